//! Definition of the `DiscreteConditional`
//!
//! A `DiscreteConditional` is a conditional probability distribution (CPD) `P(X | Pa(X))` over
//! one discrete frontal variable `X` given discrete parents. The probabilities are stored in a
//! `DecisionTree` over `X` and its parents.

use crate::tree::{check_domain, DecisionTree};
use crate::util::{HybridError, Result, PRUNED_ERROR};
use crate::variable::{all_assignments, Assignment, DiscreteKey};

use itertools::Itertools;
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Probabilities of one parent assignment may deviate from summing to one by this much
const NORMALIZATION_TOL: f64 = 1e-6;

/// Negative log of a probability. Zero probabilities map to the pruning sentinel rather than
/// infinity.
pub(crate) fn neg_log(p: f64) -> f64 {
    if p > 0.0 {
        -p.ln()
    } else {
        PRUNED_ERROR
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscreteConditional {

    /// The variable this conditional is a distribution over
    frontal: DiscreteKey,

    /// The variables the distribution is conditioned on
    parents: Vec<DiscreteKey>,

    /// `P(frontal | parents)`, as a tree over the frontal and parent keys
    table: DecisionTree<f64>,
}

impl DiscreteConditional {

    /// Create a new `DiscreteConditional` from a tree of probabilities.
    ///
    /// # Args
    /// * `frontal`: the variable the distribution is over
    /// * `parents`: the conditioning variables
    /// * `table`: a tree over (a subset of) the frontal and parent keys holding `P(frontal | parents)`
    ///
    /// # Errors
    /// * `HybridError::InvalidConditional` if a key has no values, the tree branches on foreign
    ///   keys, holds negative probabilities, or a parent assignment's probabilities do not sum
    ///   to one
    pub fn new(frontal: DiscreteKey, parents: Vec<DiscreteKey>, table: DecisionTree<f64>) -> Result<Self> {
        check_domain(&[frontal])?;
        check_domain(&parents)?;

        if parents.iter().any(|p| p.key == frontal.key) || parents.iter().map(|p| p.key).unique().count() != parents.len() {
            return Err(HybridError::InvalidConditional(
                format!("variable {} repeated in the scope of a discrete conditional", frontal)
            ));
        }

        let conditional = DiscreteConditional { frontal, parents, table };
        let scope = conditional.keys();
        if conditional.table.keys().iter().any(|k| !scope.contains(k)) {
            return Err(HybridError::InvalidConditional(
                String::from("probability table branches on keys outside of the conditional's scope")
            ));
        }

        if conditional.table.any(|&p| p < 0.0 || !p.is_finite()) {
            return Err(HybridError::InvalidConditional(
                String::from("probabilities must be finite and non-negative")
            ));
        }

        for parent_values in all_assignments(&conditional.parents) {
            let mut total = 0.0;
            for v in 0..frontal.cardinality {
                total += conditional.table.evaluate(&parent_values.clone().with(frontal.key, v))?;
            }
            if (total - 1.0).abs() > NORMALIZATION_TOL {
                return Err(HybridError::InvalidConditional(format!(
                    "probabilities of {} given {} sum to {}",
                    frontal, parent_values, total
                )));
            }
        }

        Ok(conditional)
    }

    /// Create a new `DiscreteConditional` from a dense table.
    ///
    /// The table has one axis per parent, in order, followed by a last axis for the frontal
    /// variable, as in `P[pa_0][pa_1]...[x]`.
    pub fn from_table(frontal: DiscreteKey, parents: Vec<DiscreteKey>, table: ArrayD<f64>) -> Result<Self> {
        let scope: Vec<DiscreteKey> = parents.iter().chain(Some(&frontal)).cloned().collect();
        check_domain(&scope)?;

        let shape: Vec<usize> = parents.iter().chain(Some(&frontal)).map(|dk| dk.cardinality).collect();
        if table.shape() != &shape[..] {
            return Err(HybridError::InvalidConditional(format!(
                "table shape {:?} does not match the scope cardinalities {:?}",
                table.shape(),
                shape
            )));
        }

        let tree = DecisionTree::from_fn(&scope, |a| {
            let idx: Vec<usize> = scope.iter().map(|dk| a.get(dk.key).unwrap_or(0)).collect();
            table[IxDyn(&idx)]
        });
        DiscreteConditional::new(frontal, parents, tree)
    }

    /// Create a new `DiscreteConditional` from a signature string.
    ///
    /// The signature holds one row per parent assignment (in the order of `all_assignments`
    /// over the parents), separated by whitespace. Each row lists relative weights for the
    /// frontal values separated by `/`, e.g. `"99/1"` for a prior on a binary variable or
    /// `"1/2 3/2"` for a binary variable with one binary parent. Rows are normalized.
    pub fn from_signature(frontal: DiscreteKey, parents: Vec<DiscreteKey>, signature: &str) -> Result<Self> {
        check_domain(&[frontal])?;
        check_domain(&parents)?;

        let rows: Vec<Vec<f64>> = signature
            .split_whitespace()
            .map(|row| {
                row.split('/')
                   .map(|w| w.parse::<f64>().map_err(|_| HybridError::InvalidSignature(String::from(signature))))
                   .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<_>>()?;

        let nr_rows: usize = parents.iter().map(|dk| dk.cardinality).product();
        if rows.len() != nr_rows || rows.iter().any(|r| r.len() != frontal.cardinality) {
            return Err(HybridError::InvalidSignature(format!(
                "'{}' needs {} rows of {} weights",
                signature, nr_rows, frontal.cardinality
            )));
        }

        let mut probabilities = Vec::with_capacity(nr_rows * frontal.cardinality);
        for row in rows {
            let total: f64 = row.iter().sum();
            if total <= 0.0 || row.iter().any(|&w| w < 0.0) {
                return Err(HybridError::InvalidSignature(format!("row of '{}' has no positive weight", signature)));
            }
            probabilities.extend(row.iter().map(|w| w / total));
        }

        let scope: Vec<DiscreteKey> = parents.iter().chain(Some(&frontal)).cloned().collect();
        let tree = DecisionTree::from_leaves(&scope, probabilities)?;
        DiscreteConditional::new(frontal, parents, tree)
    }

    pub fn frontal(&self) -> DiscreteKey {
        self.frontal
    }

    pub fn parents(&self) -> &[DiscreteKey] {
        &self.parents
    }

    /// The frontal key followed by the parent keys
    pub fn keys(&self) -> Vec<DiscreteKey> {
        Some(self.frontal).into_iter().chain(self.parents.iter().cloned()).collect()
    }

    /// The probability tree
    pub fn table(&self) -> &DecisionTree<f64> {
        &self.table
    }

    /// `P(frontal = a[frontal] | parents = a[parents])`
    pub fn probability(&self, assignment: &Assignment) -> Result<f64> {
        // check the full scope, even where the table has collapsed a key
        if let Some(&missing) = assignment.missing(&self.keys()).first() {
            return Err(HybridError::KeyNotFound(missing));
        }
        self.table.evaluate(assignment).map(|&p| p)
    }

    /// The negative log probability of the assignment
    pub fn error(&self, assignment: &Assignment) -> Result<f64> {
        self.probability(assignment).map(neg_log)
    }

    /// The negative log probability of every assignment, as a tree
    pub fn error_tree(&self) -> DecisionTree<f64> {
        self.table.apply(|&p| neg_log(p))
    }

    /// The most probable frontal value given the parents' values. Ties go to the lowest value.
    ///
    /// This is a query on one conditional. Chaining it through a net does not give the joint
    /// MAP assignment in general; `HybridBayesNet::optimize` minimizes the joint error instead.
    pub fn argmax(&self, parents: &Assignment) -> Result<usize> {
        let mut best = (0, f64::NEG_INFINITY);
        for v in 0..self.frontal.cardinality {
            let p = self.probability(&parents.clone().with(self.frontal.key, v))?;
            if p > best.1 {
                best = (v, p);
            }
        }
        Ok(best.0)
    }

    /// Draw a frontal value given the parents' values
    pub fn sample<R: Rng + ?Sized>(&self, parents: &Assignment, rng: &mut R) -> Result<usize> {
        let weights = (0..self.frontal.cardinality)
            .map(|v| self.probability(&parents.clone().with(self.frontal.key, v)))
            .collect::<Result<Vec<f64>>>()?;

        // pruned rows need not sum to one
        let total: f64 = weights.iter().sum();
        let mut u = rng.gen::<f64>() * total;
        for (v, w) in weights.iter().enumerate() {
            if u < *w {
                return Ok(v);
            }
            u -= w;
        }

        // rounding can leave u just above the last weight
        Ok(weights.iter().rposition(|&w| w > 0.0).unwrap_or(0))
    }

    /// Zero the probability of every entry that no surviving assignment extends.
    ///
    /// `survivors` is a tree over (a superset of) this conditional's keys marking the discrete
    /// assignments to keep. The result is not renormalized.
    pub fn prune(&self, survivors: &DecisionTree<bool>) -> DiscreteConditional {
        let table = DecisionTree::from_fn(&self.keys(), |a| {
            if survivors.any_extension(a) {
                self.table.evaluate(a).map(|&p| p).unwrap_or(0.0)
            } else {
                0.0
            }
        });

        DiscreteConditional { frontal: self.frontal, parents: self.parents.clone(), table }
    }

    /// The same distribution, conditioned in addition on every key of `keys` outside its scope.
    ///
    /// The probabilities do not depend on the added parents, so the error of every assignment
    /// is unchanged. Pruning the result can then tell apart every assignment of `keys`.
    pub(crate) fn widen(&self, keys: &[DiscreteKey]) -> DiscreteConditional {
        let scope = self.keys();
        let extra = keys.iter().filter(|dk| !scope.iter().any(|s| s.key == dk.key)).cloned();

        DiscreteConditional {
            frontal: self.frontal,
            parents: self.parents.iter().cloned().chain(extra).collect(),
            table: self.table.clone(),
        }
    }

    /// Check if the two conditionals have the same scope and probabilities up to `tol`
    pub fn equals(&self, other: &DiscreteConditional, tol: f64) -> bool {
        self.frontal == other.frontal && self.parents == other.parents && self.table.equals(&other.table, tol)
    }
}

impl fmt::Display for DiscreteConditional {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "P({}", self.frontal)?;
        if !self.parents.is_empty() {
            write!(f, " | {}", self.parents.iter().join(", "))?;
        }
        write!(f, ")")
    }
}
