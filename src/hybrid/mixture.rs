//! Definition of the `GaussianMixture`

use crate::gaussian::GaussianConditional;
use crate::tree::{check_domain, DecisionTree};
use crate::util::{HybridError, Result, PRUNED_ERROR};
use crate::values::VectorValues;
use crate::variable::{Assignment, DiscreteKey, Key, Symbol};

use approx::AbsDiffEq;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::sync::Arc;

/// A family of Gaussian conditionals indexed by discrete variables: `p(X | Pa(X), M)`.
///
/// # Representation
/// The conditionals live in the leaves of a `DecisionTree` over the discrete keys `M`. Every
/// conditional has the same frontal and parent variables; only the numbers differ. A parallel
/// tree holds the `neg_log_constant` of each branch so that errors of branches with different
/// covariances can be compared. A leaf is `None` once its branch has been pruned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianMixture {
    frontals: Vec<(Key, usize)>,
    parents: Vec<(Key, usize)>,
    discrete_keys: Vec<DiscreteKey>,
    conditionals: DecisionTree<Option<Arc<GaussianConditional>>>,

    /// `−ln K` of every branch
    neg_log_constants: DecisionTree<f64>,

    /// The smallest `−ln K` over the branches at construction. Pruning leaves it unchanged.
    min_neg_log_constant: f64,
}

impl GaussianMixture {

    /// Create a new `GaussianMixture`.
    ///
    /// # Args
    /// * `discrete_keys`: the discrete variables indexing the conditionals
    /// * `conditionals`: a tree over (a subset of) `discrete_keys` holding the conditionals
    ///
    /// # Errors
    /// * `HybridError::InvalidConditional` if a discrete key is repeated or has no values, the
    ///   tree branches on a key outside `discrete_keys`, or the conditionals are over different
    ///   variables
    pub fn new(discrete_keys: Vec<DiscreteKey>, conditionals: DecisionTree<Arc<GaussianConditional>>) -> Result<Self> {
        check_domain(&discrete_keys)?;
        if discrete_keys.iter().map(|dk| dk.key).unique().count() != discrete_keys.len() {
            return Err(HybridError::InvalidConditional(String::from("repeated discrete key in a mixture")));
        }

        if let Some(foreign) = conditionals.keys().into_iter().find(|k| !discrete_keys.contains(k)) {
            return Err(HybridError::InvalidConditional(format!(
                "mixture branches on {}, which is not one of its discrete keys",
                foreign
            )));
        }

        let leaves = conditionals.leaves();
        let first = leaves[0].clone();
        if leaves.iter().any(|c| !c.same_structure(&first)) {
            return Err(HybridError::InvalidConditional(String::from(
                "the conditionals of a mixture must share frontal and parent variables"
            )));
        }

        let neg_log_constants = conditionals.apply(|c| c.neg_log_constant());
        let min_neg_log_constant = neg_log_constants.min();

        Ok(GaussianMixture {
            frontals: first.frontals().to_vec(),
            parents: first.parents().to_vec(),
            discrete_keys,
            conditionals: conditionals.apply(|c| Some(c.clone())),
            neg_log_constants,
            min_neg_log_constant,
        })
    }

    /// Create a `GaussianMixture` from one conditional per assignment of `discrete_keys`, in the
    /// order of `all_assignments(&discrete_keys)`.
    pub fn from_conditionals(discrete_keys: Vec<DiscreteKey>, conditionals: Vec<GaussianConditional>) -> Result<Self> {
        let leaves = conditionals.into_iter().map(Arc::new).collect();
        let tree = DecisionTree::from_leaves(&discrete_keys, leaves)?;
        GaussianMixture::new(discrete_keys, tree)
    }

    pub fn frontals(&self) -> &[(Key, usize)] {
        &self.frontals
    }

    pub fn parents(&self) -> &[(Key, usize)] {
        &self.parents
    }

    pub fn discrete_keys(&self) -> &[DiscreteKey] {
        &self.discrete_keys
    }

    pub fn frontal_keys(&self) -> Vec<Key> {
        self.frontals.iter().map(|&(k, _)| k).collect()
    }

    /// The continuous parents
    pub fn parent_keys(&self) -> Vec<Key> {
        self.parents.iter().map(|&(k, _)| k).collect()
    }

    pub fn conditionals(&self) -> &DecisionTree<Option<Arc<GaussianConditional>>> {
        &self.conditionals
    }

    /// `−ln K` of every branch
    pub fn neg_log_constants(&self) -> &DecisionTree<f64> {
        &self.neg_log_constants
    }

    /// `ln K` of every branch
    pub fn log_normalization_constants(&self) -> DecisionTree<f64> {
        self.neg_log_constants.apply(|n| -n)
    }

    fn check_covered(&self, assignment: &Assignment) -> Result<()> {
        match assignment.missing(&self.discrete_keys).first() {
            Some(&k) => Err(HybridError::KeyNotFound(k)),
            None => Ok(()),
        }
    }

    /// Select the conditional of the branch given by `assignment`. Keys other than the
    /// mixture's discrete keys are ignored.
    ///
    /// # Errors
    /// * `HybridError::KeyNotFound` if a discrete key of the mixture is not assigned
    /// * `HybridError::PrunedAssignment` if the branch has been pruned
    pub fn choose(&self, assignment: &Assignment) -> Result<Arc<GaussianConditional>> {
        self.check_covered(assignment)?;
        self.conditionals.evaluate(assignment)?.clone().ok_or(HybridError::PrunedAssignment)
    }

    /// The error of the selected branch, normalized across branches.
    ///
    /// The branch's residual `½‖R x + S pa − d‖²` is offset by how much its `−ln K` exceeds the
    /// smallest one, so that differences between branches equal differences of the full
    /// negative log densities. A pruned branch has error `PRUNED_ERROR`.
    pub fn error(&self, values: &VectorValues, assignment: &Assignment) -> Result<f64> {
        self.check_covered(assignment)?;
        match self.conditionals.evaluate(assignment)? {
            Some(c) => {
                let n = self.neg_log_constants.evaluate(assignment)?;
                Ok(c.error(values)? + (n - self.min_neg_log_constant))
            }
            None => Ok(PRUNED_ERROR),
        }
    }

    /// The normalized error of every branch at `values`, as a tree
    pub fn error_tree(&self, values: &VectorValues) -> Result<DecisionTree<f64>> {
        let residuals = self.conditionals.try_apply(|c| match c {
            Some(c) => c.error(values).map(Some),
            None => Ok(None),
        })?;

        let min = self.min_neg_log_constant;
        Ok(residuals.combine(&self.neg_log_constants, |e, n| match e {
            Some(e) => e + (n - min),
            None => PRUNED_ERROR,
        }))
    }

    /// The normalization offset of every branch: its error when the residual is zero
    pub fn normalization_offsets(&self) -> DecisionTree<f64> {
        let min = self.min_neg_log_constant;
        self.conditionals.combine(&self.neg_log_constants, |c, n| match c {
            Some(_) => n - min,
            None => PRUNED_ERROR,
        })
    }

    /// Remove every branch that no surviving assignment extends.
    ///
    /// `survivors` marks the discrete assignments to keep. The normalization constants of the
    /// remaining branches are left alone, so their errors do not change.
    pub fn prune(&self, survivors: &DecisionTree<bool>) -> GaussianMixture {
        let conditionals = DecisionTree::from_fn(&self.discrete_keys, |a| {
            if survivors.any_extension(a) {
                self.conditionals.evaluate(a).ok().and_then(|c| c.clone())
            } else {
                None
            }
        });

        GaussianMixture { conditionals, ..self.clone() }
    }

    /// The same mixture, switching in addition on every key of `keys` it does not already have.
    /// Every branch is shared by the values of the added keys.
    pub(crate) fn widen(&self, keys: &[DiscreteKey]) -> GaussianMixture {
        let extra = keys.iter().filter(|dk| !self.discrete_keys.iter().any(|own| own.key == dk.key)).cloned();
        let discrete_keys = self.discrete_keys.iter().cloned().chain(extra).collect();
        GaussianMixture { discrete_keys, ..self.clone() }
    }

    /// The number of branches that have not been pruned
    pub fn nr_live_branches(&self) -> usize {
        self.conditionals.enumerate().iter().filter(|(_, c)| c.is_some()).count()
    }

    /// Check if the two mixtures are over the same variables with equal branches up to `tol`
    pub fn equals(&self, other: &GaussianMixture, tol: f64) -> bool {
        self.frontals == other.frontals
            && self.parents == other.parents
            && self.discrete_keys == other.discrete_keys
            && self.min_neg_log_constant.abs_diff_eq(&other.min_neg_log_constant, tol)
            && self.neg_log_constants.equals(&other.neg_log_constants, tol)
            && self.conditionals.equals_with(&other.conditionals, |a, b| match (a, b) {
                (Some(a), Some(b)) => a.equals(b, tol),
                (None, None) => true,
                _ => false,
            })
    }
}

impl fmt::Display for GaussianMixture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "p({}", self.frontals.iter().map(|&(k, _)| Symbol(k)).join(", "))?;
        let parents = self.parents.iter().map(|&(k, _)| Symbol(k).to_string())
            .chain(self.discrete_keys.iter().map(|dk| dk.to_string()))
            .join(", ");
        if !parents.is_empty() {
            write!(f, " | {}", parents)?;
        }
        write!(f, ")")
    }
}
