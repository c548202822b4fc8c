//! Definition of the `HybridBayesNet`

use super::{GaussianMixture, HybridConditional};
use crate::discrete::DiscreteConditional;
use crate::gaussian::{GaussianBayesNet, GaussianConditional};
use crate::tree::DecisionTree;
use crate::util::{HybridError, Result, PRUNED_ERROR};
use crate::values::{HybridValues, VectorValues};
use crate::variable::{all_assignments, Assignment, DiscreteKey, Key};

use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Clamp an accumulated error at the pruning sentinel, so that every assignment touching a
/// pruned branch reports exactly `PRUNED_ERROR`
fn saturate(e: f64) -> f64 {
    if e >= PRUNED_ERROR {
        PRUNED_ERROR
    } else {
        e
    }
}

/// A hybrid Bayes net: the factorization `p(X, M) = ∏ p(· | ·)` of a joint density over
/// continuous variables `X` and discrete variables `M` into `HybridConditional`s.
///
/// # Representation
/// The conditionals are held in elimination order: a conditional is conditioned only on
/// variables that are frontal in conditionals *after* it, e.g. `p(x1 | x2, m1) p(x2 | m1) p(m1)`.
/// Solving from the back of the list therefore always has every parent available. Insertion
/// enforces this order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridBayesNet {
    conditionals: Vec<HybridConditional>,
}

impl HybridBayesNet {

    /// Construct an empty `HybridBayesNet`
    pub fn new() -> Self {
        HybridBayesNet { conditionals: Vec::new() }
    }

    /// Append a conditional, keeping the net in elimination order.
    ///
    /// # Errors
    /// * `HybridError::DuplicateFrontal` if a frontal variable of `conditional` is already
    ///   frontal in the net
    /// * `HybridError::CyclicDependency` if `conditional` depends on a frontal variable of an
    ///   earlier conditional
    /// * `HybridError::InvalidConditional` if a discrete key's cardinality disagrees with the net
    pub fn push<C: Into<HybridConditional>>(&mut self, conditional: C) -> Result<()> {
        let conditional = conditional.into();
        let frontals: HashSet<Key> = self.conditionals.iter().flat_map(|c| c.frontal_keys()).collect();

        if let Some(k) = conditional.frontal_keys().into_iter().find(|k| frontals.contains(k)) {
            return Err(HybridError::DuplicateFrontal(k));
        }

        if let Some(k) = conditional.parent_keys().into_iter().find(|k| frontals.contains(k)) {
            return Err(HybridError::CyclicDependency(k));
        }

        let cardinalities: HashMap<Key, usize> = self.discrete_keys().into_iter().map(|dk| (dk.key, dk.cardinality)).collect();
        if let Some(dk) = conditional.discrete_keys().into_iter()
            .find(|dk| cardinalities.get(&dk.key).map_or(false, |&c| c != dk.cardinality))
        {
            return Err(HybridError::InvalidConditional(format!(
                "{} disagrees with the cardinality of the same key in the net",
                dk
            )));
        }

        self.conditionals.push(conditional);
        Ok(())
    }

    /// Append every conditional of `other`, in order
    pub fn extend(&mut self, other: &HybridBayesNet) -> Result<()> {
        for c in other.iter() {
            self.push(c.clone())?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HybridConditional> {
        self.conditionals.iter()
    }

    /// Get the conditional at position `i`
    pub fn at(&self, i: usize) -> Option<&HybridConditional> {
        self.conditionals.get(i)
    }

    /// Get the conditional at position `i` if it is a mixture
    pub fn at_mixture(&self, i: usize) -> Option<&Arc<GaussianMixture>> {
        self.at(i).and_then(|c| c.as_mixture())
    }

    /// Get the conditional at position `i` if it is discrete
    pub fn at_discrete(&self, i: usize) -> Option<&Arc<DiscreteConditional>> {
        self.at(i).and_then(|c| c.as_discrete())
    }

    /// Get the conditional at position `i` if it is Gaussian
    pub fn at_gaussian(&self, i: usize) -> Option<&Arc<GaussianConditional>> {
        self.at(i).and_then(|c| c.as_continuous())
    }

    /// Every discrete variable in the net, in ascending key order
    pub fn discrete_keys(&self) -> Vec<DiscreteKey> {
        self.conditionals.iter()
            .flat_map(|c| c.discrete_keys())
            .sorted()
            .dedup_by(|a, b| a.key == b.key)
            .collect()
    }

    /// Every continuous variable in the net, in order of first appearance
    pub fn continuous_keys(&self) -> Vec<Key> {
        self.conditionals.iter().flat_map(|c| c.continuous_keys()).unique().collect()
    }

    /// The discrete conditionals, in net order
    pub fn discrete_conditionals(&self) -> Vec<Arc<DiscreteConditional>> {
        self.conditionals.iter().filter_map(|c| c.as_discrete().cloned()).collect()
    }

    /// The discrete keys of the mixtures in the net
    fn mixture_keys(&self) -> Vec<DiscreteKey> {
        self.conditionals.iter()
            .filter_map(|c| c.as_mixture())
            .flat_map(|m| m.discrete_keys().to_vec())
            .collect()
    }

    /// Select the Gaussian conditional of every mixture branch given by `assignment`.
    ///
    /// # Returns
    /// A `GaussianBayesNet` holding, in net order, the chosen conditional of every mixture and
    /// every Gaussian conditional. Discrete conditionals are dropped.
    ///
    /// # Errors
    /// * `HybridError::AssignmentIncomplete` if the assignment misses discrete keys of a mixture
    /// * `HybridError::PrunedAssignment` if a selected branch has been pruned
    pub fn choose(&self, assignment: &Assignment) -> Result<GaussianBayesNet> {
        let missing = assignment.missing(&self.mixture_keys());
        if !missing.is_empty() {
            return Err(HybridError::AssignmentIncomplete(missing));
        }

        trace!(assignment = %assignment, "choosing gaussian bayes net");

        let mut gbn = GaussianBayesNet::new();
        for c in self.conditionals.iter() {
            match c {
                HybridConditional::Mixture(m) => gbn.push(m.choose(assignment)?),
                HybridConditional::Continuous(g) => gbn.push(g.clone()),
                HybridConditional::Discrete(_) => {}
            }
        }
        Ok(gbn)
    }

    /// Find the MAP assignment of the net.
    ///
    /// The discrete assignment is the minimum of `discrete_error_tree`; ties go to the
    /// lexicographically smallest assignment over the discrete keys in ascending key order, and
    /// keys that do not affect the error are set to 0. The continuous values are then found by
    /// back-substitution through the chosen Gaussian Bayes net.
    pub fn optimize(&self) -> Result<HybridValues> {
        let (best, error) = self.discrete_error_tree().argmin();

        let mut assignment = best;
        for dk in self.discrete_keys() {
            if !assignment.contains(dk.key) {
                assignment = assignment.with(dk.key, 0);
            }
        }

        debug!(assignment = %assignment, error, "selected MAP assignment");

        let continuous = self.optimize_with(&assignment)?;
        Ok(HybridValues::new(continuous, assignment))
    }

    /// Find the most likely continuous values for a fixed discrete assignment
    pub fn optimize_with(&self, assignment: &Assignment) -> Result<VectorValues> {
        self.choose(assignment)?.optimize()
    }

    /// The error (negative log density, up to a constant) of the net at the given continuous
    /// values and discrete assignment.
    ///
    /// The errors of the conditionals are summed in net order. Sums reaching `PRUNED_ERROR` are
    /// reported as `PRUNED_ERROR`.
    ///
    /// # Errors
    /// * `HybridError::KeyNotFound` if a value or discrete key is missing
    /// * `HybridError::DimensionMismatch` if a continuous value has the wrong dimension
    pub fn error(&self, continuous: &VectorValues, discrete: &Assignment) -> Result<f64> {
        let mut total = 0.0;
        for c in self.conditionals.iter() {
            total += c.error(continuous, discrete)?;
        }
        Ok(saturate(total))
    }

    /// The error of the net at the given continuous values for every discrete assignment.
    ///
    /// For every complete assignment `a`, evaluating the tree at `a` gives exactly
    /// `self.error(continuous, a)`.
    pub fn error_tree(&self, continuous: &VectorValues) -> Result<DecisionTree<f64>> {
        let mut total = DecisionTree::leaf(0.0);
        for c in self.conditionals.iter() {
            total = &total + &c.error_tree(continuous)?;
        }
        Ok(total.apply(|&e| saturate(e)))
    }

    /// The error of every discrete assignment with each continuous residual at its optimum:
    /// the negative log probabilities of the discrete conditionals plus the normalization
    /// offsets of the mixtures.
    pub fn discrete_error_tree(&self) -> DecisionTree<f64> {
        let total = self.conditionals.iter()
            .fold(DecisionTree::leaf(0.0), |total, c| &total + &c.discrete_error_tree());
        total.apply(|&e| saturate(e))
    }

    /// Keep the `max_nr_leaves` most likely discrete assignments, pruning every other one.
    ///
    /// Assignments are ranked by `discrete_error_tree`, ties in lexicographic order. A mixture
    /// branch or discrete probability is pruned when no kept assignment extends it: pruned
    /// branches have error `PRUNED_ERROR` and pruned probabilities become 0. The result is not
    /// renormalized, and `self` is left unchanged.
    ///
    /// A conditional only sees its own keys, so one conditional of the result is widened to
    /// every discrete key of the net: the first discrete conditional, or the first mixture if
    /// there is none. Every assignment that is not kept then has error `PRUNED_ERROR`.
    pub fn prune(&self, max_nr_leaves: usize) -> HybridBayesNet {
        let keys = self.discrete_keys();
        let scores = self.discrete_error_tree();

        // every key of the score tree is one of the net's keys, so evaluation cannot fail
        let mut ranked: Vec<(Assignment, f64)> = all_assignments(&keys)
            .filter_map(|a| scores.evaluate(&a).ok().cloned().map(|e| (a, e)))
            .collect();

        if max_nr_leaves >= ranked.len() {
            return self.clone();
        }

        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        let kept: HashSet<Assignment> = ranked.into_iter().take(max_nr_leaves).map(|(a, _)| a).collect();
        let survivors = DecisionTree::from_fn(&keys, |a| kept.contains(a));

        let widened = self.conditionals.iter().position(|c| c.is_discrete())
            .or_else(|| self.conditionals.iter().position(|c| c.is_mixture()));

        debug!(kept = max_nr_leaves, total = keys.iter().map(|dk| dk.cardinality).product::<usize>(), ?widened, "pruned hybrid bayes net");

        let conditionals = self.conditionals.iter().enumerate()
            .map(|(i, c)| match widened {
                Some(w) if w == i => c.widen(&keys).prune(&survivors),
                _ => c.prune(&survivors),
            })
            .collect();
        HybridBayesNet { conditionals }
    }

    /// Draw a joint sample by ancestral sampling, from the last conditional to the first.
    ///
    /// # Errors
    /// * `HybridError::PrunedAssignment` if a sampled discrete assignment selects a pruned
    ///   mixture branch
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<HybridValues> {
        let mut discrete = Assignment::new();
        let mut continuous = VectorValues::new();

        for c in self.conditionals.iter().rev() {
            match c {
                HybridConditional::Discrete(d) => {
                    let value = d.sample(&discrete, rng)?;
                    discrete = discrete.with(d.frontal().key, value);
                }
                HybridConditional::Continuous(g) => {
                    for (k, v) in g.sample(&continuous, rng)?.iter() {
                        continuous.insert(k, v.clone());
                    }
                }
                HybridConditional::Mixture(m) => {
                    for (k, v) in m.choose(&discrete)?.sample(&continuous, rng)?.iter() {
                        continuous.insert(k, v.clone());
                    }
                }
            }
        }

        Ok(HybridValues::new(continuous, discrete))
    }

    /// Check if the two nets hold equal conditionals, in the same order
    pub fn equals(&self, other: &HybridBayesNet, tol: f64) -> bool {
        self.len() == other.len()
            && self.conditionals.iter().zip(other.iter()).all(|(a, b)| a.equals(b, tol))
    }
}


/// An implementation of the [builder pattern] for creating a `HybridBayesNet`.
///
/// Conditionals must be added in elimination order. The first error is kept and reported by
/// `build`; later additions are ignored.
///
/// [builder pattern]: https://en.wikipedia.org/wiki/Builder_pattern
pub struct HybridBayesNetBuilder {

    /// The net under construction
    net: HybridBayesNet,

    /// The error state of the builder
    err: Option<HybridError>,
}

impl HybridBayesNetBuilder {

    /// Construct a new `HybridBayesNetBuilder` representing an empty `HybridBayesNet`
    pub fn new() -> Self {
        HybridBayesNetBuilder { net: HybridBayesNet::new(), err: None }
    }

    /// Add a conditional to the net
    pub fn with_conditional<C: Into<HybridConditional>>(mut self, conditional: C) -> Self {
        if self.err.is_none() {
            if let Err(e) = self.net.push(conditional) {
                self.err = Some(e);
            }
        }
        self
    }

    /// Add a conditional that may have failed to construct
    pub fn with_result<C: Into<HybridConditional>>(mut self, conditional: Result<C>) -> Self {
        match conditional {
            Ok(c) => self.with_conditional(c),
            Err(e) => {
                if self.err.is_none() {
                    self.err = Some(e);
                }
                self
            }
        }
    }

    /// Add a discrete conditional given by a signature such as `"1/2 3/2"`.
    ///
    /// # Args
    /// * `frontal`: the variable the distribution is over
    /// * `parents`: the conditioning variables
    /// * `signature`: one `/`-separated row of weights per parent assignment
    pub fn with_discrete(self, frontal: DiscreteKey, parents: Vec<DiscreteKey>, signature: &str) -> Self {
        self.with_result(DiscreteConditional::from_signature(frontal, parents, signature))
    }

    /// Complete building the net.
    ///
    /// # Returns
    /// the `HybridBayesNet`, or the first error generated during the building process
    pub fn build(self) -> Result<HybridBayesNet> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(self.net),
        }
    }
}

impl Default for HybridBayesNetBuilder {
    fn default() -> Self {
        HybridBayesNetBuilder::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::symbol;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;
    use rand::SeedableRng;

    fn x(j: u64) -> Key {
        symbol('x', j)
    }

    fn m1() -> DiscreteKey {
        DiscreteKey::binary(symbol('m', 1))
    }

    fn a(v: usize) -> Assignment {
        Assignment::new().with(symbol('m', 1), v)
    }

    /// p(x1 | x2, m1) p(x2) P(m1): x1 = x2 when m1 = 0 and x1 = x2 + 1 when m1 = 1, the latter
    /// branch twice as wide; P(m1 = 1) = 0.75
    fn tiny() -> HybridBayesNet {
        HybridBayesNetBuilder::new()
            .with_result(GaussianMixture::from_conditionals(
                vec![m1()],
                vec![
                    GaussianConditional::scalar(x(1), 1.0, &[(x(2), -1.0)], 0.0).unwrap(),
                    GaussianConditional::scalar(x(1), 0.5, &[(x(2), -0.5)], 0.5).unwrap(),
                ],
            ))
            .with_conditional(GaussianConditional::scalar(x(2), 1.0, &[], 2.0).unwrap())
            .with_discrete(m1(), vec![], "1/3")
            .build()
            .unwrap()
    }

    #[test]
    fn build() {
        let bn = tiny();
        assert_eq!(3, bn.len());
        assert!(bn.at_mixture(0).is_some());
        assert!(bn.at_gaussian(1).is_some());
        assert!(bn.at_discrete(2).is_some());
        assert!(bn.at_discrete(0).is_none());
        assert_eq!(vec![m1()], bn.discrete_keys());
        assert_eq!(vec![x(1), x(2)], bn.continuous_keys());
        assert_eq!(1, bn.discrete_conditionals().len());
    }

    #[test]
    fn ordering_is_enforced() {
        let p_x2 = GaussianConditional::scalar(x(2), 1.0, &[], 0.0).unwrap();

        // x1 depends on x2, which is already frontal
        let res = HybridBayesNetBuilder::new()
            .with_conditional(p_x2.clone())
            .with_conditional(GaussianConditional::scalar(x(1), 1.0, &[(x(2), 1.0)], 0.0).unwrap())
            .build();
        assert_eq!(Err(HybridError::CyclicDependency(x(2))), res);

        let res = HybridBayesNetBuilder::new()
            .with_conditional(p_x2.clone())
            .with_conditional(p_x2)
            .build();
        assert_eq!(Err(HybridError::DuplicateFrontal(x(2))), res);

        // the first error is the one reported
        let res = HybridBayesNetBuilder::new()
            .with_discrete(m1(), vec![], "1/2/3")
            .with_discrete(m1(), vec![], "1/1")
            .with_discrete(m1(), vec![], "1/1")
            .build();
        assert!(match res {
            Err(HybridError::InvalidSignature(_)) => true,
            _ => false,
        });

        // cardinalities must agree
        let res = HybridBayesNetBuilder::new()
            .with_discrete(DiscreteKey::binary(symbol('m', 2)), vec![m1()], "1/1 1/1")
            .with_discrete(DiscreteKey::new(symbol('m', 1), 3), vec![], "1/1/1")
            .build();
        assert!(res.is_err());
    }

    #[test]
    fn choose() {
        let bn = tiny();
        let gbn = bn.choose(&a(1)).unwrap();

        assert_eq!(2, gbn.len());
        assert!(gbn.at(0).unwrap().equals(&bn.at_mixture(0).unwrap().choose(&a(1)).unwrap(), 0.0));
        assert!(gbn.at(1).unwrap().equals(bn.at_gaussian(1).unwrap(), 0.0));

        assert_eq!(
            Err(HybridError::AssignmentIncomplete(vec![symbol('m', 1)])),
            bn.choose(&Assignment::new())
        );
    }

    #[test]
    fn optimize() {
        let bn = tiny();
        let map = bn.optimize().unwrap();

        // the residuals vanish at the optimum, so the discrete part decides:
        // -ln 0.25 = 1.386 for m1 = 0 against -ln 0.75 + ln 2 = 0.981 for m1 = 1
        assert_eq!(a(1), map.discrete);
        assert_abs_diff_eq!(map.continuous.at(x(2)).unwrap()[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(map.continuous.at(x(1)).unwrap()[0], 3.0, epsilon = 1e-12);

        let fixed = bn.optimize_with(&a(0)).unwrap();
        assert_abs_diff_eq!(fixed.at(x(1)).unwrap()[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn errors_agree() {
        let bn = tiny();
        let values = VectorValues::new().with(x(1), arr1(&[2.5])).with(x(2), arr1(&[1.5]));
        let tree = bn.error_tree(&values).unwrap();

        for v in 0..2 {
            assert_eq!(bn.error(&values, &a(v)).unwrap(), *tree.evaluate(&a(v)).unwrap());
        }

        // m1 = 0: ½(1)² + ½(0.5)² - ln 0.25
        assert_abs_diff_eq!(bn.error(&values, &a(0)).unwrap(), 0.625 - 0.25f64.ln(), epsilon = 1e-12);

        assert_eq!(Err(HybridError::KeyNotFound(symbol('m', 1))), bn.error(&values, &Assignment::new()));
        assert_eq!(Err(HybridError::KeyNotFound(x(2))), bn.error(&VectorValues::new().with(x(1), arr1(&[0.0])), &a(0)));
    }

    #[test]
    fn prune() {
        let bn = tiny();
        let pruned = bn.prune(1);

        assert!(pruned.at_mixture(0).unwrap().choose(&a(0)).is_err());
        assert_eq!(Err(HybridError::PrunedAssignment), pruned.optimize_with(&a(0)).map(|_| ()));

        let values = VectorValues::new().with(x(1), arr1(&[0.0])).with(x(2), arr1(&[0.0]));
        assert_eq!(PRUNED_ERROR, pruned.error(&values, &a(0)).unwrap());
        assert_eq!(bn.error(&values, &a(1)).unwrap(), pruned.error(&values, &a(1)).unwrap());
        assert_eq!(bn.optimize().unwrap(), pruned.optimize().unwrap());

        // nothing to prune
        assert_eq!(bn, bn.prune(2));
        assert_eq!(bn, bn.prune(10));
    }

    /// p(x1 | m1) p(x2 | m2) P(m1) P(m2): the modes are independent, so no conditional spans both
    fn independent() -> HybridBayesNet {
        let m2 = DiscreteKey::binary(symbol('m', 2));
        let switch = |j: u64, key: DiscreteKey| GaussianMixture::from_conditionals(
            vec![key],
            vec![
                GaussianConditional::scalar(x(j), 1.0, &[], 0.0).unwrap(),
                GaussianConditional::scalar(x(j), 1.0, &[], 1.0).unwrap(),
            ],
        );

        HybridBayesNetBuilder::new()
            .with_result(switch(1, m1()))
            .with_result(switch(2, m2))
            .with_discrete(m1(), vec![], "7/3")
            .with_discrete(m2, vec![], "6/4")
            .build()
            .unwrap()
    }

    #[test]
    fn prune_independent_modes() {
        let bn = independent();
        let keys = bn.discrete_keys();
        let pruned = bn.prune(3);
        let values = VectorValues::new().with(x(1), arr1(&[0.5])).with(x(2), arr1(&[0.5]));

        // P = .42, .28, .18, .12: only {m1 = 1, m2 = 1} goes
        let both = a(1).with(symbol('m', 2), 1);
        assert_eq!(PRUNED_ERROR, pruned.error(&values, &both).unwrap());
        assert_eq!(PRUNED_ERROR, *pruned.error_tree(&values).unwrap().evaluate(&both).unwrap());

        let mut live = 0;
        for assignment in all_assignments(&keys) {
            let e = pruned.error(&values, &assignment).unwrap();
            if e < PRUNED_ERROR {
                live += 1;
                assert_eq!(bn.error(&values, &assignment).unwrap(), e);
            }
        }
        assert_eq!(3, live);

        assert_eq!(bn.optimize().unwrap(), pruned.optimize().unwrap());
        assert_eq!(keys, pruned.discrete_keys());

        // the prior on m1 now conditions on m2, so sampling avoids the pruned pair
        assert_eq!(vec![DiscreteKey::binary(symbol('m', 2))], pruned.at_discrete(2).unwrap().parents().to_vec());
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        for _ in 0..100 {
            assert_ne!(both, pruned.sample(&mut rng).unwrap().discrete);
        }
    }

    #[test]
    fn prune_without_discrete_conditionals() {
        let m2 = DiscreteKey::binary(symbol('m', 2));
        let bn = HybridBayesNetBuilder::new()
            .with_result(GaussianMixture::from_conditionals(
                vec![m1()],
                vec![
                    GaussianConditional::scalar(x(1), 1.0, &[], 0.0).unwrap(),
                    GaussianConditional::scalar(x(1), 0.5, &[], 0.0).unwrap(),
                ],
            ))
            .with_result(GaussianMixture::from_conditionals(
                vec![m2],
                vec![
                    GaussianConditional::scalar(x(2), 1.0, &[], 0.0).unwrap(),
                    GaussianConditional::scalar(x(2), 0.25, &[], 0.0).unwrap(),
                ],
            ))
            .build()
            .unwrap();

        // offsets 0, ln 2, ln 4 and ln 8: keep the first two
        let pruned = bn.prune(2);
        let values = VectorValues::new().with(x(1), arr1(&[0.0])).with(x(2), arr1(&[0.0]));
        let errors: Vec<f64> = all_assignments(&bn.discrete_keys())
            .map(|assignment| pruned.error(&values, &assignment).unwrap())
            .collect();

        assert_eq!(0.0, errors[0]);
        assert_abs_diff_eq!(errors[2], 2f64.ln(), epsilon = 1e-12);
        assert_eq!(vec![PRUNED_ERROR, PRUNED_ERROR], vec![errors[1], errors[3]]);
    }

    #[test]
    fn map_is_not_a_chain_of_argmax() {
        let m2 = DiscreteKey::binary(symbol('m', 2));
        let bn = HybridBayesNetBuilder::new()
            .with_discrete(m2, vec![m1()], "1/1 0/1")
            .with_discrete(m1(), vec![], "3/2")
            .build()
            .unwrap();

        // greedily m1 = 0 (.6), then m2 = 0 (.5): joint .3
        let first = bn.at_discrete(1).unwrap().argmax(&Assignment::new()).unwrap();
        let second = bn.at_discrete(0).unwrap().argmax(&a(first)).unwrap();
        assert_eq!((0, 0), (first, second));

        // the joint optimum is m1 = 1, m2 = 1 with .4
        let map = bn.optimize().unwrap();
        assert_eq!(a(1).with(symbol('m', 2), 1), map.discrete);
        assert!(map.continuous.is_empty());
    }

    #[test]
    fn sample() {
        use rand::rngs::StdRng;

        let bn = tiny();
        let mut rng = StdRng::seed_from_u64(3);
        let samples: Vec<HybridValues> = (0..400).map(|_| bn.sample(&mut rng).unwrap()).collect();

        let ones = samples.iter().filter(|s| s.discrete.get(symbol('m', 1)) == Some(1)).count();
        assert!(ones > 240 && ones < 360, "P(m1 = 1) = 0.75, drew {} of 400", ones);
        assert!(samples.iter().all(|s| s.continuous.contains(x(1)) && s.continuous.contains(x(2))));

        // sampling from a pruned net never selects a pruned branch
        let pruned = bn.prune(1);
        for _ in 0..50 {
            assert_eq!(Some(1), pruned.sample(&mut rng).unwrap().discrete.get(symbol('m', 1)));
        }
    }

    #[test]
    fn extend() {
        let bn = tiny();
        let mut head = HybridBayesNet::new();
        head.push(bn.at(0).unwrap().clone()).unwrap();

        let mut tail = HybridBayesNet::new();
        tail.push(bn.at(1).unwrap().clone()).unwrap();
        tail.push(bn.at(2).unwrap().clone()).unwrap();

        head.extend(&tail).unwrap();
        assert!(head.equals(&bn, 0.0));
        assert!(tail.extend(&bn).is_err());
    }
}
