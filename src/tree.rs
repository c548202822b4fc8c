//! Definition of the `DecisionTree`
//!
//! A `DecisionTree` maps assignments of discrete variables to values of type `T` without
//! enumerating the Cartesian product of the variables. Internal nodes branch on one discrete
//! variable, leaves hold values.
//!
//! # Representation
//! Trees are kept in a canonical form:
//! * along every path from the root the branching keys are strictly increasing, and
//! * a node whose branches are all equal is replaced by that branch.
//!
//! Nodes are immutable and reference counted, so subtrees are shared between trees produced by
//! `apply`, `combine` and `restrict`, and a tree can be read from many threads at once. Two
//! canonical trees represent the same function exactly when they are structurally equal.

use crate::util::{HybridError, Result};
use crate::variable::{Assignment, DiscreteKey, Key};

use approx::AbsDiffEq;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use std::ops::Add;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Node<T> {
    Leaf(T),
    Choice {
        key: DiscreteKey,
        branches: Vec<Arc<Node<T>>>,
    },
}

impl<T> Node<T> {
    fn top_key(&self) -> Option<DiscreteKey> {
        match self {
            Node::Leaf(_) => None,
            Node::Choice { key, .. } => Some(*key),
        }
    }
}

/// A `DecisionTree` over leaves of type `T`. See the module documentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree<T> {
    root: Arc<Node<T>>,
}

/// A `DecisionTree` with scalar leaves, e.g. errors or probabilities
pub type AlgebraicDecisionTree = DecisionTree<f64>;


/// Check that every key can take at least one value, so that trees over `keys` have leaves.
///
/// # Errors
/// * `HybridError::InvalidConditional` if a key has cardinality 0
pub(crate) fn check_domain(keys: &[DiscreteKey]) -> Result<()> {
    match keys.iter().find(|dk| dk.cardinality == 0) {
        Some(dk) => Err(HybridError::InvalidConditional(format!("{} has no values", dk))),
        None => Ok(()),
    }
}

/// Build a choice node, collapsing it when every branch is the same.
fn choice<T: PartialEq>(key: DiscreteKey, branches: Vec<Arc<Node<T>>>) -> Arc<Node<T>> {
    let first = &branches[0];
    if branches[1..].iter().all(|b| Arc::ptr_eq(b, first) || b == first) {
        return first.clone();
    }
    Arc::new(Node::Choice { key, branches })
}

/// The branch of `node` to follow when `key = value`. Nodes not branching on `key` are
/// returned as-is: in a canonical tree their subtrees cannot mention `key` either.
fn branch<T>(node: &Arc<Node<T>>, key: Key, value: usize) -> Arc<Node<T>> {
    match &**node {
        Node::Choice { key: k, branches } if k.key == key => branches[value].clone(),
        _ => node.clone(),
    }
}

fn build<T, F>(keys: &[DiscreteKey], level: usize, assignment: Assignment, f: &mut F) -> Arc<Node<T>>
where
    T: PartialEq,
    F: FnMut(&Assignment) -> T,
{
    if level == keys.len() {
        return Arc::new(Node::Leaf(f(&assignment)));
    }

    let key = keys[level];
    let branches = (0..key.cardinality)
        .map(|v| build(keys, level + 1, assignment.clone().with(key.key, v), &mut *f))
        .collect();
    choice(key, branches)
}

fn apply_node<T, U, F>(node: &Arc<Node<T>>, f: &F) -> Result<Arc<Node<U>>>
where
    U: PartialEq,
    F: Fn(&T) -> Result<U>,
{
    match &**node {
        Node::Leaf(v) => Ok(Arc::new(Node::Leaf(f(v)?))),
        Node::Choice { key, branches } => {
            let branches = branches.iter().map(|b| apply_node(b, f)).collect::<Result<Vec<_>>>()?;
            Ok(choice(*key, branches))
        }
    }
}

fn combine_nodes<T, U, V, F>(a: &Arc<Node<T>>, b: &Arc<Node<U>>, f: &F) -> Arc<Node<V>>
where
    V: PartialEq,
    F: Fn(&T, &U) -> V,
{
    if let (Node::Leaf(x), Node::Leaf(y)) = (&**a, &**b) {
        return Arc::new(Node::Leaf(f(x, y)));
    }

    // branch on the smallest key at the top of either tree
    let top = match (a.top_key(), b.top_key()) {
        (Some(ka), Some(kb)) if kb.key < ka.key => kb,
        (Some(k), _) | (None, Some(k)) => k,
        (None, None) => unreachable!("two leaves are combined above"),
    };

    debug_assert!(
        [a.top_key(), b.top_key()].iter().flatten()
            .filter(|dk| dk.key == top.key)
            .all(|dk| dk.cardinality == top.cardinality),
        "trees disagree on the cardinality of a key"
    );

    let branches = (0..top.cardinality)
        .map(|v| combine_nodes(&branch(a, top.key, v), &branch(b, top.key, v), f))
        .collect();
    choice(top, branches)
}

fn restrict_node<T: PartialEq>(node: &Arc<Node<T>>, assignment: &Assignment) -> Result<Arc<Node<T>>> {
    match &**node {
        Node::Leaf(_) => Ok(node.clone()),
        Node::Choice { key, branches } => match assignment.get(key.key) {
            Some(v) => {
                let b = branches.get(v).ok_or(HybridError::ValueOutOfRange {
                    key: key.key,
                    value: v,
                    cardinality: key.cardinality,
                })?;
                restrict_node(b, assignment)
            }
            None => {
                let branches = branches
                    .iter()
                    .map(|b| restrict_node(b, assignment))
                    .collect::<Result<Vec<_>>>()?;
                Ok(choice(*key, branches))
            }
        },
    }
}

fn collect_keys<T>(node: &Node<T>, keys: &mut Vec<DiscreteKey>) {
    if let Node::Choice { key, branches } = node {
        keys.push(*key);
        for b in branches {
            collect_keys(b, keys);
        }
    }
}


impl<T: PartialEq> DecisionTree<T> {

    /// A constant tree
    pub fn leaf(value: T) -> Self {
        DecisionTree { root: Arc::new(Node::Leaf(value)) }
    }

    /// Build a tree over `keys` whose leaf for each complete assignment is `f(assignment)`.
    ///
    /// The keys may be given in any order; duplicates are ignored.
    ///
    /// # Panics
    /// If a key has cardinality 0. Fallible constructors check keys with `from_leaves`.
    pub fn from_fn<F>(keys: &[DiscreteKey], mut f: F) -> Self
    where
        F: FnMut(&Assignment) -> T,
    {
        let keys: Vec<DiscreteKey> = keys.iter().cloned().sorted().dedup_by(|a, b| a.key == b.key).collect();
        DecisionTree { root: build(&keys, 0, Assignment::new(), &mut f) }
    }

    /// Build a tree from the leaves of every complete assignment to `keys`.
    ///
    /// # Args
    /// * `keys`: the keys, first key most significant
    /// * `leaves`: one leaf per assignment, in the order of `all_assignments(keys)`
    ///
    /// # Errors
    /// * `HybridError::InvalidConditional` if a key has no values or the number of leaves does
    ///   not match the domain
    pub fn from_leaves(keys: &[DiscreteKey], leaves: Vec<T>) -> Result<Self>
    where
        T: Clone,
    {
        check_domain(keys)?;
        let expected: usize = keys.iter().map(|dk| dk.cardinality).product();
        if leaves.len() != expected {
            return Err(HybridError::InvalidConditional(format!(
                "expected {} leaves for keys [{}], got {}",
                expected,
                keys.iter().join(", "),
                leaves.len()
            )));
        }

        Ok(DecisionTree::from_fn(keys, |a| {
            // mixed-radix index of the assignment, last key least significant
            let idx = keys.iter().fold(0, |idx, dk| idx * dk.cardinality + a.get(dk.key).unwrap_or(0));
            leaves[idx].clone()
        }))
    }

    /// Look up the leaf selected by `assignment`.
    ///
    /// Keys in the assignment that the tree does not branch on are ignored.
    ///
    /// # Errors
    /// * `HybridError::KeyNotFound` if a key the tree branches on is not assigned
    /// * `HybridError::ValueOutOfRange` if an assigned value exceeds the key's cardinality
    pub fn evaluate(&self, assignment: &Assignment) -> Result<&T> {
        let mut node = &self.root;
        loop {
            match &**node {
                Node::Leaf(v) => return Ok(v),
                Node::Choice { key, branches } => {
                    let v = assignment.at(key.key)?;
                    node = branches.get(v).ok_or(HybridError::ValueOutOfRange {
                        key: key.key,
                        value: v,
                        cardinality: key.cardinality,
                    })?;
                }
            }
        }
    }

    /// Map every leaf through `f`, keeping the branching structure
    pub fn apply<U, F>(&self, f: F) -> DecisionTree<U>
    where
        U: PartialEq,
        F: Fn(&T) -> U,
    {
        match apply_node(&self.root, &|v: &T| Ok(f(v))) {
            Ok(root) => DecisionTree { root },
            Err(_) => unreachable!("infallible map"),
        }
    }

    /// Map every leaf through a fallible `f`, stopping at the first error
    pub fn try_apply<U, F>(&self, f: F) -> Result<DecisionTree<U>>
    where
        U: PartialEq,
        F: Fn(&T) -> Result<U>,
    {
        Ok(DecisionTree { root: apply_node(&self.root, &f)? })
    }

    /// Pointwise combination of two trees.
    ///
    /// The result is a tree over the union of both key sets whose leaf for every assignment `a`
    /// is `f(self(a), other(a))`. Only the branches present in at least one of the trees are
    /// visited.
    pub fn combine<U, V, F>(&self, other: &DecisionTree<U>, f: F) -> DecisionTree<V>
    where
        V: PartialEq,
        F: Fn(&T, &U) -> V,
    {
        DecisionTree { root: combine_nodes(&self.root, &other.root, &f) }
    }

    /// Fix the keys that `assignment` covers, returning a tree over the remaining keys
    pub fn restrict(&self, assignment: &Assignment) -> Result<Self> {
        Ok(DecisionTree { root: restrict_node(&self.root, assignment)? })
    }

    /// The discrete keys the tree branches on, in ascending key order
    pub fn keys(&self) -> Vec<DiscreteKey> {
        let mut keys = Vec::new();
        collect_keys(&self.root, &mut keys);
        keys.into_iter().sorted().dedup_by(|a, b| a.key == b.key).collect()
    }

    /// The number of leaves reached by walking the tree. Shared subtrees count once per path.
    pub fn nr_leaves(&self) -> usize {
        fn count<T>(node: &Node<T>) -> usize {
            match node {
                Node::Leaf(_) => 1,
                Node::Choice { branches, .. } => branches.iter().map(|b| count(b)).sum(),
            }
        }
        count(&self.root)
    }

    /// Check if any leaf satisfies `pred`
    pub fn any<F: Fn(&T) -> bool>(&self, pred: F) -> bool {
        fn walk<T, F: Fn(&T) -> bool>(node: &Node<T>, pred: &F) -> bool {
            match node {
                Node::Leaf(v) => pred(v),
                Node::Choice { branches, .. } => branches.iter().any(|b| walk(b, pred)),
            }
        }
        walk(&self.root, &pred)
    }

    /// Every leaf, once per path
    pub fn leaves(&self) -> Vec<&T> {
        fn walk<'a, T>(node: &'a Node<T>, out: &mut Vec<&'a T>) {
            match node {
                Node::Leaf(v) => out.push(v),
                Node::Choice { branches, .. } => branches.iter().for_each(|b| walk(b, out)),
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }

    /// Every complete assignment to `self.keys()` paired with its leaf.
    ///
    /// Assignments come in the order of `all_assignments(&self.keys())`, so collapsed keys are
    /// expanded again and a leaf can appear several times.
    pub fn enumerate(&self) -> Vec<(Assignment, &T)> {
        fn expand<'a, T>(
            node: &'a Arc<Node<T>>,
            keys: &[DiscreteKey],
            assignment: Assignment,
            out: &mut Vec<(Assignment, &'a T)>,
        ) {
            match (&**node, keys.split_first()) {
                (Node::Leaf(v), None) => out.push((assignment, v)),
                (Node::Choice { key, branches }, Some((k, rest))) if key.key == k.key => {
                    for (v, b) in branches.iter().enumerate() {
                        expand(b, rest, assignment.clone().with(k.key, v), out);
                    }
                }
                (_, Some((k, rest))) => {
                    for v in 0..k.cardinality {
                        expand(node, rest, assignment.clone().with(k.key, v), out);
                    }
                }
                (Node::Choice { .. }, None) => unreachable!("keys() covers every branching key"),
            }
        }

        let keys = self.keys();
        let mut out = Vec::new();
        expand(&self.root, &keys, Assignment::new(), &mut out);
        out
    }

    /// Check whether two trees agree on every assignment, comparing leaves with `eq`
    pub fn equals_with<F>(&self, other: &DecisionTree<T>, eq: F) -> bool
    where
        F: Fn(&T, &T) -> bool,
    {
        !self.combine(other, |a, b| eq(a, b)).any(|&same| !same)
    }
}


impl DecisionTree<f64> {

    /// Check whether two trees agree on every assignment up to `tol`
    pub fn equals(&self, other: &DecisionTree<f64>, tol: f64) -> bool {
        self.equals_with(other, |a, b| a.abs_diff_eq(b, tol))
    }

    /// The smallest leaf
    pub fn min(&self) -> f64 {
        fn walk(node: &Node<f64>) -> f64 {
            match node {
                Node::Leaf(v) => *v,
                Node::Choice { branches, .. } => branches.iter().map(|b| walk(b)).fold(f64::INFINITY, f64::min),
            }
        }
        walk(&self.root)
    }

    /// The assignment with the smallest leaf, together with that leaf.
    ///
    /// Ties go to the lexicographically smallest assignment: keys are compared in ascending
    /// key order, and lower values come first. The returned assignment only covers the keys on
    /// the path to the selected leaf; keys collapsed away on that path may take any value, and
    /// value 0 is the lexicographically smallest choice for them.
    pub fn argmin(&self) -> (Assignment, f64) {
        fn walk(node: &Node<f64>, assignment: Assignment) -> (Assignment, f64) {
            match node {
                Node::Leaf(v) => (assignment, *v),
                Node::Choice { key, branches } => {
                    let mut best: Option<(Assignment, f64)> = None;
                    for (v, b) in branches.iter().enumerate() {
                        let candidate = walk(b, assignment.clone().with(key.key, v));
                        // strict comparison: the first minimum wins
                        if best.as_ref().map_or(true, |(_, e)| candidate.1 < *e) {
                            best = Some(candidate);
                        }
                    }
                    best.unwrap_or((assignment, f64::INFINITY))
                }
            }
        }
        walk(&self.root, Assignment::new())
    }
}

impl DecisionTree<bool> {

    /// Check if some complete assignment extending `partial` maps to `true`
    pub fn any_extension(&self, partial: &Assignment) -> bool {
        self.restrict(partial).map_or(false, |t| t.any(|&b| b))
    }
}

impl<'a> Add for &'a DecisionTree<f64> {
    type Output = DecisionTree<f64>;

    fn add(self, other: &'a DecisionTree<f64>) -> DecisionTree<f64> {
        self.combine(other, |a, b| a + b)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::all_assignments;
    use itertools::iproduct;
    use proptest::prelude::*;

    fn keys() -> (DiscreteKey, DiscreteKey, DiscreteKey) {
        (DiscreteKey::binary(1), DiscreteKey::new(2, 3), DiscreteKey::binary(3))
    }

    #[test]
    fn evaluate() {
        let (a, b, _) = keys();
        let tree = DecisionTree::from_leaves(&[a, b], vec![0., 1., 2., 3., 4., 5.]).unwrap();

        for (x, y) in iproduct!(0..2, 0..3) {
            let assn = Assignment::new().with(1, x).with(2, y);
            assert_eq!(*tree.evaluate(&assn).unwrap(), (3 * x + y) as f64);
        }

        // extra keys are ignored
        let assn = Assignment::new().with(1, 1).with(2, 2).with(99, 7);
        assert_eq!(*tree.evaluate(&assn).unwrap(), 5.);

        // missing keys are not
        let assn = Assignment::new().with(2, 1);
        assert_eq!(tree.evaluate(&assn), Err(HybridError::KeyNotFound(1)));

        let assn = Assignment::new().with(1, 2).with(2, 0);
        assert!(tree.evaluate(&assn).is_err());
    }

    #[test]
    fn leaves_follow_given_key_order() {
        let (a, b, _) = keys();
        // b is most significant here, although the tree branches on a first
        let tree = DecisionTree::from_leaves(&[b, a], vec![0., 1., 2., 3., 4., 5.]).unwrap();

        let assn = Assignment::new().with(1, 1).with(2, 2);
        assert_eq!(*tree.evaluate(&assn).unwrap(), 5.);
        let assn = Assignment::new().with(1, 0).with(2, 1);
        assert_eq!(*tree.evaluate(&assn).unwrap(), 2.);

        assert!(DecisionTree::from_leaves(&[a, b], vec![0., 1.]).is_err());
    }

    #[test]
    fn canonical_form() {
        let (a, b, c) = keys();

        // a tree that does not depend on b collapses it away
        let tree = DecisionTree::from_fn(&[a, b], |assn| assn.get(1).unwrap() as f64);
        assert_eq!(vec![a], tree.keys());
        assert_eq!(2, tree.nr_leaves());

        // a constant tree is a leaf
        let tree = DecisionTree::from_fn(&[a, b, c], |_| 4.0);
        assert!(tree.keys().is_empty());
        assert_eq!(DecisionTree::leaf(4.0), tree);

        // the key order given to the constructor does not matter
        let t1 = DecisionTree::from_fn(&[a, c], |assn| (assn.get(1).unwrap() * 2 + assn.get(3).unwrap()) as f64);
        let t2 = DecisionTree::from_fn(&[c, a], |assn| (assn.get(1).unwrap() * 2 + assn.get(3).unwrap()) as f64);
        assert_eq!(t1, t2);
    }

    #[test]
    fn combine_and_apply() {
        let (a, b, c) = keys();
        let t1 = DecisionTree::from_leaves(&[a, b], vec![0., 1., 2., 3., 4., 5.]).unwrap();
        let t2 = DecisionTree::from_leaves(&[c], vec![10., 20.]).unwrap();

        let sum = &t1 + &t2;
        assert_eq!(vec![a, b, c], sum.keys());
        for assn in all_assignments(&[a, b, c]) {
            let expected = t1.evaluate(&assn).unwrap() + t2.evaluate(&assn).unwrap();
            assert_eq!(expected, *sum.evaluate(&assn).unwrap());
        }

        let doubled = t1.apply(|v| 2. * v);
        assert_eq!(t1.keys(), doubled.keys());
        assert_eq!(10., *doubled.evaluate(&Assignment::new().with(1, 1).with(2, 1)).unwrap());

        // mapping can make branches equal, which collapses them
        let parity = t1.apply(|&v| v >= 3.0);
        assert_eq!(vec![a], parity.keys());

        let checked = t1.try_apply(|&v| if v < 5.0 { Ok(v) } else { Err(HybridError::PrunedAssignment) });
        assert_eq!(Err(HybridError::PrunedAssignment), checked);
    }

    #[test]
    fn restrict() {
        let (a, b, _) = keys();
        let tree = DecisionTree::from_leaves(&[a, b], vec![0., 1., 2., 3., 4., 5.]).unwrap();

        let restricted = tree.restrict(&Assignment::new().with(2, 1)).unwrap();
        assert_eq!(vec![a], restricted.keys());
        assert_eq!(4., *restricted.evaluate(&Assignment::new().with(1, 1)).unwrap());

        let restricted = tree.restrict(&Assignment::new().with(1, 0).with(2, 2)).unwrap();
        assert_eq!(DecisionTree::leaf(2.), restricted);
    }

    #[test]
    fn enumerate_expands_collapsed_keys() {
        let (a, b, c) = keys();
        // depends on a and c only
        let tree = DecisionTree::from_fn(&[a, b, c], |assn| (assn.get(1).unwrap() * 2 + assn.get(3).unwrap()) as f64);
        assert_eq!(vec![a, c], tree.keys());

        let all = tree.enumerate();
        assert_eq!(4, all.len());
        let expected: Vec<Assignment> = all_assignments(&[a, c]).collect();
        for (i, (assn, &v)) in all.into_iter().enumerate() {
            assert_eq!(expected[i], assn);
            assert_eq!(i as f64, v);
        }

        assert_eq!(vec![(Assignment::new(), &7)], DecisionTree::leaf(7).enumerate());
        assert_eq!(4, tree.leaves().len());
    }

    #[test]
    fn any_extension() {
        let (a, b, _) = keys();
        let survivors = DecisionTree::from_fn(&[a, b], |assn| assn.get(1) == Some(1) && assn.get(2) == Some(2));

        assert!(survivors.any_extension(&Assignment::new().with(1, 1)));
        assert!(survivors.any_extension(&Assignment::new().with(2, 2)));
        assert!(!survivors.any_extension(&Assignment::new().with(1, 0)));
        assert!(!survivors.any_extension(&Assignment::new().with(1, 1).with(2, 0)));
        assert!(survivors.any_extension(&Assignment::new()));
    }

    #[test]
    fn argmin_prefers_first_minimum() {
        let (a, b, _) = keys();
        let tree = DecisionTree::from_leaves(&[a, b], vec![3., 1., 2., 5., 1., 1.]).unwrap();

        let (assn, value) = tree.argmin();
        assert_eq!(1., value);
        assert_eq!(Assignment::new().with(1, 0).with(2, 1), assn);
        assert_eq!(1., tree.min());
    }

    #[test]
    fn equality_with_tolerance() {
        let (a, b, _) = keys();
        let t1 = DecisionTree::from_leaves(&[a, b], vec![0., 1., 2., 3., 4., 5.]).unwrap();
        let t2 = t1.apply(|v| v + 1e-12);

        assert!(t1.equals(&t2, 1e-9));
        assert!(!t1.equals(&t2, 0.0));
        assert!(!t1.equals(&DecisionTree::leaf(0.0), 1e-9));
    }

    #[test]
    fn keys_without_values_are_rejected() {
        let (a, _, _) = keys();
        let empty = DiscreteKey::new(9, 0);

        assert!(match DecisionTree::<f64>::from_leaves(&[empty], vec![]) {
            Err(HybridError::InvalidConditional(_)) => true,
            _ => false,
        });
        assert!(DecisionTree::<f64>::from_leaves(&[a, empty], vec![]).is_err());
        assert!(check_domain(&[a]).is_ok());
    }

    proptest! {
        #[test]
        fn combine_is_pointwise(
            left in proptest::collection::vec(0u8..4, 6),
            right in proptest::collection::vec(0u8..4, 6),
        ) {
            let (a, b, c) = keys();
            let left: Vec<f64> = left.into_iter().map(f64::from).collect();
            let right: Vec<f64> = right.into_iter().map(f64::from).collect();

            let t1 = DecisionTree::from_leaves(&[a, b], left).unwrap();
            let t2 = DecisionTree::from_leaves(&[b, c], right).unwrap();
            let product = t1.combine(&t2, |x, y| x * y);

            for assn in all_assignments(&[a, b, c]) {
                let expected = t1.evaluate(&assn).unwrap() * t2.evaluate(&assn).unwrap();
                prop_assert_eq!(expected, *product.evaluate(&assn).unwrap());
            }
        }
    }
}
