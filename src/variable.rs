//! Definition of the variable module
//!
//! Variables are identified by integer `Key`s. Discrete variables additionally carry their
//! cardinality (`DiscreteKey`), and an `Assignment` maps discrete keys to values.

use crate::util::{HybridError, Result};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;
use std::iter::FromIterator;

/// Identifies a random variable, discrete or continuous.
pub type Key = u64;

const CHAR_BITS: u64 = 8;
const INDEX_BITS: u64 = 64 - CHAR_BITS;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Build a `Key` from a character and an index, e.g. `symbol('x', 1)` for the first pose.
pub fn symbol(c: char, j: u64) -> Key {
    ((c as u64 & 0xff) << INDEX_BITS) | (j & INDEX_MASK)
}

/// Display wrapper rendering a `Key` built by `symbol` as `x1`. Keys without a printable
/// character are rendered as plain integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Symbol(pub Key);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = (self.0 >> INDEX_BITS) as u8;
        if c.is_ascii_graphic() {
            write!(f, "{}{}", c as char, self.0 & INDEX_MASK)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A discrete variable: its key, and the number of values it can take. The values are
/// `0..cardinality`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscreteKey {
    pub key: Key,
    pub cardinality: usize,
}

impl DiscreteKey {
    pub fn new(key: Key, cardinality: usize) -> Self {
        DiscreteKey { key, cardinality }
    }

    /// Shorthand for a binary discrete variable
    pub fn binary(key: Key) -> Self {
        DiscreteKey { key, cardinality: 2 }
    }
}

impl fmt::Display for DiscreteKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", Symbol(self.key), self.cardinality)
    }
}


/// An assignment of values to discrete variables.
///
/// An `Assignment` is never edited in place once it is shared: `with` consumes the assignment
/// and returns the extended one, so callers copy before extending.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    values: BTreeMap<Key, usize>,
}

impl Assignment {

    /// Construct an empty `Assignment`
    pub fn new() -> Self {
        Assignment { values: BTreeMap::new() }
    }

    /// Extend the assignment with `key = value`, replacing any previous value for `key`.
    pub fn with(mut self, key: Key, value: usize) -> Self {
        self.values.insert(key, value);
        self
    }

    /// Get the value assigned to `key`, if any
    pub fn get(&self, key: Key) -> Option<usize> {
        self.values.get(&key).cloned()
    }

    /// Get the value assigned to `key`, failing with `KeyNotFound` when absent
    pub fn at(&self, key: Key) -> Result<usize> {
        self.get(key).ok_or(HybridError::KeyNotFound(key))
    }

    pub fn contains(&self, key: Key) -> bool {
        self.values.contains_key(&key)
    }

    /// The assigned keys, in ascending order
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.values.keys().cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, usize)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The keys of `required` that this assignment does not cover
    pub fn missing(&self, required: &[DiscreteKey]) -> Vec<Key> {
        required.iter()
                .map(|dk| dk.key)
                .filter(|&k| !self.contains(k))
                .unique()
                .collect()
    }

    /// Restrict this assignment to the given keys. Keys that are not assigned are skipped.
    pub fn restrict(&self, keys: &[DiscreteKey]) -> Assignment {
        keys.iter()
            .filter_map(|dk| self.get(dk.key).map(|v| (dk.key, v)))
            .collect()
    }
}

impl FromIterator<(Key, usize)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (Key, usize)>>(iter: I) -> Self {
        Assignment { values: iter.into_iter().collect() }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.values.iter().map(|(&k, v)| format!("{}={}", Symbol(k), v)).join(", ")
        )
    }
}


/// Iterate over every complete `Assignment` to `keys`.
///
/// The enumeration is lexicographic: the first key varies slowest, and each key runs through
/// its values in increasing order. Duplicate keys are enumerated once.
pub fn all_assignments(keys: &[DiscreteKey]) -> impl Iterator<Item = Assignment> {
    let keys: Vec<DiscreteKey> = keys.iter().cloned().unique_by(|dk| dk.key).collect();
    let count: usize = keys.iter().map(|dk| dk.cardinality).product();

    (0..count).map(move |mut idx| {
        // decode idx as a mixed-radix number, last key least significant
        let mut assignment = Assignment::new();
        for dk in keys.iter().rev() {
            assignment = assignment.with(dk.key, idx % dk.cardinality);
            idx /= dk.cardinality;
        }
        assignment
    })
}
