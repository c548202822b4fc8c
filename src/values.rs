//! Containers for the values of continuous variables, and for hybrid (discrete + continuous)
//! solutions.

use crate::util::{HybridError, Result};
use crate::variable::{Assignment, Key, Symbol};

use approx::AbsDiffEq;
use indexmap::IndexMap;
use itertools::Itertools;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Alias f64 ndarray::Array1 as Vector
pub type Vector = Array1<f64>;

/// Values of continuous variables, each a vector. Insertion order is preserved for display,
/// but equality does not depend on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorValues {
    values: IndexMap<Key, Vector>,
}

impl VectorValues {

    pub fn new() -> Self {
        VectorValues { values: IndexMap::new() }
    }

    /// Insert (or replace) the value of `key`
    pub fn insert(&mut self, key: Key, value: Vector) {
        self.values.insert(key, value);
    }

    /// Builder-style insert
    pub fn with(mut self, key: Key, value: Vector) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: Key) -> Option<&Vector> {
        self.values.get(&key)
    }

    /// Get the value of `key`, failing with `KeyNotFound` when it is absent
    pub fn at(&self, key: Key) -> Result<&Vector> {
        self.values.get(&key).ok_or(HybridError::KeyNotFound(key))
    }

    /// Get the value of `key`, checking that it has dimension `dim`
    pub fn at_dim(&self, key: Key, dim: usize) -> Result<&Vector> {
        let v = self.at(key)?;
        if v.len() != dim {
            return Err(HybridError::DimensionMismatch { key, expected: dim, actual: v.len() });
        }
        Ok(v)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.values.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.values.keys().cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, &Vector)> {
        self.values.iter().map(|(&k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if two `VectorValues` hold the same keys with values equal up to `tol`
    pub fn equals(&self, other: &VectorValues, tol: f64) -> bool {
        self.len() == other.len() && self.values.iter().all(|(k, v)| {
            other.get(*k).map_or(false, |w| v.abs_diff_eq(w, tol))
        })
    }
}

impl fmt::Display for VectorValues {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.values.iter().map(|(&k, v)| format!("{}: {}", Symbol(k), v)).join(", ")
        )
    }
}


/// A joint discrete and continuous solution, e.g. the MAP estimate of a hybrid Bayes net
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridValues {
    pub continuous: VectorValues,
    pub discrete: Assignment,
}

impl HybridValues {

    pub fn new(continuous: VectorValues, discrete: Assignment) -> Self {
        HybridValues { continuous, discrete }
    }

    pub fn continuous(&self) -> &VectorValues {
        &self.continuous
    }

    pub fn discrete(&self) -> &Assignment {
        &self.discrete
    }
}
