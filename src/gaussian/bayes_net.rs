//! A Bayes net of Gaussian conditionals

use super::GaussianConditional;
use crate::util::Result;
use crate::values::VectorValues;

use serde::{Deserialize, Serialize};

use std::sync::Arc;

/// A purely continuous Bayes net: an ordered list of Gaussian conditionals, such that each
/// conditional's parents are frontal variables of conditionals later in the list, as produced by
/// elimination.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GaussianBayesNet {
    conditionals: Vec<Arc<GaussianConditional>>,
}

impl GaussianBayesNet {

    pub fn new() -> Self {
        GaussianBayesNet { conditionals: Vec::new() }
    }

    pub fn push(&mut self, conditional: Arc<GaussianConditional>) {
        self.conditionals.push(conditional);
    }

    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn at(&self, i: usize) -> Option<&Arc<GaussianConditional>> {
        self.conditionals.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<GaussianConditional>> {
        self.conditionals.iter()
    }

    /// Find the most likely values of all variables by back-substitution, solving the
    /// conditionals from last to first.
    ///
    /// # Errors
    /// * `HybridError::KeyNotFound` if a parent is not the frontal of a later conditional
    pub fn optimize(&self) -> Result<VectorValues> {
        let mut solution = VectorValues::new();
        for c in self.conditionals.iter().rev() {
            for (key, value) in c.solve(&solution)?.iter() {
                solution.insert(key, value.clone());
            }
        }
        Ok(solution)
    }

    /// Sum of the conditionals' errors
    pub fn error(&self, values: &VectorValues) -> Result<f64> {
        self.conditionals.iter().map(|c| c.error(values)).sum()
    }

    /// Check if the two nets hold equal conditionals, in the same order
    pub fn equals(&self, other: &GaussianBayesNet, tol: f64) -> bool {
        self.len() == other.len()
            && self.conditionals.iter().zip(other.iter()).all(|(a, b)| a.equals(b, tol))
    }
}

impl From<Vec<Arc<GaussianConditional>>> for GaussianBayesNet {
    fn from(conditionals: Vec<Arc<GaussianConditional>>) -> Self {
        GaussianBayesNet { conditionals }
    }
}
