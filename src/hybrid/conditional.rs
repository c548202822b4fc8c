//! Definition of the `HybridConditional`

use super::GaussianMixture;
use crate::discrete::DiscreteConditional;
use crate::gaussian::GaussianConditional;
use crate::tree::DecisionTree;
use crate::util::Result;
use crate::values::VectorValues;
use crate::variable::{Assignment, DiscreteKey, Key};

use serde::{Deserialize, Serialize};

use std::fmt;
use std::sync::Arc;

/// One conditional of a `HybridBayesNet`: discrete, continuous, or a mixture of continuous
/// conditionals indexed by discrete variables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HybridConditional {
    Discrete(Arc<DiscreteConditional>),
    Continuous(Arc<GaussianConditional>),
    Mixture(Arc<GaussianMixture>),
}

impl HybridConditional {

    pub fn is_discrete(&self) -> bool {
        match self {
            HybridConditional::Discrete(_) => true,
            _ => false,
        }
    }

    pub fn is_continuous(&self) -> bool {
        match self {
            HybridConditional::Continuous(_) => true,
            _ => false,
        }
    }

    pub fn is_mixture(&self) -> bool {
        match self {
            HybridConditional::Mixture(_) => true,
            _ => false,
        }
    }

    pub fn as_discrete(&self) -> Option<&Arc<DiscreteConditional>> {
        match self {
            HybridConditional::Discrete(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_continuous(&self) -> Option<&Arc<GaussianConditional>> {
        match self {
            HybridConditional::Continuous(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_mixture(&self) -> Option<&Arc<GaussianMixture>> {
        match self {
            HybridConditional::Mixture(m) => Some(m),
            _ => None,
        }
    }

    /// The variables this conditional is a density over
    pub fn frontal_keys(&self) -> Vec<Key> {
        match self {
            HybridConditional::Discrete(c) => vec![c.frontal().key],
            HybridConditional::Continuous(c) => c.frontal_keys(),
            HybridConditional::Mixture(m) => m.frontal_keys(),
        }
    }

    /// The variables this conditional is conditioned on, continuous first. The discrete keys
    /// of a mixture are parents.
    pub fn parent_keys(&self) -> Vec<Key> {
        match self {
            HybridConditional::Discrete(c) => c.parents().iter().map(|dk| dk.key).collect(),
            HybridConditional::Continuous(c) => c.parent_keys(),
            HybridConditional::Mixture(m) => {
                let mut keys = m.parent_keys();
                keys.extend(m.discrete_keys().iter().map(|dk| dk.key));
                keys
            }
        }
    }

    /// The continuous variables, frontals first
    pub fn continuous_keys(&self) -> Vec<Key> {
        match self {
            HybridConditional::Discrete(_) => vec![],
            HybridConditional::Continuous(c) => c.frontal_keys().into_iter().chain(c.parent_keys()).collect(),
            HybridConditional::Mixture(m) => m.frontal_keys().into_iter().chain(m.parent_keys()).collect(),
        }
    }

    /// The discrete variables, frontal first for a discrete conditional
    pub fn discrete_keys(&self) -> Vec<DiscreteKey> {
        match self {
            HybridConditional::Discrete(c) => c.keys(),
            HybridConditional::Continuous(_) => vec![],
            HybridConditional::Mixture(m) => m.discrete_keys().to_vec(),
        }
    }

    /// The error at the given continuous values and discrete assignment: `−ln p` for a discrete
    /// conditional, the (normalized) residual otherwise
    pub fn error(&self, continuous: &VectorValues, discrete: &Assignment) -> Result<f64> {
        match self {
            HybridConditional::Discrete(c) => c.error(discrete),
            HybridConditional::Continuous(c) => c.error(continuous),
            HybridConditional::Mixture(m) => m.error(continuous, discrete),
        }
    }

    /// The error at the given continuous values for every discrete assignment
    pub fn error_tree(&self, continuous: &VectorValues) -> Result<DecisionTree<f64>> {
        match self {
            HybridConditional::Discrete(c) => Ok(c.error_tree()),
            HybridConditional::Continuous(c) => Ok(DecisionTree::leaf(c.error(continuous)?)),
            HybridConditional::Mixture(m) => m.error_tree(continuous),
        }
    }

    /// The part of the error that does not depend on continuous values: `−ln p` for a discrete
    /// conditional, the normalization offsets of a mixture, zero for a Gaussian
    pub fn discrete_error_tree(&self) -> DecisionTree<f64> {
        match self {
            HybridConditional::Discrete(c) => c.error_tree(),
            HybridConditional::Continuous(_) => DecisionTree::leaf(0.0),
            HybridConditional::Mixture(m) => m.normalization_offsets(),
        }
    }

    /// Prune the discrete branches that no surviving assignment extends
    pub fn prune(&self, survivors: &DecisionTree<bool>) -> HybridConditional {
        match self {
            HybridConditional::Discrete(c) => HybridConditional::Discrete(Arc::new(c.prune(survivors))),
            HybridConditional::Continuous(c) => HybridConditional::Continuous(c.clone()),
            HybridConditional::Mixture(m) => HybridConditional::Mixture(Arc::new(m.prune(survivors))),
        }
    }

    /// The same conditional with `keys` added to its discrete scope. Errors do not change.
    /// Gaussian conditionals have no discrete scope and are returned as they are.
    pub(crate) fn widen(&self, keys: &[DiscreteKey]) -> HybridConditional {
        match self {
            HybridConditional::Discrete(c) => HybridConditional::Discrete(Arc::new(c.widen(keys))),
            HybridConditional::Continuous(c) => HybridConditional::Continuous(c.clone()),
            HybridConditional::Mixture(m) => HybridConditional::Mixture(Arc::new(m.widen(keys))),
        }
    }

    pub fn equals(&self, other: &HybridConditional, tol: f64) -> bool {
        match (self, other) {
            (HybridConditional::Discrete(a), HybridConditional::Discrete(b)) => a.equals(b, tol),
            (HybridConditional::Continuous(a), HybridConditional::Continuous(b)) => a.equals(b, tol),
            (HybridConditional::Mixture(a), HybridConditional::Mixture(b)) => a.equals(b, tol),
            _ => false,
        }
    }
}

impl From<DiscreteConditional> for HybridConditional {
    fn from(c: DiscreteConditional) -> Self {
        HybridConditional::Discrete(Arc::new(c))
    }
}

impl From<GaussianConditional> for HybridConditional {
    fn from(c: GaussianConditional) -> Self {
        HybridConditional::Continuous(Arc::new(c))
    }
}

impl From<GaussianMixture> for HybridConditional {
    fn from(m: GaussianMixture) -> Self {
        HybridConditional::Mixture(Arc::new(m))
    }
}

impl fmt::Display for HybridConditional {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HybridConditional::Discrete(c) => write!(f, "Discrete {}", c),
            HybridConditional::Continuous(c) => write!(f, "Gaussian {}", c),
            HybridConditional::Mixture(m) => write!(f, "Mixture {}", m),
        }
    }
}
