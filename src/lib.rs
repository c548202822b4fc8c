//! Exact inference over hybrid Bayes nets: joint densities over discrete mode variables and
//! continuous Gaussian variables, factored into discrete, Gaussian and mixture conditionals.

pub mod variable;
pub mod values;
pub mod tree;
pub mod discrete;
pub mod gaussian;
pub mod hybrid;
pub mod util;

pub use crate::discrete::DiscreteConditional;
pub use crate::gaussian::{GaussianBayesNet, GaussianConditional};
pub use crate::hybrid::{GaussianMixture, HybridBayesNet, HybridBayesNetBuilder, HybridConditional};
pub use crate::tree::{AlgebraicDecisionTree, DecisionTree};
pub use crate::util::{HybridError, Result, DEFAULT_TOL, PRUNED_ERROR};
pub use crate::values::{HybridValues, Vector, VectorValues};
pub use crate::variable::{all_assignments, symbol, Assignment, DiscreteKey, Key, Symbol};
