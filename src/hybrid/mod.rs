//! Hybrid conditionals and the `HybridBayesNet`

mod bayes_net;
mod conditional;
mod mixture;

pub use self::bayes_net::{HybridBayesNet, HybridBayesNetBuilder};
pub use self::conditional::HybridConditional;
pub use self::mixture::GaussianMixture;
