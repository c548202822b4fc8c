//! Gaussian conditional densities over continuous variables, and Bayes nets made of them.

mod bayes_net;
mod conditional;

pub use self::bayes_net::GaussianBayesNet;
pub use self::conditional::GaussianConditional;
