//! Defines the `Error` type for the jerome-hybrid library, and a handful of shared constants

use crate::variable::{Key, Symbol};

use itertools::Itertools;
use thiserror::Error;

use std::result;

pub type Result<T> = result::Result<T, HybridError>;

/// The error assigned to discrete branches that have been pruned away. It stands in for an
/// effectively zero probability while staying finite, so it survives further arithmetic and
/// serialization.
pub const PRUNED_ERROR: f64 = 1e50;

/// Default tolerance used when comparing floating point content for equality.
pub const DEFAULT_TOL: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum HybridError {

    /// A required key was missing from an `Assignment` or from the continuous values.
    #[error("Missing a value for the required key {}", sym(.0))]
    KeyNotFound(Key),

    /// Represents an incomplete discrete assignment where a complete assignment was required.
    /// The value in the tuple is the keys that were missing from the assignment.
    #[error("Missing assignments to the following discrete keys: [{}]", display_keys(.0))]
    AssignmentIncomplete(Vec<Key>),

    /// A continuous value did not have the dimension a conditional expects for it.
    #[error("Value for {} has dimension {}, expected {}", sym(.key), .actual, .expected)]
    DimensionMismatch { key: Key, expected: usize, actual: usize },

    /// A discrete value outside of `0..cardinality`
    #[error("Value {} is out of range for {} with cardinality {}", .value, sym(.key), .cardinality)]
    ValueOutOfRange { key: Key, value: usize, cardinality: usize },

    /// The selected branch of a mixture was removed by pruning
    #[error("The selected discrete branch has been pruned")]
    PrunedAssignment,

    /// A conditional was constructed from inconsistent parts
    #[error("Invalid conditional: {0}")]
    InvalidConditional(String),

    /// A discrete signature string could not be parsed
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// A variable was introduced as a frontal variable twice
    #[error("The variable {} is already a frontal variable of the net", sym(.0))]
    DuplicateFrontal(Key),

    /// A conditional depends on a variable that an earlier conditional already eliminated
    #[error("The parent {} was eliminated earlier in the net", sym(.0))]
    CyclicDependency(Key),
}

fn sym(key: &Key) -> Symbol {
    Symbol(*key)
}

fn display_keys(keys: &[Key]) -> String {
    keys.iter().map(|&k| Symbol(k)).join(", ")
}
