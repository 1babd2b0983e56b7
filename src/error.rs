/// Error types for the fractional likelihood engine
///
/// Every check runs before any arithmetic, so a failed call never leaves
/// partially computed arrays behind.

use thiserror::Error;

/// Errors raised while validating engine inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LikelihoodError {
    /// Odd edge count, broken same-parent pairing, or an edge list that is not post-ordered.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Boundary rows, prior or transition matrices disagree with the state count or edge count.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A node label that does not map into `[0, n_nodes)` under the configured index base.
    #[error("node label {label} out of range for a tree with {n_nodes} nodes")]
    IndexOutOfRange { label: usize, n_nodes: usize },

    /// Unrecognized configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LikelihoodError>;

#[cfg(feature = "python")]
impl From<LikelihoodError> for pyo3::PyErr {
    fn from(err: LikelihoodError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
