//! Error types for fuzzy join configuration and execution.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while configuring or running a join.
///
/// Everything except [`JoinError::DataFrame`] is raised while validating the
/// configuration, before any rows are scanned.
#[derive(Debug, Error)]
pub enum JoinError {
    /// Invalid key declaration, join mode, or level configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A declared key column does not exist in its dataset.
    #[error("dataset {dataset} has no column '{column}'")]
    MissingColumn { dataset: usize, column: String },

    /// Fuzzy key columns differ in dtype (or time unit) and no difference
    /// function was supplied.
    #[error(
        "fuzzy key '{left}' ({left_type}) and '{right}' ({right_type}) differ in type; \
         supply a difference function"
    )]
    TypeMismatch {
        left: String,
        right: String,
        left_type: String,
        right_type: String,
    },

    /// Requested behavior exists in the model but is not implemented.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl JoinError {
    /// Shorthand for a [`JoinError::Configuration`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<PolarsError> for JoinError {
    fn from(err: PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for join operations.
pub type Result<T> = std::result::Result<T, JoinError>;
