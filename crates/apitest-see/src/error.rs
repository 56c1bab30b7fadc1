//! Error types for symbolic execution.

use thiserror::Error;

use crate::factory::FactoryError;

/// Errors that abort a symbolic execution pass.
#[derive(Debug, Error)]
pub enum SeeError {
    /// An assignment target that is neither a variable nor a tuple of
    /// variables.
    #[error("malformed assignment target: {0}")]
    MalformedTarget(String),

    /// A tuple assignment whose sides do not line up.
    #[error("cannot destructure {value} into {target}")]
    TupleMismatch { target: String, value: String },

    /// An application API failed; the concretization run aborts.
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Result type for engine operations.
pub type SeeResult<T> = Result<T, SeeError>;
