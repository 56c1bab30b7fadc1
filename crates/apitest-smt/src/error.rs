//! Error types for SMT translation and solving.

use thiserror::Error;

/// Errors raised by the translation layer or the solver backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmtError {
    /// A call name outside the built-in vocabulary reached the bridge.
    #[error("unknown operator '{0}' in constraint")]
    UnknownOperator(String),

    /// A recognized construct the backend cannot express.
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// Operand sorts do not fit the operator.
    #[error("type mismatch in '{op}': expected {expected}, got {actual}")]
    TypeMismatch {
        op: String,
        expected: String,
        actual: String,
    },

    /// Wrong number of arguments for an operator.
    #[error("'{op}' expects {expected} argument(s), got {actual}")]
    Arity {
        op: String,
        expected: usize,
        actual: usize,
    },

    /// The solver reported sat but produced no model.
    #[error("solver returned no model")]
    ModelUnavailable,
}

/// Result type for SMT operations.
pub type SmtResult<T> = Result<T, SmtError>;
