//! Error types for concretization.

use thiserror::Error;

use apitest_see::SeeError;
use apitest_smt::SmtError;

/// Errors that abort a concretization run. An unsatisfiable constraint set
/// is not an error; it surfaces as a partially concretized program.
#[derive(Debug, Error)]
pub enum TesterError {
    /// Concrete values were supplied for a program with no statements.
    #[error("concrete values provided for an empty test case")]
    ValuesWithoutSlots,

    /// An input assignment whose target is not a plain variable.
    #[error("input assignment target must be a variable, got {0}")]
    MalformedInputTarget(String),

    #[error(transparent)]
    See(#[from] SeeError),

    #[error(transparent)]
    Smt(#[from] SmtError),
}

/// Result type for concretization.
pub type TesterResult<T> = Result<T, TesterError>;
