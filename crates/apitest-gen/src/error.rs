//! Error types for ATC generation.

use thiserror::Error;

/// Errors that abort the current generation run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenError {
    /// The test string names a block the specification does not define.
    #[error("test string names unknown block '{0}'")]
    UnknownBlock(String),

    /// The global symbol table has no child for the block's index.
    #[error("no symbol table child at index {index} for block '{block}'")]
    MissingSymbolTable { block: String, index: usize },

    /// A response expression renamed to something that cannot be assigned.
    #[error("response of block '{block}' is not an assignable target: {target}")]
    MalformedResponse { block: String, target: String },
}

/// Result type for generation.
pub type GenResult<T> = Result<T, GenError>;
