//! The function-factory boundary.
//!
//! Application APIs are opaque to the engine: it resolves a name plus
//! fully concrete arguments to an [`Executable`] and invokes it inline.
//! Factories are supplied by the embedding application; executables own
//! their arguments and must not retain references past their return.

use apitest_lang::Expr;
use thiserror::Error;

/// Errors raised by a factory or one of its executables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactoryError {
    #[error("no API function registered for '{0}'")]
    UnknownFunction(String),

    #[error("API '{name}' expects {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("API '{name}' failed: {message}")]
    ExecutionFailed { name: String, message: String },
}

/// An executable unit bound to one API invocation.
pub trait Executable {
    /// Runs the API and returns its effect, typically a number or a
    /// composite value.
    fn execute(&self) -> Result<Expr, FactoryError>;
}

/// Resolves an API name and concrete arguments to an executable. The
/// executable may borrow the factory, but never the engine's state.
pub trait FunctionFactory {
    fn get_function(
        &self,
        name: &str,
        args: Vec<Expr>,
    ) -> Result<Box<dyn Executable + '_>, FactoryError>;
}
