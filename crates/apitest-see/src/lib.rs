//! apitest-see - symbolic execution of abstract test cases
//!
//! Interprets a straight-line test-case program over a symbolic value
//! environment. Built-in operators are evaluated symbolically and
//! assumptions accumulate into a path constraint; an API call whose
//! arguments are still symbolic blocks the pass, handing control back to
//! the concretizer. API calls with concrete arguments are executed through
//! the [`FunctionFactory`] boundary.

mod engine;
mod error;
mod factory;

pub use engine::{Engine, Outcome};
pub use error::{SeeError, SeeResult};
pub use factory::{Executable, FactoryError, FunctionFactory};
