//! apitest-tester - from abstract to concrete test cases
//!
//! Drives the interruption-resume loop: run the symbolic engine until it
//! blocks on an API call that needs concrete values, hand the accumulated
//! path constraint to the solver, substitute the model back into the
//! program, and resume. The loop ends with every `input()` replaced by a
//! literal, or with a partially concretized program when the constraints
//! admit no model.

mod concretize;
mod error;

pub use concretize::{rewrite_atc, Tester};
pub use error::{TesterError, TesterResult};
