//! apitest-smt - SMT solving for path constraints
//!
//! Translates path-constraint expressions into Z3 and extracts models.
//! Symbolic variables map to integer constants `X{n}`; free named
//! variables get their sort from a type map (sets become arrays to bool,
//! maps use the array theory). The solver itself is reached through the
//! narrow [`Solver`] trait so the concretizer never depends on Z3
//! directly.

mod error;
mod solver;
mod translate;

pub use error::{SmtError, SmtResult};
pub use solver::{Model, SmtValue, Solution, Solver, Z3Solver};
pub use translate::{Sort, Term, Translator};
