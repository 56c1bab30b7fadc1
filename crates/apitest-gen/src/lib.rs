//! apitest-gen - specification to abstract test case
//!
//! Lowers a declarative API specification and a test string (an ordered
//! selection of block names) into an abstract test case: a straight-line
//! program with `input()` placeholders, block-local variables renamed
//! apart, and postcondition primes rewritten into old/new state pairs.

mod error;
mod generator;

pub use error::{GenError, GenResult};
pub use generator::{AtcGenerator, GeneratedAtc};
