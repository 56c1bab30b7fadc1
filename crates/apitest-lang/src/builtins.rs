//! The closed vocabulary of built-in operators.
//!
//! The symbolic engine and the SMT bridge both depend on the same
//! distinction: a call whose name is in this set is evaluated symbolically
//! as an operator; any other name is an API call that must be executed
//! through a function factory.

use crate::ast::Call;

/// The zero-argument call that materializes a fresh symbolic variable.
pub const INPUT: &str = "input";

/// The specification-level next-state marker. Only meaningful inside
/// postconditions; the ATC generator strips it before execution.
pub const PRIME: &str = "'";

/// True iff `name` is a built-in operator (including alias spellings).
pub fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        // Arithmetic
        "Add" | "Sub" | "Mul" | "Div"
        // Comparison
        | "Eq" | "=" | "=="
        | "Neq" | "!=" | "<>"
        | "Lt" | "<"
        | "Gt" | ">"
        | "Le" | "<="
        | "Ge" | ">="
        // Boolean
        | "And" | "and" | "&&"
        | "Or" | "or" | "||"
        | "Not" | "not" | "!"
        | "Implies"
        // Input
        | "input"
        // Set predicates and operations
        | "in" | "member" | "contains"
        | "not_in" | "not_member" | "not_contains"
        | "union"
        | "intersection" | "intersect"
        | "difference" | "diff" | "minus"
        | "subset" | "is_subset"
        | "add_to_set" | "remove_from_set" | "is_empty_set"
        // Map operations
        | "get" | "lookup" | "select"
        | "put" | "store" | "update"
        | "contains_key" | "has_key"
        // Sequence operations
        | "concat" | "append_list"
        | "length" | "at" | "nth"
        | "prefix" | "suffix" | "contains_seq"
        // Free-variable registration
        | "Any" | "any"
        // Prime marker
        | "'"
    )
}

/// True iff `call` targets an application API rather than an operator.
pub fn is_api_call(call: &Call) -> bool {
    !is_builtin(&call.name)
}
