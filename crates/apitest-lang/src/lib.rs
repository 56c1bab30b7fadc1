//! apitest-lang - the shared language layer for API test generation
//!
//! This crate defines the AST used by every other tool in the workspace:
//! type expressions, value expressions, statements, test-case programs and
//! specifications, together with the scope-chain environments and the
//! closed vocabulary of built-in operators.
//!
//! The AST is designed to be:
//! - Owned: every container owns its subtrees; sharing is by explicit clone
//! - Identity-preserving: cloning a symbolic variable keeps its identity
//! - Exhaustive: consumers traverse it with `match`, so adding a variant
//!   breaks every traversal at compile time

pub mod ast;
pub mod builtins;
pub mod env;
mod pretty;

pub use ast::{
    ApiBlock, Call, Decl, Expr, Init, Program, Response, ResponseCode, Spec, Stmt, SymVarGen,
    TypeExpr,
};
pub use env::{EnvError, ScopeChain, SymbolTable, TypeMap, ValueEnv};
