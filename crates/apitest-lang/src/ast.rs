//! Abstract syntax for specifications and test-case programs.
//!
//! Two families of trees live here. The specification side (`Spec`,
//! `ApiBlock`, `Init`, `Decl`) is produced by an external parser and
//! consumed once by the ATC generator. The program side (`Program`,
//! `Stmt`, `Expr`) is the straight-line test-case language that the
//! generator emits, the symbolic engine interprets and the concretizer
//! rewrites in place.
//!
//! All nodes derive `Clone`, which produces a deep, ownership-independent
//! copy. `Expr::SymVar` clones carry the same identity, so two copies of a
//! symbolic input keep referring to the same solver constant.

use serde::{Deserialize, Serialize};

use crate::builtins::INPUT;

/// Type expressions attached to declarations and tracked in type maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// Named base type: `int`, `string`, `bool`, ...
    Const(String),
    /// Function type: `(params) -> ret`
    Func {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    /// Map type: `map<domain, range>`
    Map {
        domain: Box<TypeExpr>,
        range: Box<TypeExpr>,
    },
    /// Tuple type: `(t1, t2, ...)`
    Tuple(Vec<TypeExpr>),
    /// Set type: `set<element>`
    Set(Box<TypeExpr>),
}

impl TypeExpr {
    /// Shorthand for a named base type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Const(name.into())
    }

    /// Shorthand for `set<element>`.
    pub fn set_of(element: TypeExpr) -> Self {
        TypeExpr::Set(Box::new(element))
    }

    /// Shorthand for `map<domain, range>`.
    pub fn map_of(domain: TypeExpr, range: TypeExpr) -> Self {
        TypeExpr::Map {
            domain: Box::new(domain),
            range: Box::new(range),
        }
    }
}

/// A named application of an operator or API function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Call {
            name: name.into(),
            args,
        }
    }
}

/// Value expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// Named reference, resolved through the value environment.
    Var(String),
    /// Integer literal.
    Num(i64),
    /// String literal.
    String(String),
    /// Set literal. Represented as an ordered sequence; duplicates are
    /// tolerated but carry no meaning.
    Set(Vec<Expr>),
    /// Map literal as ordered `key -> value` entries. Keys are
    /// variable-valued by convention but may be any expression.
    Map(Vec<(Expr, Expr)>),
    /// Tuple literal.
    Tuple(Vec<Expr>),
    /// Operator or API application.
    Call(Call),
    /// Symbolic placeholder with a process-unique identity. Identities are
    /// minted by [`SymVarGen`] and survive cloning.
    SymVar(u32),
    /// Marker for an unresolved input slot; interchangeable with
    /// `Call("input", [])`.
    Input,
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(name.into())
    }

    pub fn str(value: impl Into<String>) -> Expr {
        Expr::String(value.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call(Call::new(name, args))
    }

    /// Binary operator application.
    pub fn binop(name: impl Into<String>, left: Expr, right: Expr) -> Expr {
        Expr::call(name, vec![left, right])
    }

    /// The canonical unresolved input slot, `input()`.
    pub fn input() -> Expr {
        Expr::call(INPUT, Vec::new())
    }

    /// True for both spellings of an input slot: the `Input` marker and a
    /// zero-argument `input` call.
    pub fn is_input(&self) -> bool {
        match self {
            Expr::Input => true,
            Expr::Call(call) => call.name == INPUT && call.args.is_empty(),
            _ => false,
        }
    }

    /// Walks the tree looking for any unresolved input slot.
    pub fn contains_input(&self) -> bool {
        if self.is_input() {
            return true;
        }
        match self {
            Expr::Var(_) | Expr::Num(_) | Expr::String(_) | Expr::SymVar(_) | Expr::Input => false,
            Expr::Set(elements) | Expr::Tuple(elements) => {
                elements.iter().any(Expr::contains_input)
            }
            Expr::Map(entries) => entries
                .iter()
                .any(|(k, v)| k.contains_input() || v.contains_input()),
            Expr::Call(call) => call.args.iter().any(Expr::contains_input),
        }
    }
}

/// Mints process-unique symbolic variable identities.
///
/// Whoever drives generation owns one of these and threads it through the
/// engine; there is no hidden global counter. Clones of an existing
/// `SymVar` keep their identity, only fresh materializations consume a new
/// one.
#[derive(Debug, Default, Clone)]
pub struct SymVarGen {
    next: u32,
}

impl SymVarGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces `SymVar(n)` for the next unused `n`.
    pub fn fresh(&mut self) -> Expr {
        let id = self.next;
        self.next += 1;
        Expr::SymVar(id)
    }

    /// Number of identities minted so far.
    pub fn minted(&self) -> u32 {
        self.next
    }
}

/// Statements of the straight-line test-case language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    /// `target := value`. The target is a `Var` or a `Tuple` of `Var`s.
    Assign { target: Expr, value: Expr },
    /// `assume(cond)` - contributes to the path constraint.
    Assume(Expr),
    /// `assert(cond)` - contributes to the path constraint and survives
    /// into the concrete test case for downstream checking.
    Assert(Expr),
    /// `name: type` - declares a symbolic name.
    Decl { name: String, ty: TypeExpr },
}

impl Stmt {
    pub fn assign(target: Expr, value: Expr) -> Stmt {
        Stmt::Assign { target, value }
    }

    /// True for `x := input()` in either input spelling.
    pub fn is_input_assign(&self) -> bool {
        matches!(self, Stmt::Assign { value, .. } if value.is_input())
    }
}

/// An ordered sequence of statements; the root of a test case.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Program { statements }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// A program is abstract while at least one input slot remains.
    pub fn is_abstract(&self) -> bool {
        self.statements.iter().any(Stmt::is_input_assign)
    }
}

/// A global variable declaration in a specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decl {
    pub name: String,
    pub ty: TypeExpr,
}

impl Decl {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Decl {
            name: name.into(),
            ty,
        }
    }
}

/// An initialization binding: `name := expr` at the start of every test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Init {
    pub name: String,
    pub expr: Expr,
}

impl Init {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Init {
            name: name.into(),
            expr,
        }
    }
}

/// HTTP response codes recognized on API block responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    Ok200,
    Created201,
    BadRequest400,
    /// Any other status; rendered as `???` by the printer.
    Other(u16),
}

/// The declared response of an API call: a status code and, optionally,
/// the expression naming where the response body is bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: ResponseCode,
    pub expr: Option<Expr>,
}

impl Response {
    pub fn new(code: ResponseCode, expr: Option<Expr>) -> Self {
        Response { code, expr }
    }
}

/// A single API-call specification: precondition, call, response binding
/// and postcondition. Pre and post may be absent. The postcondition may
/// reference next-state values of globals through the prime operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiBlock {
    pub name: String,
    pub pre: Option<Expr>,
    pub call: Call,
    pub response: Response,
    pub post: Option<Expr>,
}

/// A full behavioral specification: global state, its initialization, and
/// named API blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Spec {
    pub globals: Vec<Decl>,
    pub init: Vec<Init>,
    pub blocks: Vec<ApiBlock>,
}

impl Spec {
    /// Finds a block and its declaration index by name.
    pub fn block(&self, name: &str) -> Option<(usize, &ApiBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.name == name)
    }
}
