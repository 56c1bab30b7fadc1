//! Line-oriented debug rendering of the AST.
//!
//! This form is informational, not a parseable interchange format:
//! `name := expr`, `assume(expr)`, `assert(expr)` and `Response(code,
//! expr)` for HTTP responses.

use std::fmt;

use crate::ast::{
    ApiBlock, Call, Decl, Expr, Init, Program, Response, ResponseCode, Spec, Stmt, TypeExpr,
};

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Const(name) => f.write_str(name),
            TypeExpr::Func { params, ret } => {
                f.write_str("(")?;
                join(f, params, ", ")?;
                write!(f, ") -> {ret}")
            }
            TypeExpr::Map { domain, range } => write!(f, "map<{domain}, {range}>"),
            TypeExpr::Tuple(elements) => {
                f.write_str("(")?;
                join(f, elements, ", ")?;
                f.write_str(")")
            }
            TypeExpr::Set(element) => write!(f, "set<{element}>"),
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        join(f, &self.args, ", ")?;
        f.write_str(")")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => f.write_str(name),
            Expr::Num(value) => write!(f, "{value}"),
            Expr::String(value) => write!(f, "\"{value}\""),
            Expr::Set(elements) => {
                f.write_str("{")?;
                join(f, elements, ", ")?;
                f.write_str("}")
            }
            Expr::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} -> {value}")?;
                }
                f.write_str("}")
            }
            Expr::Tuple(elements) => {
                f.write_str("(")?;
                join(f, elements, ", ")?;
                f.write_str(")")
            }
            Expr::Call(call) => write!(f, "{call}"),
            Expr::SymVar(id) => write!(f, "X{id}"),
            Expr::Input => f.write_str("input()"),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { target, value } => write!(f, "{target} := {value}"),
            Stmt::Assume(cond) => write!(f, "assume({cond})"),
            Stmt::Assert(cond) => write!(f, "assert({cond})"),
            Stmt::Decl { name, ty } => write!(f, "{name}: {ty}"),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            writeln!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Ok200 => f.write_str("OK_200"),
            ResponseCode::Created201 => f.write_str("CREATED_201"),
            ResponseCode::BadRequest400 => f.write_str("BAD_REQUEST_400"),
            ResponseCode::Other(_) => f.write_str("???"),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expr {
            Some(expr) => write!(f, "Response({}, {expr})", self.code),
            None => write!(f, "Response({})", self.code),
        }
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

impl fmt::Display for Init {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} := {}", self.name, self.expr)
    }
}

impl fmt::Display for ApiBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.name)?;
        if let Some(pre) = &self.pre {
            writeln!(f, "  pre: {pre}")?;
        }
        writeln!(f, "  call: {} -> {}", self.call, self.response)?;
        if let Some(post) = &self.post {
            writeln!(f, "  post: {post}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "globals:")?;
        for decl in &self.globals {
            writeln!(f, "  {decl}")?;
        }
        writeln!(f, "init:")?;
        for init in &self.init {
            writeln!(f, "  {init}")?;
        }
        writeln!(f, "blocks:")?;
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}
