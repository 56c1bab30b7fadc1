//! One pass of symbolic execution.
//!
//! Statements execute strictly in program order against the value
//! environment sigma. The pass either completes or stops at the first
//! statement that is not ready: an API call with a symbolic argument.
//! The ready/blocked signal is a plain return value, not a suspension;
//! the concretizer decides what happens next.

use tracing::debug;

use apitest_lang::builtins::is_api_call;
use apitest_lang::{Expr, Program, Stmt, SymVarGen, ValueEnv};

use crate::error::{SeeError, SeeResult};
use crate::factory::FunctionFactory;

/// Result of one execution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every statement executed.
    Completed,
    /// Execution stopped at `index` because that statement needs concrete
    /// values first.
    Blocked { index: usize },
}

/// The symbolic execution engine.
///
/// Owns sigma and the path-constraint list for the duration of a
/// concretization run. The constraint list is cleared at the start of
/// every pass; sigma persists so repeated passes over a progressively
/// rewritten program see consistent bindings.
pub struct Engine<'f> {
    factory: &'f dyn FunctionFactory,
    sigma: ValueEnv,
    constraints: Vec<Expr>,
    ids: SymVarGen,
}

impl<'f> Engine<'f> {
    pub fn new(factory: &'f dyn FunctionFactory) -> Self {
        Self::with_ids(factory, SymVarGen::new())
    }

    /// Builds an engine around an externally owned identity source, so the
    /// caller controls symbolic-variable numbering across engines.
    pub fn with_ids(factory: &'f dyn FunctionFactory, ids: SymVarGen) -> Self {
        Engine {
            factory,
            sigma: ValueEnv::new(),
            constraints: Vec::new(),
            ids,
        }
    }

    pub fn sigma(&self) -> &ValueEnv {
        &self.sigma
    }

    /// Constraints collected by the most recent pass, in insertion order.
    pub fn constraints(&self) -> &[Expr] {
        &self.constraints
    }

    /// The conjunction of the collected constraints, or the trivial
    /// `Eq(1, 1)` when none were collected.
    pub fn path_constraint(&self) -> Expr {
        let mut rest = self.constraints.iter().rev();
        match rest.next() {
            None => Expr::binop("Eq", Expr::Num(1), Expr::Num(1)),
            Some(last) => rest.fold(last.clone(), |acc, c| Expr::binop("And", c.clone(), acc)),
        }
    }

    /// Runs one pass over `program`, stopping at the first non-ready
    /// statement.
    pub fn run(&mut self, program: &Program) -> SeeResult<Outcome> {
        self.constraints.clear();
        for (index, stmt) in program.statements.iter().enumerate() {
            if !self.is_ready(stmt) {
                debug!(index, %stmt, "statement not ready; interrupting pass");
                return Ok(Outcome::Blocked { index });
            }
            self.exec(stmt)?;
        }
        Ok(Outcome::Completed)
    }

    /// A statement is ready when it needs no new concrete values: only an
    /// API-call assignment with a symbolic argument blocks.
    pub fn is_ready(&self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Assign {
                value: Expr::Call(call),
                ..
            } if is_api_call(call) => !call.args.iter().any(|arg| self.is_symbolic(arg)),
            _ => true,
        }
    }

    /// True iff the tree rooted at `expr`, with variables resolved through
    /// sigma, contains a symbolic variable.
    pub fn is_symbolic(&self, expr: &Expr) -> bool {
        match expr {
            Expr::SymVar(_) => true,
            Expr::Num(_) | Expr::String(_) | Expr::Input => false,
            Expr::Var(name) => self
                .sigma
                .lookup(name)
                .is_some_and(|bound| self.is_symbolic(bound)),
            Expr::Set(elements) | Expr::Tuple(elements) => {
                elements.iter().any(|e| self.is_symbolic(e))
            }
            Expr::Map(entries) => entries
                .iter()
                .any(|(k, v)| self.is_symbolic(k) || self.is_symbolic(v)),
            Expr::Call(call) => call.args.iter().any(|arg| self.is_symbolic(arg)),
        }
    }

    fn exec(&mut self, stmt: &Stmt) -> SeeResult<()> {
        match stmt {
            Stmt::Assign { target, value } => {
                if let Expr::Call(call) = value {
                    if is_api_call(call) {
                        return self.exec_api_call(target, call);
                    }
                }
                let evaluated = self.eval(value);
                debug!(%target, value = %evaluated, "assign");
                self.bind(target, evaluated)
            }
            Stmt::Assume(cond) | Stmt::Assert(cond) => {
                let constraint = self.eval(cond);
                debug!(constraint = %constraint, "collecting path constraint");
                self.constraints.push(constraint);
                Ok(())
            }
            Stmt::Decl { name, .. } => {
                let fresh = self.ids.fresh();
                debug!(name = %name, value = %fresh, "declaring symbolic name");
                self.sigma.insert(name.clone(), fresh);
                Ok(())
            }
        }
    }

    fn exec_api_call(&mut self, target: &Expr, call: &apitest_lang::Call) -> SeeResult<()> {
        let args: Vec<Expr> = call.args.iter().map(|arg| self.eval(arg)).collect();
        debug!(api = %call.name, ?args, "executing API call");
        let executable = self.factory.get_function(&call.name, args)?;
        let result = executable.execute()?;
        debug!(api = %call.name, result = %result, "API call returned");
        self.bind(target, result)
    }

    fn bind(&mut self, target: &Expr, value: Expr) -> SeeResult<()> {
        match target {
            Expr::Var(name) => {
                self.sigma.insert(name.clone(), value);
                Ok(())
            }
            Expr::Tuple(targets) => match value {
                Expr::Tuple(values) if values.len() == targets.len() => {
                    for (t, v) in targets.iter().zip(values) {
                        self.bind(t, v)?;
                    }
                    Ok(())
                }
                other => Err(SeeError::TupleMismatch {
                    target: target.to_string(),
                    value: other.to_string(),
                }),
            },
            other => Err(SeeError::MalformedTarget(other.to_string())),
        }
    }

    /// Symbolic evaluation: variables rewrite to their sigma binding (or
    /// stay free), `input()` materializes a fresh symbolic variable, other
    /// calls reconstruct over evaluated arguments, and literals recurse
    /// through their children.
    fn eval(&mut self, expr: &Expr) -> Expr {
        if expr.is_input() {
            return self.ids.fresh();
        }
        match expr {
            Expr::Var(name) => self
                .sigma
                .lookup(name)
                .cloned()
                .unwrap_or_else(|| expr.clone()),
            Expr::Num(_) | Expr::String(_) | Expr::SymVar(_) | Expr::Input => expr.clone(),
            Expr::Set(elements) => Expr::Set(elements.iter().map(|e| self.eval(e)).collect()),
            Expr::Tuple(elements) => Expr::Tuple(elements.iter().map(|e| self.eval(e)).collect()),
            Expr::Map(entries) => Expr::Map(
                entries
                    .iter()
                    .map(|(k, v)| (self.eval(k), self.eval(v)))
                    .collect(),
            ),
            Expr::Call(call) => Expr::call(
                call.name.clone(),
                call.args.iter().map(|arg| self.eval(arg)).collect(),
            ),
        }
    }
}
