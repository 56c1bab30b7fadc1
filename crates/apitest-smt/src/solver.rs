//! Z3-backed constraint solving with model extraction.
//!
//! The concretizer talks to the narrow [`Solver`] trait: one call, one
//! formula, `Sat` with a model or `Unsat`. [`Z3Solver`] is the production
//! implementation; it builds a fresh Z3 context per query, translates the
//! formula, and reads every declared constant back out of the model.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};
use z3::{Config, Context, Model as Z3Model, SatResult, Solver as Z3Handle};

use apitest_lang::{Expr, TypeMap};

use crate::error::{SmtError, SmtResult};
use crate::translate::{Term, Translator};

/// Value extracted from an SMT model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Array-sorted values (sets, maps) in Z3's textual rendering.
    Array(String),
}

impl fmt::Display for SmtValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtValue::Bool(b) => write!(f, "{b}"),
            SmtValue::Int(i) => write!(f, "{i}"),
            SmtValue::Str(s) => write!(f, "\"{s}\""),
            SmtValue::Array(s) => f.write_str(s),
        }
    }
}

/// Variable assignments of a satisfiable query, iterated in name order.
pub type Model = BTreeMap<String, SmtValue>;

/// Outcome of one solver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    Sat(Model),
    Unsat,
}

impl Solution {
    pub fn is_sat(&self) -> bool {
        matches!(self, Solution::Sat(_))
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            Solution::Sat(model) => Some(model),
            Solution::Unsat => None,
        }
    }
}

/// The black-box solver boundary used by the concretizer.
pub trait Solver {
    fn solve(&self, formula: &Expr) -> SmtResult<Solution>;
}

/// Z3 implementation of [`Solver`].
///
/// Carries the type map used to sort free named variables, and an optional
/// per-query timeout. A timeout or other inconclusive result surfaces as
/// `Unsat` (the caller observes no progress), never as a distinct state.
pub struct Z3Solver {
    cfg: Config,
    types: TypeMap,
    timeout_ms: Option<u64>,
}

impl Z3Solver {
    pub fn new(types: TypeMap) -> Self {
        Z3Solver {
            cfg: Config::new(),
            types,
            timeout_ms: None,
        }
    }

    /// Sets the per-query timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    fn extract_model(
        &self,
        model: &Z3Model,
        translator: &Translator<'_, '_>,
    ) -> SmtResult<Model> {
        let mut assignments = BTreeMap::new();
        for (name, (_, term)) in translator.vars() {
            let value = match term {
                Term::Bool(b) => match model.eval(b, true).and_then(|v| v.as_bool()) {
                    Some(b) => SmtValue::Bool(b),
                    None => continue,
                },
                Term::Int(i) => match model.eval(i, true) {
                    Some(v) => match v.as_i64() {
                        Some(n) => SmtValue::Int(n),
                        // Out of i64 range; keep the textual form.
                        None => SmtValue::Str(v.to_string()),
                    },
                    None => continue,
                },
                Term::Str(s) => match model.eval(s, true) {
                    Some(v) => match v.as_string() {
                        Some(decoded) => SmtValue::Str(decoded),
                        None => SmtValue::Str(v.to_string()),
                    },
                    None => continue,
                },
                Term::Set { ast, .. } => match model.eval(ast, true) {
                    Some(v) => SmtValue::Array(v.to_string()),
                    None => continue,
                },
                Term::Map { ast, .. } => match model.eval(ast, true) {
                    Some(v) => SmtValue::Array(v.to_string()),
                    None => continue,
                },
            };
            assignments.insert(name.clone(), value);
        }
        Ok(assignments)
    }
}

impl Solver for Z3Solver {
    fn solve(&self, formula: &Expr) -> SmtResult<Solution> {
        let ctx = Context::new(&self.cfg);
        let mut translator = Translator::new(&ctx, &self.types);
        let constraint = translator.translate_bool(formula)?;

        let solver = Z3Handle::new(&ctx);
        if let Some(ms) = self.timeout_ms {
            let mut params = z3::Params::new(&ctx);
            params.set_u32("timeout", ms as u32);
            solver.set_params(&params);
        }
        solver.assert(&constraint);

        match solver.check() {
            SatResult::Sat => {
                let model = solver.get_model().ok_or(SmtError::ModelUnavailable)?;
                let assignments = self.extract_model(&model, &translator)?;
                debug!(constants = assignments.len(), "solver returned a model");
                Ok(Solution::Sat(assignments))
            }
            SatResult::Unsat => Ok(Solution::Unsat),
            SatResult::Unknown => {
                let reason = solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(reason, "solver inconclusive; reporting unsat");
                Ok(Solution::Unsat)
            }
        }
    }
}
