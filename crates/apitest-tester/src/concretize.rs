//! The concretization loop and ATC rewriting.

use tracing::{debug, info};

use apitest_lang::{Expr, Program, Stmt};
use apitest_see::{Engine, FunctionFactory};
use apitest_smt::{Model, SmtValue, Solution, Solver};

use crate::error::{TesterError, TesterResult};

/// Orchestrates engine, solver and program rewriting for one
/// concretization run. Sigma lives in the engine and is fresh per tester;
/// the path constraint is cleared by each engine pass.
pub struct Tester<'f> {
    engine: Engine<'f>,
    solver: Box<dyn Solver>,
}

impl<'f> Tester<'f> {
    pub fn new(factory: &'f dyn FunctionFactory, solver: Box<dyn Solver>) -> Self {
        Tester {
            engine: Engine::new(factory),
            solver,
        }
    }

    /// Read access to the engine, for inspecting sigma and the constraints
    /// of the final pass.
    pub fn engine(&self) -> &Engine<'f> {
        &self.engine
    }

    /// Produces a concrete test case from `atc`, threading `seed` values
    /// into its leading input slots. An empty seed is the normal starting
    /// point.
    ///
    /// Returns once no input slot remains, or as soon as the solver stops
    /// producing new values (unsatisfiable or empty model) - in that case
    /// the program may still contain input slots and the caller decides
    /// what a partial result means.
    pub fn generate_ctc(&mut self, atc: Program, seed: Vec<Expr>) -> TesterResult<Program> {
        let mut program = atc;
        let mut values = seed;
        let mut round = 0usize;

        loop {
            if !program.is_abstract() {
                info!(round, "program is concrete");
                return Ok(program);
            }

            program = rewrite_atc(&program, &values)?;
            let outcome = self.engine.run(&program)?;
            let constraint = self.engine.path_constraint();
            debug!(round, ?outcome, %constraint, "pass finished, solving");

            match self.solver.solve(&constraint)? {
                Solution::Unsat => {
                    info!(round, "constraints unsatisfiable; returning partial program");
                    return Ok(program);
                }
                Solution::Sat(model) => {
                    values = symvar_values(&model);
                    if values.is_empty() {
                        info!(round, "model carries no new input values; stopping");
                        return Ok(program);
                    }
                    debug!(round, count = values.len(), "resuming with solved inputs");
                }
            }
            round += 1;
        }
    }
}

/// Replaces leading input slots with the given concrete values, one value
/// per slot in program order. Statements that are not input assignments
/// are cloned unchanged, as are input slots once the values run out;
/// excess values are ignored. Values against an empty program are a hard
/// error.
pub fn rewrite_atc(atc: &Program, values: &[Expr]) -> TesterResult<Program> {
    if atc.is_empty() && !values.is_empty() {
        return Err(TesterError::ValuesWithoutSlots);
    }

    let mut remaining = values.iter();
    let mut statements = Vec::with_capacity(atc.len());
    for stmt in &atc.statements {
        if stmt.is_input_assign() {
            let Stmt::Assign { target, .. } = stmt else {
                unreachable!("input assignment is an assignment");
            };
            if !matches!(target, Expr::Var(_)) {
                return Err(TesterError::MalformedInputTarget(target.to_string()));
            }
            if let Some(value) = remaining.next() {
                statements.push(Stmt::assign(target.clone(), value.clone()));
                continue;
            }
        }
        statements.push(stmt.clone());
    }
    Ok(Program::new(statements))
}

/// The solved input values: integer assignments of the symbolic constants
/// `X{n}`, in ascending identity order so the i-th value lines up with the
/// i-th minted input slot.
fn symvar_values(model: &Model) -> Vec<Expr> {
    let mut picked: Vec<(u32, i64)> = model
        .iter()
        .filter_map(|(name, value)| {
            let id: u32 = name.strip_prefix('X')?.parse().ok()?;
            match value {
                SmtValue::Int(v) => Some((id, *v)),
                _ => None,
            }
        })
        .collect();
    picked.sort_by_key(|(id, _)| *id);
    picked.into_iter().map(|(_, v)| Expr::Num(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use apitest_lang::{ScopeChain, TypeMap};
    use apitest_see::{Executable, FactoryError};
    use apitest_smt::Z3Solver;

    struct Return(Expr);

    impl Executable for Return {
        fn execute(&self) -> Result<Expr, FactoryError> {
            Ok(self.0.clone())
        }
    }

    struct ConstFactory(Expr);

    impl FunctionFactory for ConstFactory {
        fn get_function(
            &self,
            _name: &str,
            _args: Vec<Expr>,
        ) -> Result<Box<dyn Executable + '_>, FactoryError> {
            Ok(Box::new(Return(self.0.clone())))
        }
    }

    fn tester(factory: &dyn FunctionFactory) -> Tester<'_> {
        let types: TypeMap = ScopeChain::new();
        Tester::new(factory, Box::new(Z3Solver::new(types)))
    }

    fn input_stmt(name: &str) -> Stmt {
        Stmt::assign(Expr::var(name), Expr::input())
    }

    fn gt(l: Expr, r: Expr) -> Expr {
        Expr::binop("Gt", l, r)
    }

    #[test]
    fn rewrite_replaces_slots_in_order() {
        let atc = Program::new(vec![
            input_stmt("x"),
            Stmt::Assume(gt(Expr::var("x"), Expr::Num(0))),
            input_stmt("y"),
        ]);
        let rewritten = rewrite_atc(&atc, &[Expr::Num(7), Expr::Num(9)]).unwrap();
        assert_eq!(
            rewritten.statements[0],
            Stmt::assign(Expr::var("x"), Expr::Num(7))
        );
        assert_eq!(rewritten.statements[1], atc.statements[1]);
        assert_eq!(
            rewritten.statements[2],
            Stmt::assign(Expr::var("y"), Expr::Num(9))
        );
    }

    #[test]
    fn rewrite_keeps_unfilled_slots_and_ignores_excess() {
        let atc = Program::new(vec![input_stmt("x"), input_stmt("y")]);
        let partial = rewrite_atc(&atc, &[Expr::Num(1)]).unwrap();
        assert!(partial.statements[1].is_input_assign());
        assert!(partial.is_abstract());

        let concrete =
            rewrite_atc(&atc, &[Expr::Num(1), Expr::Num(2), Expr::Num(3)]).unwrap();
        assert!(!concrete.is_abstract());
    }

    #[test]
    fn rewrite_of_empty_program_with_values_is_fatal() {
        let err = rewrite_atc(&Program::default(), &[Expr::Num(1)]).unwrap_err();
        assert!(matches!(err, TesterError::ValuesWithoutSlots));
        // No values is fine.
        assert!(rewrite_atc(&Program::default(), &[]).unwrap().is_empty());
    }

    #[test]
    fn rewrite_rejects_non_variable_input_targets() {
        let atc = Program::new(vec![Stmt::assign(
            Expr::Tuple(vec![Expr::var("a")]),
            Expr::input(),
        )]);
        let err = rewrite_atc(&atc, &[Expr::Num(1)]).unwrap_err();
        assert!(matches!(err, TesterError::MalformedInputTarget(_)));
    }

    #[test]
    fn symvar_values_sort_numerically_not_lexicographically() {
        let mut model: Model = BTreeMap::new();
        model.insert("X2".into(), SmtValue::Int(22));
        model.insert("X10".into(), SmtValue::Int(1010));
        model.insert("X0".into(), SmtValue::Int(0));
        model.insert("u".into(), SmtValue::Int(99)); // named var, not an input
        model.insert("X1".into(), SmtValue::Str("not an int".into()));
        assert_eq!(
            symvar_values(&model),
            vec![Expr::Num(0), Expr::Num(22), Expr::Num(1010)]
        );
    }

    #[test]
    fn assume_only_program_concretizes_in_one_round() {
        let factory = ConstFactory(Expr::Num(0));
        let mut tester = tester(&factory);
        let atc = Program::new(vec![
            input_stmt("x"),
            Stmt::Assume(gt(Expr::var("x"), Expr::Num(5))),
        ]);

        let ctc = tester.generate_ctc(atc, Vec::new()).unwrap();
        assert!(!ctc.is_abstract());
        match &ctc.statements[0] {
            Stmt::Assign {
                value: Expr::Num(v),
                ..
            } => assert!(*v > 5, "solved value {v} must satisfy x > 5"),
            other => panic!("expected concrete assignment, got {other}"),
        }
        // The assumption survives verbatim for downstream checking.
        assert_eq!(
            ctc.statements[1],
            Stmt::Assume(gt(Expr::var("x"), Expr::Num(5)))
        );
    }

    #[test]
    fn unsat_constraints_leave_inputs_unresolved() {
        let factory = ConstFactory(Expr::Num(0));
        let mut tester = tester(&factory);
        let atc = Program::new(vec![
            input_stmt("x"),
            input_stmt("y"),
            Stmt::Assume(Expr::binop(
                "Eq",
                Expr::binop("Mul", Expr::var("x"), Expr::var("y")),
                Expr::Num(3),
            )),
            Stmt::Assume(Expr::binop("Eq", Expr::var("x"), Expr::Num(5))),
        ]);

        let result = tester.generate_ctc(atc, Vec::new()).unwrap();
        assert!(result.is_abstract(), "no progress is observable on unsat");
    }

    #[test]
    fn blocked_api_call_resumes_after_solving() {
        let factory = ConstFactory(Expr::Num(200));
        let mut tester = tester(&factory);
        let atc = Program::new(vec![
            input_stmt("x"),
            Stmt::Assume(gt(Expr::var("x"), Expr::Num(5))),
            Stmt::assign(Expr::var("r"), Expr::call("ping", vec![Expr::var("x")])),
            Stmt::Assert(Expr::binop("Eq", Expr::var("r"), Expr::Num(200))),
        ]);

        let ctc = tester.generate_ctc(atc, Vec::new()).unwrap();
        assert!(!ctc.is_abstract());
        // The API executed on the resumed pass and its result landed in
        // sigma.
        assert_eq!(tester.engine().sigma().lookup("r"), Some(&Expr::Num(200)));
    }

    #[test]
    fn concrete_program_returns_untouched() {
        let factory = ConstFactory(Expr::Num(0));
        let mut tester = tester(&factory);
        let atc = Program::new(vec![Stmt::assign(Expr::var("x"), Expr::Num(3))]);
        let ctc = tester.generate_ctc(atc.clone(), Vec::new()).unwrap();
        assert_eq!(ctc, atc);
    }
}
