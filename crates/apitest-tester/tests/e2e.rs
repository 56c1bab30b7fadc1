//! End-to-end pipeline tests: specification -> ATC -> CTC.
//!
//! Exercises the full loop against a small in-memory user-store
//! application: the generator lowers the spec, the engine interrupts on
//! symbolic API calls, Z3 supplies inputs, and the factory executes the
//! calls on the resumed pass.

use std::cell::RefCell;

use apitest_gen::AtcGenerator;
use apitest_lang::{
    ApiBlock, Call, Decl, Expr, Init, Response, ResponseCode, ScopeChain, Spec, Stmt, SymbolTable,
    TypeExpr, TypeMap,
};
use apitest_see::{Executable, FactoryError, FunctionFactory};
use apitest_smt::Z3Solver;
use apitest_tester::Tester;

struct Reply(i64);

impl Executable for Reply {
    fn execute(&self) -> Result<Expr, FactoryError> {
        Ok(Expr::Num(self.0))
    }
}

/// In-memory user store; records every invocation it serves.
#[derive(Default)]
struct UserStore {
    calls: RefCell<Vec<(String, Vec<Expr>)>>,
}

impl FunctionFactory for UserStore {
    fn get_function(
        &self,
        name: &str,
        args: Vec<Expr>,
    ) -> Result<Box<dyn Executable + '_>, FactoryError> {
        let status = match name {
            "signup" => 201,
            "login" => 200,
            _ => return Err(FactoryError::UnknownFunction(name.to_string())),
        };
        self.calls.borrow_mut().push((name.to_string(), args));
        Ok(Box::new(Reply(status)))
    }
}

fn and(l: Expr, r: Expr) -> Expr {
    Expr::binop("And", l, r)
}

/// Users are integer ids guarded by integer pins; `U` is the set of
/// registered ids.
fn user_spec(initial_users: Vec<i64>) -> Spec {
    let signup_pre = and(
        and(
            Expr::binop("Gt", Expr::var("uid"), Expr::Num(0)),
            Expr::binop("not_in", Expr::var("uid"), Expr::var("U")),
        ),
        Expr::call("Any", vec![Expr::var("pin")]),
    );
    let signup_post = Expr::binop(
        "Eq",
        Expr::call("'", vec![Expr::var("U")]),
        Expr::binop("add_to_set", Expr::var("U"), Expr::var("uid")),
    );
    let login_pre = and(
        Expr::binop("in", Expr::var("uid"), Expr::var("U")),
        Expr::call("Any", vec![Expr::var("pin")]),
    );

    Spec {
        globals: vec![Decl::new("U", TypeExpr::set_of(TypeExpr::named("int")))],
        init: vec![Init::new(
            "U",
            Expr::Set(initial_users.into_iter().map(Expr::Num).collect()),
        )],
        blocks: vec![
            ApiBlock {
                name: "signup".into(),
                pre: Some(signup_pre),
                call: Call::new("signup", vec![Expr::var("uid"), Expr::var("pin")]),
                response: Response::new(ResponseCode::Created201, None),
                post: Some(signup_post),
            },
            ApiBlock {
                name: "login".into(),
                pre: Some(login_pre),
                call: Call::new("login", vec![Expr::var("uid"), Expr::var("pin")]),
                response: Response::new(ResponseCode::Ok200, None),
                post: None,
            },
        ],
    }
}

fn user_symbols() -> SymbolTable {
    let mut global = SymbolTable::new();
    for _ in 0..2 {
        let mut block = SymbolTable::new();
        block.bind("uid", TypeExpr::named("int")).unwrap();
        block.bind("pin", TypeExpr::named("int")).unwrap();
        global.add_child(block);
    }
    global
}

fn run_pipeline(spec: &Spec, test_string: &[&str], store: &UserStore) -> apitest_lang::Program {
    let symbols = user_symbols();
    let mut types: TypeMap = ScopeChain::new();
    for global in &spec.globals {
        types.insert(global.name.clone(), global.ty.clone());
    }
    let atc = AtcGenerator::new(spec, &symbols)
        .generate(test_string, &types)
        .unwrap();

    let mut tester = Tester::new(store, Box::new(Z3Solver::new(atc.types.clone())));
    tester.generate_ctc(atc.program, Vec::new()).unwrap()
}

fn solved_input(program: &apitest_lang::Program, name: &str) -> Option<i64> {
    program.statements.iter().find_map(|stmt| match stmt {
        Stmt::Assign {
            target: Expr::Var(var),
            value: Expr::Num(v),
        } if var == name => Some(*v),
        _ => None,
    })
}

#[test]
fn signup_concretizes_and_executes_the_api() {
    let store = UserStore::default();
    let ctc = run_pipeline(&user_spec(vec![]), &["signup"], &store);

    assert!(!ctc.is_abstract(), "all inputs resolved:\n{ctc}");
    let uid = solved_input(&ctc, "uid0").expect("uid0 solved");
    assert!(uid > 0, "precondition uid > 0 must hold, got {uid}");
    assert!(solved_input(&ctc, "pin0").is_some(), "Any(pin) registers pin");

    let calls = store.calls.borrow();
    assert_eq!(calls.len(), 1, "signup executed exactly once");
    assert_eq!(calls[0].0, "signup");
    assert_eq!(calls[0].1[0], Expr::Num(uid));
}

#[test]
fn signup_ctc_keeps_snapshot_and_postcondition() {
    let store = UserStore::default();
    let ctc = run_pipeline(&user_spec(vec![]), &["signup"], &store);
    let rendered: Vec<String> = ctc.statements.iter().map(|s| s.to_string()).collect();

    assert_eq!(rendered[0], "U := {}");
    assert!(rendered.contains(&"U_old := U".to_string()));
    assert!(rendered
        .iter()
        .any(|line| line == "assert(Eq(U, add_to_set(U_old, uid0)))"));
}

#[test]
fn login_against_seeded_store_picks_a_registered_id() {
    let store = UserStore::default();
    let ctc = run_pipeline(&user_spec(vec![10, 20]), &["login"], &store);

    assert!(!ctc.is_abstract());
    let uid = solved_input(&ctc, "uid0").expect("uid0 solved");
    assert!(uid == 10 || uid == 20, "uid must come from U, got {uid}");

    let calls = store.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "login");
}

#[test]
fn login_after_signup_stalls_on_unmodeled_state_transition() {
    // Sigma never reflects the API's effect on U, so the login
    // precondition over the still-empty set is unsatisfiable and the
    // caller observes a partially concretized program.
    let store = UserStore::default();
    let ctc = run_pipeline(&user_spec(vec![]), &["signup", "login"], &store);

    assert!(ctc.is_abstract(), "login inputs stay unresolved:\n{ctc}");
    assert!(solved_input(&ctc, "uid0").is_some(), "signup inputs resolved");
    let unresolved: Vec<&Stmt> = ctc
        .statements
        .iter()
        .filter(|s| s.is_input_assign())
        .collect();
    assert_eq!(unresolved.len(), 2, "uid1 and pin1 remain input slots");
}

#[test]
fn repeated_signups_use_disjoint_locals() {
    let store = UserStore::default();
    let ctc = run_pipeline(&user_spec(vec![]), &["signup", "signup"], &store);
    let rendered: Vec<String> = ctc.statements.iter().map(|s| s.to_string()).collect();

    assert!(rendered.iter().any(|l| l.starts_with("uid0 := ")));
    assert!(rendered.iter().any(|l| l.starts_with("uid1 := ")));
    assert!(rendered.contains(&"_result1 := signup(uid1, pin1)".to_string()));
}
