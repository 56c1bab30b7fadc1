//! The embedded demo application: an in-memory user store.
//!
//! Stands in for a real HTTP backend so the whole pipeline can run out of
//! the box. `signup` registers an id (400 on duplicates), `login` checks
//! one (400 on unknown ids); both return their HTTP status as a number.

use std::cell::RefCell;
use std::collections::BTreeSet;

use tracing::info;

use apitest_lang::{
    ApiBlock, Call, Decl, Expr, Init, Response, ResponseCode, ScopeChain, Spec, SymbolTable,
    TypeExpr, TypeMap,
};
use apitest_see::{Executable, FactoryError, FunctionFactory};

/// The demo specification: integer user ids guarded by integer pins, with
/// the registered-id set `U` as global state.
pub fn spec() -> Spec {
    let and = |l, r| Expr::binop("And", l, r);
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
            Expr::Set(vec![Expr::Num(10), Expr::Num(20)]),
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

/// Symbol tables matching [`spec`]: one child per block, each declaring
/// the block's parameters.
pub fn symbols() -> SymbolTable {
    let mut global = SymbolTable::new();
    for _ in 0..2 {
        let mut block = SymbolTable::new();
        // Distinct literal names; binding into a fresh table cannot
        // conflict.
        for param in ["uid", "pin"] {
            let _ = block.bind(param, TypeExpr::named("int"));
        }
        global.add_child(block);
    }
    global
}

/// Type map seeded with the global declarations of [`spec`].
pub fn types() -> TypeMap {
    let mut types = ScopeChain::new();
    for global in &spec().globals {
        types.insert(global.name.clone(), global.ty.clone());
    }
    types
}

enum Action {
    Signup(i64),
    Login(i64),
}

struct UserStoreCall<'s> {
    store: &'s UserStore,
    action: Action,
}

impl Executable for UserStoreCall<'_> {
    fn execute(&self) -> Result<Expr, FactoryError> {
        let mut users = self.store.users.borrow_mut();
        let status = match self.action {
            Action::Signup(uid) => {
                if users.insert(uid) {
                    info!(uid, "demo store: registered user");
                    201
                } else {
                    400 // duplicate id
                }
            }
            Action::Login(uid) => {
                if users.contains(&uid) {
                    200
                } else {
                    400
                }
            }
        };
        Ok(Expr::Num(status))
    }
}

/// In-memory user store behind the [`FunctionFactory`] boundary.
#[derive(Default)]
pub struct UserStore {
    users: RefCell<BTreeSet<i64>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn int_arg(name: &str, args: &[Expr], index: usize) -> Result<i64, FactoryError> {
        match args.get(index) {
            Some(Expr::Num(v)) => Ok(*v),
            Some(other) => Err(FactoryError::ExecutionFailed {
                name: name.to_string(),
                message: format!("argument {index} is not a number: {other}"),
            }),
            None => Err(FactoryError::Arity {
                name: name.to_string(),
                expected: 2,
                actual: args.len(),
            }),
        }
    }
}

impl FunctionFactory for UserStore {
    fn get_function(
        &self,
        name: &str,
        args: Vec<Expr>,
    ) -> Result<Box<dyn Executable + '_>, FactoryError> {
        let action = match name {
            "signup" => Action::Signup(Self::int_arg(name, &args, 0)?),
            "login" => Action::Login(Self::int_arg(name, &args, 0)?),
            _ => return Err(FactoryError::UnknownFunction(name.to_string())),
        };
        Ok(Box::new(UserStoreCall {
            store: self,
            action,
        }))
    }
}
