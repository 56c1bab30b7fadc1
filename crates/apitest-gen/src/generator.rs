//! ATC generation.
//!
//! For every occurrence of a block name in the test string the generator
//! emits one block of statements: input assignments for the block's local
//! variables, the precondition as an assumption, old-state snapshots for
//! primed globals, the API call itself, and the postcondition as an
//! assertion with primes stripped.
//!
//! Locals are suffixed with the occurrence index in the test string, so a
//! block invoked twice gets disjoint variables (`u0`, `u1`, ...). Globals
//! are never renamed.

use tracing::debug;

use apitest_lang::builtins::PRIME;
use apitest_lang::{Call, Expr, Program, Spec, Stmt, SymbolTable, TypeMap};

use crate::error::{GenError, GenResult};

/// The product of one generation run: the abstract test case and the type
/// map extended with the suffixed locals and old-state snapshots it
/// introduced, ready for the SMT bridge.
#[derive(Debug, Clone)]
pub struct GeneratedAtc {
    pub program: Program,
    pub types: TypeMap,
}

/// Lowers a specification into abstract test cases.
///
/// The global symbol table's ordered children correspond one-to-one with
/// the specification's API blocks; each child lists that block's local
/// parameter names.
pub struct AtcGenerator<'a> {
    spec: &'a Spec,
    symbols: &'a SymbolTable,
}

impl<'a> AtcGenerator<'a> {
    pub fn new(spec: &'a Spec, symbols: &'a SymbolTable) -> Self {
        AtcGenerator { spec, symbols }
    }

    /// Generates the ATC for `test_string`, starting from the caller's
    /// type map (which is expected to carry the global declarations).
    pub fn generate<S: AsRef<str>>(
        &self,
        test_string: &[S],
        types: &TypeMap,
    ) -> GenResult<GeneratedAtc> {
        let mut statements = Vec::new();
        let mut types = types.clone();

        for init in &self.spec.init {
            statements.push(Stmt::assign(
                Expr::Var(init.name.clone()),
                init.expr.clone(),
            ));
        }

        for (occurrence, name) in test_string.iter().enumerate() {
            let name = name.as_ref();
            let (block_index, block) = self
                .spec
                .block(name)
                .ok_or_else(|| GenError::UnknownBlock(name.to_string()))?;
            let locals =
                self.symbols
                    .child(block_index)
                    .ok_or_else(|| GenError::MissingSymbolTable {
                        block: name.to_string(),
                        index: block_index,
                    })?;
            let suffix = occurrence.to_string();
            debug!(block = name, occurrence, "generating block");

            // Input variables: every block-local name referenced by the
            // call arguments or the precondition, first occurrence wins.
            let mut inputs = Vec::new();
            for arg in &block.call.args {
                collect_locals(arg, locals, &mut inputs);
            }
            if let Some(pre) = &block.pre {
                collect_locals(pre, locals, &mut inputs);
            }
            for local in &inputs {
                let renamed = format!("{local}{suffix}");
                statements.push(Stmt::assign(Expr::Var(renamed.clone()), Expr::input()));
                if let Some(ty) = locals.lookup(local) {
                    types.insert(renamed, ty.clone());
                }
            }

            if let Some(pre) = &block.pre {
                statements.push(Stmt::Assume(rename_locals(pre, locals, &suffix)));
            }

            // Primed globals get their pre-call value snapshotted, in the
            // order the primed forms were first seen.
            let mut primed = Vec::new();
            if let Some(post) = &block.post {
                collect_primed(post, &mut primed);
            }
            for global in &primed {
                let old = format!("{global}_old");
                statements.push(Stmt::assign(
                    Expr::Var(old.clone()),
                    Expr::Var(global.clone()),
                ));
                if let Some(ty) = types.lookup(global).cloned() {
                    types.insert(old, ty);
                }
            }

            let args = block
                .call
                .args
                .iter()
                .map(|arg| rename_locals(arg, locals, &suffix))
                .collect();
            let target = match &block.response.expr {
                Some(expr) => rename_locals(expr, locals, &suffix),
                None => Expr::Var(format!("_result{suffix}")),
            };
            if !matches!(target, Expr::Var(_) | Expr::Tuple(_)) {
                return Err(GenError::MalformedResponse {
                    block: name.to_string(),
                    target: target.to_string(),
                });
            }
            statements.push(Stmt::assign(
                target,
                Expr::Call(Call::new(block.call.name.clone(), args)),
            ));

            if let Some(post) = &block.post {
                let renamed = rename_locals(post, locals, &suffix);
                statements.push(Stmt::Assert(strip_primes(&renamed, &primed, false)));
            }
        }

        Ok(GeneratedAtc {
            program: Program::new(statements),
            types,
        })
    }
}

/// Gathers block-local variable names in first-occurrence order, without
/// duplicates.
fn collect_locals(expr: &Expr, locals: &SymbolTable, out: &mut Vec<String>) {
    match expr {
        Expr::Var(name) => {
            if locals.has(name) && !out.iter().any(|seen| seen == name) {
                out.push(name.clone());
            }
        }
        Expr::Num(_) | Expr::String(_) | Expr::SymVar(_) | Expr::Input => {}
        Expr::Set(elements) | Expr::Tuple(elements) => {
            for element in elements {
                collect_locals(element, locals, out);
            }
        }
        Expr::Map(entries) => {
            for (key, value) in entries {
                collect_locals(key, locals, out);
                collect_locals(value, locals, out);
            }
        }
        Expr::Call(call) => {
            for arg in &call.args {
                collect_locals(arg, locals, out);
            }
        }
    }
}

/// Rebuilds `expr` with every block-local variable suffixed. Globals and
/// literals pass through unchanged.
fn rename_locals(expr: &Expr, locals: &SymbolTable, suffix: &str) -> Expr {
    match expr {
        Expr::Var(name) if locals.has(name) => Expr::Var(format!("{name}{suffix}")),
        Expr::Var(_) | Expr::Num(_) | Expr::String(_) | Expr::SymVar(_) | Expr::Input => {
            expr.clone()
        }
        Expr::Set(elements) => Expr::Set(
            elements
                .iter()
                .map(|e| rename_locals(e, locals, suffix))
                .collect(),
        ),
        Expr::Tuple(elements) => Expr::Tuple(
            elements
                .iter()
                .map(|e| rename_locals(e, locals, suffix))
                .collect(),
        ),
        Expr::Map(entries) => Expr::Map(
            entries
                .iter()
                .map(|(k, v)| {
                    (
                        rename_locals(k, locals, suffix),
                        rename_locals(v, locals, suffix),
                    )
                })
                .collect(),
        ),
        Expr::Call(call) => Expr::Call(Call::new(
            call.name.clone(),
            call.args
                .iter()
                .map(|a| rename_locals(a, locals, suffix))
                .collect(),
        )),
    }
}

/// Collects the bare global names wrapped by prime applications, in
/// first-seen traversal order.
fn collect_primed(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Call(call) if call.name == PRIME && !call.args.is_empty() => {
            if let Expr::Var(name) = &call.args[0] {
                if !out.iter().any(|seen| seen == name) {
                    out.push(name.clone());
                }
            }
        }
        Expr::Call(call) => {
            for arg in &call.args {
                collect_primed(arg, out);
            }
        }
        Expr::Set(elements) | Expr::Tuple(elements) => {
            for element in elements {
                collect_primed(element, out);
            }
        }
        Expr::Map(entries) => {
            for (key, value) in entries {
                collect_primed(key, out);
                collect_primed(value, out);
            }
        }
        Expr::Var(_) | Expr::Num(_) | Expr::String(_) | Expr::SymVar(_) | Expr::Input => {}
    }
}

/// Rewrites prime notation out of a postcondition: `'(g)` becomes the bare
/// `g` (the post-call value), while unprimed occurrences of a primed
/// global become `g_old` (the snapshot taken before the call).
fn strip_primes(expr: &Expr, primed: &[String], inside_prime: bool) -> Expr {
    match expr {
        Expr::Var(name) => {
            if !inside_prime && primed.iter().any(|p| p == name) {
                Expr::Var(format!("{name}_old"))
            } else {
                Expr::Var(name.clone())
            }
        }
        Expr::Call(call) if call.name == PRIME && !call.args.is_empty() => {
            strip_primes(&call.args[0], primed, true)
        }
        Expr::Call(call) => Expr::Call(Call::new(
            call.name.clone(),
            call.args
                .iter()
                .map(|a| strip_primes(a, primed, inside_prime))
                .collect(),
        )),
        Expr::Set(elements) => Expr::Set(
            elements
                .iter()
                .map(|e| strip_primes(e, primed, inside_prime))
                .collect(),
        ),
        Expr::Tuple(elements) => Expr::Tuple(
            elements
                .iter()
                .map(|e| strip_primes(e, primed, inside_prime))
                .collect(),
        ),
        Expr::Map(entries) => Expr::Map(
            entries
                .iter()
                .map(|(k, v)| {
                    (
                        strip_primes(k, primed, inside_prime),
                        strip_primes(v, primed, inside_prime),
                    )
                })
                .collect(),
        ),
        Expr::Num(_) | Expr::String(_) | Expr::SymVar(_) | Expr::Input => expr.clone(),
    }
}
