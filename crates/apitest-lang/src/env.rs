//! Scoped name-to-payload environments.
//!
//! Three environments share one chain primitive: the symbol table (names
//! to types, append-only, with per-block children), the value environment
//! sigma (names to expressions, overwriting), and the type map consulted
//! by the SMT bridge (names to types, overwriting). Lookup checks the
//! innermost scope first and walks outward; ordinary misses are `None`,
//! never an error.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::ast::{Expr, TypeExpr};

/// Environment errors. Only binding conflicts are fatal; lookup misses are
/// an ordinary `None`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("name '{0}' is already bound in this scope")]
    DuplicateBinding(String),
}

/// A parent-linked chain of scopes: an always-present root plus nested
/// child scopes, innermost last.
#[derive(Debug, Clone)]
pub struct ScopeChain<V> {
    root: BTreeMap<String, V>,
    nested: Vec<BTreeMap<String, V>>,
}

impl<V> Default for ScopeChain<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ScopeChain<V> {
    /// A chain with only the root scope.
    pub fn new() -> Self {
        ScopeChain {
            root: BTreeMap::new(),
            nested: Vec::new(),
        }
    }

    /// Opens a child scope; subsequent inserts land there.
    pub fn enter(&mut self) {
        self.nested.push(BTreeMap::new());
    }

    /// Closes the innermost scope, dropping its bindings. The root scope
    /// is never popped.
    pub fn exit(&mut self) {
        self.nested.pop();
    }

    fn innermost_mut(&mut self) -> &mut BTreeMap<String, V> {
        self.nested.last_mut().unwrap_or(&mut self.root)
    }

    /// Chain lookup, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&V> {
        self.nested
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.root.get(name))
    }

    /// Chain-walking membership predicate.
    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Binds `name` in the innermost scope, overwriting any previous
    /// binding there. Outer-scope bindings are shadowed, not touched.
    pub fn insert(&mut self, name: impl Into<String>, value: V) {
        self.innermost_mut().insert(name.into(), value);
    }

    /// Append-only bind: rejects a name already bound in the innermost
    /// scope.
    pub fn bind(&mut self, name: impl Into<String>, value: V) -> Result<(), EnvError> {
        let name = name.into();
        let scope = self.innermost_mut();
        if scope.contains_key(&name) {
            return Err(EnvError::DuplicateBinding(name));
        }
        scope.insert(name, value);
        Ok(())
    }

    /// Visible bindings: every name reachable by chain lookup, with inner
    /// bindings shadowing outer ones. Iteration order is by name.
    pub fn visible(&self) -> BTreeMap<&str, &V> {
        let mut out = BTreeMap::new();
        for scope in std::iter::once(&self.root).chain(self.nested.iter()) {
            for (name, value) in scope {
                out.insert(name.as_str(), value);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.nested.iter().all(BTreeMap::is_empty)
    }
}

/// Sigma: the value environment tracked by the symbolic engine. Updates
/// overwrite.
pub type ValueEnv = ScopeChain<Expr>;

/// Names to type expressions, consulted by the SMT bridge to pick sorts.
/// Updates overwrite.
pub type TypeMap = ScopeChain<TypeExpr>;

/// The generator-facing symbol table: an append-only scope plus ordered
/// children, one per API block of the specification (the producer
/// guarantees the child index matches the block index).
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    table: BTreeMap<String, TypeExpr>,
    children: Vec<SymbolTable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append-only bind; a duplicate name indicates a broken spec.
    pub fn bind(&mut self, name: impl Into<String>, ty: TypeExpr) -> Result<(), EnvError> {
        let name = name.into();
        if self.table.contains_key(&name) {
            return Err(EnvError::DuplicateBinding(name));
        }
        self.table.insert(name, ty);
        Ok(())
    }

    /// Membership in this scope only. Block-local renaming decisions hinge
    /// on exactly this, so globals are never consulted here.
    pub fn has(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeExpr> {
        self.table.get(name)
    }

    pub fn add_child(&mut self, child: SymbolTable) {
        self.children.push(child);
    }

    pub fn child(&self, index: usize) -> Option<&SymbolTable> {
        self.children.get(index)
    }

    pub fn children(&self) -> &[SymbolTable] {
        &self.children
    }

    /// Names bound in this scope, in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}
