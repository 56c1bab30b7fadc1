//! Translation from constraint expressions to Z3.
//!
//! Every `SymVar(n)` becomes an integer constant `X{n}`. Free named
//! variables are declared on first use with a sort derived from the type
//! map (unrecorded names default to integer). Sets use Z3's array-of-bool
//! set theory, maps the plain array theory, and sequence operations run
//! over the string sort via the sequence theory.
//!
//! Known limitations: tuples are not translatable, map-valued
//! `union` is not expressible in the array theory used, and key membership
//! over a map whose entries are not statically known collapses to `true`
//! (exact translation needs a domain-tracking map representation).

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;
use z3::ast::{Array, Ast, Bool, Dynamic, Int, Set as ZSet, String as ZString};
use z3::{Context, Sort as Z3Sort};

use apitest_lang::{Call, Expr, TypeExpr, TypeMap};

use crate::error::{SmtError, SmtResult};

/// Sort of an SMT constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sort {
    Bool,
    Int,
    Str,
    Set(Box<Sort>),
    Map(Box<Sort>, Box<Sort>),
}

impl Sort {
    /// Derives the sort for a declared type. Unrecognized base types
    /// default to integer.
    pub fn from_type(ty: &TypeExpr) -> SmtResult<Sort> {
        match ty {
            TypeExpr::Const(name) => Ok(match name.as_str() {
                "string" | "str" => Sort::Str,
                "bool" | "boolean" => Sort::Bool,
                _ => Sort::Int,
            }),
            TypeExpr::Set(element) => Ok(Sort::Set(Box::new(Sort::from_type(element)?))),
            TypeExpr::Map { domain, range } => Ok(Sort::Map(
                Box::new(Sort::from_type(domain)?),
                Box::new(Sort::from_type(range)?),
            )),
            TypeExpr::Tuple(_) => Err(SmtError::Unsupported(
                "tuple-typed constants are not translatable".into(),
            )),
            TypeExpr::Func { .. } => Err(SmtError::Unsupported(
                "function-typed constants are not translatable".into(),
            )),
        }
    }

    fn to_z3<'ctx>(&self, ctx: &'ctx Context) -> Z3Sort<'ctx> {
        match self {
            Sort::Bool => Z3Sort::bool(ctx),
            Sort::Int => Z3Sort::int(ctx),
            Sort::Str => Z3Sort::string(ctx),
            Sort::Set(element) => Z3Sort::set(ctx, &element.to_z3(ctx)),
            Sort::Map(domain, range) => Z3Sort::array(ctx, &domain.to_z3(ctx), &range.to_z3(ctx)),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => f.write_str("Bool"),
            Sort::Int => f.write_str("Int"),
            Sort::Str => f.write_str("String"),
            Sort::Set(element) => write!(f, "Set<{element}>"),
            Sort::Map(domain, range) => write!(f, "Map<{domain}, {range}>"),
        }
    }
}

/// A translated expression, tagged with its Z3 representation.
#[derive(Debug, Clone)]
pub enum Term<'ctx> {
    Bool(Bool<'ctx>),
    Int(Int<'ctx>),
    Str(ZString<'ctx>),
    Set { ast: ZSet<'ctx>, elem: Sort },
    Map { ast: Array<'ctx>, domain: Sort, range: Sort },
}

impl<'ctx> Term<'ctx> {
    pub fn sort(&self) -> Sort {
        match self {
            Term::Bool(_) => Sort::Bool,
            Term::Int(_) => Sort::Int,
            Term::Str(_) => Sort::Str,
            Term::Set { elem, .. } => Sort::Set(Box::new(elem.clone())),
            Term::Map { domain, range, .. } => {
                Sort::Map(Box::new(domain.clone()), Box::new(range.clone()))
            }
        }
    }

    fn to_dynamic(&self) -> Dynamic<'ctx> {
        match self {
            Term::Bool(b) => Dynamic::from_ast(b),
            Term::Int(i) => Dynamic::from_ast(i),
            Term::Str(s) => Dynamic::from_ast(s),
            Term::Set { ast, .. } => Dynamic::from_ast(ast),
            Term::Map { ast, .. } => Dynamic::from_ast(ast),
        }
    }
}

/// Translator from constraint expressions to Z3 AST.
pub struct Translator<'ctx, 'a> {
    ctx: &'ctx Context,
    types: &'a TypeMap,
    /// Declared constants: name -> (sort, Z3 constant), in name order.
    vars: BTreeMap<String, (Sort, Term<'ctx>)>,
    /// Counter for fresh helper constants (empty-map defaults).
    aux: u32,
}

impl<'ctx, 'a> Translator<'ctx, 'a> {
    pub fn new(ctx: &'ctx Context, types: &'a TypeMap) -> Self {
        Translator {
            ctx,
            types,
            vars: BTreeMap::new(),
            aux: 0,
        }
    }

    /// The constants declared so far, keyed and iterated by name.
    pub fn vars(&self) -> &BTreeMap<String, (Sort, Term<'ctx>)> {
        &self.vars
    }

    /// Translates a constraint that must come out boolean.
    pub fn translate_bool(&mut self, expr: &Expr) -> SmtResult<Bool<'ctx>> {
        match self.translate(expr)? {
            Term::Bool(b) => Ok(b),
            other => Err(SmtError::TypeMismatch {
                op: "constraint".into(),
                expected: "Bool".into(),
                actual: other.sort().to_string(),
            }),
        }
    }

    /// Translates any expression to a sorted term.
    pub fn translate(&mut self, expr: &Expr) -> SmtResult<Term<'ctx>> {
        match expr {
            Expr::Var(name) => self.var_term(name),
            Expr::Num(value) => Ok(Term::Int(Int::from_i64(self.ctx, *value))),
            Expr::String(value) => ZString::from_str(self.ctx, value)
                .map(Term::Str)
                .map_err(|_| SmtError::Unsupported("string literal with NUL byte".into())),
            Expr::SymVar(id) => Ok(Term::Int(self.symvar(*id))),
            Expr::Set(elements) => self.set_literal(elements),
            Expr::Map(entries) => self.map_literal(entries),
            Expr::Tuple(_) => Err(SmtError::Unsupported(
                "tuple translation requires datatype support".into(),
            )),
            Expr::Input => Err(SmtError::Unsupported(
                "unresolved input slot in constraint".into(),
            )),
            Expr::Call(call) => self.call(call),
        }
    }

    /// Declares (or reuses) the integer constant `X{id}` for a symbolic
    /// variable.
    fn symvar(&mut self, id: u32) -> Int<'ctx> {
        let name = format!("X{id}");
        if let Some((_, Term::Int(i))) = self.vars.get(&name) {
            return i.clone();
        }
        let constant = Int::new_const(self.ctx, name.as_str());
        self.vars
            .insert(name, (Sort::Int, Term::Int(constant.clone())));
        constant
    }

    /// Declares (or reuses) a named constant, sorted via the type map.
    fn var_term(&mut self, name: &str) -> SmtResult<Term<'ctx>> {
        if let Some((_, term)) = self.vars.get(name) {
            return Ok(term.clone());
        }
        let sort = match self.types.lookup(name) {
            Some(ty) => Sort::from_type(ty)?,
            None => Sort::Int,
        };
        let term = match &sort {
            Sort::Bool => Term::Bool(Bool::new_const(self.ctx, name)),
            Sort::Int => Term::Int(Int::new_const(self.ctx, name)),
            Sort::Str => Term::Str(ZString::new_const(self.ctx, name)),
            Sort::Set(element) => Term::Set {
                ast: ZSet::new_const(self.ctx, name, &element.to_z3(self.ctx)),
                elem: (**element).clone(),
            },
            Sort::Map(domain, range) => Term::Map {
                ast: Array::new_const(
                    self.ctx,
                    name,
                    &domain.to_z3(self.ctx),
                    &range.to_z3(self.ctx),
                ),
                domain: (**domain).clone(),
                range: (**range).clone(),
            },
        };
        self.vars.insert(name.into(), (sort, term.clone()));
        Ok(term)
    }

    fn set_literal(&mut self, elements: &[Expr]) -> SmtResult<Term<'ctx>> {
        if elements.is_empty() {
            return Ok(Term::Set {
                ast: ZSet::empty(self.ctx, &Sort::Int.to_z3(self.ctx)),
                elem: Sort::Int,
            });
        }
        let first = self.translate(&elements[0])?;
        let elem = first.sort();
        let mut ast =
            ZSet::empty(self.ctx, &elem.to_z3(self.ctx)).add(&first.to_dynamic());
        for element in &elements[1..] {
            let term = self.translate(element)?;
            if term.sort() != elem {
                return Err(SmtError::TypeMismatch {
                    op: "set literal".into(),
                    expected: elem.to_string(),
                    actual: term.sort().to_string(),
                });
            }
            ast = ast.add(&term.to_dynamic());
        }
        Ok(Term::Set { ast, elem })
    }

    fn map_literal(&mut self, entries: &[(Expr, Expr)]) -> SmtResult<Term<'ctx>> {
        // The empty map defaults to string keys and values.
        let (domain, range, translated) = match entries.first() {
            None => (Sort::Str, Sort::Str, Vec::new()),
            Some((first_key, first_value)) => {
                let key = self.translate(first_key)?;
                let value = self.translate(first_value)?;
                let (domain, range) = (key.sort(), value.sort());
                let mut translated = vec![(key, value)];
                for (k, v) in &entries[1..] {
                    let key = self.translate(k)?;
                    let value = self.translate(v)?;
                    if key.sort() != domain || value.sort() != range {
                        return Err(SmtError::TypeMismatch {
                            op: "map literal".into(),
                            expected: format!("{domain} -> {range}"),
                            actual: format!("{} -> {}", key.sort(), value.sort()),
                        });
                    }
                    translated.push((key, value));
                }
                (domain, range, translated)
            }
        };

        let default = self.fresh_default(&range)?;
        let mut ast = Array::const_array(self.ctx, &domain.to_z3(self.ctx), &default);
        for (key, value) in &translated {
            ast = ast.store(&key.to_dynamic(), &value.to_dynamic());
        }
        Ok(Term::Map { ast, domain, range })
    }

    /// A fresh unconstrained constant standing for the out-of-domain value
    /// of a map.
    fn fresh_default(&mut self, sort: &Sort) -> SmtResult<Dynamic<'ctx>> {
        let name = format!("_default{}", self.aux);
        self.aux += 1;
        Ok(match sort {
            Sort::Bool => Dynamic::from_ast(&Bool::new_const(self.ctx, name.as_str())),
            Sort::Int => Dynamic::from_ast(&Int::new_const(self.ctx, name.as_str())),
            Sort::Str => Dynamic::from_ast(&ZString::new_const(self.ctx, name.as_str())),
            Sort::Set(_) | Sort::Map(..) => {
                return Err(SmtError::Unsupported(
                    "collection-valued map range".into(),
                ))
            }
        })
    }

    fn call(&mut self, call: &Call) -> SmtResult<Term<'ctx>> {
        let name = call.name.as_str();
        match name {
            // Arithmetic
            "Add" => {
                let (l, r) = self.int_pair(call)?;
                Ok(Term::Int(Int::add(self.ctx, &[&l, &r])))
            }
            "Sub" => {
                let (l, r) = self.int_pair(call)?;
                Ok(Term::Int(Int::sub(self.ctx, &[&l, &r])))
            }
            "Mul" => {
                let (l, r) = self.int_pair(call)?;
                Ok(Term::Int(Int::mul(self.ctx, &[&l, &r])))
            }
            "Div" => {
                let (l, r) = self.int_pair(call)?;
                Ok(Term::Int(l.div(&r)))
            }

            // Comparison
            "Eq" | "=" | "==" => self.equality(call).map(Term::Bool),
            "Neq" | "!=" | "<>" => self.equality(call).map(|eq| Term::Bool(eq.not())),
            "Lt" | "<" => {
                let (l, r) = self.int_pair(call)?;
                Ok(Term::Bool(l.lt(&r)))
            }
            "Gt" | ">" => {
                let (l, r) = self.int_pair(call)?;
                Ok(Term::Bool(l.gt(&r)))
            }
            "Le" | "<=" => {
                let (l, r) = self.int_pair(call)?;
                Ok(Term::Bool(l.le(&r)))
            }
            "Ge" | ">=" => {
                let (l, r) = self.int_pair(call)?;
                Ok(Term::Bool(l.ge(&r)))
            }

            // Boolean
            "And" | "and" | "&&" => {
                let (l, r) = self.bool_pair(call)?;
                Ok(Term::Bool(Bool::and(self.ctx, &[&l, &r])))
            }
            "Or" | "or" | "||" => {
                let (l, r) = self.bool_pair(call)?;
                Ok(Term::Bool(Bool::or(self.ctx, &[&l, &r])))
            }
            "Not" | "not" | "!" => {
                self.expect_arity(call, 1)?;
                let inner = self.operand_bool(call, 0)?;
                Ok(Term::Bool(inner.not()))
            }
            "Implies" => {
                let (l, r) = self.bool_pair(call)?;
                Ok(Term::Bool(l.implies(&r)))
            }

            // Membership
            "in" | "member" | "contains" => self.membership(call, false).map(Term::Bool),
            "not_in" | "not_member" | "not_contains" => {
                self.membership(call, true).map(Term::Bool)
            }

            // Set operations
            "union" => {
                let (l, r) = self.set_pair(call)?;
                let (a, elem) = l;
                let (b, _) = r;
                Ok(Term::Set {
                    ast: ZSet::set_union(self.ctx, &[&a, &b]),
                    elem,
                })
            }
            "intersection" | "intersect" => {
                let (l, r) = self.set_pair(call)?;
                let (a, elem) = l;
                let (b, _) = r;
                Ok(Term::Set {
                    ast: ZSet::intersect(self.ctx, &[&a, &b]),
                    elem,
                })
            }
            "difference" | "diff" | "minus" => {
                let (l, r) = self.set_pair(call)?;
                let (a, elem) = l;
                let (b, _) = r;
                Ok(Term::Set {
                    ast: a.difference(&b),
                    elem,
                })
            }
            "subset" | "is_subset" => {
                let (l, r) = self.set_pair(call)?;
                Ok(Term::Bool(l.0.set_subset(&r.0)))
            }
            "add_to_set" | "remove_from_set" => {
                self.expect_arity(call, 2)?;
                let set = self.operand_set(call, 0)?;
                let element = self.translate(&call.args[1])?;
                if element.sort() != set.1 {
                    return Err(SmtError::TypeMismatch {
                        op: name.into(),
                        expected: set.1.to_string(),
                        actual: element.sort().to_string(),
                    });
                }
                let ast = if name == "add_to_set" {
                    set.0.add(&element.to_dynamic())
                } else {
                    set.0.del(&element.to_dynamic())
                };
                Ok(Term::Set { ast, elem: set.1 })
            }
            "is_empty_set" => {
                self.expect_arity(call, 1)?;
                let (set, elem) = self.operand_set(call, 0)?;
                let empty = ZSet::empty(self.ctx, &elem.to_z3(self.ctx));
                Ok(Term::Bool(set._eq(&empty)))
            }

            // Map operations
            "get" | "lookup" | "select" => {
                self.expect_arity(call, 2)?;
                let (map, _, range) = self.operand_map(call, 0)?;
                let key = self.translate(&call.args[1])?;
                let selected = map.select(&key.to_dynamic());
                self.dynamic_to_term(selected, &range)
            }
            "put" | "store" | "update" => {
                self.expect_arity(call, 3)?;
                let (map, domain, range) = self.operand_map(call, 0)?;
                let key = self.translate(&call.args[1])?;
                let value = self.translate(&call.args[2])?;
                if value.sort() != range {
                    return Err(SmtError::TypeMismatch {
                        op: name.into(),
                        expected: range.to_string(),
                        actual: value.sort().to_string(),
                    });
                }
                Ok(Term::Map {
                    ast: map.store(&key.to_dynamic(), &value.to_dynamic()),
                    domain,
                    range,
                })
            }
            "contains_key" | "has_key" => self.key_membership(call).map(Term::Bool),

            // Sequence operations, over the string sort
            "concat" | "append_list" => {
                self.expect_arity(call, 2)?;
                let l = self.operand_str(call, 0)?;
                let r = self.operand_str(call, 1)?;
                Ok(Term::Str(ZString::concat(self.ctx, &[&l, &r])))
            }
            "length" => {
                self.expect_arity(call, 1)?;
                let s = self.operand_str(call, 0)?;
                Ok(Term::Int(s.length()))
            }
            "at" | "nth" => {
                self.expect_arity(call, 2)?;
                let s = self.operand_str(call, 0)?;
                let index = self.operand_int(call, 1)?;
                Ok(Term::Str(s.at(&index)))
            }
            "prefix" => {
                self.expect_arity(call, 2)?;
                let l = self.operand_str(call, 0)?;
                let r = self.operand_str(call, 1)?;
                Ok(Term::Bool(l.prefix(&r)))
            }
            "suffix" => {
                self.expect_arity(call, 2)?;
                let l = self.operand_str(call, 0)?;
                let r = self.operand_str(call, 1)?;
                Ok(Term::Bool(l.suffix(&r)))
            }
            "contains_seq" => {
                self.expect_arity(call, 2)?;
                let s = self.operand_str(call, 0)?;
                let needle = self.operand_str(call, 1)?;
                Ok(Term::Bool(s.contains(&needle)))
            }

            // Registers its argument as a free constant, constrains nothing.
            "Any" | "any" => {
                self.expect_arity(call, 1)?;
                self.translate(&call.args[0])?;
                Ok(Term::Bool(Bool::from_bool(self.ctx, true)))
            }

            "input" => Err(SmtError::Unsupported(
                "unresolved input slot in constraint".into(),
            )),
            "'" => Err(SmtError::Unsupported(
                "prime marker outside a postcondition".into(),
            )),

            other => Err(SmtError::UnknownOperator(other.into())),
        }
    }

    /// `in`/`not_in` over sets and maps. Map literals translate exactly as
    /// a key-equality disjunction; a map with unknown entries collapses to
    /// `true` either way (domain tracking limitation).
    fn membership(&mut self, call: &Call, negate: bool) -> SmtResult<Bool<'ctx>> {
        self.expect_arity(call, 2)?;
        if let Expr::Map(entries) = &call.args[1] {
            let membership = self.literal_key_membership(&call.args[0], entries)?;
            return Ok(if negate { membership.not() } else { membership });
        }
        let collection = self.translate(&call.args[1])?;
        match collection {
            Term::Set { ast, .. } => {
                let element = self.translate(&call.args[0])?;
                let membership = ast.member(&element.to_dynamic());
                Ok(if negate { membership.not() } else { membership })
            }
            Term::Map { .. } => {
                debug!(op = %call.name, "membership over untracked map domain; assuming true");
                Ok(Bool::from_bool(self.ctx, true))
            }
            other => Err(SmtError::TypeMismatch {
                op: call.name.clone(),
                expected: "Set or Map".into(),
                actual: other.sort().to_string(),
            }),
        }
    }

    fn key_membership(&mut self, call: &Call) -> SmtResult<Bool<'ctx>> {
        self.expect_arity(call, 2)?;
        if let Expr::Map(entries) = &call.args[1] {
            return self.literal_key_membership(&call.args[0], entries);
        }
        let collection = self.translate(&call.args[1])?;
        match collection {
            Term::Map { .. } => {
                debug!(op = %call.name, "key lookup over untracked map domain; assuming true");
                Ok(Bool::from_bool(self.ctx, true))
            }
            other => Err(SmtError::TypeMismatch {
                op: call.name.clone(),
                expected: "Map".into(),
                actual: other.sort().to_string(),
            }),
        }
    }

    /// Key membership over a statically known entry list: a disjunction of
    /// key equalities, `false` for the empty map.
    fn literal_key_membership(
        &mut self,
        element: &Expr,
        entries: &[(Expr, Expr)],
    ) -> SmtResult<Bool<'ctx>> {
        let needle = self.translate(element)?;
        let mut arms = Vec::new();
        for (key, _) in entries {
            let key = self.translate(key)?;
            arms.push(self.term_eq(&needle, &key, "in")?);
        }
        if arms.is_empty() {
            return Ok(Bool::from_bool(self.ctx, false));
        }
        let refs: Vec<&Bool<'ctx>> = arms.iter().collect();
        Ok(Bool::or(self.ctx, &refs))
    }

    fn equality(&mut self, call: &Call) -> SmtResult<Bool<'ctx>> {
        self.expect_arity(call, 2)?;
        let l = self.translate(&call.args[0])?;
        let r = self.translate(&call.args[1])?;
        self.term_eq(&l, &r, &call.name)
    }

    fn term_eq(&self, l: &Term<'ctx>, r: &Term<'ctx>, op: &str) -> SmtResult<Bool<'ctx>> {
        match (l, r) {
            (Term::Bool(a), Term::Bool(b)) => Ok(a._eq(b)),
            (Term::Int(a), Term::Int(b)) => Ok(a._eq(b)),
            (Term::Str(a), Term::Str(b)) => Ok(a._eq(b)),
            (Term::Set { ast: a, .. }, Term::Set { ast: b, .. }) => Ok(a._eq(b)),
            (Term::Map { ast: a, .. }, Term::Map { ast: b, .. }) => Ok(a._eq(b)),
            _ => Err(SmtError::TypeMismatch {
                op: op.into(),
                expected: l.sort().to_string(),
                actual: r.sort().to_string(),
            }),
        }
    }

    fn expect_arity(&self, call: &Call, expected: usize) -> SmtResult<()> {
        if call.args.len() != expected {
            return Err(SmtError::Arity {
                op: call.name.clone(),
                expected,
                actual: call.args.len(),
            });
        }
        Ok(())
    }

    fn operand_bool(&mut self, call: &Call, index: usize) -> SmtResult<Bool<'ctx>> {
        match self.translate(&call.args[index])? {
            Term::Bool(b) => Ok(b),
            other => Err(SmtError::TypeMismatch {
                op: call.name.clone(),
                expected: "Bool".into(),
                actual: other.sort().to_string(),
            }),
        }
    }

    fn operand_int(&mut self, call: &Call, index: usize) -> SmtResult<Int<'ctx>> {
        match self.translate(&call.args[index])? {
            Term::Int(i) => Ok(i),
            other => Err(SmtError::TypeMismatch {
                op: call.name.clone(),
                expected: "Int".into(),
                actual: other.sort().to_string(),
            }),
        }
    }

    fn operand_str(&mut self, call: &Call, index: usize) -> SmtResult<ZString<'ctx>> {
        match self.translate(&call.args[index])? {
            Term::Str(s) => Ok(s),
            other => Err(SmtError::TypeMismatch {
                op: call.name.clone(),
                expected: "String".into(),
                actual: other.sort().to_string(),
            }),
        }
    }

    fn operand_set(&mut self, call: &Call, index: usize) -> SmtResult<(ZSet<'ctx>, Sort)> {
        match self.translate(&call.args[index])? {
            Term::Set { ast, elem } => Ok((ast, elem)),
            other => Err(SmtError::TypeMismatch {
                op: call.name.clone(),
                expected: "Set".into(),
                actual: other.sort().to_string(),
            }),
        }
    }

    fn operand_map(&mut self, call: &Call, index: usize) -> SmtResult<(Array<'ctx>, Sort, Sort)> {
        match self.translate(&call.args[index])? {
            Term::Map { ast, domain, range } => Ok((ast, domain, range)),
            other => Err(SmtError::TypeMismatch {
                op: call.name.clone(),
                expected: "Map".into(),
                actual: other.sort().to_string(),
            }),
        }
    }

    fn int_pair(&mut self, call: &Call) -> SmtResult<(Int<'ctx>, Int<'ctx>)> {
        self.expect_arity(call, 2)?;
        Ok((self.operand_int(call, 0)?, self.operand_int(call, 1)?))
    }

    fn bool_pair(&mut self, call: &Call) -> SmtResult<(Bool<'ctx>, Bool<'ctx>)> {
        self.expect_arity(call, 2)?;
        Ok((self.operand_bool(call, 0)?, self.operand_bool(call, 1)?))
    }

    #[allow(clippy::type_complexity)]
    fn set_pair(&mut self, call: &Call) -> SmtResult<((ZSet<'ctx>, Sort), (ZSet<'ctx>, Sort))> {
        self.expect_arity(call, 2)?;
        let l = self.operand_set(call, 0)?;
        let r = self.operand_set(call, 1)?;
        if l.1 != r.1 {
            return Err(SmtError::TypeMismatch {
                op: call.name.clone(),
                expected: format!("Set<{}>", l.1),
                actual: format!("Set<{}>", r.1),
            });
        }
        Ok((l, r))
    }

    fn dynamic_to_term(&self, value: Dynamic<'ctx>, sort: &Sort) -> SmtResult<Term<'ctx>> {
        match sort {
            Sort::Bool => value.as_bool().map(Term::Bool),
            Sort::Int => value.as_int().map(Term::Int),
            Sort::Str => value.as_string().map(Term::Str),
            Sort::Set(_) | Sort::Map(..) => {
                return Err(SmtError::Unsupported(
                    "collection-valued map lookup".into(),
                ))
            }
        }
        .ok_or_else(|| SmtError::TypeMismatch {
            op: "select".into(),
            expected: sort.to_string(),
            actual: "unsorted value".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apitest_lang::ScopeChain;
    use z3::{Config, Context, SatResult, Solver as Z3SolverHandle};

    fn check(expr: &Expr, types: &TypeMap) -> SatResult {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let mut translator = Translator::new(&ctx, types);
        let formula = translator.translate_bool(expr).unwrap();
        let solver = Z3SolverHandle::new(&ctx);
        solver.assert(&formula);
        solver.check()
    }

    fn no_types() -> TypeMap {
        ScopeChain::new()
    }

    #[test]
    fn symvar_constraint_is_sat() {
        // X0 > 5
        let expr = Expr::binop("Gt", Expr::SymVar(0), Expr::Num(5));
        assert_eq!(check(&expr, &no_types()), SatResult::Sat);
    }

    #[test]
    fn contradictory_bounds_are_unsat() {
        let expr = Expr::binop(
            "And",
            Expr::binop("Gt", Expr::SymVar(0), Expr::Num(5)),
            Expr::binop("Lt", Expr::SymVar(0), Expr::Num(3)),
        );
        assert_eq!(check(&expr, &no_types()), SatResult::Unsat);
    }

    #[test]
    fn symvars_share_identity_across_occurrences() {
        // X0 = 3 /\ X0 = 4 must be unsat because both occurrences are the
        // same constant.
        let expr = Expr::binop(
            "And",
            Expr::binop("Eq", Expr::SymVar(0), Expr::Num(3)),
            Expr::binop("Eq", Expr::SymVar(0), Expr::Num(4)),
        );
        assert_eq!(check(&expr, &no_types()), SatResult::Unsat);
    }

    #[test]
    fn set_membership_constrains_element() {
        // in(x, {10, 20, 30}) /\ x > 15 is sat only for 20 or 30.
        let members = Expr::Set(vec![Expr::Num(10), Expr::Num(20), Expr::Num(30)]);
        let expr = Expr::binop(
            "And",
            Expr::binop("in", Expr::var("x"), members.clone()),
            Expr::binop("Gt", Expr::var("x"), Expr::Num(15)),
        );
        assert_eq!(check(&expr, &no_types()), SatResult::Sat);

        let too_high = Expr::binop(
            "And",
            Expr::binop("in", Expr::var("x"), members),
            Expr::binop("Gt", Expr::var("x"), Expr::Num(30)),
        );
        assert_eq!(check(&too_high, &no_types()), SatResult::Unsat);
    }

    #[test]
    fn set_algebra_laws_hold() {
        // subset({1}, union({1}, {2})) is valid.
        let union = Expr::binop(
            "union",
            Expr::Set(vec![Expr::Num(1)]),
            Expr::Set(vec![Expr::Num(2)]),
        );
        let subset = Expr::binop("subset", Expr::Set(vec![Expr::Num(1)]), union);
        assert_eq!(check(&subset, &no_types()), SatResult::Sat);
        assert_eq!(
            check(&Expr::call("Not", vec![subset]), &no_types()),
            SatResult::Unsat
        );

        // remove_from_set(add_to_set({}, 7), 7) is empty.
        let added = Expr::binop("add_to_set", Expr::Set(vec![]), Expr::Num(7));
        let removed = Expr::binop("remove_from_set", added, Expr::Num(7));
        let empty = Expr::call("is_empty_set", vec![removed]);
        assert_eq!(check(&empty, &no_types()), SatResult::Sat);
        assert_eq!(
            check(&Expr::call("Not", vec![empty]), &no_types()),
            SatResult::Unsat
        );
    }

    #[test]
    fn string_typed_variable_uses_string_sort() {
        let mut types = no_types();
        types.insert("s", apitest_lang::TypeExpr::named("string"));
        let expr = Expr::binop("Eq", Expr::var("s"), Expr::str("hello"));
        assert_eq!(check(&expr, &types), SatResult::Sat);

        let contradiction = Expr::binop(
            "And",
            Expr::binop("Eq", Expr::var("s"), Expr::str("a")),
            Expr::binop("Eq", Expr::var("s"), Expr::str("b")),
        );
        assert_eq!(check(&contradiction, &types), SatResult::Unsat);
    }

    #[test]
    fn map_store_then_select_round_trips() {
        // get(put({k -> 1}, k, 5), k) = 5 is valid.
        let literal = Expr::Map(vec![(Expr::var("k"), Expr::Num(1))]);
        let stored = Expr::call("put", vec![literal, Expr::var("k"), Expr::Num(5)]);
        let selected = Expr::binop("get", stored, Expr::var("k"));
        let eq = Expr::binop("Eq", selected, Expr::Num(5));
        assert_eq!(check(&eq, &no_types()), SatResult::Sat);
        assert_eq!(
            check(&Expr::call("Not", vec![eq]), &no_types()),
            SatResult::Unsat
        );
    }

    #[test]
    fn literal_map_key_membership_is_exact() {
        // not_in(x, {}) is valid; in(x, {}) is unsat.
        let empty = Expr::Map(vec![]);
        assert_eq!(
            check(
                &Expr::binop("not_in", Expr::var("x"), empty.clone()),
                &no_types()
            ),
            SatResult::Sat
        );
        assert_eq!(
            check(&Expr::binop("in", Expr::var("x"), empty), &no_types()),
            SatResult::Unsat
        );

        // contains_key({k -> 1}, k) is valid.
        let literal = Expr::Map(vec![(Expr::var("k"), Expr::Num(1))]);
        let has = Expr::binop("contains_key", literal, Expr::var("k"));
        assert_eq!(
            check(&Expr::call("Not", vec![has]), &no_types()),
            SatResult::Unsat
        );
    }

    #[test]
    fn sequence_predicates_hold_on_literals() {
        // prefix("ab", "abc"), suffix("bc", "abc") and
        // contains_seq("abc", "b") are all valid.
        let abc = Expr::str("abc");
        for formula in [
            Expr::binop("prefix", Expr::str("ab"), abc.clone()),
            Expr::binop("suffix", Expr::str("bc"), abc.clone()),
            Expr::binop("contains_seq", abc.clone(), Expr::str("b")),
        ] {
            assert_eq!(check(&formula, &no_types()), SatResult::Sat);
            assert_eq!(
                check(&Expr::call("Not", vec![formula]), &no_types()),
                SatResult::Unsat
            );
        }
        // prefix("bc", "abc") is unsatisfiable.
        let wrong = Expr::binop("prefix", Expr::str("bc"), abc);
        assert_eq!(check(&wrong, &no_types()), SatResult::Unsat);
    }

    #[test]
    fn sequence_length_and_indexing_translate() {
        // length(concat("ab", "c")) = 3 is valid.
        let concat = Expr::binop("concat", Expr::str("ab"), Expr::str("c"));
        let len_eq = Expr::binop(
            "Eq",
            Expr::call("length", vec![concat]),
            Expr::Num(3),
        );
        assert_eq!(
            check(&Expr::call("Not", vec![len_eq]), &no_types()),
            SatResult::Unsat
        );

        // at("abc", 1) = "b" is valid.
        let at_eq = Expr::binop(
            "Eq",
            Expr::binop("at", Expr::str("abc"), Expr::Num(1)),
            Expr::str("b"),
        );
        assert_eq!(
            check(&Expr::call("Not", vec![at_eq]), &no_types()),
            SatResult::Unsat
        );
    }

    #[test]
    fn sequence_constraints_shape_free_string_variables() {
        let mut types = no_types();
        types.insert("s", apitest_lang::TypeExpr::named("string"));
        // length(s) = 3 /\ prefix("ab", s) is satisfiable.
        let formula = Expr::binop(
            "And",
            Expr::binop("Eq", Expr::call("length", vec![Expr::var("s")]), Expr::Num(3)),
            Expr::binop("prefix", Expr::str("ab"), Expr::var("s")),
        );
        assert_eq!(check(&formula, &types), SatResult::Sat);

        // ...but not together with an incompatible exact value.
        let contradiction = Expr::binop(
            "And",
            formula,
            Expr::binop("Eq", Expr::var("s"), Expr::str("xyz")),
        );
        assert_eq!(check(&contradiction, &types), SatResult::Unsat);
    }

    #[test]
    fn any_registers_argument_without_constraining() {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let types = no_types();
        let mut translator = Translator::new(&ctx, &types);
        let formula = translator
            .translate_bool(&Expr::call("Any", vec![Expr::var("x")]))
            .unwrap();
        assert!(translator.vars().contains_key("x"));
        let solver = Z3SolverHandle::new(&ctx);
        solver.assert(&formula);
        assert_eq!(solver.check(), SatResult::Sat);
    }

    #[test]
    fn unknown_operator_is_fatal() {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let types = no_types();
        let mut translator = Translator::new(&ctx, &types);
        let err = translator
            .translate_bool(&Expr::call("frobnicate", vec![Expr::Num(1)]))
            .unwrap_err();
        assert_eq!(err, SmtError::UnknownOperator("frobnicate".into()));
    }

    #[test]
    fn tuples_and_bad_arity_are_rejected() {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let types = no_types();
        let mut translator = Translator::new(&ctx, &types);

        let tuple = Expr::Tuple(vec![Expr::Num(1)]);
        assert!(matches!(
            translator.translate(&tuple),
            Err(SmtError::Unsupported(_))
        ));

        let lopsided = Expr::call("And", vec![Expr::binop("Eq", Expr::Num(1), Expr::Num(1))]);
        assert_eq!(
            translator.translate_bool(&lopsided).unwrap_err(),
            SmtError::Arity {
                op: "And".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn alias_spellings_translate() {
        let expr = Expr::binop(
            "&&",
            Expr::binop("<>", Expr::SymVar(0), Expr::Num(1)),
            Expr::binop(">=", Expr::SymVar(0), Expr::Num(10)),
        );
        assert_eq!(check(&expr, &no_types()), SatResult::Sat);
    }

    #[test]
    fn declared_variables_are_recorded_in_name_order() {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let types = no_types();
        let mut translator = Translator::new(&ctx, &types);
        let expr = Expr::binop(
            "And",
            Expr::binop("Gt", Expr::var("b"), Expr::Num(0)),
            Expr::binop("Gt", Expr::var("a"), Expr::SymVar(0)),
        );
        translator.translate_bool(&expr).unwrap();
        let names: Vec<&str> = translator.vars().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["X0", "a", "b"]);
    }
}
