//! Builtin operation registry.
//!
//! Builtins are declared and implemented separately. A [`Registry`] collects
//! [`BuiltinDecl`] signatures and host implementations keyed by the same name;
//! [`Registry::link`] checks that both tables agree and produces the
//! immutable [`Builtins`] table the interpreter calls into.
//!
//! Every call through [`Builtins::call`] is checked against the declared
//! signature: argument count, then each argument's kind, and finally the kind
//! of the returned value.

mod ops;

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::console::Console;
use crate::error::{InterpError, LinkageError};
use crate::value::{Value, ValueKind};

/// Names of the standard builtin operations.
pub mod names {
    pub const INT_ADD: &str = "__builtin_int_add";
    pub const INT_SUB: &str = "__builtin_int_sub";
    pub const INT_MUL: &str = "__builtin_int_mul";
    pub const INT_DIV: &str = "__builtin_int_div";
    pub const INT_MOD: &str = "__builtin_int_mod";
    pub const ANY_EQ: &str = "__builtin_any_eq";
    pub const ANY_NEQ: &str = "__builtin_any_neq";
    pub const INT_LEQ: &str = "__builtin_int_leq";
    pub const INT_GEQ: &str = "__builtin_int_geq";
    pub const INT_LT: &str = "__builtin_int_lt";
    pub const INT_GT: &str = "__builtin_int_gt";
    pub const INT_AND: &str = "__builtin_int_logical_and";
    pub const INT_OR: &str = "__builtin_int_logical_or";
    pub const CONCAT: &str = "concat";
    pub const PRINT: &str = "print";
    pub const READ: &str = "read";
    pub const STRING_TO_INT: &str = "string_to_int";
    pub const INT_TO_STRING: &str = "int_to_string";
    pub const CAN_CONVERT_TO_INT: &str = "can_convert_to_int";
    pub const ARRAY_LENGTH: &str = "array_length";
    pub const TIME: &str = "time";
}

/// Declared type of a builtin parameter or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    Int,
    Str,
    Array,
    /// Any kind, null included.
    Any,
}

impl Ty {
    pub fn accepts(self, kind: ValueKind) -> bool {
        match self {
            Ty::Any => true,
            Ty::Int => kind == ValueKind::Int,
            Ty::Str => kind == ValueKind::Str,
            Ty::Array => kind == ValueKind::Array,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ty::Int => "int",
            Ty::Str => "string",
            Ty::Array => "array",
            Ty::Any => "any",
        })
    }
}

/// Signature of a builtin operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDecl {
    pub name: String,
    pub ret: Ty,
    pub args: Vec<Ty>,
}

impl BuiltinDecl {
    pub fn new(name: &str, ret: Ty, args: &[Ty]) -> Self {
        Self {
            name: name.to_owned(),
            ret,
            args: args.to_vec(),
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for BuiltinDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// Host implementation of a builtin. Arguments have already been checked
/// against the declaration when it runs.
pub type BuiltinFn =
    Box<dyn Fn(&[Value], &mut Console) -> Result<Value, InterpError> + Send + Sync>;

/// Declarations and implementations before linking.
#[derive(Default)]
pub struct Registry {
    decls: Vec<BuiltinDecl>,
    impls: HashMap<String, BuiltinFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard catalog with all of its implementations registered.
    pub fn standard() -> Result<Self, LinkageError> {
        let mut registry = Self::with_standard_declarations()?;
        registry.register_standard_implementations();
        Ok(registry)
    }

    /// The standard signatures only, without implementations.
    pub fn with_standard_declarations() -> Result<Self, LinkageError> {
        let mut registry = Self::new();
        registry.declare_all(standard_declarations())?;
        Ok(registry)
    }

    /// Declare every signature in `decls`, stopping at the first duplicate.
    pub fn declare_all(
        &mut self,
        decls: impl IntoIterator<Item = BuiltinDecl>,
    ) -> Result<(), LinkageError> {
        decls.into_iter().try_for_each(|decl| self.declare(decl))
    }

    pub fn register_standard_implementations(&mut self) {
        ops::register_standard_fns(self);
    }

    pub fn declare(&mut self, decl: BuiltinDecl) -> Result<(), LinkageError> {
        if self.decls.iter().any(|d| d.name == decl.name) {
            return Err(LinkageError::DuplicateDeclaration { name: decl.name });
        }
        self.decls.push(decl);
        Ok(())
    }

    /// Bind `name` to a host implementation, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, imp: F)
    where
        F: Fn(&[Value], &mut Console) -> Result<Value, InterpError> + Send + Sync + 'static,
    {
        self.impls.insert(name.to_owned(), Box::new(imp));
    }

    /// Drop the implementation of `name`. Returns whether there was one.
    pub fn remove_implementation(&mut self, name: &str) -> bool {
        self.impls.remove(name).is_some()
    }

    pub fn declarations(&self) -> &[BuiltinDecl] {
        &self.decls
    }

    /// Pair every declaration with its implementation.
    ///
    /// Fails with every declared name that lacks an implementation and every
    /// implementation nobody declared, not just the first mismatch.
    pub fn link(mut self) -> Result<Builtins, LinkageError> {
        let missing: Vec<String> = self
            .decls
            .iter()
            .filter(|d| !self.impls.contains_key(&d.name))
            .map(|d| d.name.clone())
            .collect();
        let mut undeclared: Vec<String> = self
            .impls
            .keys()
            .filter(|name| !self.decls.iter().any(|d| &d.name == *name))
            .cloned()
            .collect();
        undeclared.sort();
        if !missing.is_empty() || !undeclared.is_empty() {
            return Err(LinkageError::Incomplete {
                missing,
                undeclared,
            });
        }

        let mut entries = HashMap::with_capacity(self.decls.len());
        for decl in self.decls {
            if let Some(imp) = self.impls.remove(&decl.name) {
                entries.insert(decl.name.clone(), Builtin { decl, imp });
            }
        }
        info!("Linked {} builtin operations", entries.len());
        Ok(Builtins { entries })
    }
}

struct Builtin {
    decl: BuiltinDecl,
    imp: BuiltinFn,
}

/// A linked, immutable builtin table.
pub struct Builtins {
    entries: HashMap<String, Builtin>,
}

impl fmt::Debug for Builtins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Builtins").field("entries", &names).finish()
    }
}

impl Builtins {
    pub fn decl(&self, name: &str) -> Option<&BuiltinDecl> {
        self.entries.get(name).map(|b| &b.decl)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke `name` with the declared contract enforced on both sides.
    pub fn call(
        &self,
        name: &str,
        args: &[Value],
        console: &mut Console,
    ) -> Result<Value, InterpError> {
        let builtin = self
            .entries
            .get(name)
            .ok_or_else(|| InterpError::UnknownBuiltin {
                name: name.to_owned(),
            })?;
        let decl = &builtin.decl;
        if args.len() != decl.arity() {
            return Err(InterpError::Arity {
                callee: format!("built-in operation {name}"),
                expected: decl.arity(),
                actual: args.len(),
            });
        }
        for (index, (arg, ty)) in args.iter().zip(&decl.args).enumerate() {
            if !ty.accepts(arg.kind()) {
                return Err(InterpError::Type {
                    op: name.to_owned(),
                    index,
                    expected: *ty,
                    actual: arg.kind(),
                });
            }
        }

        debug!("Calling builtin {}", decl);
        let result = (builtin.imp)(args, console)?;
        if !decl.ret.accepts(result.kind()) {
            return Err(InterpError::ContractViolation {
                op: name.to_owned(),
                promised: decl.ret,
                returned: result.kind(),
            });
        }
        Ok(result)
    }
}

fn standard_declarations() -> Vec<BuiltinDecl> {
    use Ty::*;
    use names::*;

    let mut decls = Vec::new();
    for name in [INT_ADD, INT_SUB, INT_MUL, INT_DIV, INT_MOD] {
        decls.push(BuiltinDecl::new(name, Int, &[Int, Int]));
    }
    for name in [ANY_EQ, ANY_NEQ] {
        decls.push(BuiltinDecl::new(name, Int, &[Any, Any]));
    }
    for name in [INT_LEQ, INT_GEQ, INT_LT, INT_GT, INT_AND, INT_OR] {
        decls.push(BuiltinDecl::new(name, Int, &[Int, Int]));
    }
    decls.extend([
        BuiltinDecl::new(CONCAT, Str, &[Str, Str]),
        BuiltinDecl::new(PRINT, Any, &[Any]),
        BuiltinDecl::new(READ, Str, &[]),
        BuiltinDecl::new(STRING_TO_INT, Int, &[Str]),
        BuiltinDecl::new(INT_TO_STRING, Str, &[Int]),
        BuiltinDecl::new(CAN_CONVERT_TO_INT, Int, &[Str]),
        BuiltinDecl::new(ARRAY_LENGTH, Int, &[Array]),
        BuiltinDecl::new(TIME, Int, &[]),
    ]);
    decls
}

static STANDARD: OnceLock<Result<Builtins, LinkageError>> = OnceLock::new();

/// The process-wide standard builtin table, linked on first use.
pub fn standard() -> Result<&'static Builtins, LinkageError> {
    STANDARD
        .get_or_init(|| Registry::standard().and_then(Registry::link))
        .as_ref()
        .map_err(Clone::clone)
}
