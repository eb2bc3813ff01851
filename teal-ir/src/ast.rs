//! Validated program tree.
//!
//! This is the hand-off format from the front end: names are already
//! resolved, so every variable says whether it is a local or which module's
//! global it is, and every call says which function or builtin it targets.
//! Lowering trusts these facts and only fails on references that do not
//! exist at all.

use std::collections::BTreeMap;

use crate::ir::{BinOp, SourceLocation};

/// Modules keyed by their identity, plus the module holding the entry point.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub modules: BTreeMap<String, Module>,
    pub root: String,
}

impl Program {
    pub fn new(root: &str) -> Self {
        Self {
            modules: BTreeMap::new(),
            root: root.to_owned(),
        }
    }

    pub fn module(mut self, id: &str, module: Module) -> Self {
        self.modules.insert(id.to_owned(), module);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub imports: Vec<String>,
    pub globals: Vec<GlobalDef>,
    pub functions: Vec<FunctionDef>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import(mut self, module: &str) -> Self {
        self.imports.push(module.to_owned());
        self
    }

    pub fn global(mut self, name: &str, init: Option<Expr>) -> Self {
        self.globals.push(GlobalDef {
            name: name.to_owned(),
            init,
            location: SourceLocation::Unknown,
        });
        self
    }

    pub fn function(mut self, name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        self.functions.push(FunctionDef {
            name: name.to_owned(),
            params: params.iter().map(|p| (*p).to_owned()).collect(),
            body,
        });
        self
    }
}

/// A module-level variable. Its initializer, if any, runs once before the
/// entry function.
#[derive(Debug, Clone)]
pub struct GlobalDef {
    pub name: String,
    pub init: Option<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Var {
    Local(String),
    Global { module: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Function { module: String, name: String },
    Builtin(String),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// Declare a local, null unless initialized.
    VarDecl { name: String, init: Option<Expr> },
    Assign { var: Var, value: Expr },
    AssignIndex { array: Expr, index: Expr, value: Expr },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While { cond: Expr, body: Vec<Stmt> },
    Return(Option<Expr>),
    Expr(Expr),
    /// Attach a source range to everything emitted for `stmt`.
    Located {
        location: SourceLocation,
        stmt: Box<Stmt>,
    },
}

impl Stmt {
    pub fn at(self, location: SourceLocation) -> Stmt {
        Stmt::Located {
            location,
            stmt: Box::new(self),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64),
    Str(String),
    Null,
    Var(Var),
    Call { target: Target, args: Vec<Expr> },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `[e0, e1, ...]`: a fresh array holding the element values.
    ArrayLit(Vec<Expr>),
    /// `array(n)`: a fresh array of `n` nulls.
    NewArray(Box<Expr>),
    Index { array: Box<Expr>, index: Box<Expr> },
}

// Shorthands for building trees by hand.

pub fn int(value: i64) -> Expr {
    Expr::Int(value)
}

pub fn string(value: &str) -> Expr {
    Expr::Str(value.to_owned())
}

pub fn local(name: &str) -> Expr {
    Expr::Var(Var::Local(name.to_owned()))
}

pub fn global(module: &str, name: &str) -> Expr {
    Expr::Var(Var::Global {
        module: module.to_owned(),
        name: name.to_owned(),
    })
}

pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

pub fn call(module: &str, name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        target: Target::Function {
            module: module.to_owned(),
            name: name.to_owned(),
        },
        args,
    }
}

pub fn builtin(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        target: Target::Builtin(name.to_owned()),
        args,
    }
}

pub fn index(array: Expr, index: Expr) -> Expr {
    Expr::Index {
        array: Box::new(array),
        index: Box::new(index),
    }
}

pub fn let_(name: &str, init: Expr) -> Stmt {
    Stmt::VarDecl {
        name: name.to_owned(),
        init: Some(init),
    }
}

pub fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        var: Var::Local(name.to_owned()),
        value,
    }
}

pub fn assign_global(module: &str, name: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        var: Var::Global {
            module: module.to_owned(),
            name: name.to_owned(),
        },
        value,
    }
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(Some(value))
}
