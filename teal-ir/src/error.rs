//! Error taxonomy.
//!
//! Three families of failures exist and they never mix:
//!
//! - [`StructuralError`]: a violated IR invariant. Raised while building or
//!   editing IR, always a defect of lowering or of a transformation.
//! - [`LinkageError`]: the builtin catalog and its implementations disagree.
//!   Raised once, while linking the registry; nothing can be evaluated after it.
//! - [`InterpError`]: a runtime failure. Raised during evaluation and unwinds
//!   every active frame.

use thiserror::Error;

use crate::builtins::Ty;
use crate::ir::{BlockId, InsnId, ModuleIdx};
use crate::value::ValueKind;

/// Umbrella error for callers that lower and evaluate in one go.
#[derive(Debug, Error)]
pub enum Error {
    #[error("[structure] {0}")]
    Structural(#[from] StructuralError),

    #[error("[linkage] {0}")]
    Linkage(#[from] LinkageError),

    #[error("[lowering] {0}")]
    Lower(#[from] LowerError),

    #[error("[runtime] {0}")]
    Interp(#[from] InterpError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("instruction {insn} is already owned by block {block}; detach it first")]
    AlreadyOwned { insn: InsnId, block: BlockId },

    #[error("instruction {insn} is not attached to any block")]
    Detached { insn: InsnId },

    #[error("index {index} out of range for block {block} with {len} instructions")]
    IndexOutOfRange {
        block: BlockId,
        index: usize,
        len: usize,
    },

    #[error("unknown block {block}")]
    UnknownBlock { block: BlockId },

    #[error("unknown instruction {insn}")]
    UnknownInsn { insn: InsnId },

    #[error("unknown module #{}", .module.0)]
    UnknownModule { module: ModuleIdx },

    #[error("in function '{func}': block {block} {detail}")]
    Malformed {
        func: String,
        block: BlockId,
        detail: String,
    },

    #[error("function '{name}' is declared twice in module '{module}'")]
    DuplicateFunction { module: String, name: String },

    #[error("entry function {entry} does not exist")]
    MissingEntry { entry: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkageError {
    #[error(
        "builtin registry is incomplete: {}",
        describe_linkage(.missing, .undeclared)
    )]
    Incomplete {
        /// Declared operations without an implementation.
        missing: Vec<String>,
        /// Implementations registered under a name nobody declared.
        undeclared: Vec<String>,
    },

    #[error("builtin operation '{name}' is declared twice")]
    DuplicateDeclaration { name: String },
}

fn describe_linkage(missing: &[String], undeclared: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!(
            "{} operation(s) lack an implementation: {}",
            missing.len(),
            missing.join(", ")
        ));
    }
    if !undeclared.is_empty() {
        parts.push(format!(
            "{} implementation(s) have no declaration: {}",
            undeclared.len(),
            undeclared.join(", ")
        ));
    }
    parts.join("; ")
}

#[derive(Debug, Error)]
pub enum InterpError {
    #[error("wrong number of arguments to {callee}: expected {expected}, got {actual}")]
    Arity {
        callee: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "while calling builtin operation {op}, parameter #{index} expects {expected} but received {actual}"
    )]
    Type {
        op: String,
        index: usize,
        expected: Ty,
        actual: ValueKind,
    },

    #[error("internal error: builtin operation {op} promised {promised} but returned {returned}")]
    ContractViolation {
        op: String,
        promised: Ty,
        returned: ValueKind,
    },

    #[error("internal error: {detail}")]
    Internal { detail: String },

    #[error("division by 0 in {op}")]
    DivisionByZero { op: String },

    #[error("cannot convert {input:?} to int")]
    Conversion { input: String },

    #[error("I/O error while executing {op}: {detail}")]
    Io { op: String, detail: String },

    #[error("index out of bounds: index {index} but the array has {len} elements")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("cannot allocate an array of negative size {size}")]
    NegativeArraySize { size: i64 },

    #[error("{context} expects {expected} but found {found}")]
    Operand {
        context: &'static str,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("branch condition must be int, found {found}")]
    InvalidCondition { found: ValueKind },

    #[error("unknown builtin operation '{name}'")]
    UnknownBuiltin { name: String },

    #[error("call to unknown function {callee}")]
    UnknownFunction { callee: String },

    #[error("call depth exceeded the limit of {limit} frames")]
    StackOverflow { limit: usize },

    #[error(transparent)]
    Linkage(#[from] LinkageError),
}

impl InterpError {
    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        InterpError::Internal {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("module '{module}' is imported but was never provided")]
    UnknownModule { module: String },

    #[error("module '{module}' has no function '{name}'")]
    UnknownFunction { module: String, name: String },

    #[error("module '{module}' has no global '{name}'")]
    UnknownGlobal { module: String, name: String },

    #[error("in function '{function}': no local variable '{name}' is in scope")]
    UnknownLocal { function: String, name: String },

    #[error("module '{module}' has no entry function '{name}'")]
    MissingEntry { module: String, name: String },

    #[error(transparent)]
    Structural(#[from] StructuralError),
}
