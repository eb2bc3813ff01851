//! Intermediate representation.
//!
//! A [`Program`] owns its [`Module`]s, each module owns its [`Function`]s, and
//! each function owns an arena of instructions plus the [`BasicBlock`]s that
//! order them. Blocks refer to instructions through [`InsnId`] handles; the
//! arena records which block currently owns each instruction, so an
//! instruction can belong to at most one block at a time.
//!
//! Control-flow edges are stored on both endpoints. They are only mutated via
//! [`Function::add_edge`] and [`Function::remove_edge`], which keep successor
//! and predecessor sets symmetric.

mod block;
mod builder;
mod function;
mod insn;
mod location;
pub mod printer;
mod program;

pub use block::{BasicBlock, BlockId};
pub use builder::Builder;
pub use function::Function;
pub use insn::{BinOp, Callee, Constant, Insn, InsnId, Local, Operand};
pub use location::SourceLocation;
pub use printer::PrintOptions;
pub use program::{FuncRef, GlobalDecl, GlobalId, Module, ModuleId, ModuleIdx, Program, ProgramBuilder};
