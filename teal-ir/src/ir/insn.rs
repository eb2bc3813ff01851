use std::fmt;
use std::rc::Rc;

use smallvec::{SmallVec, smallvec};

use crate::builtins::names;
use crate::ir::block::BlockId;
use crate::ir::program::{FuncRef, GlobalId};
use crate::value::Value;

/// Handle to an instruction in its function's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InsnId(pub u32);

impl fmt::Display for InsnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// A local slot of the executing frame. Parameters occupy the first slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Local(pub u32);

impl Local {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(i64),
    Str(Rc<str>),
    Null,
}

impl Constant {
    pub fn to_value(&self) -> Value {
        match self {
            Constant::Int(i) => Value::Int(*i),
            Constant::Str(s) => Value::Str(Rc::clone(s)),
            Constant::Null => Value::Null,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{i}"),
            Constant::Str(s) => write!(f, "{:?}", &**s),
            Constant::Null => f.write_str("null"),
        }
    }
}

/// Instruction input: a local slot or an inline constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Local(Local),
    Const(Constant),
}

impl Operand {
    pub fn null() -> Self {
        Operand::Const(Constant::Null)
    }

    pub fn local(&self) -> Option<Local> {
        match self {
            Operand::Local(l) => Some(*l),
            Operand::Const(_) => None,
        }
    }
}

impl From<Local> for Operand {
    fn from(value: Local) -> Self {
        Operand::Local(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Const(Constant::Int(value))
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Const(Constant::Str(Rc::from(value)))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(l) => write!(f, "{l}"),
            Operand::Const(c) => write!(f, "{c}"),
        }
    }
}

/// Target of a call instruction.
///
/// Builtins are bound by name and resolved against the registry when the call
/// executes, so a program naming an unregistered operation still lowers and
/// only fails if that call is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Function(FuncRef),
    Builtin(String),
}

/// Binary operators. Each one is evaluated by the builtin it names, so it gets
/// the same dynamic type checks as an explicit builtin call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    And,
    Or,
    Concat,
}

impl BinOp {
    /// Name of the builtin operation implementing this operator.
    pub fn builtin(self) -> &'static str {
        match self {
            BinOp::Add => names::INT_ADD,
            BinOp::Sub => names::INT_SUB,
            BinOp::Mul => names::INT_MUL,
            BinOp::Div => names::INT_DIV,
            BinOp::Mod => names::INT_MOD,
            BinOp::Eq => names::ANY_EQ,
            BinOp::Neq => names::ANY_NEQ,
            BinOp::Lt => names::INT_LT,
            BinOp::Leq => names::INT_LEQ,
            BinOp::Gt => names::INT_GT,
            BinOp::Geq => names::INT_GEQ,
            BinOp::And => names::INT_AND,
            BinOp::Or => names::INT_OR,
            BinOp::Concat => names::CONCAT,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Leq => "<=",
            BinOp::Gt => ">",
            BinOp::Geq => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Concat => "++",
        }
    }
}

/// A single IR instruction.
///
/// `Jump`, `Branch` and `Return` are terminators: every block ends with exactly
/// one of them and contains no other.
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    Copy {
        dst: Local,
        src: Operand,
    },
    /// Allocate an array of `size` null elements.
    NewArray {
        dst: Local,
        size: Operand,
    },
    LoadArray {
        dst: Local,
        array: Operand,
        index: Operand,
    },
    StoreArray {
        array: Operand,
        index: Operand,
        value: Operand,
    },
    LoadGlobal {
        dst: Local,
        global: GlobalId,
    },
    StoreGlobal {
        global: GlobalId,
        src: Operand,
    },
    Call {
        dst: Option<Local>,
        callee: Callee,
        args: Vec<Operand>,
    },
    BinOp {
        dst: Local,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    Jump {
        target: BlockId,
    },
    /// Branch on an integer condition: nonzero goes to `then_target`.
    Branch {
        cond: Operand,
        then_target: BlockId,
        else_target: BlockId,
    },
    Return {
        value: Operand,
    },
}

impl Insn {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Insn::Jump { .. } | Insn::Branch { .. } | Insn::Return { .. }
        )
    }

    /// Blocks control may transfer to after this instruction.
    pub fn targets(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Insn::Jump { target } => smallvec![*target],
            Insn::Branch {
                then_target,
                else_target,
                ..
            } if then_target == else_target => smallvec![*then_target],
            Insn::Branch {
                then_target,
                else_target,
                ..
            } => smallvec![*then_target, *else_target],
            _ => SmallVec::new(),
        }
    }

    /// The local this instruction writes, if any.
    pub fn def(&self) -> Option<Local> {
        match self {
            Insn::Copy { dst, .. }
            | Insn::NewArray { dst, .. }
            | Insn::LoadArray { dst, .. }
            | Insn::LoadGlobal { dst, .. }
            | Insn::BinOp { dst, .. } => Some(*dst),
            Insn::Call { dst, .. } => *dst,
            _ => None,
        }
    }

    /// Every operand this instruction reads, in order.
    pub fn operands(&self) -> SmallVec<[&Operand; 4]> {
        match self {
            Insn::Copy { src, .. } | Insn::StoreGlobal { src, .. } => smallvec![src],
            Insn::NewArray { size, .. } => smallvec![size],
            Insn::LoadArray { array, index, .. } => smallvec![array, index],
            Insn::StoreArray {
                array,
                index,
                value,
            } => smallvec![array, index, value],
            Insn::Call { args, .. } => args.iter().collect(),
            Insn::BinOp { lhs, rhs, .. } => smallvec![lhs, rhs],
            Insn::Branch { cond, .. } => smallvec![cond],
            Insn::Return { value } => smallvec![value],
            Insn::LoadGlobal { .. } | Insn::Jump { .. } => SmallVec::new(),
        }
    }

    /// Every local slot this instruction touches, reads and writes alike.
    pub fn locals(&self) -> impl Iterator<Item = Local> + '_ {
        self.operands()
            .into_iter()
            .filter_map(Operand::local)
            .chain(self.def())
    }
}
