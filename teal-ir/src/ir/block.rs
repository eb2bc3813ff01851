use std::fmt;

use crate::ir::insn::InsnId;

/// Index of a block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// An ordered instruction sequence plus its control-flow edges.
///
/// The block holds handles, not instructions; the owning [`Function`] keeps the
/// instructions and the ownership table. Predecessors are a derived lookup:
/// `b` is in `a.successors()` iff `a` is in `b.predecessors()`. Both sets keep
/// insertion order and hold each block at most once.
///
/// [`Function`]: crate::ir::Function
#[derive(Debug, Clone)]
pub struct BasicBlock {
    id: BlockId,
    name: Option<String>,
    pub(super) insns: Vec<InsnId>,
    pub(super) succs: Vec<BlockId>,
    pub(super) preds: Vec<BlockId>,
}

impl BasicBlock {
    pub(super) fn new(id: BlockId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            insns: Vec::new(),
            succs: Vec::new(),
            preds: Vec::new(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Display name given at creation, such as `while.cond`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn insns(&self) -> &[InsnId] {
        &self.insns
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn successors(&self) -> &[BlockId] {
        &self.succs
    }

    pub fn predecessors(&self) -> &[BlockId] {
        &self.preds
    }
}
