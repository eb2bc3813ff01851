use crate::error::StructuralError;
use crate::ir::block::{BasicBlock, BlockId};
use crate::ir::insn::{Insn, InsnId, Local};
use crate::ir::location::SourceLocation;

/// Arena entry: the instruction, the block that currently owns it and the
/// source range it was lowered from.
#[derive(Debug, Clone)]
struct InsnSlot {
    insn: Insn,
    owner: Option<BlockId>,
    location: SourceLocation,
}

/// A function: parameters, local slots and a set of basic blocks.
///
/// All instructions of the function live in one arena indexed by [`InsnId`].
/// Creating an instruction yields a detached handle; it joins a block through
/// [`insert_insn`](Self::insert_insn) or the before/after helpers, and can be
/// detached again with [`remove_insn`](Self::remove_insn).
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    params: Vec<String>,
    num_locals: u32,
    entry: BlockId,
    blocks: Vec<BasicBlock>,
    insns: Vec<InsnSlot>,
}

impl Function {
    /// Create a function whose parameters occupy locals `0..params.len()`.
    /// The entry block `bb0` is created empty.
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        let num_locals = params.len() as u32;
        let entry = BlockId(0);
        Self {
            name: name.into(),
            params,
            num_locals,
            entry,
            blocks: vec![BasicBlock::new(entry, Some("entry".to_string()))],
            insns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Total number of local slots, parameters included.
    pub fn num_locals(&self) -> usize {
        self.num_locals as usize
    }

    pub fn param_local(&self, index: usize) -> Option<Local> {
        (index < self.params.len()).then(|| Local(index as u32))
    }

    /// Reserve a fresh local slot.
    pub fn new_local(&mut self) -> Local {
        let local = Local(self.num_locals);
        self.num_locals += 1;
        local
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn add_block(&mut self, name: Option<&str>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(id, name.map(str::to_owned)));
        id
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Result<&BasicBlock, StructuralError> {
        self.blocks
            .get(id.index())
            .ok_or(StructuralError::UnknownBlock { block: id })
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut BasicBlock, StructuralError> {
        self.blocks
            .get_mut(id.index())
            .ok_or(StructuralError::UnknownBlock { block: id })
    }

    // ---------------------------------------------------------------------
    // Instruction arena
    // ---------------------------------------------------------------------

    /// Add a detached instruction to the arena.
    pub fn new_insn(&mut self, insn: Insn) -> InsnId {
        self.new_insn_at(insn, SourceLocation::Unknown)
    }

    pub fn new_insn_at(&mut self, insn: Insn, location: SourceLocation) -> InsnId {
        let id = InsnId(self.insns.len() as u32);
        self.insns.push(InsnSlot {
            insn,
            owner: None,
            location,
        });
        id
    }

    fn slot(&self, id: InsnId) -> Result<&InsnSlot, StructuralError> {
        self.insns
            .get(id.0 as usize)
            .ok_or(StructuralError::UnknownInsn { insn: id })
    }

    fn slot_mut(&mut self, id: InsnId) -> Result<&mut InsnSlot, StructuralError> {
        self.insns
            .get_mut(id.0 as usize)
            .ok_or(StructuralError::UnknownInsn { insn: id })
    }

    pub fn insn(&self, id: InsnId) -> Result<&Insn, StructuralError> {
        Ok(&self.slot(id)?.insn)
    }

    /// Replace an instruction in place. Its ownership and position are kept.
    pub fn replace_insn(&mut self, id: InsnId, insn: Insn) -> Result<Insn, StructuralError> {
        Ok(std::mem::replace(&mut self.slot_mut(id)?.insn, insn))
    }

    pub fn location(&self, id: InsnId) -> Result<&SourceLocation, StructuralError> {
        Ok(&self.slot(id)?.location)
    }

    pub fn set_location(&mut self, id: InsnId, location: SourceLocation) -> Result<(), StructuralError> {
        self.slot_mut(id)?.location = location;
        Ok(())
    }

    /// The block that currently owns `id`, or `None` if it is detached.
    pub fn owner(&self, id: InsnId) -> Result<Option<BlockId>, StructuralError> {
        Ok(self.slot(id)?.owner)
    }

    /// Block and index of an attached instruction.
    pub fn position(&self, id: InsnId) -> Result<(BlockId, usize), StructuralError> {
        let block = self.owner(id)?.ok_or(StructuralError::Detached { insn: id })?;
        let index = self
            .block(block)?
            .insns
            .iter()
            .position(|i| *i == id)
            .ok_or_else(|| StructuralError::Malformed {
                func: self.name.clone(),
                block,
                detail: format!("does not list its instruction {id}"),
            })?;
        Ok((block, index))
    }

    /// Insert a detached instruction at `index`, shifting later instructions.
    ///
    /// `index` may equal the block length, which appends. Fails if the
    /// instruction already belongs to a block.
    pub fn insert_insn(
        &mut self,
        block: BlockId,
        insn: InsnId,
        index: usize,
    ) -> Result<InsnId, StructuralError> {
        if let Some(owner) = self.owner(insn)? {
            return Err(StructuralError::AlreadyOwned { insn, block: owner });
        }
        let target = self.block_mut(block)?;
        let len = target.insns.len();
        if index > len {
            return Err(StructuralError::IndexOutOfRange { block, index, len });
        }
        target.insns.insert(index, insn);
        self.slot_mut(insn)?.owner = Some(block);
        Ok(insn)
    }

    /// Append a detached instruction to `block`.
    pub fn push_insn(&mut self, block: BlockId, insn: InsnId) -> Result<InsnId, StructuralError> {
        let len = self.count(block)?;
        self.insert_insn(block, insn, len)
    }

    /// Insert `new` immediately before `anchor`, in the anchor's block.
    /// Returns `new` so edits can be chained.
    pub fn insn_before(&mut self, anchor: InsnId, new: InsnId) -> Result<InsnId, StructuralError> {
        let (block, index) = self.position(anchor)?;
        self.insert_insn(block, new, index)
    }

    /// Insert `new` immediately after `anchor`, in the anchor's block.
    /// Returns `new` so edits can be chained.
    pub fn insn_after(&mut self, anchor: InsnId, new: InsnId) -> Result<InsnId, StructuralError> {
        let (block, index) = self.position(anchor)?;
        self.insert_insn(block, new, index + 1)
    }

    /// Detach an instruction from its block. The handle stays valid and the
    /// instruction can be inserted again, in this or another block.
    pub fn remove_insn(&mut self, insn: InsnId) -> Result<(), StructuralError> {
        let (block, index) = self.position(insn)?;
        self.block_mut(block)?.insns.remove(index);
        self.slot_mut(insn)?.owner = None;
        Ok(())
    }

    pub fn count(&self, block: BlockId) -> Result<usize, StructuralError> {
        Ok(self.block(block)?.insns.len())
    }

    pub fn at(&self, block: BlockId, index: usize) -> Result<InsnId, StructuralError> {
        let b = self.block(block)?;
        b.insns
            .get(index)
            .copied()
            .ok_or(StructuralError::IndexOutOfRange {
                block,
                index,
                len: b.insns.len(),
            })
    }

    /// Instructions of `block` in execution order.
    pub fn block_insns(
        &self,
        block: BlockId,
    ) -> Result<impl Iterator<Item = (InsnId, &Insn)> + '_, StructuralError> {
        let b = self.block(block)?;
        Ok(b.insns
            .iter()
            .filter_map(|id| self.insns.get(id.0 as usize).map(|slot| (*id, &slot.insn))))
    }

    /// The block's last instruction, if it is a terminator.
    pub fn terminator(&self, block: BlockId) -> Option<&Insn> {
        let last = *self.block(block).ok()?.insns.last()?;
        self.insn(last).ok().filter(|insn| insn.is_terminator())
    }

    // ---------------------------------------------------------------------
    // Control-flow edges
    // ---------------------------------------------------------------------

    pub fn successors(&self, block: BlockId) -> Result<&[BlockId], StructuralError> {
        Ok(self.block(block)?.successors())
    }

    pub fn predecessors(&self, block: BlockId) -> Result<&[BlockId], StructuralError> {
        Ok(self.block(block)?.predecessors())
    }

    /// Add the edge `src -> dst` on both endpoints. Returns `false` if the
    /// edge already existed. Nothing changes unless both blocks exist.
    pub fn add_edge(&mut self, src: BlockId, dst: BlockId) -> Result<bool, StructuralError> {
        self.block(dst)?;
        if self.block(src)?.succs.contains(&dst) {
            return Ok(false);
        }
        self.block_mut(src)?.succs.push(dst);
        self.block_mut(dst)?.preds.push(src);
        Ok(true)
    }

    /// Remove the edge `src -> dst` from both endpoints. Returns `false` if
    /// there was no such edge.
    pub fn remove_edge(&mut self, src: BlockId, dst: BlockId) -> Result<bool, StructuralError> {
        self.block(dst)?;
        let succs = &mut self.block_mut(src)?.succs;
        let Some(pos) = succs.iter().position(|b| *b == dst) else {
            return Ok(false);
        };
        succs.remove(pos);
        self.block_mut(dst)?.preds.retain(|b| *b != src);
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Verification
    // ---------------------------------------------------------------------

    /// Check the structural invariants of the function.
    ///
    /// Every block is non-empty and ends with exactly one terminator, every
    /// listed instruction is owned by the listing block, successors match the
    /// terminator targets, edges are symmetric and every local is in range.
    pub fn verify(&self) -> Result<(), StructuralError> {
        for block in &self.blocks {
            let id = block.id();
            let malformed = |detail: String| StructuralError::Malformed {
                func: self.name.clone(),
                block: id,
                detail,
            };

            if block.insns.is_empty() {
                return Err(malformed("is empty".to_string()));
            }
            for (index, insn_id) in block.insns.iter().enumerate() {
                let slot = self.slot(*insn_id)?;
                if slot.owner != Some(id) {
                    return Err(malformed(format!(
                        "lists instruction {insn_id} owned by {:?}",
                        slot.owner
                    )));
                }
                let is_last = index + 1 == block.insns.len();
                if slot.insn.is_terminator() != is_last {
                    return Err(malformed(if is_last {
                        "does not end with a terminator".to_string()
                    } else {
                        format!("has terminator {insn_id} before its end")
                    }));
                }
                if let Some(local) = slot.insn.locals().find(|l| l.index() >= self.num_locals()) {
                    return Err(malformed(format!(
                        "uses {local} but the function has {} locals",
                        self.num_locals
                    )));
                }
            }

            let targets = self
                .terminator(id)
                .map(Insn::targets)
                .unwrap_or_default();
            for target in &targets {
                self.block(*target)?;
                if !block.succs.contains(target) {
                    return Err(malformed(format!("jumps to {target} without an edge")));
                }
            }
            if let Some(extra) = block.succs.iter().find(|s| !targets.contains(s)) {
                return Err(malformed(format!(
                    "has an edge to {extra} its terminator never takes"
                )));
            }
            for succ in &block.succs {
                if !self.block(*succ)?.preds.contains(&id) {
                    return Err(malformed(format!("edge to {succ} lacks its back-edge")));
                }
            }
            for pred in &block.preds {
                if !self.block(*pred)?.succs.contains(&id) {
                    return Err(malformed(format!("back-edge from {pred} has no edge")));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::insn::Operand;

    fn copy(dst: u32) -> Insn {
        Insn::Copy {
            dst: Local(dst),
            src: Operand::null(),
        }
    }

    #[test]
    fn test_insert_shifts_later_instructions() {
        let mut f = Function::new("f", vec![]);
        let bb = f.entry();
        f.new_local();
        let new_array = f.new_insn(Insn::NewArray {
            dst: Local(0),
            size: 3_i64.into(),
        });
        let c = f.new_insn(copy(0));
        f.insert_insn(bb, new_array, 0).unwrap();
        f.insert_insn(bb, c, 0).unwrap();

        assert_eq!(f.count(bb).unwrap(), 2);
        assert_eq!(f.at(bb, 0).unwrap(), c);
        assert_eq!(f.at(bb, 1).unwrap(), new_array);
        assert!(matches!(f.insn(f.at(bb, 1).unwrap()).unwrap(), Insn::NewArray { .. }));
    }

    #[test]
    fn test_insert_rejects_owned_instruction() {
        let mut f = Function::new("f", vec!["x".into()]);
        let bb = f.entry();
        let other = f.add_block(None);
        let i = f.new_insn(copy(0));
        f.push_insn(bb, i).unwrap();
        assert_eq!(
            f.push_insn(other, i),
            Err(StructuralError::AlreadyOwned { insn: i, block: bb })
        );
        f.remove_insn(i).unwrap();
        assert_eq!(f.owner(i).unwrap(), None);
        f.push_insn(other, i).unwrap();
        assert_eq!(f.owner(i).unwrap(), Some(other));
        assert_eq!(f.count(bb).unwrap(), 0);
    }

    #[test]
    fn test_bounds_checked_access() {
        let mut f = Function::new("f", vec!["x".into()]);
        let bb = f.entry();
        let i = f.new_insn(copy(0));
        assert_eq!(
            f.insert_insn(bb, i, 1),
            Err(StructuralError::IndexOutOfRange {
                block: bb,
                index: 1,
                len: 0
            })
        );
        assert!(matches!(
            f.at(bb, 0),
            Err(StructuralError::IndexOutOfRange { index: 0, len: 0, .. })
        ));
        assert!(matches!(
            f.count(BlockId(9)),
            Err(StructuralError::UnknownBlock { .. })
        ));
    }

    #[test]
    fn test_before_and_after_chain() {
        let mut f = Function::new("f", vec!["x".into()]);
        let bb = f.entry();
        let i0 = f.new_insn(copy(0));
        f.push_insn(bb, i0).unwrap();

        let a = f.new_insn(copy(0));
        let b = f.new_insn(copy(0));
        let a = f.insn_before(i0, a).unwrap();
        f.insn_before(a, b).unwrap();
        assert_eq!(f.block(bb).unwrap().insns(), &[b, a, i0]);

        let c = f.new_insn(copy(0));
        let d = f.new_insn(copy(0));
        let c = f.insn_after(i0, c).unwrap();
        f.insn_after(c, d).unwrap();
        assert_eq!(f.block(bb).unwrap().insns(), &[b, a, i0, c, d]);
    }

    #[test]
    fn test_anchor_must_be_attached() {
        let mut f = Function::new("f", vec!["x".into()]);
        let loose = f.new_insn(copy(0));
        let new = f.new_insn(copy(0));
        assert_eq!(
            f.insn_before(loose, new),
            Err(StructuralError::Detached { insn: loose })
        );
    }

    #[test]
    fn test_edges_stay_symmetric() {
        let mut f = Function::new("f", vec![]);
        let a = f.entry();
        let b = f.add_block(None);
        let c = f.add_block(None);

        assert!(f.add_edge(a, b).unwrap());
        assert!(f.add_edge(a, c).unwrap());
        assert!(!f.add_edge(a, b).unwrap());
        assert!(f.add_edge(b, b).unwrap());
        assert_eq!(f.successors(a).unwrap(), &[b, c]);
        assert_eq!(f.predecessors(b).unwrap(), &[a, b]);

        assert!(f.remove_edge(a, b).unwrap());
        assert!(!f.remove_edge(a, b).unwrap());
        assert_eq!(f.successors(a).unwrap(), &[c]);
        assert_eq!(f.predecessors(b).unwrap(), &[b]);

        assert!(f.add_edge(a, BlockId(7)).is_err());
        assert_eq!(f.successors(a).unwrap(), &[c]);
    }

    #[test]
    fn test_verify_catches_missing_terminator_and_edges() {
        let mut f = Function::new("f", vec![]);
        let entry = f.entry();
        let exit = f.add_block(None);
        let j = f.new_insn(Insn::Jump { target: exit });
        f.push_insn(entry, j).unwrap();
        let r = f.new_insn(Insn::Return {
            value: Operand::null(),
        });
        f.push_insn(exit, r).unwrap();
        assert!(matches!(f.verify(), Err(StructuralError::Malformed { .. })));

        f.add_edge(entry, exit).unwrap();
        f.verify().unwrap();

        let extra = f.new_insn(Insn::Return {
            value: Operand::null(),
        });
        f.insn_before(j, extra).unwrap();
        assert!(f.verify().is_err());
    }

    #[test]
    fn test_verify_checks_local_range() {
        let mut f = Function::new("f", vec![]);
        let r = f.new_insn(Insn::Return {
            value: Local(3).into(),
        });
        f.push_insn(f.entry(), r).unwrap();
        assert!(f.verify().is_err());
    }
}
