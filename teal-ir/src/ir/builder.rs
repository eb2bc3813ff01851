use crate::error::StructuralError;
use crate::ir::block::BlockId;
use crate::ir::function::Function;
use crate::ir::insn::{BinOp, Callee, Insn, InsnId, Local, Operand};
use crate::ir::location::SourceLocation;
use crate::ir::program::GlobalId;

/// Cursor-based instruction emission.
///
/// Instructions are appended to the current block and tagged with the
/// current source location. Once a block has a terminator it is sealed and
/// further emission into it fails.
pub struct Builder<'f> {
    func: &'f mut Function,
    current: BlockId,
    location: SourceLocation,
}

impl<'f> Builder<'f> {
    pub fn new(func: &'f mut Function) -> Self {
        let current = func.entry();
        Self {
            func,
            current,
            location: SourceLocation::Unknown,
        }
    }

    pub fn function(&self) -> &Function {
        self.func
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn create_block(&mut self, name: &str) -> BlockId {
        self.func.add_block(Some(name))
    }

    /// Set the location attached to subsequent instructions, returning the
    /// previous one so callers can restore it.
    pub fn set_location(&mut self, location: SourceLocation) -> SourceLocation {
        std::mem::replace(&mut self.location, location)
    }

    pub fn temp(&mut self) -> Local {
        self.func.new_local()
    }

    /// True if the current block already ends with a terminator.
    pub fn is_terminated(&self) -> bool {
        self.func.terminator(self.current).is_some()
    }

    pub fn emit(&mut self, insn: Insn) -> Result<InsnId, StructuralError> {
        if self.is_terminated() {
            return Err(StructuralError::Malformed {
                func: self.func.name().to_owned(),
                block: self.current,
                detail: format!("is sealed; cannot emit {insn:?}"),
            });
        }
        let id = self.func.new_insn_at(insn, self.location.clone());
        self.func.push_insn(self.current, id)
    }

    pub fn copy(&mut self, dst: Local, src: impl Into<Operand>) -> Result<(), StructuralError> {
        self.emit(Insn::Copy {
            dst,
            src: src.into(),
        })?;
        Ok(())
    }

    pub fn new_array(&mut self, size: impl Into<Operand>) -> Result<Local, StructuralError> {
        let dst = self.temp();
        self.emit(Insn::NewArray {
            dst,
            size: size.into(),
        })?;
        Ok(dst)
    }

    pub fn load_array(
        &mut self,
        array: impl Into<Operand>,
        index: impl Into<Operand>,
    ) -> Result<Local, StructuralError> {
        let dst = self.temp();
        self.emit(Insn::LoadArray {
            dst,
            array: array.into(),
            index: index.into(),
        })?;
        Ok(dst)
    }

    pub fn store_array(
        &mut self,
        array: impl Into<Operand>,
        index: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> Result<(), StructuralError> {
        self.emit(Insn::StoreArray {
            array: array.into(),
            index: index.into(),
            value: value.into(),
        })?;
        Ok(())
    }

    pub fn load_global(&mut self, global: GlobalId) -> Result<Local, StructuralError> {
        let dst = self.temp();
        self.emit(Insn::LoadGlobal { dst, global })?;
        Ok(dst)
    }

    pub fn store_global(
        &mut self,
        global: GlobalId,
        src: impl Into<Operand>,
    ) -> Result<(), StructuralError> {
        self.emit(Insn::StoreGlobal {
            global,
            src: src.into(),
        })?;
        Ok(())
    }

    /// Emit a call whose result lands in a fresh temporary.
    pub fn call(&mut self, callee: Callee, args: Vec<Operand>) -> Result<Local, StructuralError> {
        let dst = self.temp();
        self.emit(Insn::Call {
            dst: Some(dst),
            callee,
            args,
        })?;
        Ok(dst)
    }

    pub fn binop(
        &mut self,
        op: BinOp,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> Result<Local, StructuralError> {
        let dst = self.temp();
        self.emit(Insn::BinOp {
            dst,
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        })?;
        Ok(dst)
    }

    pub fn jump(&mut self, target: BlockId) -> Result<(), StructuralError> {
        self.func.block(target)?;
        self.emit(Insn::Jump { target })?;
        self.func.add_edge(self.current, target)?;
        Ok(())
    }

    pub fn branch(
        &mut self,
        cond: impl Into<Operand>,
        then_target: BlockId,
        else_target: BlockId,
    ) -> Result<(), StructuralError> {
        self.func.block(then_target)?;
        self.func.block(else_target)?;
        self.emit(Insn::Branch {
            cond: cond.into(),
            then_target,
            else_target,
        })?;
        self.func.add_edge(self.current, then_target)?;
        self.func.add_edge(self.current, else_target)?;
        Ok(())
    }

    pub fn ret(&mut self, value: impl Into<Operand>) -> Result<(), StructuralError> {
        self.emit(Insn::Return {
            value: value.into(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_adds_both_edges() {
        let mut f = Function::new("f", vec!["n".into()]);
        let mut b = Builder::new(&mut f);
        let then_bb = b.create_block("then");
        let else_bb = b.create_block("else");
        let n = Local(0);
        let cond = b.binop(BinOp::Gt, n, 0_i64).unwrap();
        b.branch(cond, then_bb, else_bb).unwrap();
        b.switch_to(then_bb);
        b.ret(n).unwrap();
        b.switch_to(else_bb);
        b.ret(0_i64).unwrap();

        assert_eq!(f.successors(f.entry()).unwrap(), &[then_bb, else_bb]);
        assert_eq!(f.predecessors(else_bb).unwrap(), &[f.entry()]);
        f.verify().unwrap();
    }

    #[test]
    fn test_sealed_block_rejects_emission() {
        let mut f = Function::new("f", vec![]);
        let mut b = Builder::new(&mut f);
        b.ret(1_i64).unwrap();
        assert!(b.is_terminated());
        assert!(matches!(
            b.copy(Local(0), 2_i64),
            Err(StructuralError::Malformed { .. })
        ));
    }

    #[test]
    fn test_location_tags_instructions() {
        let mut f = Function::new("f", vec![]);
        let mut b = Builder::new(&mut f);
        let loc = SourceLocation::new("f.teal", 1, 1, 1, 9);
        assert_eq!(b.set_location(loc.clone()), SourceLocation::Unknown);
        b.ret(Operand::null()).unwrap();
        let ret = f.at(f.entry(), 0).unwrap();
        assert_eq!(f.location(ret).unwrap(), &loc);
    }
}
