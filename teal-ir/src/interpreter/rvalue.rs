use tracing::debug;

use super::function::{FnInterpreter, invoke_fn};
use crate::error::InterpError;
use crate::ir::{BinOp, Callee, Operand};
use crate::value::{ArrayRef, Value, ValueKind};

impl FnInterpreter<'_, '_, '_> {
    pub(super) fn evaluate_operand(&self, operand: &Operand) -> Result<Value, InterpError> {
        match operand {
            Operand::Local(local) => self.read_local(*local),
            Operand::Const(constant) => Ok(constant.to_value()),
        }
    }

    fn evaluate_operands(&self, operands: &[Operand]) -> Result<Vec<Value>, InterpError> {
        operands.iter().map(|op| self.evaluate_operand(op)).collect()
    }

    /// Binary operators run through the builtin they name, so they carry the
    /// same argument checks as a direct call.
    pub(super) fn evaluate_binop(
        &mut self,
        op: BinOp,
        lhs: &Operand,
        rhs: &Operand,
    ) -> Result<Value, InterpError> {
        let args = [self.evaluate_operand(lhs)?, self.evaluate_operand(rhs)?];
        self.ctx.builtins.call(op.builtin(), &args, self.ctx.console)
    }

    pub(super) fn evaluate_call(
        &mut self,
        callee: &Callee,
        args: &[Operand],
    ) -> Result<Value, InterpError> {
        let args = self.evaluate_operands(args)?;
        match callee {
            Callee::Builtin(name) => self.ctx.builtins.call(name, &args, self.ctx.console),
            Callee::Function(func) => {
                debug!("Calling {}", self.ctx.program.describe(*func));
                invoke_fn(*func, args, self.memory, self.ctx)
            }
        }
    }

    pub(super) fn evaluate_new_array(&self, size: &Operand) -> Result<Value, InterpError> {
        let size = self.expect_int("array size", size)?;
        let len = usize::try_from(size).map_err(|_| InterpError::NegativeArraySize { size })?;
        Ok(Value::Array(ArrayRef::new(len)))
    }

    pub(super) fn evaluate_load_array(
        &self,
        array: &Operand,
        index: &Operand,
    ) -> Result<Value, InterpError> {
        let array = self.expect_array("array load", array)?;
        let index = self.expect_int("array index", index)?;
        array.get(index)
    }

    pub(super) fn evaluate_store_array(
        &self,
        array: &Operand,
        index: &Operand,
        value: &Operand,
    ) -> Result<(), InterpError> {
        let array = self.expect_array("array store", array)?;
        let index = self.expect_int("array index", index)?;
        let value = self.evaluate_operand(value)?;
        array.set(index, value)
    }

    fn expect_int(&self, context: &'static str, operand: &Operand) -> Result<i64, InterpError> {
        match self.evaluate_operand(operand)? {
            Value::Int(i) => Ok(i),
            other => Err(InterpError::Operand {
                context,
                expected: ValueKind::Int,
                found: other.kind(),
            }),
        }
    }

    fn expect_array(
        &self,
        context: &'static str,
        operand: &Operand,
    ) -> Result<ArrayRef, InterpError> {
        match self.evaluate_operand(operand)? {
            Value::Array(array) => Ok(array),
            other => Err(InterpError::Operand {
                context,
                expected: ValueKind::Array,
                found: other.kind(),
            }),
        }
    }
}
