//! Reads and writes of local slots and globals.

use crate::error::InterpError;
use crate::ir::{GlobalId, Local};
use crate::value::Value;

impl super::function::FnInterpreter<'_, '_, '_> {
    pub(super) fn read_local(&self, local: Local) -> Result<Value, InterpError> {
        self.memory.stack.read_local(local)
    }

    pub(super) fn write_local(&mut self, local: Local, value: Value) -> Result<(), InterpError> {
        self.memory.stack.write_local(local, value)
    }

    pub(super) fn read_global(&self, global: GlobalId) -> Result<Value, InterpError> {
        self.memory.statics.read(global)
    }

    pub(super) fn write_global(&mut self, global: GlobalId, value: Value) -> Result<(), InterpError> {
        self.memory.statics.write(global, value)
    }
}
