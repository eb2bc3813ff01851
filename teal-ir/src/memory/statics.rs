//! Global variable table.
//!
//! One slot per declared global, all null until first assigned.

use tracing::trace;

use crate::error::InterpError;
use crate::ir::GlobalId;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Statics {
    globals: Vec<Value>,
}

impl Statics {
    pub fn new(num_globals: usize) -> Self {
        Self {
            globals: vec![Value::Null; num_globals],
        }
    }

    /// An unassigned global reads as null.
    pub fn read(&self, global: GlobalId) -> Result<Value, InterpError> {
        self.globals
            .get(global.index())
            .cloned()
            .ok_or_else(|| InterpError::internal(format!("global {global} out of bounds")))
    }

    pub fn write(&mut self, global: GlobalId, value: Value) -> Result<(), InterpError> {
        trace!("{} <- {}", global, value);
        let slot = self
            .globals
            .get_mut(global.index())
            .ok_or_else(|| InterpError::internal(format!("global {global} out of bounds")))?;
        *slot = value;
        Ok(())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.globals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_start_null() {
        let mut statics = Statics::new(2);
        assert!(statics.read(GlobalId(1)).unwrap().is_null());
        statics.write(GlobalId(1), Value::Int(3)).unwrap();
        assert_eq!(statics.read(GlobalId(1)).unwrap(), Value::Int(3));
        assert!(statics.read(GlobalId(2)).is_err());
    }
}
