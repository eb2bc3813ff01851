//! Call stack.
//!
//! Every call gets its own frame: parameters occupy the first local slots and
//! the remaining slots start out null. Frames are never shared, so recursive
//! invocations of the same function see independent locals.

use smallvec::SmallVec;
use tracing::trace;

use super::ThreadMemory;
use crate::error::InterpError;
use crate::ir::{FuncRef, Local};
use crate::value::Value;

#[derive(Debug)]
pub struct Stack {
    frames: Vec<StackFrame>,
    limit: usize,
}

impl Stack {
    pub fn new(limit: usize) -> Self {
        Self {
            frames: Vec::new(),
            limit,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Runs `body` with a fresh frame for `func` on top of the stack.
    ///
    /// The frame exists exactly for the duration of `body` and is popped
    /// whether `body` returns a value or an error.
    pub fn with_stack_frame<F, R>(
        memory: &mut ThreadMemory,
        func: FuncRef,
        num_locals: usize,
        args: Vec<Value>,
        body: F,
    ) -> Result<R, InterpError>
    where
        F: FnOnce(&mut ThreadMemory) -> Result<R, InterpError>,
    {
        let stack = &mut memory.stack;
        if stack.frames.len() >= stack.limit {
            return Err(InterpError::StackOverflow { limit: stack.limit });
        }
        stack.frames.push(StackFrame::new(func, num_locals, args));
        let depth = stack.frames.len();

        let result = body(memory);

        debug_assert_eq!(memory.stack.depth(), depth, "Unexpected stack frame");
        debug_assert_eq!(memory.stack.current().map(StackFrame::func), Some(func));
        memory.stack.frames.pop();
        result
    }

    pub fn current(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn read_local(&self, local: Local) -> Result<Value, InterpError> {
        self.current()
            .ok_or_else(|| InterpError::internal("no active frame"))?
            .read_local(local)
    }

    pub fn write_local(&mut self, local: Local, value: Value) -> Result<(), InterpError> {
        self.frames
            .last_mut()
            .ok_or_else(|| InterpError::internal("no active frame"))?
            .write_local(local, value)
    }
}

/// Local slots of one call.
#[derive(Debug)]
pub struct StackFrame {
    func: FuncRef,
    locals: SmallVec<[Value; 8]>,
}

impl StackFrame {
    /// `args` fill the first slots; the caller has checked the arity.
    pub fn new(func: FuncRef, num_locals: usize, args: Vec<Value>) -> Self {
        let mut locals: SmallVec<[Value; 8]> = args.into_iter().collect();
        locals.resize(num_locals.max(locals.len()), Value::Null);
        Self { func, locals }
    }

    pub fn func(&self) -> FuncRef {
        self.func
    }

    pub fn read_local(&self, local: Local) -> Result<Value, InterpError> {
        self.locals
            .get(local.index())
            .cloned()
            .ok_or_else(|| InterpError::internal(format!("local {local} out of bounds")))
    }

    pub fn write_local(&mut self, local: Local, value: Value) -> Result<(), InterpError> {
        trace!("{} <- {}", local, value);
        let slot = self
            .locals
            .get_mut(local.index())
            .ok_or_else(|| InterpError::internal(format!("local {local} out of bounds")))?;
        *slot = value;
        Ok(())
    }
}
