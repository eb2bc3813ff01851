//! Interpreter memory.
//!
//! Evaluation state is split into the call stack, which holds one frame of
//! local slots per active call, and the statics, which hold one slot per
//! declared global. Array contents live outside both: slots hold shared
//! [`ArrayRef`](crate::value::ArrayRef) handles.

pub mod stack;
pub mod statics;

use stack::Stack;
use statics::Statics;

/// Memory of one evaluation.
#[derive(Debug)]
pub struct ThreadMemory {
    pub stack: Stack,
    pub statics: Statics,
}

impl ThreadMemory {
    /// Empty stack limited to `max_depth` frames and `num_globals` null globals.
    pub fn new(num_globals: usize, max_depth: usize) -> Self {
        Self {
            stack: Stack::new(max_depth),
            statics: Statics::new(num_globals),
        }
    }
}
