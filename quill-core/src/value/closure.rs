//! Closures: a compiled function paired with the upvalue cells it captured
//! at creation time.

use super::Value;
use crate::bytecode::CompiledFunction;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ClosureData {
    pub function: Rc<CompiledFunction>,
    /// One entry per free variable the function body references, in
    /// declaration order, populated by `Closure` right before the frame
    /// is pushed. Each entry is an `ObjectPtr` cell shared with whichever
    /// frame originally owned the captured local.
    pub free: Vec<Value>,
}

impl ClosureData {
    pub fn new(function: Rc<CompiledFunction>, free: Vec<Value>) -> Self {
        Self { function, free }
    }
}
