//! Call frames
//!
//! A frame owns everything one activation needs: its locals, its operand stack, its label
//! stack and its program counter. Nothing in a frame is shared with any other frame, so
//! dropping a frame releases all of its temporaries.

use super::{code::FunctionCode, control::LabelStack, marshal, stack::Stack, FuncAddr, Value};
use crate::module::FuncType;
use std::rc::Rc;

/// How a frame was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEntry {
    /// Ordinary call: the caller is suspended below this frame
    Call,
    /// Tail call: this frame replaced its caller
    TailCall,
}

/// Activation record of a running function
#[derive(Debug)]
pub struct Frame {
    /// Store address of the running function
    pub func: FuncAddr,
    /// Instance the function belongs to, for resolving module-local indices
    pub instance: usize,
    pub code: Rc<FunctionCode>,
    /// Position of the next instruction
    pub pc: usize,
    /// Parameters followed by declared locals
    pub locals: Vec<Value>,
    pub stack: Stack,
    pub labels: LabelStack,
    pub entry: FrameEntry,
}

impl Frame {
    /// Build a frame for `code`, binding `args` as the leading locals
    pub fn new(func: FuncAddr, instance: usize, code: Rc<FunctionCode>, args: Vec<Value>, entry: FrameEntry) -> Self {
        let locals = marshal::bind_locals(args, &code.locals);
        Frame {
            func,
            instance,
            code,
            pc: 0,
            locals,
            stack: Stack::new(),
            labels: LabelStack::new(),
            entry,
        }
    }

    pub fn signature(&self) -> &FuncType {
        &self.code.signature
    }
}
