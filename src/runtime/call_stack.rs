//! The explicit frame stack
//!
//! The interpreter never recurses on the host stack for calls: every activation is a [`Frame`]
//! on this stack. Ordinary calls push, returns pop, and tail calls replace the top frame,
//! dropping the caller before the callee is built. The depth after any number of tail calls
//! is therefore the depth before the first one.

use super::{frame::Frame, trap::Trap, RuntimeError};

#[derive(Debug)]
pub struct CallStack {
    frames: Vec<Frame>,
    limit: usize,
    max_depth: usize,
}

impl CallStack {
    /// Create an empty stack that traps once `limit` frames are live
    pub fn new(limit: usize) -> Self {
        CallStack {
            frames: Vec::new(),
            limit,
            max_depth: 0,
        }
    }

    /// Push a callee frame
    ///
    /// # Errors
    ///
    /// Traps with `CallStackExhausted` when the limit is reached.
    pub fn push(&mut self, frame: Frame) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.limit {
            return Err(Trap::call_stack_exhausted().into());
        }
        self.frames.push(frame);
        self.max_depth = self.max_depth.max(self.frames.len());
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Replace the top frame.
    ///
    /// The current top frame is popped and dropped first; `build` runs afterwards, so the
    /// caller's storage is gone before the callee's is allocated.
    pub fn tail_replace(&mut self, build: impl FnOnce() -> Result<Frame, RuntimeError>) -> Result<(), RuntimeError> {
        drop(self.frames.pop());
        let frame = build()?;
        self.frames.push(frame);
        self.max_depth = self.max_depth.max(self.frames.len());
        Ok(())
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Number of live frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Highest depth reached since creation
    pub fn max_depth_reached(&self) -> usize {
        self.max_depth
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
