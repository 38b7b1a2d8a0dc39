//! Label stack for structured control flow
//!
//! Labels carry the branch arity and continuation of an active control construct. Each frame
//! owns its own label stack; a `try` label turns into a `catch` label holding the caught
//! exception once one of its handlers takes over, which is what `rethrow` refers back to.

use super::exception::Exception;

/// Kind of construct a label belongs to
#[derive(Debug, Clone, PartialEq)]
pub enum LabelKind {
    /// Branches target the end of the block
    Block,
    /// Branches target the beginning of the loop
    Loop,
    If,
    /// Body of a `try`; its handlers are live
    Try,
    /// Inside a handler; holds the exception for `rethrow`
    Catch(Exception),
}

/// A label on the label stack
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub kind: LabelKind,
    /// Values consumed on entry (and carried by branches to a loop)
    pub params: usize,
    /// Values produced on exit
    pub results: usize,
    /// Operand stack height below the construct's parameters
    pub height: usize,
    /// Position of the opening instruction
    pub start: usize,
    /// Position of the matching `end`
    pub end: usize,
}

impl Label {
    /// Number of values a branch to this label carries
    ///
    /// For loops this is the parameter count (the branch re-enters the loop); for everything
    /// else it is the result count.
    pub fn arity(&self) -> usize {
        if self.kind == LabelKind::Loop {
            self.params
        } else {
            self.results
        }
    }
}

/// The label stack of one frame
#[derive(Debug, Default)]
pub struct LabelStack {
    labels: Vec<Label>,
}

impl LabelStack {
    pub fn new() -> Self {
        LabelStack { labels: Vec::new() }
    }

    pub fn push(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub fn pop(&mut self) -> Option<Label> {
        self.labels.pop()
    }

    /// Get the nth label from the top (0 = innermost)
    pub fn get(&self, depth: u32) -> Option<&Label> {
        let len = self.labels.len();
        if depth as usize >= len {
            return None;
        }
        self.labels.get(len - 1 - depth as usize)
    }

    /// Label at absolute position `index` (0 = outermost)
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Label> {
        self.labels.get_mut(index)
    }

    /// Keep only the outermost `len` labels
    pub fn truncate(&mut self, len: usize) {
        self.labels.truncate(len);
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of active labels
    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    /// Labels from innermost to outermost, with their absolute positions
    pub fn iter_innermost(&self) -> impl Iterator<Item = (usize, &Label)> {
        self.labels.iter().enumerate().rev()
    }
}
