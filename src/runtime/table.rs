//! Function tables
//!
//! A table is a fixed-capacity vector of nullable function references. Its capacity is set at
//! definition and its contents are installed by element segments during instantiation; after
//! that it is only read, by `call_indirect`, `return_call_indirect` and `table.get`.
//!
//! Tables are security-critical because they enable indirect calls: the caller checks the
//! resolved function's signature on every dispatch, see [`crate::runtime::link`].

use super::{trap::Trap, FuncAddr, RuntimeError};
use crate::module::RefType;

/// A table of function references
#[derive(Debug)]
pub struct Table {
    /// The declared element type
    elem_type: RefType,

    /// Slots are either null or a function handle
    elements: Vec<Option<FuncAddr>>,
}

impl Table {
    /// Create a table with `capacity` null slots
    pub fn new(elem_type: RefType, capacity: u32) -> Self {
        Table {
            elem_type,
            elements: vec![None; capacity as usize],
        }
    }

    pub fn elem_type(&self) -> RefType {
        self.elem_type
    }

    /// Get the table size (number of slots)
    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    /// Read a slot
    ///
    /// # Errors
    ///
    /// Traps with `TableOutOfBounds` if `slot` is not below the capacity.
    pub fn get(&self, slot: u32) -> Result<Option<FuncAddr>, RuntimeError> {
        self.elements
            .get(slot as usize)
            .copied()
            .ok_or_else(|| Trap::undefined_element().into())
    }

    /// Install an element segment at `offset`
    ///
    /// # Errors
    ///
    /// Returns `ElementSegmentOutOfBounds` if the segment does not fit; the table is left
    /// unchanged in that case.
    pub fn initialize(&mut self, offset: u32, funcs: &[FuncAddr]) -> Result<(), RuntimeError> {
        let end = (offset as usize).checked_add(funcs.len());
        match end {
            Some(end) if end <= self.elements.len() => {
                for (slot, func) in self.elements[offset as usize..end].iter_mut().zip(funcs) {
                    *slot = Some(*func);
                }
                Ok(())
            }
            _ => Err(RuntimeError::ElementSegmentOutOfBounds {
                offset,
                len: funcs.len(),
                size: self.size(),
            }),
        }
    }
}
