//! Instruction implementations
//!
//! One function per instruction, grouped by category. Operations that only touch operands
//! take the frame's [`Stack`]; operations that reach into the store take the pieces they
//! need, already resolved from module-local indices by the executor.

pub mod aggregate;
pub mod comparison;
pub mod control;
pub mod conversion;
pub mod numeric;
pub mod parametric;
pub mod reference;
pub mod table;
pub mod variable;

pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::trap::Trap;
pub(crate) use crate::runtime::{RuntimeError, Value};
