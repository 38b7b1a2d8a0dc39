//! Traps: unrecoverable execution faults
//!
//! A trap aborts the whole invocation. It unwinds every frame back to the host boundary and
//! cannot be intercepted by `catch` or `catch_all`, which only see tagged exceptions.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapKind {
    Unreachable,
    TableOutOfBounds,
    ArrayOutOfBounds,
    ArrayTooLarge,
    IndirectCallTypeMismatch,
    NullReference,
    IntegerDivideByZeroOrOverflow,
    CallStackExhausted,
}

/// A trap raised during execution, with the reason reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Trap {
    pub kind: TrapKind,
    pub reason: String,
}

impl Trap {
    pub fn new(kind: TrapKind, reason: impl Into<String>) -> Self {
        Trap {
            kind,
            reason: reason.into(),
        }
    }

    pub fn unreachable() -> Self {
        Trap::new(TrapKind::Unreachable, "Unreachable code")
    }

    /// Table slot index at or past the table's size
    pub fn undefined_element() -> Self {
        Trap::new(TrapKind::TableOutOfBounds, "undefined element")
    }

    /// Indirect call through a null table slot
    pub fn uninitialized_element() -> Self {
        Trap::new(TrapKind::NullReference, "uninitialized element")
    }

    pub fn indirect_call_type_mismatch() -> Self {
        Trap::new(TrapKind::IndirectCallTypeMismatch, "indirect call type mismatch")
    }

    pub fn null_reference() -> Self {
        Trap::new(TrapKind::NullReference, "null reference")
    }

    pub fn array_out_of_bounds() -> Self {
        Trap::new(TrapKind::ArrayOutOfBounds, "out of bounds array access")
    }

    pub fn array_too_large() -> Self {
        Trap::new(TrapKind::ArrayTooLarge, "requested new array is too large")
    }

    pub fn divide_by_zero() -> Self {
        Trap::new(TrapKind::IntegerDivideByZeroOrOverflow, "integer divide by zero")
    }

    pub fn integer_overflow() -> Self {
        Trap::new(TrapKind::IntegerDivideByZeroOrOverflow, "integer overflow")
    }

    pub fn call_stack_exhausted() -> Self {
        Trap::new(TrapKind::CallStackExhausted, "call stack exhausted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_is_display() {
        assert_eq!(Trap::unreachable().to_string(), "Unreachable code");
        assert_eq!(Trap::call_stack_exhausted().to_string(), "call stack exhausted");
    }

    #[test]
    fn test_division_traps_share_kind() {
        assert_eq!(Trap::divide_by_zero().kind, Trap::integer_overflow().kind);
        assert_ne!(Trap::divide_by_zero().reason, Trap::integer_overflow().reason);
    }
}
