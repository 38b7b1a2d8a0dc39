//! Operand stack
//!
//! Every frame owns one of these; values never move between frames except through the
//! marshaler.

use super::{Ref, RuntimeError, Value};
use crate::module::ValueType;

/// A frame's operand stack
#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Value>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Stack { values: Vec::new() }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Push multiple values onto the stack
    pub fn push_all(&mut self, values: impl IntoIterator<Item = Value>) {
        self.values.extend(values);
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop the top `n` values, returned bottom-to-top (declaration order)
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        if n > self.values.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(self.values.split_off(self.values.len() - n))
    }

    /// Pop a value and check its kind
    pub fn pop_typed(&mut self, expected_type: ValueType) -> Result<Value, RuntimeError> {
        let value = self.pop()?;
        if !value.matches_kind(&expected_type) {
            return Err(RuntimeError::TypeMismatch {
                expected: expected_type.to_string(),
                actual: value.typ().to_string(),
            });
        }
        Ok(value)
    }

    /// Pop an i32 value
    pub fn pop_i32(&mut self) -> Result<i32, RuntimeError> {
        match self.pop()? {
            Value::I32(v) => Ok(v),
            other => Err(mismatch("i32", &other)),
        }
    }

    /// Pop an i64 value
    pub fn pop_i64(&mut self) -> Result<i64, RuntimeError> {
        match self.pop()? {
            Value::I64(v) => Ok(v),
            other => Err(mismatch("i64", &other)),
        }
    }

    /// Pop an f32 value
    pub fn pop_f32(&mut self) -> Result<f32, RuntimeError> {
        match self.pop()? {
            Value::F32(v) => Ok(v),
            other => Err(mismatch("f32", &other)),
        }
    }

    /// Pop an f64 value
    pub fn pop_f64(&mut self) -> Result<f64, RuntimeError> {
        match self.pop()? {
            Value::F64(v) => Ok(v),
            other => Err(mismatch("f64", &other)),
        }
    }

    /// Pop a reference value
    pub fn pop_ref(&mut self) -> Result<Ref, RuntimeError> {
        match self.pop()? {
            Value::Ref(r) => Ok(r),
            other => Err(mismatch("ref", &other)),
        }
    }

    /// Get the current stack depth
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop everything above `height`
    pub fn truncate(&mut self, height: usize) {
        self.values.truncate(height);
    }

    /// Peek at the top value without popping
    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }
}

fn mismatch(expected: &str, actual: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.typ().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();

        stack.push(Value::I32(42));
        stack.push(Value::I64(100));

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop().unwrap(), Value::I64(100));
        assert_eq!(stack.pop().unwrap(), Value::I32(42));
        assert!(matches!(stack.pop(), Err(RuntimeError::StackUnderflow)));
    }

    #[test]
    fn test_pop_n_keeps_order() {
        let mut stack = Stack::new();
        stack.push_all(vec![Value::I32(1), Value::I32(2), Value::I32(3)]);

        assert_eq!(stack.pop_n(2).unwrap(), vec![Value::I32(2), Value::I32(3)]);
        assert_eq!(stack.depth(), 1);
        assert!(stack.pop_n(2).is_err());
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.pop_n(0).unwrap(), vec![]);
    }

    #[test]
    fn test_pop_typed() {
        let mut stack = Stack::new();
        stack.push(Value::I32(42));
        assert_eq!(stack.pop_typed(ValueType::I32).unwrap(), Value::I32(42));

        stack.push(Value::I32(42));
        assert!(stack.pop_typed(ValueType::I64).is_err());

        stack.push(Value::NULL);
        assert_eq!(stack.pop_typed(ValueType::FUNCREF).unwrap(), Value::NULL);
    }

    #[test]
    fn test_typed_pop_methods() {
        let mut stack = Stack::new();

        stack.push(Value::I32(42));
        assert_eq!(stack.pop_i32().unwrap(), 42);

        stack.push(Value::I64(100));
        assert_eq!(stack.pop_i64().unwrap(), 100);

        stack.push(Value::F32(1.5));
        assert_eq!(stack.pop_f32().unwrap(), 1.5);

        stack.push(Value::F64(2.5));
        assert_eq!(stack.pop_f64().unwrap(), 2.5);

        stack.push(Value::NULL);
        assert_eq!(stack.pop_ref().unwrap(), Ref::Null);

        stack.push(Value::F64(2.5));
        assert!(matches!(stack.pop_i32(), Err(RuntimeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_truncate_and_peek() {
        let mut stack = Stack::new();
        assert!(stack.peek().is_none());
        stack.push_all(vec![Value::I32(1), Value::I32(2), Value::I32(3)]);
        stack.truncate(1);
        assert_eq!(stack.peek(), Some(&Value::I32(1)));
        assert_eq!(stack.depth(), 1);
        stack.truncate(5);
        assert_eq!(stack.depth(), 1);
    }
}
