//! Parametric operations

use super::{RuntimeError, Stack};

/// drop - Drop value from stack
pub fn drop(stack: &mut Stack) -> Result<(), RuntimeError> {
    stack.pop()?;
    Ok(())
}

/// select - Pick the first operand if the condition is non-zero, otherwise the second
///
/// Both operands must be of the same kind.
pub fn select(stack: &mut Stack) -> Result<(), RuntimeError> {
    let condition = stack.pop_i32()?;
    let val2 = stack.pop()?;
    let val1 = stack.pop()?;
    if !val1.matches_kind(&val2.typ()) {
        return Err(RuntimeError::TypeMismatch {
            expected: val1.typ().to_string(),
            actual: val2.typ().to_string(),
        });
    }
    stack.push(if condition != 0 { val1 } else { val2 });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::module::{Instruction, ValueType};
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;

    #[test]
    fn drop_multiple_values() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::F64Const { value: 3.5 })
            .inst(Instruction::Drop)
            .inst(Instruction::Drop)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(1)]);
    }

    #[test]
    fn drop_empty_stack() {
        ExecutorTest::new()
            .inst(Instruction::Drop)
            .expect_error("Stack underflow");
    }

    #[test]
    fn select_by_condition() {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 10 })
            .inst(Instruction::I64Const { value: 20 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::Select)
            .inst(Instruction::I64Const { value: 10 })
            .inst(Instruction::I64Const { value: 20 })
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::Select)
            .returns(vec![ValueType::I64, ValueType::I64])
            .expect_stack(vec![Value::I64(10), Value::I64(20)]);
    }

    #[test]
    fn select_rejects_mixed_kinds() {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 10 })
            .inst(Instruction::I32Const { value: 20 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::Select)
            .returns(vec![ValueType::I64])
            .expect_error("Type mismatch: expected i64, got i32");
    }
}
