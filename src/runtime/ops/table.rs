//! Table operations

use super::{RuntimeError, Stack, Value};
use crate::runtime::table::Table;
use crate::runtime::Ref;

/// table.get - traps with `TableOutOfBounds` past the table's size
pub fn table_get(stack: &mut Stack, table: &Table) -> Result<(), RuntimeError> {
    let slot = stack.pop_i32()? as u32;
    let reference = match table.get(slot)? {
        Some(func) => Ref::Func(func),
        None => Ref::Null,
    };
    stack.push(Value::Ref(reference));
    Ok(())
}

/// table.size
pub fn table_size(stack: &mut Stack, table: &Table) -> Result<(), RuntimeError> {
    stack.push(Value::I32(table.size() as i32));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::module::{Instruction, RefType, ValueType};
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::trap::TrapKind;
    use crate::runtime::Value;

    #[test]
    fn size_and_slots() {
        ExecutorTest::new()
            .table(RefType::FUNCREF, 4, 1, vec![0])
            .inst(Instruction::TableSize { table_idx: 0 })
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::TableGet { table_idx: 0 })
            .inst(Instruction::RefIsNull)
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::TableGet { table_idx: 0 })
            .inst(Instruction::RefIsNull)
            .returns(vec![ValueType::I32, ValueType::I32, ValueType::I32])
            .expect_stack(vec![Value::I32(4), Value::I32(1), Value::I32(0)]);
    }

    #[test]
    fn get_past_size_traps() {
        ExecutorTest::new()
            .table(RefType::FUNCREF, 2, 0, vec![])
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::TableGet { table_idx: 0 })
            .returns(vec![ValueType::FUNCREF])
            .expect_trap(TrapKind::TableOutOfBounds, "undefined element");
    }

    #[test]
    fn unknown_table() {
        ExecutorTest::new()
            .inst(Instruction::TableSize { table_idx: 1 })
            .returns(vec![ValueType::I32])
            .expect_error("Table index out of bounds: 1");
    }
}
