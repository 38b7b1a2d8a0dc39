//! Struct and array operations
//!
//! Type indices reaching these functions are already resolved to registry indices. A null
//! operand traps with `NullReference` and an element index at or past the length traps with
//! `ArrayOutOfBounds`.

use super::{RuntimeError, Stack, Value};
use crate::module::TypeIdx;
use crate::runtime::heap::{Extension, Heap};
use crate::runtime::registry::TypeRegistry;
use crate::runtime::Ref;

/// struct.new - field values are popped in declaration order
pub fn struct_new(stack: &mut Stack, heap: &mut Heap, registry: &TypeRegistry, type_idx: TypeIdx) -> Result<(), RuntimeError> {
    let count = registry.struct_type(type_idx)?.fields.len();
    let values = stack.pop_n(count)?;
    let object = heap.new_struct(registry, type_idx, &values)?;
    stack.push(Value::Ref(object));
    Ok(())
}

/// struct.new_default
pub fn struct_new_default(
    stack: &mut Stack,
    heap: &mut Heap,
    registry: &TypeRegistry,
    type_idx: TypeIdx,
) -> Result<(), RuntimeError> {
    let object = heap.new_struct_default(registry, type_idx)?;
    stack.push(Value::Ref(object));
    Ok(())
}

/// struct.get, struct.get_s and struct.get_u
pub fn struct_get(
    stack: &mut Stack,
    heap: &Heap,
    type_idx: TypeIdx,
    field_idx: u32,
    extension: Extension,
) -> Result<(), RuntimeError> {
    let target = stack.pop_ref()?;
    check_type(heap, target, type_idx)?;
    let value = heap.struct_get(target, field_idx, extension)?;
    stack.push(value);
    Ok(())
}

/// struct.set
pub fn struct_set(stack: &mut Stack, heap: &mut Heap, type_idx: TypeIdx, field_idx: u32) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    let target = stack.pop_ref()?;
    check_type(heap, target, type_idx)?;
    heap.struct_set(target, field_idx, value)
}

/// array.new - pops the fill value and then the length
pub fn array_new(stack: &mut Stack, heap: &mut Heap, registry: &TypeRegistry, type_idx: TypeIdx) -> Result<(), RuntimeError> {
    let len = stack.pop_i32()? as u32;
    let fill = stack.pop()?;
    let object = heap.new_array(registry, type_idx, len, fill)?;
    stack.push(Value::Ref(object));
    Ok(())
}

/// array.new_default
pub fn array_new_default(
    stack: &mut Stack,
    heap: &mut Heap,
    registry: &TypeRegistry,
    type_idx: TypeIdx,
) -> Result<(), RuntimeError> {
    let len = stack.pop_i32()? as u32;
    let object = heap.new_array_default(registry, type_idx, len)?;
    stack.push(Value::Ref(object));
    Ok(())
}

/// array.new_fixed - the top `len` operands become the elements, bottom first
pub fn array_new_fixed(
    stack: &mut Stack,
    heap: &mut Heap,
    registry: &TypeRegistry,
    type_idx: TypeIdx,
    len: u32,
) -> Result<(), RuntimeError> {
    let values = stack.pop_n(len as usize)?;
    let object = heap.new_array_fixed(registry, type_idx, &values)?;
    stack.push(Value::Ref(object));
    Ok(())
}

/// array.get, array.get_s and array.get_u
pub fn array_get(stack: &mut Stack, heap: &Heap, type_idx: TypeIdx, extension: Extension) -> Result<(), RuntimeError> {
    let index = stack.pop_i32()? as u32;
    let target = stack.pop_ref()?;
    check_type(heap, target, type_idx)?;
    let value = heap.array_get(target, index, extension)?;
    stack.push(value);
    Ok(())
}

/// array.set
pub fn array_set(stack: &mut Stack, heap: &mut Heap, type_idx: TypeIdx) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    let index = stack.pop_i32()? as u32;
    let target = stack.pop_ref()?;
    check_type(heap, target, type_idx)?;
    heap.array_set(target, index, value)
}

/// array.len
pub fn array_len(stack: &mut Stack, heap: &Heap) -> Result<(), RuntimeError> {
    let target = stack.pop_ref()?;
    let len = heap.array_len(target)?;
    stack.push(Value::I32(len as i32));
    Ok(())
}

/// Objects must be of exactly the type the instruction names; null is left for the heap to trap on
fn check_type(heap: &Heap, target: Ref, type_idx: TypeIdx) -> Result<(), RuntimeError> {
    if target.is_null() {
        return Ok(());
    }
    let actual = heap.type_of(target)?;
    if actual != type_idx {
        return Err(RuntimeError::TypeMismatch {
            expected: format!("object of type {type_idx}"),
            actual: format!("object of type {actual}"),
        });
    }
    Ok(())
}
