//! Conversion operations

use super::{RuntimeError, Stack, Value};

/// i32.wrap_i64 - keep the low 32 bits
pub fn i32_wrap_i64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push(Value::I32(value as i32));
    Ok(())
}

/// i64.extend_i32_s
pub fn i64_extend_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push(Value::I64(value as i64));
    Ok(())
}

/// i64.extend_i32_u
pub fn i64_extend_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push(Value::I64(value as u32 as i64));
    Ok(())
}

/// f64.promote_f32 - exact
pub fn f64_promote_f32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push(Value::F64(value as f64));
    Ok(())
}

/// f32.demote_f64 - round to nearest, overflowing to infinity
pub fn f32_demote_f64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push(Value::F32(value as f32));
    Ok(())
}
