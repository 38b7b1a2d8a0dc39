//! Comparison operations
//!
//! All comparisons produce an i32: 1 for true, 0 for false. Float comparisons with a NaN
//! operand are false.

use super::{RuntimeError, Stack, Value};

fn push_bool(stack: &mut Stack, condition: bool) {
    stack.push(Value::I32(condition as i32));
}

// ============================================================================
// i32
// ============================================================================

/// i32.eqz - Test if i32 is zero
pub fn i32_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    push_bool(stack, value == 0);
    Ok(())
}

/// i32.eq
pub fn i32_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i32()?;
    let a = stack.pop_i32()?;
    push_bool(stack, a == b);
    Ok(())
}

/// i32.ne
pub fn i32_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i32()?;
    let a = stack.pop_i32()?;
    push_bool(stack, a != b);
    Ok(())
}

/// i32.lt_s - Test if a < b (signed)
pub fn i32_lt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i32()?;
    let a = stack.pop_i32()?;
    push_bool(stack, a < b);
    Ok(())
}

/// i32.lt_u - Test if a < b (unsigned)
pub fn i32_lt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i32()?;
    let a = stack.pop_i32()?;
    push_bool(stack, (a as u32) < (b as u32));
    Ok(())
}

/// i32.gt_s - Test if a > b (signed)
pub fn i32_gt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i32()?;
    let a = stack.pop_i32()?;
    push_bool(stack, a > b);
    Ok(())
}

/// i32.gt_u - Test if a > b (unsigned)
pub fn i32_gt_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i32()?;
    let a = stack.pop_i32()?;
    push_bool(stack, (a as u32) > (b as u32));
    Ok(())
}

/// i32.le_s
pub fn i32_le_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i32()?;
    let a = stack.pop_i32()?;
    push_bool(stack, a <= b);
    Ok(())
}

/// i32.ge_s
pub fn i32_ge_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i32()?;
    let a = stack.pop_i32()?;
    push_bool(stack, a >= b);
    Ok(())
}

// ============================================================================
// i64
// ============================================================================

/// i64.eqz
pub fn i64_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    push_bool(stack, value == 0);
    Ok(())
}

/// i64.eq
pub fn i64_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i64()?;
    let a = stack.pop_i64()?;
    push_bool(stack, a == b);
    Ok(())
}

/// i64.ne
pub fn i64_ne(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i64()?;
    let a = stack.pop_i64()?;
    push_bool(stack, a != b);
    Ok(())
}

/// i64.lt_s
pub fn i64_lt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i64()?;
    let a = stack.pop_i64()?;
    push_bool(stack, a < b);
    Ok(())
}

/// i64.gt_s
pub fn i64_gt_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_i64()?;
    let a = stack.pop_i64()?;
    push_bool(stack, a > b);
    Ok(())
}

// ============================================================================
// Floats
// ============================================================================

/// f32.eq
pub fn f32_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_f32()?;
    let a = stack.pop_f32()?;
    push_bool(stack, a == b);
    Ok(())
}

/// f32.lt
pub fn f32_lt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_f32()?;
    let a = stack.pop_f32()?;
    push_bool(stack, a < b);
    Ok(())
}

/// f64.eq
pub fn f64_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_f64()?;
    let a = stack.pop_f64()?;
    push_bool(stack, a == b);
    Ok(())
}

/// f64.lt
pub fn f64_lt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_f64()?;
    let a = stack.pop_f64()?;
    push_bool(stack, a < b);
    Ok(())
}
