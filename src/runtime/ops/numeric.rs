//! Numeric operations
//!
//! Constants and arithmetic for i32, i64, f32 and f64. Integer arithmetic wraps; integer
//! division and remainder trap on a zero divisor, and signed division also traps on
//! `MIN / -1`. Both traps are of kind `IntegerDivideByZeroOrOverflow`.

use super::{RuntimeError, Stack, Trap, Value};

// ============================================================================
// Constants
// ============================================================================

/// i32.const
pub fn i32_const(stack: &mut Stack, value: i32) -> Result<(), RuntimeError> {
    stack.push(Value::I32(value));
    Ok(())
}

/// i64.const
pub fn i64_const(stack: &mut Stack, value: i64) -> Result<(), RuntimeError> {
    stack.push(Value::I64(value));
    Ok(())
}

/// f32.const
pub fn f32_const(stack: &mut Stack, value: f32) -> Result<(), RuntimeError> {
    stack.push(Value::F32(value));
    Ok(())
}

/// f64.const
pub fn f64_const(stack: &mut Stack, value: f64) -> Result<(), RuntimeError> {
    stack.push(Value::F64(value));
    Ok(())
}

// ============================================================================
// i32 arithmetic
// ============================================================================

/// i32.add - c1 + c2 modulo 2^32
pub fn i32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_add(c2)));
    Ok(())
}

/// i32.sub - c1 - c2 modulo 2^32
pub fn i32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_sub(c2)));
    Ok(())
}

/// i32.mul - c1 * c2 modulo 2^32
pub fn i32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_mul(c2)));
    Ok(())
}

/// i32.div_s - signed division truncating toward zero
///
/// Traps if c2 is 0, or if c1 is i32::MIN and c2 is -1 (2^31 doesn't fit).
pub fn i32_div_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    if c2 == 0 {
        return Err(Trap::divide_by_zero().into());
    }
    if c1 == i32::MIN && c2 == -1 {
        return Err(Trap::integer_overflow().into());
    }
    stack.push(Value::I32(c1 / c2));
    Ok(())
}

/// i32.div_u - unsigned division
pub fn i32_div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()? as u32;
    let c1 = stack.pop_i32()? as u32;
    if c2 == 0 {
        return Err(Trap::divide_by_zero().into());
    }
    stack.push(Value::I32((c1 / c2) as i32));
    Ok(())
}

/// i32.rem_s - signed remainder, taking the sign of the dividend
///
/// i32::MIN % -1 is 0, not an overflow.
pub fn i32_rem_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    if c2 == 0 {
        return Err(Trap::divide_by_zero().into());
    }
    stack.push(Value::I32(c1.wrapping_rem(c2)));
    Ok(())
}

/// i32.rem_u - unsigned remainder
pub fn i32_rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()? as u32;
    let c1 = stack.pop_i32()? as u32;
    if c2 == 0 {
        return Err(Trap::divide_by_zero().into());
    }
    stack.push(Value::I32((c1 % c2) as i32));
    Ok(())
}

/// i32.and
pub fn i32_and(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 & c2));
    Ok(())
}

/// i32.or
pub fn i32_or(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 | c2));
    Ok(())
}

/// i32.xor
pub fn i32_xor(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 ^ c2));
    Ok(())
}

// ============================================================================
// i64 arithmetic
// ============================================================================

/// i64.add - c1 + c2 modulo 2^64
pub fn i64_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1.wrapping_add(c2)));
    Ok(())
}

/// i64.sub - c1 - c2 modulo 2^64
pub fn i64_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1.wrapping_sub(c2)));
    Ok(())
}

/// i64.mul - c1 * c2 modulo 2^64
pub fn i64_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1.wrapping_mul(c2)));
    Ok(())
}

/// i64.div_s - signed division truncating toward zero
///
/// Traps if c2 is 0, or if c1 is i64::MIN and c2 is -1 (2^63 doesn't fit).
pub fn i64_div_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    if c2 == 0 {
        return Err(Trap::divide_by_zero().into());
    }
    if c1 == i64::MIN && c2 == -1 {
        return Err(Trap::integer_overflow().into());
    }
    stack.push(Value::I64(c1 / c2));
    Ok(())
}

/// i64.div_u - unsigned division
pub fn i64_div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()? as u64;
    let c1 = stack.pop_i64()? as u64;
    if c2 == 0 {
        return Err(Trap::divide_by_zero().into());
    }
    stack.push(Value::I64((c1 / c2) as i64));
    Ok(())
}

/// i64.rem_s - signed remainder, i64::MIN % -1 is 0
pub fn i64_rem_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    if c2 == 0 {
        return Err(Trap::divide_by_zero().into());
    }
    stack.push(Value::I64(c1.wrapping_rem(c2)));
    Ok(())
}

/// i64.rem_u - unsigned remainder
pub fn i64_rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()? as u64;
    let c1 = stack.pop_i64()? as u64;
    if c2 == 0 {
        return Err(Trap::divide_by_zero().into());
    }
    stack.push(Value::I64((c1 % c2) as i64));
    Ok(())
}

// ============================================================================
// Float arithmetic (IEEE 754, round to nearest)
// ============================================================================

/// f32.add
pub fn f32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push(Value::F32(c1 + c2));
    Ok(())
}

/// f32.sub
pub fn f32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push(Value::F32(c1 - c2));
    Ok(())
}

/// f32.mul
pub fn f32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push(Value::F32(c1 * c2));
    Ok(())
}

/// f32.div - never traps; division by zero yields an infinity or NaN
pub fn f32_div(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push(Value::F32(c1 / c2));
    Ok(())
}

/// f64.add
pub fn f64_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(c1 + c2));
    Ok(())
}

/// f64.sub
pub fn f64_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(c1 - c2));
    Ok(())
}

/// f64.mul
pub fn f64_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(c1 * c2));
    Ok(())
}

/// f64.div
pub fn f64_div(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(c1 / c2));
    Ok(())
}
