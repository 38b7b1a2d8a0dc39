//! Reference operations

use super::{RuntimeError, Stack, Trap, Value};
use crate::runtime::{FuncAddr, Ref};

/// ref.null
pub fn ref_null(stack: &mut Stack) -> Result<(), RuntimeError> {
    stack.push(Value::NULL);
    Ok(())
}

/// ref.is_null
pub fn ref_is_null(stack: &mut Stack) -> Result<(), RuntimeError> {
    let reference = stack.pop_ref()?;
    stack.push(Value::I32(reference.is_null() as i32));
    Ok(())
}

/// ref.func
pub fn ref_func(stack: &mut Stack, func: FuncAddr) -> Result<(), RuntimeError> {
    stack.push(Value::Ref(Ref::Func(func)));
    Ok(())
}

/// ref.as_non_null - traps on null, otherwise leaves the reference in place
pub fn ref_as_non_null(stack: &mut Stack) -> Result<(), RuntimeError> {
    let reference = stack.pop_ref()?;
    if reference.is_null() {
        return Err(Trap::null_reference().into());
    }
    stack.push(Value::Ref(reference));
    Ok(())
}

/// ref.eq - identity comparison; two nulls are equal
pub fn ref_eq(stack: &mut Stack) -> Result<(), RuntimeError> {
    let b = stack.pop_ref()?;
    let a = stack.pop_ref()?;
    stack.push(Value::I32((a == b) as i32));
    Ok(())
}

/// Pop the callee of a `call_ref`/`return_call_ref`
///
/// # Errors
///
/// Traps with `NullReference` on a null reference.
pub fn pop_func(stack: &mut Stack) -> Result<FuncAddr, RuntimeError> {
    match stack.pop_ref()? {
        Ref::Func(func) => Ok(func),
        Ref::Null => Err(Trap::null_reference().into()),
        other => Err(RuntimeError::TypeMismatch {
            expected: "funcref".to_string(),
            actual: Value::Ref(other).typ().to_string(),
        }),
    }
}
