//! Variable operations
//!
//! Locals live in the frame; globals live in the store and are reached through the running
//! instance's global index space.

use super::{RuntimeError, Value};
use crate::runtime::frame::Frame;
use crate::runtime::store::GlobalInstance;

/// local.get x
pub fn local_get(frame: &mut Frame, local_idx: u32) -> Result<(), RuntimeError> {
    let value = *frame
        .locals
        .get(local_idx as usize)
        .ok_or(RuntimeError::LocalIndexOutOfBounds(local_idx))?;
    frame.stack.push(value);
    Ok(())
}

/// local.set x
pub fn local_set(frame: &mut Frame, local_idx: u32) -> Result<(), RuntimeError> {
    let value = frame.stack.pop()?;
    store_local(frame, local_idx, value)
}

/// local.tee x - Set local variable but keep value on stack
pub fn local_tee(frame: &mut Frame, local_idx: u32) -> Result<(), RuntimeError> {
    let value = frame.stack.pop()?;
    frame.stack.push(value);
    store_local(frame, local_idx, value)
}

fn store_local(frame: &mut Frame, local_idx: u32, value: Value) -> Result<(), RuntimeError> {
    let slot = frame
        .locals
        .get_mut(local_idx as usize)
        .ok_or(RuntimeError::LocalIndexOutOfBounds(local_idx))?;
    // Locals keep the kind they were bound with
    if !value.matches_kind(&slot.typ()) {
        return Err(RuntimeError::TypeMismatch {
            expected: slot.typ().to_string(),
            actual: value.typ().to_string(),
        });
    }
    *slot = value;
    Ok(())
}

/// global.get x
pub fn global_get(frame: &mut Frame, global: &GlobalInstance) -> Result<(), RuntimeError> {
    frame.stack.push(global.value);
    Ok(())
}

/// global.set x
pub fn global_set(frame: &mut Frame, global: &mut GlobalInstance, global_idx: u32) -> Result<(), RuntimeError> {
    let value = frame.stack.pop_typed(global.ty)?;
    if !global.mutable {
        return Err(RuntimeError::ImmutableGlobal(global_idx));
    }
    global.value = value;
    Ok(())
}
