//! Calling-convention marshaling
//!
//! Moves ordered argument and result lists between frames. Values keep their declared
//! position and kind: nothing is reordered, widened or narrowed, and every value is checked
//! against the signature slot it lands in.

use super::{stack::Stack, RuntimeError, Value};
use crate::module::ValueType;

/// Pop a callee's arguments off the caller's operand stack, in declared order
pub fn take_arguments(stack: &mut Stack, params: &[ValueType]) -> Result<Vec<Value>, RuntimeError> {
    let args = stack.pop_n(params.len())?;
    check_kinds(&args, params, "argument")?;
    Ok(args)
}

/// Build a callee's locals: arguments first, then zero/null defaults for declared locals
pub fn bind_locals(args: Vec<Value>, declared_locals: &[ValueType]) -> Vec<Value> {
    let mut locals = args;
    locals.reserve(declared_locals.len());
    locals.extend(declared_locals.iter().map(|ty| Value::default_for(*ty)));
    locals
}

/// Pop a returning frame's results, in declared order
pub fn collect_results(stack: &mut Stack, results: &[ValueType]) -> Result<Vec<Value>, RuntimeError> {
    let values = stack.pop_n(results.len())?;
    check_kinds(&values, results, "result")?;
    Ok(values)
}

/// Push results onto the resuming frame's operand stack
pub fn deliver_results(stack: &mut Stack, values: Vec<Value>) {
    stack.push_all(values);
}

/// Validate host-supplied arguments before entering the engine
pub fn check_host_arguments(args: &[Value], params: &[ValueType]) -> Result<(), RuntimeError> {
    check_arity(args, params, "arguments")?;
    check_kinds(args, params, "argument")
}

/// Validate values a host function returned
pub fn check_host_results(results: &[Value], expected: &[ValueType]) -> Result<(), RuntimeError> {
    check_arity(results, expected, "results")?;
    check_kinds(results, expected, "result")
}

fn check_arity(values: &[Value], types: &[ValueType], what: &str) -> Result<(), RuntimeError> {
    if values.len() != types.len() {
        return Err(RuntimeError::TypeMismatch {
            expected: format!("{} {what}", types.len()),
            actual: format!("{} {what}", values.len()),
        });
    }
    Ok(())
}

fn check_kinds(values: &[Value], types: &[ValueType], what: &str) -> Result<(), RuntimeError> {
    for (i, (value, ty)) in values.iter().zip(types).enumerate() {
        if !value.matches_kind(ty) {
            return Err(RuntimeError::TypeMismatch {
                expected: format!("{ty} for {what} {i}"),
                actual: value.typ().to_string(),
            });
        }
    }
    Ok(())
}
