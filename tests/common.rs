//! Common test utilities shared between integration tests
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::Rng;
use wexec::module::{ModuleBuilder, ValueType};
use wexec::runtime::{ImportObject, RuntimeError, Store, Trap, Value};

/// Instantiate a built module in a fresh store
pub fn instantiate(builder: ModuleBuilder) -> (Store, usize) {
    let mut store = Store::new();
    let id = store
        .instantiate(&builder.build(), &ImportObject::new())
        .expect("Failed to instantiate");
    (store, id)
}

/// Unwrap the trap out of a failed invocation
pub fn expect_trap(result: Result<Vec<Value>, RuntimeError>) -> Trap {
    match result {
        Err(RuntimeError::Trap(trap)) => trap,
        other => panic!("expected a trap, got {other:?}"),
    }
}

/// Compare results bit-for-bit, so NaN payloads and signed zeros count
pub fn assert_bits_eq(actual: &[Value], expected: &[Value]) {
    assert_eq!(actual.len(), expected.len(), "got {actual:?}, expected {expected:?}");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(a.bits_eq(e), "result {i}: got {a:?}, expected {e:?}");
    }
}

pub fn random_numeric_type(rng: &mut StdRng) -> ValueType {
    match rng.gen_range(0..4) {
        0 => ValueType::I32,
        1 => ValueType::I64,
        2 => ValueType::F32,
        _ => ValueType::F64,
    }
}

/// A random value of `ty`; floats are drawn from raw bits, NaNs included
pub fn random_value(rng: &mut StdRng, ty: ValueType) -> Value {
    match ty {
        ValueType::I32 => Value::I32(rng.gen()),
        ValueType::I64 => Value::I64(rng.gen()),
        ValueType::F32 => Value::F32(f32::from_bits(rng.gen())),
        ValueType::F64 => Value::F64(f64::from_bits(rng.gen())),
        ValueType::Ref(_) => panic!("no random references"),
    }
}
