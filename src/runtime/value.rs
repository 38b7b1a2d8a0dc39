//! Runtime value representation

use super::heap::ObjectRef;
use super::store::FuncAddr;
use crate::module::{HeapType, RefType, ValueType};
use fhex::ToHex;
use std::fmt;

/// A reference value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ref {
    Null,
    Struct(ObjectRef),
    Array(ObjectRef),
    Func(FuncAddr),
}

impl Ref {
    pub fn is_null(&self) -> bool {
        matches!(self, Ref::Null)
    }
}

/// Runtime representation of values
///
/// Values are `Copy`: duplicating one into several slots never aliases storage. Struct and
/// array references are handles, so copying a `Ref` shares the object, not its fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Ref(Ref),
}

impl Value {
    pub const NULL: Value = Value::Ref(Ref::Null);

    /// Get the type of this value
    ///
    /// References report a nullable abstract heap type; concrete types are not tracked on
    /// values.
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::Ref(r) => ValueType::Ref(RefType {
                nullable: true,
                heap_type: match r {
                    Ref::Null => HeapType::Any,
                    Ref::Struct(_) => HeapType::Struct,
                    Ref::Array(_) => HeapType::Array,
                    Ref::Func(_) => HeapType::Func,
                },
            }),
        }
    }

    /// True if this value can occupy a slot of type `ty` without coercion
    pub fn matches_kind(&self, ty: &ValueType) -> bool {
        self.typ().same_kind(ty)
    }

    /// Zero for numeric types, null for references
    pub fn default_for(ty: ValueType) -> Value {
        match ty {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
            ValueType::Ref(_) => Value::NULL,
        }
    }

    /// Bit-exact equality: floats compare by bit pattern, so NaN payloads and signed zeros
    /// are distinguished.
    pub fn bits_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    /// Create from a type string and value string (used in tests)
    pub fn from_strings(typ: &str, value: &str) -> Result<Self, String> {
        match typ {
            "i32" => value
                .parse::<u32>()
                .map(|v| Value::I32(v as i32))
                .map_err(|e| format!("Failed to parse i32: {e}")),
            "i64" => value
                .parse::<u64>()
                .map(|v| Value::I64(v as i64))
                .map_err(|e| format!("Failed to parse i64: {e}")),
            "f32" => {
                if let Some(hex) = value.strip_prefix("0x") {
                    u32::from_str_radix(hex, 16)
                        .map(|bits| Value::F32(f32::from_bits(bits)))
                        .map_err(|e| format!("Failed to parse f32 hex: {e}"))
                } else {
                    value
                        .parse::<u32>()
                        .map(|bits| Value::F32(f32::from_bits(bits)))
                        .map_err(|e| format!("Failed to parse f32 bits: {e}"))
                }
            }
            "f64" => {
                if let Some(hex) = value.strip_prefix("0x") {
                    u64::from_str_radix(hex, 16)
                        .map(|bits| Value::F64(f64::from_bits(bits)))
                        .map_err(|e| format!("Failed to parse f64 hex: {e}"))
                } else {
                    value
                        .parse::<u64>()
                        .map(|bits| Value::F64(f64::from_bits(bits)))
                        .map_err(|e| format!("Failed to parse f64 bits: {e}"))
                }
            }
            "ref" if value == "null" => Ok(Value::NULL),
            "ref" => value
                .strip_prefix("func:")
                .ok_or_else(|| format!("Unsupported reference literal: {value}"))?
                .parse::<usize>()
                .map(|addr| Value::Ref(Ref::Func(FuncAddr(addr))))
                .map_err(|e| format!("Failed to parse func address: {e}")),
            t => Err(format!("Unknown value type: {t}")),
        }
    }

    /// Convert to type and value strings for test comparison
    pub fn to_strings(&self) -> (String, String) {
        match self {
            Value::I32(v) => ("i32".to_string(), (*v as u32).to_string()),
            Value::I64(v) => ("i64".to_string(), (*v as u64).to_string()),
            Value::F32(v) => ("f32".to_string(), v.to_bits().to_string()),
            Value::F64(v) => ("f64".to_string(), v.to_bits().to_string()),
            Value::Ref(r) => ("ref".to_string(), r.to_string()),
        }
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Null => write!(f, "null"),
            Ref::Struct(obj) => write!(f, "struct:{}", obj.0),
            Ref::Array(obj) => write!(f, "array:{}", obj.0),
            Ref::Func(addr) => write!(f, "func:{}", addr.0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{}", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{}", v.to_hex()),
            Value::Ref(r) => write!(f, "ref:{r}"),
        }
    }
}
