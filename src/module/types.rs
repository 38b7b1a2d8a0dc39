//! Type definitions shared by module definitions and the runtime
//!
//! Value types, reference types, packed storage types and the three composite
//! type descriptors (function signatures, struct layouts, array layouts).

use std::fmt;

/// Index into a type space (module-local before instantiation, registry-global after)
pub type TypeIdx = u32;

/// The heap type a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapType {
    /// Any function reference
    Func,
    /// Any managed object reference
    Any,
    /// Any struct reference
    Struct,
    /// Any array reference
    Array,
    /// A reference to a specific defined type
    Concrete(TypeIdx),
}

/// A reference type: heap type plus nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefType {
    pub nullable: bool,
    pub heap_type: HeapType,
}

impl RefType {
    pub const FUNCREF: RefType = RefType {
        nullable: true,
        heap_type: HeapType::Func,
    };

    pub const ANYREF: RefType = RefType {
        nullable: true,
        heap_type: HeapType::Any,
    };

    /// `(ref null $t)`
    pub fn nullable(idx: TypeIdx) -> Self {
        RefType {
            nullable: true,
            heap_type: HeapType::Concrete(idx),
        }
    }

    /// `(ref $t)`
    pub fn non_null(idx: TypeIdx) -> Self {
        RefType {
            nullable: false,
            heap_type: HeapType::Concrete(idx),
        }
    }
}

/// Value types that can appear on the operand stack, in locals, globals and signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    Ref(RefType),
}

impl ValueType {
    pub const FUNCREF: ValueType = ValueType::Ref(RefType::FUNCREF);
    pub const ANYREF: ValueType = ValueType::Ref(RefType::ANYREF);

    pub fn is_ref(&self) -> bool {
        matches!(self, ValueType::Ref(_))
    }

    /// Two value types have the same kind if they are the same numeric type, or both references.
    ///
    /// Kind identity is what the calling convention preserves; reference subtyping is a
    /// validation-time concern.
    pub fn same_kind(&self, other: &ValueType) -> bool {
        match (self, other) {
            (ValueType::Ref(_), ValueType::Ref(_)) => true,
            (a, b) => a == b,
        }
    }
}

/// Storage type of a struct field or array element
///
/// Packed types (`I8`, `I16`) only exist in heap storage; on the stack they are i32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    I8,
    I16,
    Val(ValueType),
}

impl StorageType {
    /// Number of bytes the field occupies in an object's numeric payload.
    ///
    /// References are stored out of line in the object's reference slots and report 0.
    pub fn byte_width(&self) -> usize {
        match self {
            StorageType::I8 => 1,
            StorageType::I16 => 2,
            StorageType::Val(ValueType::I32) | StorageType::Val(ValueType::F32) => 4,
            StorageType::Val(ValueType::I64) | StorageType::Val(ValueType::F64) => 8,
            StorageType::Val(ValueType::Ref(_)) => 0,
        }
    }

    pub fn is_packed(&self) -> bool {
        matches!(self, StorageType::I8 | StorageType::I16)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, StorageType::Val(ValueType::Ref(_)))
    }

    /// The operand-stack type values of this storage type are read and written as
    pub fn unpacked(&self) -> ValueType {
        match self {
            StorageType::I8 | StorageType::I16 => ValueType::I32,
            StorageType::Val(t) => *t,
        }
    }
}

/// A struct field or array element declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub storage: StorageType,
    pub mutable: bool,
}

impl FieldType {
    pub fn mutable(storage: StorageType) -> Self {
        FieldType { storage, mutable: true }
    }

    pub fn immutable(storage: StorageType) -> Self {
        FieldType {
            storage,
            mutable: false,
        }
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl FuncType {
    pub fn new(params: Vec<ValueType>, results: Vec<ValueType>) -> Self {
        FuncType { params, results }
    }
}

/// Struct layout: ordered fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StructType {
    pub fields: Vec<FieldType>,
}

/// Where a field's value lives inside an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    /// Byte offset into the numeric payload
    Bytes(usize),
    /// Index into the reference slot vector
    Ref(usize),
}

/// Computed storage layout of a struct type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub fields: Vec<(FieldType, FieldLocation)>,
    pub byte_size: usize,
    pub ref_count: usize,
}

impl StructType {
    pub fn new(fields: Vec<FieldType>) -> Self {
        StructType { fields }
    }

    /// Lay fields out in declaration order; packed fields take exactly their width.
    pub fn layout(&self) -> StructLayout {
        let mut byte_size = 0;
        let mut ref_count = 0;
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let location = if field.storage.is_ref() {
                    ref_count += 1;
                    FieldLocation::Ref(ref_count - 1)
                } else {
                    let offset = byte_size;
                    byte_size += field.storage.byte_width();
                    FieldLocation::Bytes(offset)
                };
                (*field, location)
            })
            .collect();

        StructLayout {
            fields,
            byte_size,
            ref_count,
        }
    }
}

/// Array layout: a single homogeneous element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayType {
    pub field: FieldType,
}

/// An entry in the type section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Func(FuncType),
    Struct(StructType),
    Array(ArrayType),
}

impl TypeDescriptor {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDescriptor::Func(_) => "func",
            TypeDescriptor::Struct(_) => "struct",
            TypeDescriptor::Array(_) => "array",
        }
    }
}

impl fmt::Display for HeapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapType::Func => write!(f, "func"),
            HeapType::Any => write!(f, "any"),
            HeapType::Struct => write!(f, "struct"),
            HeapType::Array => write!(f, "array"),
            HeapType::Concrete(idx) => write!(f, "{idx}"),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::I32 => write!(f, "i32"),
            ValueType::I64 => write!(f, "i64"),
            ValueType::F32 => write!(f, "f32"),
            ValueType::F64 => write!(f, "f64"),
            ValueType::Ref(RefType { nullable, heap_type }) => {
                if *nullable {
                    write!(f, "(ref null {heap_type})")
                } else {
                    write!(f, "(ref {heap_type})")
                }
            }
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::I8 => write!(f, "i8"),
            StorageType::I16 => write!(f, "i16"),
            StorageType::Val(t) => write!(f, "{t}"),
        }
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |types: &[ValueType]| {
            types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        };
        write!(
            f,
            "({}) -> {}",
            join(&self.params),
            if self.results.is_empty() {
                "nil".to_string()
            } else if self.results.len() > 1 {
                format!("({})", join(&self.results))
            } else {
                self.results[0].to_string()
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_widths() {
        assert_eq!(StorageType::I8.byte_width(), 1);
        assert_eq!(StorageType::I16.byte_width(), 2);
        assert_eq!(StorageType::Val(ValueType::F32).byte_width(), 4);
        assert_eq!(StorageType::Val(ValueType::I64).byte_width(), 8);
        assert_eq!(StorageType::Val(ValueType::ANYREF).byte_width(), 0);
    }

    #[test]
    fn test_unpacked_type() {
        assert_eq!(StorageType::I8.unpacked(), ValueType::I32);
        assert_eq!(StorageType::I16.unpacked(), ValueType::I32);
        assert_eq!(StorageType::Val(ValueType::F64).unpacked(), ValueType::F64);
    }

    #[test]
    fn test_same_kind() {
        assert!(ValueType::FUNCREF.same_kind(&ValueType::Ref(RefType::non_null(3))));
        assert!(!ValueType::I32.same_kind(&ValueType::I64));
        assert!(!ValueType::F32.same_kind(&ValueType::ANYREF));
    }

    #[test]
    fn test_struct_layout() {
        let ty = StructType::new(vec![
            FieldType::mutable(StorageType::I8),
            FieldType::mutable(StorageType::Val(ValueType::ANYREF)),
            FieldType::immutable(StorageType::I16),
            FieldType::mutable(StorageType::Val(ValueType::I64)),
            FieldType::mutable(StorageType::Val(ValueType::FUNCREF)),
        ]);
        let layout = ty.layout();
        let locations: Vec<FieldLocation> = layout.fields.iter().map(|(_, loc)| *loc).collect();
        assert_eq!(
            locations,
            vec![
                FieldLocation::Bytes(0),
                FieldLocation::Ref(0),
                FieldLocation::Bytes(1),
                FieldLocation::Bytes(3),
                FieldLocation::Ref(1),
            ]
        );
        assert_eq!(layout.byte_size, 11);
        assert_eq!(layout.ref_count, 2);
    }

    #[test]
    fn test_func_type_display() {
        let ty = FuncType::new(vec![ValueType::I32, ValueType::F64], vec![ValueType::I64]);
        assert_eq!(ty.to_string(), "(i32, f64) -> i64");
        let ty = FuncType::new(vec![], vec![]);
        assert_eq!(ty.to_string(), "() -> nil");
        let ty = FuncType::new(vec![], vec![ValueType::I32, ValueType::FUNCREF]);
        assert_eq!(ty.to_string(), "() -> (i32, (ref null func))");
    }
}
