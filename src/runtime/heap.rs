//! Object heap for struct and array instances
//!
//! Objects are addressed through [`ObjectRef`] handles. Numeric fields and elements are packed
//! little-endian into a byte buffer at layout offsets, so an `i8` field occupies exactly one
//! byte and an `i16` field two. Reference fields live in a separate slot vector.
//!
//! Reclamation belongs to an external collector; the heap only allocates and grants field
//! access, and exposes [`Heap::object_count`] for diagnostics.

use super::{registry::TypeRegistry, trap::Trap, Ref, RuntimeError, Value};
use crate::module::{FieldLocation, FieldType, StorageType, StructLayout, TypeIdx, ValueType};
use byteorder::{ByteOrder, LittleEndian};
use std::rc::Rc;

/// Largest element count `array.new` and friends will allocate
pub const MAX_ARRAY_LENGTH: u32 = 1 << 26;

/// Handle to a heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub usize);

/// How a packed field is widened to i32 when read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// Plain read; only valid for unpacked storage
    None,
    /// Sign-extend packed storage
    Signed,
    /// Zero-extend packed storage
    Unsigned,
}

#[derive(Debug)]
struct Payload {
    bytes: Vec<u8>,
    refs: Vec<Ref>,
}

#[derive(Debug)]
enum HeapObject {
    Struct {
        type_idx: TypeIdx,
        layout: Rc<StructLayout>,
        payload: Payload,
    },
    Array {
        type_idx: TypeIdx,
        element: FieldType,
        len: u32,
        payload: Payload,
    },
}

#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap { objects: Vec::new() }
    }

    /// Number of live allocations
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Allocate a struct with one value per field, in field order
    pub fn new_struct(
        &mut self,
        registry: &TypeRegistry,
        type_idx: TypeIdx,
        values: &[Value],
    ) -> Result<Ref, RuntimeError> {
        let layout = registry.struct_layout(type_idx)?;
        if values.len() != layout.fields.len() {
            return Err(RuntimeError::TypeMismatch {
                expected: format!("{} field values", layout.fields.len()),
                actual: format!("{} field values", values.len()),
            });
        }

        let mut payload = Payload {
            bytes: vec![0; layout.byte_size],
            refs: vec![Ref::Null; layout.ref_count],
        };
        for ((field, location), value) in layout.fields.iter().zip(values) {
            write_storage(&mut payload, field.storage, *location, *value)?;
        }

        Ok(Ref::Struct(self.allocate(HeapObject::Struct {
            type_idx,
            layout,
            payload,
        })))
    }

    /// Allocate a struct with every field zero or null
    pub fn new_struct_default(&mut self, registry: &TypeRegistry, type_idx: TypeIdx) -> Result<Ref, RuntimeError> {
        let layout = registry.struct_layout(type_idx)?;
        let payload = Payload {
            bytes: vec![0; layout.byte_size],
            refs: vec![Ref::Null; layout.ref_count],
        };
        Ok(Ref::Struct(self.allocate(HeapObject::Struct {
            type_idx,
            layout,
            payload,
        })))
    }

    /// Allocate an array of `len` copies of `fill`
    pub fn new_array(
        &mut self,
        registry: &TypeRegistry,
        type_idx: TypeIdx,
        len: u32,
        fill: Value,
    ) -> Result<Ref, RuntimeError> {
        let element = registry.array_type(type_idx)?.field;
        let mut payload = array_payload(element, len)?;
        for index in 0..len {
            write_storage(&mut payload, element.storage, element_location(element, index), fill)?;
        }
        Ok(Ref::Array(self.allocate(HeapObject::Array {
            type_idx,
            element,
            len,
            payload,
        })))
    }

    /// Allocate an array of `len` zero/null elements
    pub fn new_array_default(&mut self, registry: &TypeRegistry, type_idx: TypeIdx, len: u32) -> Result<Ref, RuntimeError> {
        let element = registry.array_type(type_idx)?.field;
        let payload = array_payload(element, len)?;
        Ok(Ref::Array(self.allocate(HeapObject::Array {
            type_idx,
            element,
            len,
            payload,
        })))
    }

    /// Allocate an array holding exactly `values`, in order
    pub fn new_array_fixed(
        &mut self,
        registry: &TypeRegistry,
        type_idx: TypeIdx,
        values: &[Value],
    ) -> Result<Ref, RuntimeError> {
        let element = registry.array_type(type_idx)?.field;
        let len = values.len() as u32;
        let mut payload = array_payload(element, len)?;
        for (index, value) in values.iter().enumerate() {
            write_storage(&mut payload, element.storage, element_location(element, index as u32), *value)?;
        }
        Ok(Ref::Array(self.allocate(HeapObject::Array {
            type_idx,
            element,
            len,
            payload,
        })))
    }

    pub fn struct_get(&self, target: Ref, field_idx: u32, extension: Extension) -> Result<Value, RuntimeError> {
        let (layout, payload) = self.struct_parts(target)?;
        let (field, location) = field_of(layout, field_idx)?;
        read_storage(payload, field.storage, location, extension)
    }

    pub fn struct_set(&mut self, target: Ref, field_idx: u32, value: Value) -> Result<(), RuntimeError> {
        let (layout, payload) = self.struct_parts_mut(target)?;
        let (field, location) = field_of(layout, field_idx)?;
        if !field.mutable {
            return Err(RuntimeError::ImmutableField(field_idx));
        }
        write_storage(payload, field.storage, location, value)
    }

    pub fn array_get(&self, target: Ref, index: u32, extension: Extension) -> Result<Value, RuntimeError> {
        let (element, len, payload) = self.array_parts(target)?;
        if index >= len {
            return Err(Trap::array_out_of_bounds().into());
        }
        read_storage(payload, element.storage, element_location(element, index), extension)
    }

    pub fn array_set(&mut self, target: Ref, index: u32, value: Value) -> Result<(), RuntimeError> {
        let (element, len, payload) = self.array_parts_mut(target)?;
        if index >= len {
            return Err(Trap::array_out_of_bounds().into());
        }
        if !element.mutable {
            return Err(RuntimeError::ImmutableField(index));
        }
        write_storage(payload, element.storage, element_location(element, index), value)
    }

    pub fn array_len(&self, target: Ref) -> Result<u32, RuntimeError> {
        self.array_parts(target).map(|(_, len, _)| len)
    }

    /// Registered type of the object behind `target`
    pub fn type_of(&self, target: Ref) -> Result<TypeIdx, RuntimeError> {
        match self.object(target)? {
            HeapObject::Struct { type_idx, .. } | HeapObject::Array { type_idx, .. } => Ok(*type_idx),
        }
    }

    fn allocate(&mut self, object: HeapObject) -> ObjectRef {
        self.objects.push(object);
        ObjectRef(self.objects.len() - 1)
    }

    fn object(&self, target: Ref) -> Result<&HeapObject, RuntimeError> {
        let obj = object_ref(target)?;
        self.objects.get(obj.0).ok_or(RuntimeError::InvalidObject(obj.0))
    }

    fn object_mut(&mut self, target: Ref) -> Result<&mut HeapObject, RuntimeError> {
        let obj = object_ref(target)?;
        self.objects.get_mut(obj.0).ok_or(RuntimeError::InvalidObject(obj.0))
    }

    fn struct_parts(&self, target: Ref) -> Result<(&StructLayout, &Payload), RuntimeError> {
        match self.object(target)? {
            HeapObject::Struct { layout, payload, .. } => Ok((&**layout, payload)),
            HeapObject::Array { .. } => Err(not_a("struct", "array")),
        }
    }

    fn struct_parts_mut(&mut self, target: Ref) -> Result<(&StructLayout, &mut Payload), RuntimeError> {
        match self.object_mut(target)? {
            HeapObject::Struct { layout, payload, .. } => Ok((&**layout, payload)),
            HeapObject::Array { .. } => Err(not_a("struct", "array")),
        }
    }

    fn array_parts(&self, target: Ref) -> Result<(FieldType, u32, &Payload), RuntimeError> {
        match self.object(target)? {
            HeapObject::Array {
                element, len, payload, ..
            } => Ok((*element, *len, payload)),
            HeapObject::Struct { .. } => Err(not_a("array", "struct")),
        }
    }

    fn array_parts_mut(&mut self, target: Ref) -> Result<(FieldType, u32, &mut Payload), RuntimeError> {
        match self.object_mut(target)? {
            HeapObject::Array {
                element, len, payload, ..
            } => Ok((*element, *len, payload)),
            HeapObject::Struct { .. } => Err(not_a("array", "struct")),
        }
    }
}

fn object_ref(target: Ref) -> Result<ObjectRef, RuntimeError> {
    match target {
        Ref::Null => Err(Trap::null_reference().into()),
        Ref::Struct(obj) | Ref::Array(obj) => Ok(obj),
        Ref::Func(_) => Err(not_a("object", "func")),
    }
}

fn not_a(expected: &str, actual: &str) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected: format!("{expected} reference"),
        actual: format!("{actual} reference"),
    }
}

fn field_of(layout: &StructLayout, field_idx: u32) -> Result<(FieldType, FieldLocation), RuntimeError> {
    layout
        .fields
        .get(field_idx as usize)
        .copied()
        .ok_or(RuntimeError::FieldIndexOutOfBounds(field_idx))
}

fn array_payload(element: FieldType, len: u32) -> Result<Payload, RuntimeError> {
    if len > MAX_ARRAY_LENGTH {
        return Err(Trap::array_too_large().into());
    }
    Ok(if element.storage.is_ref() {
        Payload {
            bytes: Vec::new(),
            refs: vec![Ref::Null; len as usize],
        }
    } else {
        Payload {
            bytes: vec![0; element.storage.byte_width() * len as usize],
            refs: Vec::new(),
        }
    })
}

fn element_location(element: FieldType, index: u32) -> FieldLocation {
    if element.storage.is_ref() {
        FieldLocation::Ref(index as usize)
    } else {
        FieldLocation::Bytes(index as usize * element.storage.byte_width())
    }
}

fn read_storage(
    payload: &Payload,
    storage: StorageType,
    location: FieldLocation,
    extension: Extension,
) -> Result<Value, RuntimeError> {
    if storage.is_packed() == (extension == Extension::None) {
        return Err(RuntimeError::TypeMismatch {
            expected: if storage.is_packed() {
                format!("signed or unsigned read of {storage}")
            } else {
                format!("plain read of {storage}")
            },
            actual: format!("{extension:?} read"),
        });
    }

    match location {
        FieldLocation::Ref(slot) => Ok(Value::Ref(payload.refs[slot])),
        FieldLocation::Bytes(offset) => {
            let bytes = &payload.bytes[offset..];
            Ok(match storage {
                StorageType::I8 if extension == Extension::Signed => Value::I32(bytes[0] as i8 as i32),
                StorageType::I8 => Value::I32(bytes[0] as i32),
                StorageType::I16 if extension == Extension::Signed => Value::I32(LittleEndian::read_i16(bytes) as i32),
                StorageType::I16 => Value::I32(LittleEndian::read_u16(bytes) as i32),
                StorageType::Val(ValueType::I32) => Value::I32(LittleEndian::read_i32(bytes)),
                StorageType::Val(ValueType::I64) => Value::I64(LittleEndian::read_i64(bytes)),
                StorageType::Val(ValueType::F32) => Value::F32(LittleEndian::read_f32(bytes)),
                StorageType::Val(ValueType::F64) => Value::F64(LittleEndian::read_f64(bytes)),
                StorageType::Val(ValueType::Ref(_)) => Value::NULL,
            })
        }
    }
}

/// Store `value`, truncating packed storage to its width
fn write_storage(
    payload: &mut Payload,
    storage: StorageType,
    location: FieldLocation,
    value: Value,
) -> Result<(), RuntimeError> {
    if !value.matches_kind(&storage.unpacked()) {
        return Err(RuntimeError::TypeMismatch {
            expected: storage.unpacked().to_string(),
            actual: value.typ().to_string(),
        });
    }

    match (location, value) {
        (FieldLocation::Ref(slot), Value::Ref(r)) => payload.refs[slot] = r,
        (FieldLocation::Bytes(offset), value) => {
            let bytes = &mut payload.bytes[offset..];
            match (storage, value) {
                (StorageType::I8, Value::I32(v)) => bytes[0] = v as u8,
                (StorageType::I16, Value::I32(v)) => LittleEndian::write_u16(bytes, v as u16),
                (_, Value::I32(v)) => LittleEndian::write_i32(bytes, v),
                (_, Value::I64(v)) => LittleEndian::write_i64(bytes, v),
                (_, Value::F32(v)) => LittleEndian::write_f32(bytes, v),
                (_, Value::F64(v)) => LittleEndian::write_f64(bytes, v),
                (_, Value::Ref(_)) => {}
            }
        }
        (FieldLocation::Ref(_), _) => {}
    }
    Ok(())
}
