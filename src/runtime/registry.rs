//! Type registry
//!
//! An arena of immutable type descriptors indexed by [`TypeIdx`]. Every module's type section is
//! registered at instantiation and host functions register their signatures on allocation, so
//! function references from any instance can be compared through the same registry.

use super::RuntimeError;
use crate::module::{ArrayType, FuncType, StructLayout, StructType, TypeDescriptor, TypeIdx};
use std::rc::Rc;

#[derive(Debug)]
struct Entry {
    descriptor: TypeDescriptor,
    /// Cached layout for struct types
    layout: Option<Rc<StructLayout>>,
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: Vec<Entry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry { entries: Vec::new() }
    }

    /// Append a descriptor and return its index; descriptors are never mutated afterwards.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> TypeIdx {
        let layout = match &descriptor {
            TypeDescriptor::Struct(ty) => Some(Rc::new(ty.layout())),
            _ => None,
        };
        self.entries.push(Entry { descriptor, layout });
        (self.entries.len() - 1) as TypeIdx
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, idx: TypeIdx) -> Result<&TypeDescriptor, RuntimeError> {
        self.entries
            .get(idx as usize)
            .map(|entry| &entry.descriptor)
            .ok_or(RuntimeError::UnknownType(idx))
    }

    pub fn func_type(&self, idx: TypeIdx) -> Result<&FuncType, RuntimeError> {
        match self.resolve(idx)? {
            TypeDescriptor::Func(ty) => Ok(ty),
            other => Err(unexpected_kind(idx, "func", other)),
        }
    }

    pub fn struct_type(&self, idx: TypeIdx) -> Result<&StructType, RuntimeError> {
        match self.resolve(idx)? {
            TypeDescriptor::Struct(ty) => Ok(ty),
            other => Err(unexpected_kind(idx, "struct", other)),
        }
    }

    pub fn array_type(&self, idx: TypeIdx) -> Result<&ArrayType, RuntimeError> {
        match self.resolve(idx)? {
            TypeDescriptor::Array(ty) => Ok(ty),
            other => Err(unexpected_kind(idx, "array", other)),
        }
    }

    pub fn struct_layout(&self, idx: TypeIdx) -> Result<Rc<StructLayout>, RuntimeError> {
        let entry = self.entries.get(idx as usize).ok_or(RuntimeError::UnknownType(idx))?;
        entry
            .layout
            .clone()
            .ok_or_else(|| unexpected_kind(idx, "struct", &entry.descriptor))
    }

    /// True if both signatures have the same ordered parameter and result kinds.
    ///
    /// No coercion and no subtyping: an `i32` never matches an `i64`, and all references are
    /// one kind.
    pub fn signature_equals(a: &FuncType, b: &FuncType) -> bool {
        a.params.len() == b.params.len()
            && a.results.len() == b.results.len()
            && a.params.iter().zip(&b.params).all(|(x, y)| x.same_kind(y))
            && a.results.iter().zip(&b.results).all(|(x, y)| x.same_kind(y))
    }
}

fn unexpected_kind(idx: TypeIdx, expected: &'static str, actual: &TypeDescriptor) -> RuntimeError {
    RuntimeError::UnexpectedTypeKind {
        idx,
        expected,
        actual: actual.kind_name(),
    }
}
