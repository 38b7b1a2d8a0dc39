//! Module instances
//!
//! An instance is the result of instantiating a [`crate::module::Module`] in a store: it maps
//! every module-local index space (types, functions, tables, globals, tags) to store addresses.
//! Imports occupy the low end of each index space, in import order.

use super::{FuncAddr, GlobalAddr, RuntimeError, TableAddr, TagAddr};
use crate::module::TypeIdx;
use std::collections::HashMap;

/// An exported entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extern {
    Func(FuncAddr),
    Table(TableAddr),
    Global(GlobalAddr),
    Tag(TagAddr),
}

/// An instantiated module
#[derive(Debug, Default)]
pub struct Instance {
    pub name: String,
    /// Module-local type index to registry index
    pub(crate) types: Vec<TypeIdx>,
    pub(crate) functions: Vec<FuncAddr>,
    pub(crate) tables: Vec<TableAddr>,
    pub(crate) globals: Vec<GlobalAddr>,
    pub(crate) tags: Vec<TagAddr>,
    pub(crate) exports: HashMap<String, Extern>,
}

impl Instance {
    /// Registry index of the module-local type `idx`
    pub fn type_idx(&self, idx: TypeIdx) -> Result<TypeIdx, RuntimeError> {
        self.types.get(idx as usize).copied().ok_or(RuntimeError::UnknownType(idx))
    }

    pub fn func_addr(&self, idx: u32) -> Result<FuncAddr, RuntimeError> {
        self.functions
            .get(idx as usize)
            .copied()
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(idx))
    }

    pub fn table_addr(&self, idx: u32) -> Result<TableAddr, RuntimeError> {
        self.tables
            .get(idx as usize)
            .copied()
            .ok_or(RuntimeError::TableIndexOutOfBounds(idx))
    }

    pub fn global_addr(&self, idx: u32) -> Result<GlobalAddr, RuntimeError> {
        self.globals
            .get(idx as usize)
            .copied()
            .ok_or(RuntimeError::GlobalIndexOutOfBounds(idx))
    }

    pub fn tag_addr(&self, idx: u32) -> Result<TagAddr, RuntimeError> {
        self.tags.get(idx as usize).copied().ok_or(RuntimeError::TagIndexOutOfBounds(idx))
    }

    /// Look up an export by name
    pub fn export(&self, name: &str) -> Result<Extern, RuntimeError> {
        self.exports
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))
    }

    /// Look up an exported function by name
    ///
    /// # Errors
    /// Returns `UnknownExport` if there is no function export of that name
    pub fn exported_function(&self, name: &str) -> Result<FuncAddr, RuntimeError> {
        match self.export(name)? {
            Extern::Func(addr) => Ok(addr),
            _ => Err(RuntimeError::UnknownExport(name.to_string())),
        }
    }

    pub fn exported_global(&self, name: &str) -> Result<GlobalAddr, RuntimeError> {
        match self.export(name)? {
            Extern::Global(addr) => Ok(addr),
            _ => Err(RuntimeError::UnknownExport(name.to_string())),
        }
    }

    pub fn exported_table(&self, name: &str) -> Result<TableAddr, RuntimeError> {
        match self.export(name)? {
            Extern::Table(addr) => Ok(addr),
            _ => Err(RuntimeError::UnknownExport(name.to_string())),
        }
    }

    /// All exports, in no particular order
    pub fn exports(&self) -> impl Iterator<Item = (&str, Extern)> {
        self.exports.iter().map(|(name, ext)| (name.as_str(), *ext))
    }
}
