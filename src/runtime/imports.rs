//! Import resolution
//!
//! An [`ImportObject`] maps `(module, name)` pairs to store addresses. Host functions are
//! allocated in the store first and then registered here; exports of an instantiated module can
//! be registered wholesale with [`crate::runtime::Store::register_exports`].

use super::{FuncAddr, GlobalAddr, RuntimeError, TableAddr, TagAddr};
use std::collections::HashMap;

/// Container for the entities a module can import
#[derive(Debug, Clone, Default)]
pub struct ImportObject {
    /// Imported functions mapped by (module_name, field_name)
    pub functions: HashMap<(String, String), FuncAddr>,
    /// Imported tables mapped by (module_name, field_name)
    pub tables: HashMap<(String, String), TableAddr>,
    /// Imported globals mapped by (module_name, field_name)
    pub globals: HashMap<(String, String), GlobalAddr>,
    /// Imported exception tags mapped by (module_name, field_name)
    pub tags: HashMap<(String, String), TagAddr>,
}

impl ImportObject {
    /// Create a new empty import object
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function import
    pub fn add_function(&mut self, module: impl Into<String>, name: impl Into<String>, addr: FuncAddr) {
        self.functions.insert((module.into(), name.into()), addr);
    }

    /// Get a function import
    ///
    /// # Errors
    /// Returns `UnknownImport` if the import doesn't exist
    pub fn get_function(&self, module: &str, name: &str) -> Result<FuncAddr, RuntimeError> {
        lookup(&self.functions, module, name)
    }

    pub fn add_table(&mut self, module: impl Into<String>, name: impl Into<String>, addr: TableAddr) {
        self.tables.insert((module.into(), name.into()), addr);
    }

    pub fn get_table(&self, module: &str, name: &str) -> Result<TableAddr, RuntimeError> {
        lookup(&self.tables, module, name)
    }

    pub fn add_global(&mut self, module: impl Into<String>, name: impl Into<String>, addr: GlobalAddr) {
        self.globals.insert((module.into(), name.into()), addr);
    }

    pub fn get_global(&self, module: &str, name: &str) -> Result<GlobalAddr, RuntimeError> {
        lookup(&self.globals, module, name)
    }

    pub fn add_tag(&mut self, module: impl Into<String>, name: impl Into<String>, addr: TagAddr) {
        self.tags.insert((module.into(), name.into()), addr);
    }

    pub fn get_tag(&self, module: &str, name: &str) -> Result<TagAddr, RuntimeError> {
        lookup(&self.tags, module, name)
    }
}

fn lookup<A: Copy>(map: &HashMap<(String, String), A>, module: &str, name: &str) -> Result<A, RuntimeError> {
    map.get(&(module.to_string(), name.to_string()))
        .copied()
        .ok_or_else(|| RuntimeError::UnknownImport(format!("{module}.{name}")))
}
