//! The store: owner of every runtime entity
//!
//! Functions, tables, globals, tags, heap objects and instances all live here and are addressed
//! by store-wide handles, so references (a `funcref` in a table, an imported global, a tag
//! thrown across modules) work the same no matter which instance created them.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Store                            │
//! │  registry   [0] (i32) -> i32   [1] struct{i16}  ...      │
//! │  functions  [0] Host{print}    [1] Wasm{inst 0, code}    │
//! │  tables     [0] [f1, null, f1, ...]                      │
//! │  globals    [0] i32 mut = 7                              │
//! │  tags       [0] (i32)                                    │
//! │  heap       objects addressed by ObjectRef               │
//! │  instances  [0] module_a   [1] module_b (imports a)      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All execution goes through [`Store::invoke`], which runs an [`Executor`] over the store.

use super::code::FunctionCode;
use super::executor::Executor;
use super::heap::Heap;
use super::imports::ImportObject;
use super::instance::{Extern, Instance};
use super::registry::TypeRegistry;
use super::{ExecutionConfig, Ref, RuntimeError, Table, Value};
use crate::module::{ConstExpr, ExportIndex, FuncType, ImportKind, Module, TableDef, TypeDescriptor, TypeIdx, ValueType};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Type alias for host function implementations
pub type HostFunc = Rc<dyn Fn(Vec<Value>) -> Result<Vec<Value>, RuntimeError>>;

/// Store-wide function address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncAddr(pub usize);

/// Store-wide table address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableAddr(pub usize);

/// Store-wide global address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalAddr(pub usize);

/// Store-wide exception tag address; exceptions match on this identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagAddr(pub usize);

/// A function instance in the store
#[derive(Clone)]
pub enum FunctionInstance {
    /// Function defined by a module
    Wasm {
        /// Index of the defining instance in the store
        instance_id: usize,
        code: Rc<FunctionCode>,
    },
    /// Native function provided by the embedder
    Host {
        func: HostFunc,
        signature: Rc<FuncType>,
        type_idx: TypeIdx,
    },
}

impl FunctionInstance {
    pub fn signature(&self) -> &FuncType {
        match self {
            FunctionInstance::Wasm { code, .. } => &code.signature,
            FunctionInstance::Host { signature, .. } => signature,
        }
    }

    /// Registry index of the function's type
    pub fn type_idx(&self) -> TypeIdx {
        match self {
            FunctionInstance::Wasm { code, .. } => code.type_idx,
            FunctionInstance::Host { type_idx, .. } => *type_idx,
        }
    }
}

impl fmt::Debug for FunctionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionInstance::Wasm { instance_id, code } => f
                .debug_struct("Wasm")
                .field("instance_id", instance_id)
                .field("signature", &code.signature.to_string())
                .finish(),
            FunctionInstance::Host { signature, .. } => {
                f.debug_struct("Host").field("signature", &signature.to_string()).finish()
            }
        }
    }
}

/// A global variable
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalInstance {
    pub ty: ValueType,
    pub mutable: bool,
    pub value: Value,
}

/// An exception tag; its signature's parameters describe the payload
#[derive(Debug, Clone, PartialEq)]
pub struct TagInstance {
    pub type_idx: TypeIdx,
    pub signature: FuncType,
}

/// The store - owns all runtime entities and the instances that refer to them
#[derive(Debug, Default)]
pub struct Store {
    registry: TypeRegistry,
    functions: Vec<FunctionInstance>,
    tables: Vec<Table>,
    globals: Vec<GlobalInstance>,
    tags: Vec<TagInstance>,
    heap: Heap,
    instances: Vec<Instance>,
    config: ExecutionConfig,
}

impl Store {
    /// Create an empty store with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given limits
    pub fn with_config(config: ExecutionConfig) -> Self {
        Store {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable heap together with the registry that describes its objects
    pub(crate) fn heap_parts(&mut self) -> (&mut Heap, &TypeRegistry) {
        (&mut self.heap, &self.registry)
    }

    /// Register a host function with the given signature
    pub fn allocate_host_function(
        &mut self,
        signature: FuncType,
        func: impl Fn(Vec<Value>) -> Result<Vec<Value>, RuntimeError> + 'static,
    ) -> FuncAddr {
        let type_idx = self.registry.register(TypeDescriptor::Func(signature.clone()));
        self.push_function(FunctionInstance::Host {
            func: Rc::new(func),
            signature: Rc::new(signature),
            type_idx,
        })
    }

    pub fn allocate_table(&mut self, def: TableDef) -> TableAddr {
        self.tables.push(Table::new(def.elem_type, def.capacity));
        TableAddr(self.tables.len() - 1)
    }

    /// Allocate a global holding `value`
    ///
    /// # Errors
    /// Returns `TypeMismatch` if `value` is not of kind `ty`
    pub fn allocate_global(&mut self, ty: ValueType, mutable: bool, value: Value) -> Result<GlobalAddr, RuntimeError> {
        if !value.matches_kind(&ty) {
            return Err(RuntimeError::TypeMismatch {
                expected: ty.to_string(),
                actual: value.typ().to_string(),
            });
        }
        self.globals.push(GlobalInstance { ty, mutable, value });
        Ok(GlobalAddr(self.globals.len() - 1))
    }

    /// Allocate a fresh tag; every allocation is a distinct identity even for equal signatures
    pub fn allocate_tag(&mut self, signature: FuncType) -> TagAddr {
        let type_idx = self.registry.register(TypeDescriptor::Func(signature.clone()));
        self.push_tag(TagInstance { type_idx, signature })
    }

    pub fn function(&self, addr: FuncAddr) -> Result<&FunctionInstance, RuntimeError> {
        self.functions
            .get(addr.0)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(addr.0 as u32))
    }

    /// Compiled code of a module-defined function; `None` for host functions
    pub fn function_code(&self, addr: FuncAddr) -> Option<Rc<FunctionCode>> {
        match self.functions.get(addr.0) {
            Some(FunctionInstance::Wasm { code, .. }) => Some(Rc::clone(code)),
            _ => None,
        }
    }

    pub fn table(&self, addr: TableAddr) -> Result<&Table, RuntimeError> {
        self.tables
            .get(addr.0)
            .ok_or(RuntimeError::TableIndexOutOfBounds(addr.0 as u32))
    }

    pub fn global(&self, addr: GlobalAddr) -> Result<&GlobalInstance, RuntimeError> {
        self.globals
            .get(addr.0)
            .ok_or(RuntimeError::GlobalIndexOutOfBounds(addr.0 as u32))
    }

    pub fn global_mut(&mut self, addr: GlobalAddr) -> Result<&mut GlobalInstance, RuntimeError> {
        self.globals
            .get_mut(addr.0)
            .ok_or(RuntimeError::GlobalIndexOutOfBounds(addr.0 as u32))
    }

    /// Current value of a global
    pub fn global_value(&self, addr: GlobalAddr) -> Result<Value, RuntimeError> {
        self.global(addr).map(|global| global.value)
    }

    pub fn tag(&self, addr: TagAddr) -> Result<&TagInstance, RuntimeError> {
        self.tags.get(addr.0).ok_or(RuntimeError::TagIndexOutOfBounds(addr.0 as u32))
    }

    pub fn instance(&self, instance_id: usize) -> Result<&Instance, RuntimeError> {
        self.instances
            .get(instance_id)
            .ok_or(RuntimeError::InstanceNotFound(instance_id))
    }

    /// Instantiate `module`, resolving its imports from `imports`
    ///
    /// Registers the module's types, checks and binds imports, allocates tags, functions,
    /// globals and tables, installs element segments and finally runs the start function.
    /// Returns the new instance's id.
    pub fn instantiate(&mut self, module: &Module, imports: &ImportObject) -> Result<usize, RuntimeError> {
        let instance_id = self.instances.len();
        let mut instance = Instance {
            name: module.name.clone(),
            ..Default::default()
        };

        for descriptor in &module.types {
            instance.types.push(self.registry.register(descriptor.clone()));
        }

        self.resolve_imports(module, imports, &mut instance)?;

        for tag in &module.tags {
            let type_idx = instance.type_idx(tag.type_idx)?;
            let signature = self.registry.func_type(type_idx)?.clone();
            let addr = self.push_tag(TagInstance { type_idx, signature });
            instance.tags.push(addr);
        }

        // Function addresses are assigned before any body runs so that `ref.func` in a global
        // initializer can name any function of the module.
        for func in &module.functions {
            let type_idx = instance.type_idx(func.type_idx)?;
            let signature = self.registry.func_type(type_idx)?.clone();
            let code = FunctionCode::compile(module, func, type_idx, signature)?;
            let addr = self.push_function(FunctionInstance::Wasm {
                instance_id,
                code: Rc::new(code),
            });
            instance.functions.push(addr);
        }

        for global in &module.globals {
            let value = self.eval_const(&global.init, &instance)?;
            if !value.matches_kind(&global.ty) {
                return Err(RuntimeError::InvalidConstExpr(format!(
                    "initializer of type {} for global of type {}",
                    value.typ(),
                    global.ty
                )));
            }
            let addr = self.allocate_global(global.ty, global.mutable, value)?;
            instance.globals.push(addr);
        }

        for def in &module.tables {
            let addr = self.allocate_table(*def);
            instance.tables.push(addr);
        }

        for export in &module.exports {
            let ext = match export.index {
                ExportIndex::Function(idx) => Extern::Func(instance.func_addr(idx)?),
                ExportIndex::Table(idx) => Extern::Table(instance.table_addr(idx)?),
                ExportIndex::Global(idx) => Extern::Global(instance.global_addr(idx)?),
                ExportIndex::Tag(idx) => Extern::Tag(instance.tag_addr(idx)?),
            };
            instance.exports.insert(export.name.clone(), ext);
        }

        let mut segments = Vec::with_capacity(module.elements.len());
        for segment in &module.elements {
            let table = instance.table_addr(segment.table_idx)?;
            let offset = match self.eval_const(&segment.offset, &instance)? {
                Value::I32(offset) => offset,
                other => {
                    return Err(RuntimeError::InvalidConstExpr(format!(
                        "element segment offset of type {}",
                        other.typ()
                    )))
                }
            };
            let funcs = segment
                .func_indices
                .iter()
                .map(|idx| instance.func_addr(*idx))
                .collect::<Result<Vec<_>, _>>()?;
            segments.push((table, offset, funcs));
        }

        let start = module.start.map(|idx| instance.func_addr(idx)).transpose()?;
        self.instances.push(instance);

        for (table, offset, funcs) in segments {
            let table = self
                .tables
                .get_mut(table.0)
                .ok_or(RuntimeError::TableIndexOutOfBounds(table.0 as u32))?;
            if offset < 0 {
                return Err(RuntimeError::ElementSegmentOutOfBounds {
                    offset: offset as u32,
                    len: funcs.len(),
                    size: table.size(),
                });
            }
            table.initialize(offset as u32, &funcs)?;
        }

        debug!(
            module = %module.name,
            instance = instance_id,
            functions = module.functions.len(),
            "instantiated module"
        );

        if let Some(start) = start {
            self.invoke(start, vec![])?;
        }

        Ok(instance_id)
    }

    fn resolve_imports(
        &mut self,
        module: &Module,
        imports: &ImportObject,
        instance: &mut Instance,
    ) -> Result<(), RuntimeError> {
        for import in &module.imports {
            let mismatch = |expected: String, actual: String| RuntimeError::ImportTypeMismatch {
                module: import.module.clone(),
                name: import.name.clone(),
                expected,
                actual,
            };
            match &import.kind {
                ImportKind::Function(type_idx) => {
                    let addr = imports.get_function(&import.module, &import.name)?;
                    let expected = module.func_type(*type_idx).ok_or(RuntimeError::UnknownType(*type_idx))?;
                    let actual = self.function(addr)?.signature();
                    if !TypeRegistry::signature_equals(expected, actual) {
                        return Err(mismatch(expected.to_string(), actual.to_string()));
                    }
                    instance.functions.push(addr);
                }
                ImportKind::Table(def) => {
                    let addr = imports.get_table(&import.module, &import.name)?;
                    let table = self.table(addr)?;
                    if table.elem_type() != def.elem_type || table.size() < def.capacity {
                        return Err(mismatch(
                            format!("table of {} with {} slots", ValueType::Ref(def.elem_type), def.capacity),
                            format!("table of {} with {} slots", ValueType::Ref(table.elem_type()), table.size()),
                        ));
                    }
                    instance.tables.push(addr);
                }
                ImportKind::Global { ty, mutable } => {
                    let addr = imports.get_global(&import.module, &import.name)?;
                    let global = self.global(addr)?;
                    if !global.ty.same_kind(ty) || global.mutable != *mutable {
                        return Err(mismatch(describe_global(*ty, *mutable), describe_global(global.ty, global.mutable)));
                    }
                    instance.globals.push(addr);
                }
                ImportKind::Tag(type_idx) => {
                    let addr = imports.get_tag(&import.module, &import.name)?;
                    let expected = module.func_type(*type_idx).ok_or(RuntimeError::UnknownType(*type_idx))?;
                    let actual = &self.tag(addr)?.signature;
                    if !TypeRegistry::signature_equals(expected, actual) {
                        return Err(mismatch(expected.to_string(), actual.to_string()));
                    }
                    instance.tags.push(addr);
                }
            }
        }
        Ok(())
    }

    fn eval_const(&self, expr: &ConstExpr, instance: &Instance) -> Result<Value, RuntimeError> {
        Ok(match *expr {
            ConstExpr::I32(v) => Value::I32(v),
            ConstExpr::I64(v) => Value::I64(v),
            ConstExpr::F32(v) => Value::F32(v),
            ConstExpr::F64(v) => Value::F64(v),
            ConstExpr::RefNull => Value::NULL,
            ConstExpr::RefFunc(idx) => Value::Ref(Ref::Func(instance.func_addr(idx)?)),
            ConstExpr::GlobalGet(idx) => self.global_value(instance.global_addr(idx)?)?,
        })
    }

    fn push_function(&mut self, func: FunctionInstance) -> FuncAddr {
        self.functions.push(func);
        FuncAddr(self.functions.len() - 1)
    }

    fn push_tag(&mut self, tag: TagInstance) -> TagAddr {
        self.tags.push(tag);
        TagAddr(self.tags.len() - 1)
    }

    /// Call a function by address with the store's configured limits
    pub fn invoke(&mut self, addr: FuncAddr, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        let budget = self.config.instruction_budget;
        Executor::new(self).with_budget(budget).invoke(addr, args)
    }

    /// Call an exported function
    pub fn invoke_export(&mut self, instance_id: usize, name: &str, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        let budget = self.config.instruction_budget;
        self.invoke_export_with_budget(instance_id, name, args, budget)
    }

    /// Call an exported function, stopping after `instruction_budget` instructions
    pub fn invoke_export_with_budget(
        &mut self,
        instance_id: usize,
        name: &str,
        args: Vec<Value>,
        instruction_budget: Option<u64>,
    ) -> Result<Vec<Value>, RuntimeError> {
        let addr = self.instance(instance_id)?.exported_function(name)?;
        debug!(instance = instance_id, export = name, func = addr.0, "invoking export");
        Executor::new(self).with_budget(instruction_budget).invoke(addr, args)
    }

    /// Address of an exported function
    pub fn export_function(&self, instance_id: usize, name: &str) -> Result<FuncAddr, RuntimeError> {
        self.instance(instance_id)?.exported_function(name)
    }

    /// Register all exports of an instance as imports under `as_name`
    pub fn register_exports(&self, instance_id: usize, as_name: &str, imports: &mut ImportObject) -> Result<(), RuntimeError> {
        for (name, ext) in self.instance(instance_id)?.exports() {
            match ext {
                Extern::Func(addr) => imports.add_function(as_name, name, addr),
                Extern::Table(addr) => imports.add_table(as_name, name, addr),
                Extern::Global(addr) => imports.add_global(as_name, name, addr),
                Extern::Tag(addr) => imports.add_tag(as_name, name, addr),
            }
        }
        Ok(())
    }
}

fn describe_global(ty: ValueType, mutable: bool) -> String {
    if mutable {
        format!("mut {ty}")
    } else {
        ty.to_string()
    }
}
