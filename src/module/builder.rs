//! Fluent construction of [`Module`]s
//!
//! Imports must be declared before any function, global, table or tag is defined so that the
//! returned indices stay valid (imports occupy the low end of every index space).
//!
//! ```rust
//! use wexec::module::{Instruction, ModuleBuilder, ValueType};
//!
//! let mut builder = ModuleBuilder::new("example");
//! let sig = builder.func_type(vec![ValueType::I32], vec![ValueType::I32]);
//! let double = builder.function(
//!     sig,
//!     vec![],
//!     vec![
//!         Instruction::LocalGet { local_idx: 0 },
//!         Instruction::LocalGet { local_idx: 0 },
//!         Instruction::I32Add,
//!     ],
//! );
//! builder.export_function("double", double);
//! let module = builder.build();
//! assert_eq!(module.functions.len(), 1);
//! ```

use super::{
    ArrayType, ConstExpr, ElementSegment, Export, ExportIndex, FieldType, FuncType, Function, Global, Import,
    ImportKind, Instruction, Module, RefType, StructType, TableDef, Tag, TypeDescriptor, TypeIdx, ValueType,
};

/// Builder for [`Module`] values
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    module: Module,
    imported_functions: u32,
    imported_tables: u32,
    imported_globals: u32,
    imported_tags: u32,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        ModuleBuilder {
            module: Module::new(name),
            ..Default::default()
        }
    }

    /// Append a type descriptor, returning its module-local index
    pub fn type_descriptor(&mut self, descriptor: TypeDescriptor) -> TypeIdx {
        self.module.types.push(descriptor);
        (self.module.types.len() - 1) as TypeIdx
    }

    pub fn func_type(&mut self, params: Vec<ValueType>, results: Vec<ValueType>) -> TypeIdx {
        self.type_descriptor(TypeDescriptor::Func(FuncType::new(params, results)))
    }

    pub fn struct_type(&mut self, fields: Vec<FieldType>) -> TypeIdx {
        self.type_descriptor(TypeDescriptor::Struct(StructType::new(fields)))
    }

    pub fn array_type(&mut self, field: FieldType) -> TypeIdx {
        self.type_descriptor(TypeDescriptor::Array(ArrayType { field }))
    }

    pub fn import_function(&mut self, module: &str, name: &str, type_idx: TypeIdx) -> u32 {
        self.push_import(module, name, ImportKind::Function(type_idx));
        self.imported_functions += 1;
        self.imported_functions - 1
    }

    pub fn import_table(&mut self, module: &str, name: &str, table: TableDef) -> u32 {
        self.push_import(module, name, ImportKind::Table(table));
        self.imported_tables += 1;
        self.imported_tables - 1
    }

    pub fn import_global(&mut self, module: &str, name: &str, ty: ValueType, mutable: bool) -> u32 {
        self.push_import(module, name, ImportKind::Global { ty, mutable });
        self.imported_globals += 1;
        self.imported_globals - 1
    }

    pub fn import_tag(&mut self, module: &str, name: &str, type_idx: TypeIdx) -> u32 {
        self.push_import(module, name, ImportKind::Tag(type_idx));
        self.imported_tags += 1;
        self.imported_tags - 1
    }

    fn push_import(&mut self, module: &str, name: &str, kind: ImportKind) {
        self.module.imports.push(Import {
            module: module.to_string(),
            name: name.to_string(),
            kind,
        });
    }

    /// Reserve a function index so bodies can refer to functions defined later
    pub fn declare_function(&mut self, type_idx: TypeIdx) -> u32 {
        self.module.functions.push(Function {
            type_idx,
            locals: Vec::new(),
            body: vec![Instruction::End],
        });
        self.imported_functions + self.module.functions.len() as u32 - 1
    }

    /// Supply locals and body for a declared function; the terminating `end` is appended.
    ///
    /// Indices that were never declared are ignored.
    pub fn define_function(&mut self, func_idx: u32, locals: Vec<ValueType>, mut body: Vec<Instruction>) {
        body.push(Instruction::End);
        if let Some(idx) = func_idx.checked_sub(self.imported_functions) {
            if let Some(func) = self.module.functions.get_mut(idx as usize) {
                func.locals = locals;
                func.body = body;
            }
        }
    }

    /// Declare and define a function in one step
    pub fn function(&mut self, type_idx: TypeIdx, locals: Vec<ValueType>, body: Vec<Instruction>) -> u32 {
        let idx = self.declare_function(type_idx);
        self.define_function(idx, locals, body);
        idx
    }

    pub fn table(&mut self, elem_type: RefType, capacity: u32) -> u32 {
        self.module.tables.push(TableDef { elem_type, capacity });
        self.imported_tables + self.module.tables.len() as u32 - 1
    }

    /// Install `func_indices` into `table_idx` starting at `offset`
    pub fn elements(&mut self, table_idx: u32, offset: u32, func_indices: Vec<u32>) -> &mut Self {
        self.module.elements.push(ElementSegment {
            table_idx,
            offset: ConstExpr::I32(offset as i32),
            func_indices,
        });
        self
    }

    pub fn global(&mut self, ty: ValueType, mutable: bool, init: ConstExpr) -> u32 {
        self.module.globals.push(Global { ty, mutable, init });
        self.imported_globals + self.module.globals.len() as u32 - 1
    }

    pub fn tag(&mut self, type_idx: TypeIdx) -> u32 {
        self.module.tags.push(Tag { type_idx });
        self.imported_tags + self.module.tags.len() as u32 - 1
    }

    pub fn export(&mut self, name: &str, index: ExportIndex) -> &mut Self {
        self.module.exports.push(Export {
            name: name.to_string(),
            index,
        });
        self
    }

    pub fn export_function(&mut self, name: &str, func_idx: u32) -> &mut Self {
        self.export(name, ExportIndex::Function(func_idx))
    }

    pub fn start(&mut self, func_idx: u32) -> &mut Self {
        self.module.start = Some(func_idx);
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}
