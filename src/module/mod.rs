//! In-memory module definitions
//!
//! A [`Module`] is the already-decoded form of a WebAssembly module: its type section, imports,
//! function bodies, tables, element segments, globals, tags, exports and optional start
//! function. Every index in a module is module-local; the store maps them to global addresses
//! during instantiation.
//!
//! Index spaces follow the usual convention: imported entities come first, followed by the
//! module's own definitions.

pub mod builder;
pub mod instruction;
pub mod types;

pub use builder::ModuleBuilder;
pub use instruction::{BlockType, Instruction};
pub use types::{
    ArrayType, FieldLocation, FieldType, FuncType, HeapType, RefType, StorageType, StructLayout, StructType,
    TypeDescriptor, TypeIdx, ValueType,
};

/// A decoded module ready for instantiation
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Module name, used in log output
    pub name: String,
    pub types: Vec<TypeDescriptor>,
    pub imports: Vec<Import>,
    /// Functions defined by this module (imported functions are not included)
    pub functions: Vec<Function>,
    pub tables: Vec<TableDef>,
    pub elements: Vec<ElementSegment>,
    pub globals: Vec<Global>,
    pub tags: Vec<Tag>,
    pub exports: Vec<Export>,
    /// Function index of the start function, if any
    pub start: Option<u32>,
}

/// A function defined by the module
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Index of the function's signature in the type section
    pub type_idx: TypeIdx,
    /// Declared locals, not counting parameters
    pub locals: Vec<ValueType>,
    /// Flat instruction sequence terminated by `end`
    pub body: Vec<Instruction>,
}

/// Table definition: element type and fixed capacity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableDef {
    pub elem_type: RefType,
    pub capacity: u32,
}

/// Active element segment installed into a table at instantiation
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSegment {
    pub table_idx: u32,
    pub offset: ConstExpr,
    pub func_indices: Vec<u32>,
}

/// Global definition
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub ty: ValueType,
    pub mutable: bool,
    pub init: ConstExpr,
}

/// Exception tag; the referenced function type's parameters describe the payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tag {
    pub type_idx: TypeIdx,
}

/// Constant expressions used for global initializers and segment offsets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstExpr {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    RefNull,
    RefFunc(u32),
    GlobalGet(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub kind: ImportKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportKind {
    Function(TypeIdx),
    Table(TableDef),
    Global { ty: ValueType, mutable: bool },
    Tag(TypeIdx),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: String,
    pub index: ExportIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportIndex {
    Function(u32),
    Table(u32),
    Global(u32),
    Tag(u32),
}

impl Module {
    pub fn new(name: &str) -> Self {
        Module {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Look up a function signature by module-local type index
    pub fn func_type(&self, type_idx: TypeIdx) -> Option<&FuncType> {
        match self.types.get(type_idx as usize) {
            Some(TypeDescriptor::Func(ty)) => Some(ty),
            _ => None,
        }
    }

    /// Number of imported functions; defined functions are indexed after these
    pub fn imported_function_count(&self) -> usize {
        self.imports
            .iter()
            .filter(|import| matches!(import.kind, ImportKind::Function(_)))
            .count()
    }

    pub fn imported_global_count(&self) -> usize {
        self.imports
            .iter()
            .filter(|import| matches!(import.kind, ImportKind::Global { .. }))
            .count()
    }

    /// Resolve the `(params, results)` arity of a block type
    pub fn block_arity(&self, block_type: &BlockType) -> Option<(usize, usize)> {
        match block_type {
            BlockType::Empty => Some((0, 0)),
            BlockType::Value(_) => Some((0, 1)),
            BlockType::FuncType(idx) => self.func_type(*idx).map(|ty| (ty.params.len(), ty.results.len())),
        }
    }
}
