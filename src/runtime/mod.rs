//! WebAssembly execution core
//!
//! This module provides the engine that runs [`crate::module::Module`]s: the type registry,
//! the value and calling-convention layer, the object heap, tables with per-call-site link
//! caches, and the frame-based interpreter with tail calls and exception handling.
//!
//! Embedders work through a [`Store`]: allocate host functions, instantiate modules against an
//! [`ImportObject`], then invoke exports.

pub mod call_stack;
pub mod code;
pub mod config;
pub mod control;
pub mod exception;
pub mod executor;
pub mod frame;
pub mod heap;
pub mod imports;
pub mod instance;
pub mod link;
pub mod marshal;
pub mod ops;
pub mod registry;
pub mod stack;
pub mod store;
pub mod table;
pub mod test_utils;
pub mod trap;
pub mod value;

pub use call_stack::CallStack;
pub use config::ExecutionConfig;
pub use exception::Exception;
pub use executor::Executor;
pub use heap::{Extension, Heap, ObjectRef};
pub use imports::ImportObject;
pub use instance::{Extern, Instance};
pub use link::{LinkEntry, LinkSlot};
pub use registry::TypeRegistry;
pub use store::{FuncAddr, FunctionInstance, GlobalAddr, GlobalInstance, Store, TableAddr, TagAddr, TagInstance};
pub use table::Table;
pub use trap::{Trap, TrapKind};
pub use value::{Ref, Value};

use crate::module::TypeIdx;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("Unknown import: {0}")]
    UnknownImport(String),
    #[error("Unknown export: {0}")]
    UnknownExport(String),
    #[error("Function index out of bounds: {0}")]
    FunctionIndexOutOfBounds(u32),
    #[error("Local index out of bounds: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("Global index out of bounds: {0}")]
    GlobalIndexOutOfBounds(u32),
    #[error("Table index out of bounds: {0}")]
    TableIndexOutOfBounds(u32),
    #[error("Tag index out of bounds: {0}")]
    TagIndexOutOfBounds(u32),
    #[error("Field index out of bounds: {0}")]
    FieldIndexOutOfBounds(u32),
    #[error("Unknown type: {0}")]
    UnknownType(TypeIdx),
    #[error("Type {idx} is a {actual} type, expected {expected}")]
    UnexpectedTypeKind {
        idx: TypeIdx,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Invalid label: {0}")]
    InvalidLabel(u32),
    #[error("Invalid function body: {0}")]
    InvalidFunctionBody(String),
    #[error("Global {0} is immutable")]
    ImmutableGlobal(u32),
    #[error("Field {0} is immutable")]
    ImmutableField(u32),
    #[error("Invalid object reference: {0}")]
    InvalidObject(usize),
    #[error("Element segment out of bounds: offset {offset} + {len} elements exceeds table size {size}")]
    ElementSegmentOutOfBounds { offset: u32, len: usize, size: u32 },
    #[error("Import type mismatch for {module}.{name}: expected {expected}, got {actual}")]
    ImportTypeMismatch {
        module: String,
        name: String,
        expected: String,
        actual: String,
    },
    #[error("Invalid constant expression: {0}")]
    InvalidConstExpr(String),
    #[error("Operand stack overflow: more than {0} values")]
    OperandStackOverflow(usize),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Instance not found: {0}")]
    InstanceNotFound(usize),
    #[error("No active frame")]
    NoActiveFrame,
    #[error("Instruction budget exhausted")]
    InstructionBudgetExhausted,
    #[error("Uncaught exception: {0}")]
    UncaughtException(Exception),
    #[error("Trap: {0}")]
    Trap(#[from] Trap),
}

impl RuntimeError {
    /// The trap behind this error, if it is one
    pub fn as_trap(&self) -> Option<&Trap> {
        match self {
            RuntimeError::Trap(trap) => Some(trap),
            _ => None,
        }
    }
}
