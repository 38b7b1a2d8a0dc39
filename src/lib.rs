//! A WebAssembly execution core written in Rust.
//!
//! wexec runs already-decoded modules: it has no binary or text parser. It covers typed
//! function calls with tail calls, indirect calls through tables, garbage-collected struct and
//! array objects with packed fields, and tagged exceptions.
//!
//! # Modules
//!
//! - [`module`] -- Module definitions and a [`module::ModuleBuilder`] for assembling them.
//! - [`runtime`] -- Type registry, object heap, tables, and the frame-based interpreter.
//!
//! # Example
//!
//! Build a module, instantiate it, and call an exported function:
//!
//! ```
//! use wexec::module::{Instruction, ModuleBuilder, ValueType};
//! use wexec::runtime::{ImportObject, Store, Value};
//!
//! let mut builder = ModuleBuilder::new("adder");
//! let sig = builder.func_type(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32]);
//! let add = builder.function(
//!     sig,
//!     vec![],
//!     vec![
//!         Instruction::LocalGet { local_idx: 0 },
//!         Instruction::LocalGet { local_idx: 1 },
//!         Instruction::I32Add,
//!     ],
//! );
//! builder.export_function("add", add);
//!
//! let mut store = Store::new();
//! let id = store.instantiate(&builder.build(), &ImportObject::new()).unwrap();
//! let results = store.invoke_export(id, "add", vec![Value::I32(2), Value::I32(3)]).unwrap();
//! assert_eq!(results, vec![Value::I32(5)]);
//! ```
//!
//! Execution is single-threaded: a [`runtime::Store`] and everything allocated in it belong to
//! one thread.

pub mod module;
pub mod runtime;
