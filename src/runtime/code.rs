//! Executable function code
//!
//! Function bodies arrive as flat instruction sequences, exactly as decoded. Rather than
//! rebuilding a tree, compilation walks the sequence once with a stack of open constructs and
//! records a control side-table indexed by program counter:
//!
//! - every `block`/`loop`/`if`/`try` learns its arity, matching `end`, `else` and catch handlers
//! - every `else`/`catch`/`catch_all` learns the `end` it falls through to
//! - every `call_indirect`/`return_call_indirect` gets its own link cache slot
//!
//! The interpreter then moves the program counter directly, without recursion.

use super::{link::LinkSlot, RuntimeError};
use crate::module::{FuncType, Function, Instruction, Module, TypeIdx, ValueType};

/// A catch clause of a `try` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    /// Position of the `catch`/`catch_all` instruction
    pub pc: usize,
    /// Module-local tag index, `None` for `catch_all`
    pub tag: Option<u32>,
}

/// Resolved shape of a structured control instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub params: usize,
    pub results: usize,
    /// Position of the matching `end`
    pub end: usize,
    /// Position of `else`, for `if` blocks that have one
    pub else_pc: Option<usize>,
    pub handlers: Vec<Handler>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Control {
    Plain,
    Block(BlockInfo),
    /// `else`/`catch`/`catch_all` reached by falling through continue at `end`
    Exit { end: usize },
    CallSite(usize),
}

/// A compiled function body
#[derive(Debug)]
pub struct FunctionCode {
    /// Registered type of the function
    pub type_idx: TypeIdx,
    pub signature: FuncType,
    /// Declared locals, not counting parameters
    pub locals: Vec<ValueType>,
    pub body: Vec<Instruction>,
    control: Vec<Control>,
    call_sites: Vec<LinkSlot>,
}

/// An open construct while compiling
struct OpenBlock {
    pc: usize,
    exits: Vec<usize>,
}

impl FunctionCode {
    /// Compile `func`, resolving block types against `module`'s type section
    pub fn compile(
        module: &Module,
        func: &Function,
        type_idx: TypeIdx,
        signature: FuncType,
    ) -> Result<Self, RuntimeError> {
        let body = func.body.clone();
        let mut control = vec![Control::Plain; body.len()];
        let mut call_sites = Vec::new();
        let mut open: Vec<OpenBlock> = Vec::new();
        let mut finished = false;

        for (pc, instruction) in body.iter().enumerate() {
            if finished {
                return Err(malformed(pc, "instruction after the final end"));
            }
            match instruction {
                Instruction::Block { block_type }
                | Instruction::Loop { block_type }
                | Instruction::If { block_type }
                | Instruction::Try { block_type } => {
                    let (params, results) = module
                        .block_arity(block_type)
                        .ok_or_else(|| malformed(pc, "unknown block type"))?;
                    control[pc] = Control::Block(BlockInfo {
                        params,
                        results,
                        end: 0,
                        else_pc: None,
                        handlers: Vec::new(),
                    });
                    open.push(OpenBlock { pc, exits: Vec::new() });
                }
                Instruction::Else => {
                    let opener = open.last_mut().ok_or_else(|| malformed(pc, "else outside of if"))?;
                    if !matches!(body[opener.pc], Instruction::If { .. }) {
                        return Err(malformed(pc, "else outside of if"));
                    }
                    if let Control::Block(info) = &mut control[opener.pc] {
                        if info.else_pc.is_some() {
                            return Err(malformed(pc, "duplicate else"));
                        }
                        info.else_pc = Some(pc);
                    }
                    opener.exits.push(pc);
                }
                Instruction::Catch { .. } | Instruction::CatchAll => {
                    let opener = open.last_mut().ok_or_else(|| malformed(pc, "catch outside of try"))?;
                    if !matches!(body[opener.pc], Instruction::Try { .. }) {
                        return Err(malformed(pc, "catch outside of try"));
                    }
                    let tag = match instruction {
                        Instruction::Catch { tag_idx } => Some(*tag_idx),
                        _ => None,
                    };
                    if let Control::Block(info) = &mut control[opener.pc] {
                        info.handlers.push(Handler { pc, tag });
                    }
                    opener.exits.push(pc);
                }
                Instruction::End => match open.pop() {
                    Some(opener) => {
                        if let Control::Block(info) = &mut control[opener.pc] {
                            info.end = pc;
                        }
                        for exit in opener.exits {
                            control[exit] = Control::Exit { end: pc };
                        }
                    }
                    None => finished = true,
                },
                Instruction::CallIndirect { .. } | Instruction::ReturnCallIndirect { .. } => {
                    control[pc] = Control::CallSite(call_sites.len());
                    call_sites.push(LinkSlot::new());
                }
                _ => {}
            }
        }

        if !finished {
            return Err(malformed(body.len(), "missing final end"));
        }

        Ok(FunctionCode {
            type_idx,
            signature,
            locals: func.locals.clone(),
            body,
            control,
            call_sites,
        })
    }

    /// Block information for the structured instruction at `pc`
    pub fn block(&self, pc: usize) -> Result<&BlockInfo, RuntimeError> {
        match self.control.get(pc) {
            Some(Control::Block(info)) => Ok(info),
            _ => Err(malformed(pc, "not a block instruction")),
        }
    }

    /// The `end` an `else`/`catch`/`catch_all` at `pc` continues to
    pub fn exit_target(&self, pc: usize) -> Result<usize, RuntimeError> {
        match self.control.get(pc) {
            Some(Control::Exit { end }) => Ok(*end),
            _ => Err(malformed(pc, "not a block exit")),
        }
    }

    /// Link cache of the indirect call at `pc`
    pub fn call_site(&self, pc: usize) -> Result<&LinkSlot, RuntimeError> {
        match self.control.get(pc) {
            Some(Control::CallSite(idx)) => self.call_sites.get(*idx).ok_or_else(|| malformed(pc, "bad call site")),
            _ => Err(malformed(pc, "not an indirect call")),
        }
    }

    /// All link caches of this function, one per indirect call instruction
    pub fn call_sites(&self) -> &[LinkSlot] {
        &self.call_sites
    }
}

fn malformed(pc: usize, reason: &str) -> RuntimeError {
    RuntimeError::InvalidFunctionBody(format!("{reason} at instruction {pc}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{BlockType, TypeDescriptor};

    fn compile(module: &Module, body: Vec<Instruction>) -> Result<FunctionCode, RuntimeError> {
        let func = Function {
            type_idx: 0,
            locals: vec![],
            body,
        };
        FunctionCode::compile(module, &func, 0, FuncType::default())
    }

    fn module() -> Module {
        let mut module = Module::new("test");
        module.types.push(TypeDescriptor::Func(FuncType::new(
            vec![ValueType::I32],
            vec![ValueType::I32, ValueType::I64],
        )));
        module
    }

    #[test]
    fn test_if_else_targets() {
        let code = compile(
            &module(),
            vec![
                Instruction::I32Const { value: 1 },
                Instruction::If {
                    block_type: BlockType::Value(ValueType::I32),
                },
                Instruction::I32Const { value: 2 },
                Instruction::Else,
                Instruction::I32Const { value: 3 },
                Instruction::End,
                Instruction::End,
            ],
        )
        .unwrap();

        let info = code.block(1).unwrap();
        assert_eq!((info.params, info.results), (0, 1));
        assert_eq!(info.end, 5);
        assert_eq!(info.else_pc, Some(3));
        assert_eq!(code.exit_target(3).unwrap(), 5);
    }

    #[test]
    fn test_try_handlers_and_multi_value_block() {
        let code = compile(
            &module(),
            vec![
                Instruction::Try {
                    block_type: BlockType::FuncType(0),
                },
                Instruction::Catch { tag_idx: 1 },
                Instruction::CatchAll,
                Instruction::End,
                Instruction::End,
            ],
        )
        .unwrap();

        let info = code.block(0).unwrap();
        assert_eq!((info.params, info.results), (1, 2));
        assert_eq!(
            info.handlers,
            vec![Handler { pc: 1, tag: Some(1) }, Handler { pc: 2, tag: None }]
        );
        assert_eq!(code.exit_target(1).unwrap(), 3);
        assert_eq!(code.exit_target(2).unwrap(), 3);
    }

    #[test]
    fn test_one_link_slot_per_indirect_site() {
        let code = compile(
            &module(),
            vec![
                Instruction::I32Const { value: 0 },
                Instruction::CallIndirect {
                    type_idx: 0,
                    table_idx: 0,
                },
                Instruction::I32Const { value: 0 },
                Instruction::ReturnCallIndirect {
                    type_idx: 0,
                    table_idx: 0,
                },
                Instruction::End,
            ],
        )
        .unwrap();

        assert_eq!(code.call_sites().len(), 2);
        assert!(code.call_site(1).is_ok());
        assert!(code.call_site(3).is_ok());
        assert!(code.call_site(0).is_err());
    }

    #[test]
    fn test_malformed_bodies() {
        let m = module();
        assert!(compile(&m, vec![]).is_err());
        assert!(compile(&m, vec![Instruction::Block { block_type: BlockType::Empty }, Instruction::End]).is_err());
        assert!(compile(&m, vec![Instruction::Else, Instruction::End]).is_err());
        assert!(compile(&m, vec![Instruction::End, Instruction::Nop]).is_err());
        assert!(compile(
            &m,
            vec![
                Instruction::Block { block_type: BlockType::Empty },
                Instruction::CatchAll,
                Instruction::End,
                Instruction::End
            ]
        )
        .is_err());
        assert!(compile(&m, vec![Instruction::Loop { block_type: BlockType::FuncType(7) }, Instruction::End, Instruction::End]).is_err());
    }
}
