//! Instruction representation
//!
//! Function bodies are flat sequences of [`Instruction`]s terminated by `end`, the same shape a
//! binary decoder produces. Structured control (`block`/`loop`/`if`/`try`) is delimited by
//! `else`/`catch`/`catch_all`/`end` markers and resolved into jump targets by
//! [`crate::runtime::code`].

use super::types::{TypeIdx, ValueType};
use fhex::ToHex;
use std::fmt;

/// Block type for structured control instructions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockType {
    /// Empty block type (no parameters or results)
    Empty,
    /// Single value type result
    Value(ValueType),
    /// Function type index for multi-value blocks
    FuncType(TypeIdx),
}

/// Algebraic data type representing the supported instructions
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Control instructions
    Unreachable,
    Nop,
    Block { block_type: BlockType },
    Loop { block_type: BlockType },
    If { block_type: BlockType },
    Else,
    End,
    Br { label_idx: u32 },
    BrIf { label_idx: u32 },
    BrTable { labels: Vec<u32>, default: u32 },
    Return,
    Call { func_idx: u32 },
    CallIndirect { type_idx: TypeIdx, table_idx: u32 },
    CallRef { type_idx: TypeIdx },
    ReturnCall { func_idx: u32 },
    ReturnCallIndirect { type_idx: TypeIdx, table_idx: u32 },
    ReturnCallRef { type_idx: TypeIdx },

    // Exception handling
    Try { block_type: BlockType },
    Catch { tag_idx: u32 },
    CatchAll,
    Throw { tag_idx: u32 },
    Rethrow { label_idx: u32 },

    // Reference instructions
    RefNull { ref_type: ValueType },
    RefIsNull,
    RefFunc { func_idx: u32 },
    RefAsNonNull,
    RefEq,

    // Parametric instructions
    Drop,
    Select,

    // Variable instructions
    LocalGet { local_idx: u32 },
    LocalSet { local_idx: u32 },
    LocalTee { local_idx: u32 },
    GlobalGet { global_idx: u32 },
    GlobalSet { global_idx: u32 },

    // Table instructions
    TableGet { table_idx: u32 },
    TableSize { table_idx: u32 },

    // Aggregate (struct/array) instructions
    StructNew { type_idx: TypeIdx },
    StructNewDefault { type_idx: TypeIdx },
    StructGet { type_idx: TypeIdx, field_idx: u32 },
    StructGetS { type_idx: TypeIdx, field_idx: u32 },
    StructGetU { type_idx: TypeIdx, field_idx: u32 },
    StructSet { type_idx: TypeIdx, field_idx: u32 },
    ArrayNew { type_idx: TypeIdx },
    ArrayNewDefault { type_idx: TypeIdx },
    ArrayNewFixed { type_idx: TypeIdx, len: u32 },
    ArrayGet { type_idx: TypeIdx },
    ArrayGetS { type_idx: TypeIdx },
    ArrayGetU { type_idx: TypeIdx },
    ArraySet { type_idx: TypeIdx },
    ArrayLen,

    // Numeric constants
    I32Const { value: i32 },
    I64Const { value: i64 },
    F32Const { value: f32 },
    F64Const { value: f64 },

    // i32 operations
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32GeS,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,

    // i64 operations
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64GtS,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,

    // float operations
    F32Eq,
    F32Lt,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F64Eq,
    F64Lt,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,

    // conversions
    I32WrapI64,
    I64ExtendI32S,
    I64ExtendI32U,
    F64PromoteF32,
    F32DemoteF64,
}

impl Instruction {
    /// The text-format mnemonic of this instruction
    pub fn mnemonic(&self) -> &'static str {
        use Instruction::*;
        match self {
            Unreachable => "unreachable",
            Nop => "nop",
            Block { .. } => "block",
            Loop { .. } => "loop",
            If { .. } => "if",
            Else => "else",
            End => "end",
            Br { .. } => "br",
            BrIf { .. } => "br_if",
            BrTable { .. } => "br_table",
            Return => "return",
            Call { .. } => "call",
            CallIndirect { .. } => "call_indirect",
            CallRef { .. } => "call_ref",
            ReturnCall { .. } => "return_call",
            ReturnCallIndirect { .. } => "return_call_indirect",
            ReturnCallRef { .. } => "return_call_ref",
            Try { .. } => "try",
            Catch { .. } => "catch",
            CatchAll => "catch_all",
            Throw { .. } => "throw",
            Rethrow { .. } => "rethrow",
            RefNull { .. } => "ref.null",
            RefIsNull => "ref.is_null",
            RefFunc { .. } => "ref.func",
            RefAsNonNull => "ref.as_non_null",
            RefEq => "ref.eq",
            Drop => "drop",
            Select => "select",
            LocalGet { .. } => "local.get",
            LocalSet { .. } => "local.set",
            LocalTee { .. } => "local.tee",
            GlobalGet { .. } => "global.get",
            GlobalSet { .. } => "global.set",
            TableGet { .. } => "table.get",
            TableSize { .. } => "table.size",
            StructNew { .. } => "struct.new",
            StructNewDefault { .. } => "struct.new_default",
            StructGet { .. } => "struct.get",
            StructGetS { .. } => "struct.get_s",
            StructGetU { .. } => "struct.get_u",
            StructSet { .. } => "struct.set",
            ArrayNew { .. } => "array.new",
            ArrayNewDefault { .. } => "array.new_default",
            ArrayNewFixed { .. } => "array.new_fixed",
            ArrayGet { .. } => "array.get",
            ArrayGetS { .. } => "array.get_s",
            ArrayGetU { .. } => "array.get_u",
            ArraySet { .. } => "array.set",
            ArrayLen => "array.len",
            I32Const { .. } => "i32.const",
            I64Const { .. } => "i64.const",
            F32Const { .. } => "f32.const",
            F64Const { .. } => "f64.const",
            I32Eqz => "i32.eqz",
            I32Eq => "i32.eq",
            I32Ne => "i32.ne",
            I32LtS => "i32.lt_s",
            I32LtU => "i32.lt_u",
            I32GtS => "i32.gt_s",
            I32GtU => "i32.gt_u",
            I32LeS => "i32.le_s",
            I32GeS => "i32.ge_s",
            I32Add => "i32.add",
            I32Sub => "i32.sub",
            I32Mul => "i32.mul",
            I32DivS => "i32.div_s",
            I32DivU => "i32.div_u",
            I32RemS => "i32.rem_s",
            I32RemU => "i32.rem_u",
            I32And => "i32.and",
            I32Or => "i32.or",
            I32Xor => "i32.xor",
            I64Eqz => "i64.eqz",
            I64Eq => "i64.eq",
            I64Ne => "i64.ne",
            I64LtS => "i64.lt_s",
            I64GtS => "i64.gt_s",
            I64Add => "i64.add",
            I64Sub => "i64.sub",
            I64Mul => "i64.mul",
            I64DivS => "i64.div_s",
            I64DivU => "i64.div_u",
            I64RemS => "i64.rem_s",
            I64RemU => "i64.rem_u",
            F32Eq => "f32.eq",
            F32Lt => "f32.lt",
            F32Add => "f32.add",
            F32Sub => "f32.sub",
            F32Mul => "f32.mul",
            F32Div => "f32.div",
            F64Eq => "f64.eq",
            F64Lt => "f64.lt",
            F64Add => "f64.add",
            F64Sub => "f64.sub",
            F64Mul => "f64.mul",
            F64Div => "f64.div",
            I32WrapI64 => "i32.wrap_i64",
            I64ExtendI32S => "i64.extend_i32_s",
            I64ExtendI32U => "i64.extend_i32_u",
            F64PromoteF32 => "f64.promote_f32",
            F32DemoteF64 => "f32.demote_f64",
        }
    }

    /// True for instructions that open a structured control construct
    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            Instruction::Block { .. } | Instruction::Loop { .. } | Instruction::If { .. } | Instruction::Try { .. }
        )
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Empty => Ok(()),
            BlockType::Value(t) => write!(f, " (result {t})"),
            BlockType::FuncType(idx) => write!(f, " (type {idx})"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        write!(f, "{}", self.mnemonic())?;

        match self {
            Block { block_type } | Loop { block_type } | If { block_type } | Try { block_type } => {
                write!(f, "{block_type}")
            }
            Br { label_idx } | BrIf { label_idx } | Rethrow { label_idx } => write!(f, " {label_idx}"),
            BrTable { labels, default } => {
                for label in labels {
                    write!(f, " {label}")?;
                }
                write!(f, " {default}")
            }
            Call { func_idx } | ReturnCall { func_idx } | RefFunc { func_idx } => write!(f, " {func_idx}"),
            CallIndirect { type_idx, table_idx } | ReturnCallIndirect { type_idx, table_idx } => {
                write!(f, " {table_idx} (type {type_idx})")
            }
            CallRef { type_idx } | ReturnCallRef { type_idx } => write!(f, " {type_idx}"),
            Catch { tag_idx } | Throw { tag_idx } => write!(f, " {tag_idx}"),
            RefNull { ref_type } => write!(f, " {ref_type}"),
            LocalGet { local_idx } | LocalSet { local_idx } | LocalTee { local_idx } => write!(f, " {local_idx}"),
            GlobalGet { global_idx } | GlobalSet { global_idx } => write!(f, " {global_idx}"),
            TableGet { table_idx } | TableSize { table_idx } => write!(f, " {table_idx}"),
            StructNew { type_idx }
            | StructNewDefault { type_idx }
            | ArrayNew { type_idx }
            | ArrayNewDefault { type_idx }
            | ArrayGet { type_idx }
            | ArrayGetS { type_idx }
            | ArrayGetU { type_idx }
            | ArraySet { type_idx } => write!(f, " {type_idx}"),
            StructGet { type_idx, field_idx }
            | StructGetS { type_idx, field_idx }
            | StructGetU { type_idx, field_idx }
            | StructSet { type_idx, field_idx } => write!(f, " {type_idx} {field_idx}"),
            ArrayNewFixed { type_idx, len } => write!(f, " {type_idx} {len}"),
            I32Const { value } => write!(f, " {value}"),
            I64Const { value } => write!(f, " {value}"),
            F32Const { value } => write!(f, " {}", value.to_hex()),
            F64Const { value } => write!(f, " {}", value.to_hex()),
            _ => Ok(()),
        }
    }
}
