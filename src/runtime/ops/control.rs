//! Control flow operations
//!
//! Structured control works on the current frame only: entering a construct pushes a label,
//! branches pop labels and move the program counter to the label's continuation. Anything
//! that leaves the frame (returns, calls, throws) is reported to the executor as a [`Flow`].

use super::{RuntimeError, Stack, Trap};
use crate::module::ValueType;
use crate::runtime::control::{Label, LabelKind};
use crate::runtime::exception::Exception;
use crate::runtime::frame::Frame;
use crate::runtime::marshal;
use crate::runtime::{FuncAddr, TagAddr};
use std::rc::Rc;

/// What the executor does after an instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Proceed with the instruction at the frame's program counter
    Continue,
    /// Leave the current frame, delivering its results to the caller
    Return,
    /// Push a frame for the callee; arguments are still on the caller's stack
    Call(FuncAddr),
    /// Replace the current frame with one for the callee
    ReturnCall(FuncAddr),
    /// Unwind until a matching handler is found
    Throw(Exception),
}

/// block, loop and try - push a label for the construct at `pc`
pub fn enter_block(frame: &mut Frame, kind: LabelKind, pc: usize) -> Result<Flow, RuntimeError> {
    let code = Rc::clone(&frame.code);
    let info = code.block(pc)?;
    let height = frame
        .stack
        .depth()
        .checked_sub(info.params)
        .ok_or(RuntimeError::StackUnderflow)?;
    frame.labels.push(Label {
        kind,
        params: info.params,
        results: info.results,
        height,
        start: pc,
        end: info.end,
    });
    Ok(Flow::Continue)
}

/// if - enter the then-branch on a non-zero condition, otherwise the else-branch
///
/// Without an else-branch a false condition skips the whole construct.
pub fn if_(frame: &mut Frame, pc: usize) -> Result<Flow, RuntimeError> {
    let condition = frame.stack.pop_i32()?;
    let code = Rc::clone(&frame.code);
    let info = code.block(pc)?;
    if condition == 0 {
        match info.else_pc {
            Some(else_pc) => frame.pc = else_pc + 1,
            None => {
                frame.pc = info.end + 1;
                return Ok(Flow::Continue);
            }
        }
    }
    enter_block(frame, LabelKind::If, pc)
}

/// else, catch and catch_all reached by falling through: continue at the matching end
pub fn exit_block(frame: &mut Frame, pc: usize) -> Result<Flow, RuntimeError> {
    frame.pc = frame.code.exit_target(pc)?;
    Ok(Flow::Continue)
}

/// end - close the innermost construct, or return if it is the function body
pub fn end(frame: &mut Frame) -> Result<Flow, RuntimeError> {
    match frame.labels.pop() {
        Some(_) => Ok(Flow::Continue),
        None => Ok(Flow::Return),
    }
}

/// br l - Unconditional branch
///
/// The label `l` counts outwards from the innermost construct; one past the outermost label
/// is the function body itself, so branching there returns.
pub fn br(frame: &mut Frame, label_idx: u32) -> Result<Flow, RuntimeError> {
    let depth = label_idx as usize;
    let active = frame.labels.depth();
    if depth == active {
        return Ok(Flow::Return);
    }
    let (arity, height, is_loop, start, end) = match frame.labels.get(label_idx) {
        Some(label) => (
            label.arity(),
            label.height,
            label.kind == LabelKind::Loop,
            label.start,
            label.end,
        ),
        None => return Err(RuntimeError::InvalidLabel(label_idx)),
    };

    let values = frame.stack.pop_n(arity)?;
    frame.stack.truncate(height);
    frame.stack.push_all(values);

    if is_loop {
        frame.labels.truncate(active - depth);
        frame.pc = start + 1;
    } else {
        frame.labels.truncate(active - depth - 1);
        frame.pc = end + 1;
    }
    Ok(Flow::Continue)
}

/// br_if l - Conditional branch
pub fn br_if(frame: &mut Frame, label_idx: u32) -> Result<Flow, RuntimeError> {
    let condition = frame.stack.pop_i32()?;
    if condition != 0 {
        br(frame, label_idx)
    } else {
        Ok(Flow::Continue)
    }
}

/// br_table l* lN - Indirect branch, out-of-range operands take the default label
pub fn br_table(frame: &mut Frame, labels: &[u32], default: u32) -> Result<Flow, RuntimeError> {
    let index = frame.stack.pop_i32()? as u32;
    let target = labels.get(index as usize).copied().unwrap_or(default);
    br(frame, target)
}

/// return
pub fn return_op() -> Result<Flow, RuntimeError> {
    Ok(Flow::Return)
}

/// unreachable - Trap immediately
pub fn unreachable() -> Result<Flow, RuntimeError> {
    Err(Trap::unreachable().into())
}

/// throw - raise an exception carrying the tag's parameters as payload
pub fn throw(stack: &mut Stack, tag: TagAddr, params: &[ValueType]) -> Result<Flow, RuntimeError> {
    let payload = marshal::take_arguments(stack, params)?;
    Ok(Flow::Throw(Exception { tag, payload }))
}

/// rethrow l - raise the exception caught by the handler at label `l` again
pub fn rethrow(frame: &mut Frame, label_idx: u32) -> Result<Flow, RuntimeError> {
    match frame.labels.get(label_idx) {
        Some(Label {
            kind: LabelKind::Catch(exception),
            ..
        }) => Ok(Flow::Throw(exception.clone())),
        _ => Err(RuntimeError::InvalidLabel(label_idx)),
    }
}

/// Look for a handler for `exception` in this frame
///
/// Only `try` bodies are searched; an exception raised inside a handler propagates outward.
/// `tag_addr` maps the frame's module-local tag indices to store addresses. On a match the
/// frame is positioned at the first instruction of the handler, the `try` label is turned
/// into a catch label holding the exception, and `true` is returned.
pub fn catch_exception(
    frame: &mut Frame,
    exception: &Exception,
    tag_addr: impl Fn(u32) -> Option<TagAddr>,
) -> Result<bool, RuntimeError> {
    let code = Rc::clone(&frame.code);
    let mut found = None;
    for (index, label) in frame.labels.iter_innermost() {
        if label.kind != LabelKind::Try {
            continue;
        }
        let handler = code.block(label.start)?.handlers.iter().find(|handler| match handler.tag {
            Some(tag_idx) => tag_addr(tag_idx) == Some(exception.tag),
            None => true,
        });
        if let Some(handler) = handler {
            found = Some((index, *handler));
            break;
        }
    }

    let Some((index, handler)) = found else {
        return Ok(false);
    };
    frame.labels.truncate(index + 1);
    let height = match frame.labels.at_mut(index) {
        Some(label) => {
            label.kind = LabelKind::Catch(exception.clone());
            label.height
        }
        None => return Err(RuntimeError::InvalidLabel(index as u32)),
    };
    frame.stack.truncate(height);
    if handler.tag.is_some() {
        frame.stack.push_all(exception.payload.iter().copied());
    }
    frame.pc = handler.pc + 1;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use crate::module::{BlockType, FuncType, Instruction, TypeDescriptor, ValueType};
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::trap::TrapKind;
    use crate::runtime::Value;

    mod blocks {
        use super::*;

        #[test]
        fn block_with_value() {
            ExecutorTest::new()
                .inst(Instruction::Block {
                    block_type: BlockType::Value(ValueType::I32),
                })
                .inst(Instruction::I32Const { value: 42 })
                .inst(Instruction::End)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(42)]);
        }

        #[test]
        fn block_with_params() {
            ExecutorTest::new()
                .type_def(TypeDescriptor::Func(FuncType::new(
                    vec![ValueType::I32, ValueType::I32],
                    vec![ValueType::I32],
                )))
                .inst(Instruction::I32Const { value: 40 })
                .inst(Instruction::I32Const { value: 2 })
                .inst(Instruction::Block {
                    block_type: BlockType::FuncType(0),
                })
                .inst(Instruction::I32Add)
                .inst(Instruction::End)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(42)]);
        }

        #[test]
        fn br_nested() {
            ExecutorTest::new()
                .inst(Instruction::Block {
                    block_type: BlockType::Value(ValueType::I32),
                })
                .inst(Instruction::I32Const { value: 42 })
                .inst(Instruction::Block {
                    block_type: BlockType::Empty,
                })
                .inst(Instruction::Br { label_idx: 1 })
                .inst(Instruction::I32Const { value: 99 })
                .inst(Instruction::End)
                .inst(Instruction::I32Const { value: 88 })
                .inst(Instruction::End)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(42)]);
        }

        #[test]
        fn br_discards_intermediate_values() {
            ExecutorTest::new()
                .inst(Instruction::Block {
                    block_type: BlockType::Value(ValueType::I32),
                })
                .inst(Instruction::I32Const { value: 1 })
                .inst(Instruction::I32Const { value: 2 })
                .inst(Instruction::I32Const { value: 3 })
                .inst(Instruction::Br { label_idx: 0 })
                .inst(Instruction::End)
                .inst(Instruction::I32Const { value: 4 })
                .returns(vec![ValueType::I32, ValueType::I32])
                .expect_stack(vec![Value::I32(3), Value::I32(4)]);
        }

        #[test]
        fn br_to_function_body_returns() {
            ExecutorTest::new()
                .inst(Instruction::Block {
                    block_type: BlockType::Empty,
                })
                .inst(Instruction::I32Const { value: 7 })
                .inst(Instruction::Br { label_idx: 1 })
                .inst(Instruction::End)
                .inst(Instruction::Unreachable)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(7)]);
        }

        #[test]
        fn br_invalid_label() {
            ExecutorTest::new()
                .inst(Instruction::Br { label_idx: 3 })
                .expect_error("Invalid label: 3");
        }

        #[test]
        fn br_table_selects_label() {
            for (index, expected) in [(0, 10), (1, 20), (7, 30)] {
                ExecutorTest::new()
                    .arg(Value::I32(index))
                    .inst(Instruction::Block {
                        block_type: BlockType::Empty,
                    })
                    .inst(Instruction::Block {
                        block_type: BlockType::Empty,
                    })
                    .inst(Instruction::Block {
                        block_type: BlockType::Empty,
                    })
                    .inst(Instruction::LocalGet { local_idx: 0 })
                    .inst(Instruction::BrTable {
                        labels: vec![0, 1],
                        default: 2,
                    })
                    .inst(Instruction::End)
                    .inst(Instruction::I32Const { value: 10 })
                    .inst(Instruction::Return)
                    .inst(Instruction::End)
                    .inst(Instruction::I32Const { value: 20 })
                    .inst(Instruction::Return)
                    .inst(Instruction::End)
                    .inst(Instruction::I32Const { value: 30 })
                    .returns(vec![ValueType::I32])
                    .expect_stack(vec![Value::I32(expected)]);
            }
        }
    }

    mod loops {
        use super::*;

        #[test]
        fn countdown_loop() {
            // Sum 5 + 4 + 3 + 2 + 1
            ExecutorTest::new()
                .arg(Value::I32(5))
                .local(ValueType::I32)
                .inst(Instruction::Loop {
                    block_type: BlockType::Empty,
                })
                .inst(Instruction::LocalGet { local_idx: 1 })
                .inst(Instruction::LocalGet { local_idx: 0 })
                .inst(Instruction::I32Add)
                .inst(Instruction::LocalSet { local_idx: 1 })
                .inst(Instruction::LocalGet { local_idx: 0 })
                .inst(Instruction::I32Const { value: 1 })
                .inst(Instruction::I32Sub)
                .inst(Instruction::LocalTee { local_idx: 0 })
                .inst(Instruction::BrIf { label_idx: 0 })
                .inst(Instruction::End)
                .inst(Instruction::LocalGet { local_idx: 1 })
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(15)]);
        }

        #[test]
        fn loop_params_carried_by_branch() {
            ExecutorTest::new()
                .type_def(TypeDescriptor::Func(FuncType::new(
                    vec![ValueType::I32],
                    vec![ValueType::I32],
                )))
                .inst(Instruction::I32Const { value: 0 })
                .inst(Instruction::Loop {
                    block_type: BlockType::FuncType(0),
                })
                .inst(Instruction::I32Const { value: 1 })
                .inst(Instruction::I32Add)
                .inst(Instruction::LocalTee { local_idx: 0 })
                .inst(Instruction::LocalGet { local_idx: 0 })
                .inst(Instruction::I32Const { value: 10 })
                .inst(Instruction::I32LtS)
                .inst(Instruction::BrIf { label_idx: 0 })
                .inst(Instruction::End)
                .local(ValueType::I32)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(10)]);
        }

        #[test]
        fn budget_stops_infinite_loop() {
            ExecutorTest::new()
                .budget(1_000)
                .inst(Instruction::Loop {
                    block_type: BlockType::Empty,
                })
                .inst(Instruction::Br { label_idx: 0 })
                .inst(Instruction::End)
                .expect_error("Instruction budget exhausted");
        }
    }

    mod conditionals {
        use super::*;

        #[test]
        fn if_else_both_arms() {
            for (condition, expected) in [(1, 42), (0, 88), (-3, 42)] {
                ExecutorTest::new()
                    .inst(Instruction::I32Const { value: condition })
                    .inst(Instruction::If {
                        block_type: BlockType::Value(ValueType::I32),
                    })
                    .inst(Instruction::I32Const { value: 42 })
                    .inst(Instruction::Else)
                    .inst(Instruction::I32Const { value: 88 })
                    .inst(Instruction::End)
                    .returns(vec![ValueType::I32])
                    .expect_stack(vec![Value::I32(expected)]);
            }
        }

        #[test]
        fn if_false_without_else_skips() {
            ExecutorTest::new()
                .inst(Instruction::I32Const { value: 0 })
                .inst(Instruction::If {
                    block_type: BlockType::Empty,
                })
                .inst(Instruction::Unreachable)
                .inst(Instruction::End)
                .inst(Instruction::I32Const { value: 99 })
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(99)]);
        }

        #[test]
        fn unreachable_traps() {
            ExecutorTest::new()
                .inst(Instruction::Unreachable)
                .expect_trap(TrapKind::Unreachable, "Unreachable code");
        }
    }

    mod exceptions {
        use super::*;

        fn i32_tag() -> TypeDescriptor {
            TypeDescriptor::Func(FuncType::new(vec![ValueType::I32], vec![]))
        }

        #[test]
        fn catch_receives_payload() {
            ExecutorTest::new()
                .type_def(i32_tag())
                .tag(0)
                .inst(Instruction::Try {
                    block_type: BlockType::Value(ValueType::I32),
                })
                .inst(Instruction::I32Const { value: 5 })
                .inst(Instruction::Throw { tag_idx: 0 })
                .inst(Instruction::Catch { tag_idx: 0 })
                .inst(Instruction::I32Const { value: 1 })
                .inst(Instruction::I32Add)
                .inst(Instruction::End)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(6)]);
        }

        #[test]
        fn try_without_throw_skips_handlers() {
            ExecutorTest::new()
                .type_def(i32_tag())
                .tag(0)
                .inst(Instruction::Try {
                    block_type: BlockType::Value(ValueType::I32),
                })
                .inst(Instruction::I32Const { value: 3 })
                .inst(Instruction::Catch { tag_idx: 0 })
                .inst(Instruction::Unreachable)
                .inst(Instruction::CatchAll)
                .inst(Instruction::Unreachable)
                .inst(Instruction::End)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(3)]);
        }

        #[test]
        fn catch_all_and_stack_reset() {
            ExecutorTest::new()
                .type_def(i32_tag())
                .tag(0)
                .inst(Instruction::I64Const { value: 9 })
                .inst(Instruction::Try {
                    block_type: BlockType::Value(ValueType::I32),
                })
                .inst(Instruction::I32Const { value: 100 })
                .inst(Instruction::I32Const { value: 5 })
                .inst(Instruction::Throw { tag_idx: 0 })
                .inst(Instruction::CatchAll)
                .inst(Instruction::I32Const { value: 77 })
                .inst(Instruction::End)
                .returns(vec![ValueType::I64, ValueType::I32])
                .expect_stack(vec![Value::I64(9), Value::I32(77)]);
        }

        #[test]
        fn rethrow_to_outer_handler() {
            ExecutorTest::new()
                .type_def(i32_tag())
                .tag(0)
                .inst(Instruction::Try {
                    block_type: BlockType::Value(ValueType::I32),
                })
                .inst(Instruction::Try {
                    block_type: BlockType::Empty,
                })
                .inst(Instruction::I32Const { value: 8 })
                .inst(Instruction::Throw { tag_idx: 0 })
                .inst(Instruction::CatchAll)
                .inst(Instruction::Rethrow { label_idx: 0 })
                .inst(Instruction::End)
                .inst(Instruction::I32Const { value: 0 })
                .inst(Instruction::Catch { tag_idx: 0 })
                .inst(Instruction::End)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(8)]);
        }

        #[test]
        fn rethrow_outside_handler() {
            ExecutorTest::new()
                .inst(Instruction::Block {
                    block_type: BlockType::Empty,
                })
                .inst(Instruction::Rethrow { label_idx: 0 })
                .inst(Instruction::End)
                .expect_error("Invalid label: 0");
        }

        #[test]
        fn uncaught_exception_reaches_host() {
            ExecutorTest::new()
                .type_def(i32_tag())
                .tag(0)
                .inst(Instruction::I32Const { value: 5 })
                .inst(Instruction::Throw { tag_idx: 0 })
                .expect_error("Uncaught exception: tag 0 (i32:5)");
        }

        #[test]
        fn traps_are_not_caught() {
            ExecutorTest::new()
                .inst(Instruction::Try {
                    block_type: BlockType::Empty,
                })
                .inst(Instruction::Unreachable)
                .inst(Instruction::CatchAll)
                .inst(Instruction::End)
                .expect_trap(TrapKind::Unreachable, "Unreachable code");
        }
    }
}
