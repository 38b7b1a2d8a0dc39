//! The interpreter loop
//!
//! An [`Executor`] runs one host-level invocation over a [`Store`]. Every wasm activation is a
//! [`Frame`] on an explicit [`CallStack`]; the loop fetches one instruction from the top frame,
//! executes it and acts on the resulting [`Flow`]:
//!
//! ```text
//! Continue    -> next instruction
//! Call(f)     -> move args out of the caller, push a frame (or run the host function)
//! ReturnCall  -> move args out, drop the caller, build the callee in its place
//! Return      -> pop the frame, deliver results to the caller (or to the host)
//! Throw(e)    -> search handlers frame by frame, dropping frames without one
//! ```
//!
//! Traps are plain `Err` values: they abort the loop and every remaining frame is dropped on
//! the way out. Nothing here recurses on the host stack.

use super::call_stack::CallStack;
use super::code::FunctionCode;
use super::control::LabelKind;
use super::exception::Exception;
use super::frame::{Frame, FrameEntry};
use super::heap::Extension;
use super::ops::{self, control::Flow};
use super::registry::TypeRegistry;
use super::store::{FunctionInstance, HostFunc, Store};
use super::trap::Trap;
use super::{marshal, FuncAddr, RuntimeError, Value};
use crate::module::{FuncType, Instruction, TypeIdx};
use std::rc::Rc;
use tracing::{debug, trace};

/// Executes functions of a store
pub struct Executor<'s> {
    store: &'s mut Store,
    call_stack: CallStack,
    /// Remaining instructions, if limited
    budget: Option<u64>,
    max_operand_stack: usize,
}

impl<'s> Executor<'s> {
    /// Create an executor using the store's configured limits
    pub fn new(store: &'s mut Store) -> Self {
        let config = store.config().clone();
        Executor {
            store,
            call_stack: CallStack::new(config.max_call_depth),
            budget: config.instruction_budget,
            max_operand_stack: config.max_operand_stack,
        }
    }

    /// Override the instruction budget
    pub fn with_budget(mut self, budget: Option<u64>) -> Self {
        self.budget = budget;
        self
    }

    /// The frame stack, for inspecting depth after a run
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// Call `addr` with host-supplied arguments and run it to completion
    pub fn invoke(&mut self, addr: FuncAddr, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        let func = self.store.function(addr)?.clone();
        marshal::check_host_arguments(&args, &func.signature().params)?;

        let base = self.call_stack.depth();
        let result = match func {
            FunctionInstance::Host { func, signature, .. } => call_host(&func, &signature, args),
            FunctionInstance::Wasm { instance_id, code } => self
                .call_stack
                .push(Frame::new(addr, instance_id, code, args, FrameEntry::Call))
                .and_then(|()| self.run(base)),
        };

        if let Err(err) = &result {
            while self.call_stack.depth() > base {
                if let Some(frame) = self.call_stack.pop() {
                    trace!(func = frame.func.0, pc = frame.pc, "unwinding frame");
                }
            }
            debug!(func = addr.0, error = %err, "invocation failed");
        }
        result
    }

    /// Run until the frame at depth `base` returns
    fn run(&mut self, base: usize) -> Result<Vec<Value>, RuntimeError> {
        loop {
            match self.step()? {
                Flow::Continue => self.check_operand_stack()?,
                Flow::Return => {
                    let mut frame = self.call_stack.pop().ok_or(RuntimeError::NoActiveFrame)?;
                    let results = marshal::collect_results(&mut frame.stack, &frame.code.signature.results)?;
                    drop(frame);
                    if self.call_stack.depth() == base {
                        return Ok(results);
                    }
                    marshal::deliver_results(&mut self.current_frame()?.stack, results);
                }
                Flow::Call(callee) => self.call(callee)?,
                Flow::ReturnCall(callee) => {
                    if let Some(results) = self.return_call(callee, base)? {
                        return Ok(results);
                    }
                }
                Flow::Throw(exception) => self.throw(exception, base)?,
            }
        }
    }

    fn current_frame(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.call_stack.top_mut().ok_or(RuntimeError::NoActiveFrame)
    }

    fn check_operand_stack(&self) -> Result<(), RuntimeError> {
        match self.call_stack.top() {
            Some(frame) if frame.stack.depth() > self.max_operand_stack => {
                Err(RuntimeError::OperandStackOverflow(self.max_operand_stack))
            }
            _ => Ok(()),
        }
    }

    /// Ordinary call: the caller stays suspended below the callee
    fn call(&mut self, callee: FuncAddr) -> Result<(), RuntimeError> {
        let func = self.store.function(callee)?.clone();
        let args = marshal::take_arguments(&mut self.current_frame()?.stack, &func.signature().params)?;
        trace!(func = callee.0, depth = self.call_stack.depth(), "call");
        match func {
            FunctionInstance::Host { func, signature, .. } => {
                let results = call_host(&func, &signature, args)?;
                marshal::deliver_results(&mut self.current_frame()?.stack, results);
                Ok(())
            }
            FunctionInstance::Wasm { instance_id, code } => {
                self.call_stack
                    .push(Frame::new(callee, instance_id, code, args, FrameEntry::Call))
            }
        }
    }

    /// Tail call: the caller's frame is gone before the callee's exists
    ///
    /// Returns the results if the replaced frame was the invocation's entry frame and the
    /// callee was a host function.
    fn return_call(&mut self, callee: FuncAddr, base: usize) -> Result<Option<Vec<Value>>, RuntimeError> {
        let func = self.store.function(callee)?.clone();
        let args = marshal::take_arguments(&mut self.current_frame()?.stack, &func.signature().params)?;
        trace!(func = callee.0, depth = self.call_stack.depth(), "tail call");
        match func {
            FunctionInstance::Host { func, signature, .. } => {
                drop(self.call_stack.pop());
                let results = call_host(&func, &signature, args)?;
                if self.call_stack.depth() == base {
                    return Ok(Some(results));
                }
                marshal::deliver_results(&mut self.current_frame()?.stack, results);
                Ok(None)
            }
            FunctionInstance::Wasm { instance_id, code } => {
                self.call_stack
                    .tail_replace(|| Ok(Frame::new(callee, instance_id, code, args, FrameEntry::TailCall)))?;
                Ok(None)
            }
        }
    }

    /// Unwind to the nearest handler for `exception`
    fn throw(&mut self, exception: Exception, base: usize) -> Result<(), RuntimeError> {
        while self.call_stack.depth() > base {
            let depth = self.call_stack.depth();
            let frame = self.call_stack.top_mut().ok_or(RuntimeError::NoActiveFrame)?;
            let instance = self.store.instance(frame.instance)?;
            if ops::control::catch_exception(frame, &exception, |idx| instance.tag_addr(idx).ok())? {
                trace!(tag = exception.tag.0, depth, "exception caught");
                return Ok(());
            }
            trace!(tag = exception.tag.0, func = frame.func.0, depth, "exception unwinding frame");
            drop(self.call_stack.pop());
        }
        Err(RuntimeError::UncaughtException(exception))
    }

    /// Execute the instruction at the top frame's program counter
    fn step(&mut self) -> Result<Flow, RuntimeError> {
        if let Some(budget) = self.budget.as_mut() {
            if *budget == 0 {
                return Err(RuntimeError::InstructionBudgetExhausted);
            }
            *budget -= 1;
        }

        let store = &mut *self.store;
        let frame = self.call_stack.top_mut().ok_or(RuntimeError::NoActiveFrame)?;
        let code = Rc::clone(&frame.code);
        let pc = frame.pc;
        let instruction = code
            .body
            .get(pc)
            .ok_or_else(|| RuntimeError::InvalidFunctionBody(format!("no instruction at {pc}")))?;
        frame.pc += 1;

        match instruction {
            // Control
            Instruction::Unreachable => return ops::control::unreachable(),
            Instruction::Nop => {}
            Instruction::Block { .. } => return ops::control::enter_block(frame, LabelKind::Block, pc),
            Instruction::Loop { .. } => return ops::control::enter_block(frame, LabelKind::Loop, pc),
            Instruction::If { .. } => return ops::control::if_(frame, pc),
            Instruction::Else | Instruction::Catch { .. } | Instruction::CatchAll => {
                return ops::control::exit_block(frame, pc)
            }
            Instruction::End => return ops::control::end(frame),
            Instruction::Br { label_idx } => return ops::control::br(frame, *label_idx),
            Instruction::BrIf { label_idx } => return ops::control::br_if(frame, *label_idx),
            Instruction::BrTable { labels, default } => return ops::control::br_table(frame, labels, *default),
            Instruction::Return => return ops::control::return_op(),

            // Calls
            Instruction::Call { func_idx } => {
                return Ok(Flow::Call(store.instance(frame.instance)?.func_addr(*func_idx)?));
            }
            Instruction::ReturnCall { func_idx } => {
                return Ok(Flow::ReturnCall(store.instance(frame.instance)?.func_addr(*func_idx)?));
            }
            Instruction::CallIndirect { type_idx, table_idx } => {
                return resolve_indirect(store, frame, &code, pc, *type_idx, *table_idx).map(Flow::Call);
            }
            Instruction::ReturnCallIndirect { type_idx, table_idx } => {
                return resolve_indirect(store, frame, &code, pc, *type_idx, *table_idx).map(Flow::ReturnCall);
            }
            Instruction::CallRef { type_idx } => return resolve_ref(store, frame, *type_idx).map(Flow::Call),
            Instruction::ReturnCallRef { type_idx } => {
                return resolve_ref(store, frame, *type_idx).map(Flow::ReturnCall);
            }

            // Exceptions
            Instruction::Try { .. } => return ops::control::enter_block(frame, LabelKind::Try, pc),
            Instruction::Throw { tag_idx } => {
                let tag_addr = store.instance(frame.instance)?.tag_addr(*tag_idx)?;
                let tag = store.tag(tag_addr)?;
                return ops::control::throw(&mut frame.stack, tag_addr, &tag.signature.params);
            }
            Instruction::Rethrow { label_idx } => return ops::control::rethrow(frame, *label_idx),

            // References
            Instruction::RefNull { .. } => ops::reference::ref_null(&mut frame.stack)?,
            Instruction::RefIsNull => ops::reference::ref_is_null(&mut frame.stack)?,
            Instruction::RefFunc { func_idx } => {
                let addr = store.instance(frame.instance)?.func_addr(*func_idx)?;
                ops::reference::ref_func(&mut frame.stack, addr)?
            }
            Instruction::RefAsNonNull => ops::reference::ref_as_non_null(&mut frame.stack)?,
            Instruction::RefEq => ops::reference::ref_eq(&mut frame.stack)?,

            // Parametric
            Instruction::Drop => ops::parametric::drop(&mut frame.stack)?,
            Instruction::Select => ops::parametric::select(&mut frame.stack)?,

            // Variables
            Instruction::LocalGet { local_idx } => ops::variable::local_get(frame, *local_idx)?,
            Instruction::LocalSet { local_idx } => ops::variable::local_set(frame, *local_idx)?,
            Instruction::LocalTee { local_idx } => ops::variable::local_tee(frame, *local_idx)?,
            Instruction::GlobalGet { global_idx } => {
                let addr = store.instance(frame.instance)?.global_addr(*global_idx)?;
                ops::variable::global_get(frame, store.global(addr)?)?
            }
            Instruction::GlobalSet { global_idx } => {
                let addr = store.instance(frame.instance)?.global_addr(*global_idx)?;
                ops::variable::global_set(frame, store.global_mut(addr)?, *global_idx)?
            }

            // Tables
            Instruction::TableGet { table_idx } => {
                let addr = store.instance(frame.instance)?.table_addr(*table_idx)?;
                ops::table::table_get(&mut frame.stack, store.table(addr)?)?
            }
            Instruction::TableSize { table_idx } => {
                let addr = store.instance(frame.instance)?.table_addr(*table_idx)?;
                ops::table::table_size(&mut frame.stack, store.table(addr)?)?
            }

            // Aggregates
            Instruction::StructNew { type_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                let (heap, registry) = store.heap_parts();
                ops::aggregate::struct_new(&mut frame.stack, heap, registry, ty)?
            }
            Instruction::StructNewDefault { type_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                let (heap, registry) = store.heap_parts();
                ops::aggregate::struct_new_default(&mut frame.stack, heap, registry, ty)?
            }
            Instruction::StructGet { type_idx, field_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                ops::aggregate::struct_get(&mut frame.stack, store.heap(), ty, *field_idx, Extension::None)?
            }
            Instruction::StructGetS { type_idx, field_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                ops::aggregate::struct_get(&mut frame.stack, store.heap(), ty, *field_idx, Extension::Signed)?
            }
            Instruction::StructGetU { type_idx, field_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                ops::aggregate::struct_get(&mut frame.stack, store.heap(), ty, *field_idx, Extension::Unsigned)?
            }
            Instruction::StructSet { type_idx, field_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                let (heap, _) = store.heap_parts();
                ops::aggregate::struct_set(&mut frame.stack, heap, ty, *field_idx)?
            }
            Instruction::ArrayNew { type_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                let (heap, registry) = store.heap_parts();
                ops::aggregate::array_new(&mut frame.stack, heap, registry, ty)?
            }
            Instruction::ArrayNewDefault { type_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                let (heap, registry) = store.heap_parts();
                ops::aggregate::array_new_default(&mut frame.stack, heap, registry, ty)?
            }
            Instruction::ArrayNewFixed { type_idx, len } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                let (heap, registry) = store.heap_parts();
                ops::aggregate::array_new_fixed(&mut frame.stack, heap, registry, ty, *len)?
            }
            Instruction::ArrayGet { type_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                ops::aggregate::array_get(&mut frame.stack, store.heap(), ty, Extension::None)?
            }
            Instruction::ArrayGetS { type_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                ops::aggregate::array_get(&mut frame.stack, store.heap(), ty, Extension::Signed)?
            }
            Instruction::ArrayGetU { type_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                ops::aggregate::array_get(&mut frame.stack, store.heap(), ty, Extension::Unsigned)?
            }
            Instruction::ArraySet { type_idx } => {
                let ty = store.instance(frame.instance)?.type_idx(*type_idx)?;
                let (heap, _) = store.heap_parts();
                ops::aggregate::array_set(&mut frame.stack, heap, ty)?
            }
            Instruction::ArrayLen => ops::aggregate::array_len(&mut frame.stack, store.heap())?,

            // Constants
            Instruction::I32Const { value } => ops::numeric::i32_const(&mut frame.stack, *value)?,
            Instruction::I64Const { value } => ops::numeric::i64_const(&mut frame.stack, *value)?,
            Instruction::F32Const { value } => ops::numeric::f32_const(&mut frame.stack, *value)?,
            Instruction::F64Const { value } => ops::numeric::f64_const(&mut frame.stack, *value)?,

            // i32
            Instruction::I32Eqz => ops::comparison::i32_eqz(&mut frame.stack)?,
            Instruction::I32Eq => ops::comparison::i32_eq(&mut frame.stack)?,
            Instruction::I32Ne => ops::comparison::i32_ne(&mut frame.stack)?,
            Instruction::I32LtS => ops::comparison::i32_lt_s(&mut frame.stack)?,
            Instruction::I32LtU => ops::comparison::i32_lt_u(&mut frame.stack)?,
            Instruction::I32GtS => ops::comparison::i32_gt_s(&mut frame.stack)?,
            Instruction::I32GtU => ops::comparison::i32_gt_u(&mut frame.stack)?,
            Instruction::I32LeS => ops::comparison::i32_le_s(&mut frame.stack)?,
            Instruction::I32GeS => ops::comparison::i32_ge_s(&mut frame.stack)?,
            Instruction::I32Add => ops::numeric::i32_add(&mut frame.stack)?,
            Instruction::I32Sub => ops::numeric::i32_sub(&mut frame.stack)?,
            Instruction::I32Mul => ops::numeric::i32_mul(&mut frame.stack)?,
            Instruction::I32DivS => ops::numeric::i32_div_s(&mut frame.stack)?,
            Instruction::I32DivU => ops::numeric::i32_div_u(&mut frame.stack)?,
            Instruction::I32RemS => ops::numeric::i32_rem_s(&mut frame.stack)?,
            Instruction::I32RemU => ops::numeric::i32_rem_u(&mut frame.stack)?,
            Instruction::I32And => ops::numeric::i32_and(&mut frame.stack)?,
            Instruction::I32Or => ops::numeric::i32_or(&mut frame.stack)?,
            Instruction::I32Xor => ops::numeric::i32_xor(&mut frame.stack)?,

            // i64
            Instruction::I64Eqz => ops::comparison::i64_eqz(&mut frame.stack)?,
            Instruction::I64Eq => ops::comparison::i64_eq(&mut frame.stack)?,
            Instruction::I64Ne => ops::comparison::i64_ne(&mut frame.stack)?,
            Instruction::I64LtS => ops::comparison::i64_lt_s(&mut frame.stack)?,
            Instruction::I64GtS => ops::comparison::i64_gt_s(&mut frame.stack)?,
            Instruction::I64Add => ops::numeric::i64_add(&mut frame.stack)?,
            Instruction::I64Sub => ops::numeric::i64_sub(&mut frame.stack)?,
            Instruction::I64Mul => ops::numeric::i64_mul(&mut frame.stack)?,
            Instruction::I64DivS => ops::numeric::i64_div_s(&mut frame.stack)?,
            Instruction::I64DivU => ops::numeric::i64_div_u(&mut frame.stack)?,
            Instruction::I64RemS => ops::numeric::i64_rem_s(&mut frame.stack)?,
            Instruction::I64RemU => ops::numeric::i64_rem_u(&mut frame.stack)?,

            // Floats
            Instruction::F32Eq => ops::comparison::f32_eq(&mut frame.stack)?,
            Instruction::F32Lt => ops::comparison::f32_lt(&mut frame.stack)?,
            Instruction::F32Add => ops::numeric::f32_add(&mut frame.stack)?,
            Instruction::F32Sub => ops::numeric::f32_sub(&mut frame.stack)?,
            Instruction::F32Mul => ops::numeric::f32_mul(&mut frame.stack)?,
            Instruction::F32Div => ops::numeric::f32_div(&mut frame.stack)?,
            Instruction::F64Eq => ops::comparison::f64_eq(&mut frame.stack)?,
            Instruction::F64Lt => ops::comparison::f64_lt(&mut frame.stack)?,
            Instruction::F64Add => ops::numeric::f64_add(&mut frame.stack)?,
            Instruction::F64Sub => ops::numeric::f64_sub(&mut frame.stack)?,
            Instruction::F64Mul => ops::numeric::f64_mul(&mut frame.stack)?,
            Instruction::F64Div => ops::numeric::f64_div(&mut frame.stack)?,

            // Conversions
            Instruction::I32WrapI64 => ops::conversion::i32_wrap_i64(&mut frame.stack)?,
            Instruction::I64ExtendI32S => ops::conversion::i64_extend_i32_s(&mut frame.stack)?,
            Instruction::I64ExtendI32U => ops::conversion::i64_extend_i32_u(&mut frame.stack)?,
            Instruction::F64PromoteF32 => ops::conversion::f64_promote_f32(&mut frame.stack)?,
            Instruction::F32DemoteF64 => ops::conversion::f32_demote_f64(&mut frame.stack)?,
        }
        Ok(Flow::Continue)
    }
}

/// Resolve the target of a `call_indirect`/`return_call_indirect` at `pc`
///
/// The table slot is read on every dispatch and run through the site's link cache; the
/// target's signature is compared with the expected one every time, hit or miss.
fn resolve_indirect(
    store: &Store,
    frame: &mut Frame,
    code: &FunctionCode,
    pc: usize,
    type_idx: TypeIdx,
    table_idx: u32,
) -> Result<FuncAddr, RuntimeError> {
    let instance = store.instance(frame.instance)?;
    let table_addr = instance.table_addr(table_idx)?;
    let expected = store.registry().func_type(instance.type_idx(type_idx)?)?;

    let slot = frame.stack.pop_i32()? as u32;
    let target = store
        .table(table_addr)?
        .get(slot)?
        .ok_or_else(Trap::uninitialized_element)?;
    let entry = code
        .call_site(pc)?
        .link(table_addr, slot, target, |addr| Ok(store.function(addr)?.type_idx()))?;

    let actual = store.registry().func_type(entry.type_idx)?;
    if !TypeRegistry::signature_equals(expected, actual) {
        return Err(Trap::indirect_call_type_mismatch().into());
    }
    Ok(entry.target)
}

/// Resolve the target of a `call_ref`/`return_call_ref`
fn resolve_ref(store: &Store, frame: &mut Frame, type_idx: TypeIdx) -> Result<FuncAddr, RuntimeError> {
    let expected = store
        .registry()
        .func_type(store.instance(frame.instance)?.type_idx(type_idx)?)?;
    let target = ops::reference::pop_func(&mut frame.stack)?;
    if !TypeRegistry::signature_equals(expected, store.function(target)?.signature()) {
        return Err(Trap::indirect_call_type_mismatch().into());
    }
    Ok(target)
}

fn call_host(func: &HostFunc, signature: &FuncType, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
    let results = func(args)?;
    marshal::check_host_results(&results, &signature.results)?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleBuilder, RefType, ValueType};
    use crate::runtime::trap::TrapKind;
    use crate::runtime::{ExecutionConfig, ImportObject};

    /// `count(n)`: tail-calls itself until n reaches 0, then returns 7
    fn countdown(builder: &mut ModuleBuilder, tail: bool) -> u32 {
        let sig = builder.func_type(vec![ValueType::I64], vec![ValueType::I32]);
        let count = builder.declare_function(sig);
        let recurse = if tail {
            Instruction::ReturnCall { func_idx: count }
        } else {
            Instruction::Call { func_idx: count }
        };
        builder.define_function(
            count,
            vec![],
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::I64Eqz,
                Instruction::If {
                    block_type: crate::module::BlockType::Empty,
                },
                Instruction::I32Const { value: 7 },
                Instruction::Return,
                Instruction::End,
                Instruction::LocalGet { local_idx: 0 },
                Instruction::I64Const { value: 1 },
                Instruction::I64Sub,
                recurse,
            ],
        );
        builder.export_function("count", count);
        count
    }

    fn instantiate(store: &mut Store, tail: bool) -> FuncAddr {
        let mut builder = ModuleBuilder::new("countdown");
        countdown(&mut builder, tail);
        let id = store.instantiate(&builder.build(), &ImportObject::new()).unwrap();
        store.export_function(id, "count").unwrap()
    }

    #[test]
    fn test_tail_calls_keep_depth_constant() {
        let mut store = Store::new();
        let count = instantiate(&mut store, true);
        let mut executor = Executor::new(&mut store);
        let results = executor.invoke(count, vec![Value::I64(100_000)]).unwrap();
        assert_eq!(results, vec![Value::I32(7)]);
        assert_eq!(executor.call_stack().max_depth_reached(), 1);
        assert!(executor.call_stack().is_empty());
    }

    #[test]
    fn test_plain_calls_grow_depth() {
        let mut store = Store::new();
        let count = instantiate(&mut store, false);
        let mut executor = Executor::new(&mut store);
        executor.invoke(count, vec![Value::I64(50)]).unwrap();
        assert_eq!(executor.call_stack().max_depth_reached(), 51);
    }

    #[test]
    fn test_call_depth_limit() {
        let mut store = Store::with_config(ExecutionConfig {
            max_call_depth: 100,
            ..Default::default()
        });
        let count = instantiate(&mut store, false);
        let mut executor = Executor::new(&mut store);
        match executor.invoke(count, vec![Value::I64(1_000)]) {
            Err(RuntimeError::Trap(trap)) => assert_eq!(trap.kind, TrapKind::CallStackExhausted),
            other => panic!("expected trap, got {other:?}"),
        }
        assert!(executor.call_stack().is_empty());

        // The same depth is fine as a tail-call chain
        let count = instantiate(&mut store, true);
        assert_eq!(store.invoke(count, vec![Value::I64(1_000)]).unwrap(), vec![Value::I32(7)]);
    }

    #[test]
    fn test_host_function_call() {
        let mut store = Store::new();
        let mut imports = ImportObject::new();
        let sig = FuncType::new(vec![ValueType::I32, ValueType::I64], vec![ValueType::I64]);
        let host = store.allocate_host_function(sig.clone(), |args| match args.as_slice() {
            [Value::I32(a), Value::I64(b)] => Ok(vec![Value::I64(i64::from(*a) * *b)]),
            _ => unreachable!(),
        });
        imports.add_function("env", "mul", host);

        let mut builder = ModuleBuilder::new("m");
        let ty = builder.func_type(sig.params.clone(), sig.results.clone());
        let mul = builder.import_function("env", "mul", ty);
        let caller_ty = builder.func_type(vec![], vec![ValueType::I64]);
        let f = builder.function(
            caller_ty,
            vec![],
            vec![
                Instruction::I32Const { value: 6 },
                Instruction::I64Const { value: 7 },
                Instruction::Call { func_idx: mul },
            ],
        );
        let g = builder.function(
            caller_ty,
            vec![],
            vec![
                Instruction::I32Const { value: -2 },
                Instruction::I64Const { value: 8 },
                Instruction::ReturnCall { func_idx: mul },
            ],
        );
        builder.export_function("f", f);
        builder.export_function("g", g);
        let id = store.instantiate(&builder.build(), &imports).unwrap();

        assert_eq!(store.invoke_export(id, "f", vec![]).unwrap(), vec![Value::I64(42)]);
        assert_eq!(store.invoke_export(id, "g", vec![]).unwrap(), vec![Value::I64(-16)]);
    }

    #[test]
    fn test_host_results_checked() {
        let mut store = Store::new();
        let host = store.allocate_host_function(FuncType::new(vec![], vec![ValueType::I32]), |_| {
            Ok(vec![Value::F32(1.0)])
        });
        let err = store.invoke(host, vec![]).unwrap_err();
        assert!(err.to_string().contains("expected i32 for result 0"));
    }

    #[test]
    fn test_indirect_dispatch_and_link_cache() {
        let mut builder = ModuleBuilder::new("m");
        let unary = builder.func_type(vec![ValueType::I32], vec![ValueType::I32]);
        let nullary = builder.func_type(vec![], vec![ValueType::I32]);
        let inc = builder.function(
            unary,
            vec![],
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::I32Const { value: 1 },
                Instruction::I32Add,
            ],
        );
        let neg = builder.function(
            unary,
            vec![],
            vec![
                Instruction::I32Const { value: 0 },
                Instruction::LocalGet { local_idx: 0 },
                Instruction::I32Sub,
            ],
        );
        let answer = builder.function(nullary, vec![], vec![Instruction::I32Const { value: 42 }]);
        let table = builder.table(RefType::FUNCREF, 4);
        builder.elements(table, 0, vec![inc, neg, answer]);
        // dispatch(slot, x) = table[slot](x)
        let dispatch_ty = builder.func_type(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32]);
        let dispatch = builder.function(
            dispatch_ty,
            vec![],
            vec![
                Instruction::LocalGet { local_idx: 1 },
                Instruction::LocalGet { local_idx: 0 },
                Instruction::CallIndirect {
                    type_idx: unary,
                    table_idx: table,
                },
            ],
        );
        builder.export_function("dispatch", dispatch);

        let mut store = Store::new();
        let id = store.instantiate(&builder.build(), &ImportObject::new()).unwrap();
        let dispatch = store.export_function(id, "dispatch").unwrap();
        let call = |store: &mut Store, slot: i32, x: i32| store.invoke(dispatch, vec![Value::I32(slot), Value::I32(x)]);

        assert_eq!(call(&mut store, 0, 5).unwrap(), vec![Value::I32(6)]);
        assert_eq!(call(&mut store, 0, 9).unwrap(), vec![Value::I32(10)]);
        assert_eq!(call(&mut store, 1, 5).unwrap(), vec![Value::I32(-5)]);

        let code = store.function_code(dispatch).unwrap();
        let site = &code.call_sites()[0];
        assert_eq!(code.call_sites().len(), 1);
        assert_eq!(site.hits(), 1);
        assert_eq!(site.relinks(), 1);

        let trap_kind = |result: Result<Vec<Value>, RuntimeError>| match result {
            Err(RuntimeError::Trap(trap)) => (trap.kind, trap.reason),
            other => panic!("expected trap, got {other:?}"),
        };
        assert_eq!(
            trap_kind(call(&mut store, 2, 5)),
            (TrapKind::IndirectCallTypeMismatch, "indirect call type mismatch".to_string())
        );
        assert_eq!(
            trap_kind(call(&mut store, 3, 5)),
            (TrapKind::NullReference, "uninitialized element".to_string())
        );
        assert_eq!(
            trap_kind(call(&mut store, 4, 5)),
            (TrapKind::TableOutOfBounds, "undefined element".to_string())
        );
        // A mismatched target is still checked after it has been linked
        assert_eq!(trap_kind(call(&mut store, 2, 5)).0, TrapKind::IndirectCallTypeMismatch);
    }

    #[test]
    fn test_call_ref() {
        let mut builder = ModuleBuilder::new("m");
        let unary = builder.func_type(vec![ValueType::I64], vec![ValueType::I64]);
        let square = builder.function(
            unary,
            vec![],
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 0 },
                Instruction::I64Mul,
            ],
        );
        let apply = builder.function(
            unary,
            vec![],
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::RefFunc { func_idx: square },
                Instruction::ReturnCallRef { type_idx: unary },
            ],
        );
        let apply_null = builder.function(
            unary,
            vec![],
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::RefNull {
                    ref_type: ValueType::FUNCREF,
                },
                Instruction::CallRef { type_idx: unary },
            ],
        );
        builder.export_function("apply", apply);
        builder.export_function("apply_null", apply_null);

        let mut store = Store::new();
        let id = store.instantiate(&builder.build(), &ImportObject::new()).unwrap();
        assert_eq!(
            store.invoke_export(id, "apply", vec![Value::I64(-9)]).unwrap(),
            vec![Value::I64(81)]
        );
        match store.invoke_export(id, "apply_null", vec![Value::I64(1)]) {
            Err(RuntimeError::Trap(trap)) => assert_eq!(trap.kind, TrapKind::NullReference),
            other => panic!("expected trap, got {other:?}"),
        }
    }

    #[test]
    fn test_exception_crosses_frames() {
        let mut builder = ModuleBuilder::new("m");
        let payload = builder.func_type(vec![ValueType::I32], vec![]);
        let tag = builder.tag(payload);
        let thrower_ty = builder.func_type(vec![], vec![]);
        let thrower = builder.function(
            thrower_ty,
            vec![],
            vec![Instruction::I32Const { value: 13 }, Instruction::Throw { tag_idx: tag }],
        );
        let result_ty = builder.func_type(vec![], vec![ValueType::I32]);
        let catcher = builder.function(
            result_ty,
            vec![],
            vec![
                Instruction::Try {
                    block_type: crate::module::BlockType::Value(ValueType::I32),
                },
                Instruction::Call { func_idx: thrower },
                Instruction::I32Const { value: 0 },
                Instruction::Catch { tag_idx: tag },
                Instruction::End,
            ],
        );
        builder.export_function("catcher", catcher);
        builder.export_function("thrower", thrower);

        let mut store = Store::new();
        let id = store.instantiate(&builder.build(), &ImportObject::new()).unwrap();
        assert_eq!(store.invoke_export(id, "catcher", vec![]).unwrap(), vec![Value::I32(13)]);
        match store.invoke_export(id, "thrower", vec![]) {
            Err(RuntimeError::UncaughtException(exception)) => {
                assert_eq!(exception.payload, vec![Value::I32(13)]);
            }
            other => panic!("expected uncaught exception, got {other:?}"),
        }
    }

    #[test]
    fn test_operand_stack_limit() {
        let mut builder = ModuleBuilder::new("m");
        let sig = builder.func_type(vec![], vec![]);
        let mut body: Vec<Instruction> = (0..9).map(|value| Instruction::I32Const { value }).collect();
        body.extend((0..9).map(|_| Instruction::Drop));
        let deep = builder.function(sig, vec![], body);
        let spin = builder.function(
            sig,
            vec![],
            vec![
                Instruction::Loop {
                    block_type: crate::module::BlockType::Empty,
                },
                Instruction::I32Const { value: 1 },
                Instruction::Br { label_idx: 0 },
                Instruction::End,
            ],
        );
        builder.export_function("deep", deep);
        builder.export_function("spin", spin);
        let mut store = Store::with_config(ExecutionConfig {
            max_operand_stack: 8,
            ..Default::default()
        });
        let id = store.instantiate(&builder.build(), &ImportObject::new()).unwrap();

        let err = store.invoke_export(id, "deep", vec![]).unwrap_err();
        assert!(matches!(err, RuntimeError::OperandStackOverflow(8)));

        // Branching back to the loop discards the pushed value, so only the budget stops it
        let err = store.invoke_export_with_budget(id, "spin", vec![], Some(300)).unwrap_err();
        assert!(matches!(err, RuntimeError::InstructionBudgetExhausted));
    }
}
