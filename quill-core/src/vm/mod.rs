//! The bytecode virtual machine: fetch-decode loop, calling convention,
//! exception unwinding, the iterator protocol, and the module cache.

mod frame;
mod handler;
mod index;
mod iter;
mod modules;
mod ops;
mod pool;

pub use frame::Frame;
pub use handler::Handler;
pub use modules::ModuleCache;
pub use pool::VmPool;

use crate::bytecode::{Bytecode, CompiledFunction};
use crate::error::VmError;
use crate::instr::{call_flag, finalizer_mode, op, throw_mode};
use crate::value::{
    CallArgs, CallWrapperData, ClosureData, NativeFunctionData, OrderedDict, RuntimeErrorData, Value,
};
use iter::IterState;
use std::cell::RefCell;
use std::rc::Rc;

/// Frame stack depth at which the VM gives up and raises `StackOverflow`
/// rather than growing without bound (runaway recursion, accidental
/// infinite mutual tail calls that didn't qualify for frame reuse).
pub const MAX_FRAMES: usize = 2048;

pub struct Vm {
    main: Rc<CompiledFunction>,
    constants: Rc<Vec<Value>>,
    globals: Rc<RefCell<Vec<Value>>>,
    builtins: Rc<Vec<Rc<NativeFunctionData>>>,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    iterators: Vec<IterState>,
    modules: ModuleCache,
    /// Stashed by `propagate` when a pure `try`/`finally` (no catch) needs
    /// its finally block to run before the error keeps unwinding; consumed
    /// by `Finalizer`'s `RERAISE` mode.
    pending_rethrow: Option<RuntimeErrorData>,
}

impl Vm {
    pub fn new(bytecode: &Bytecode, builtins: Vec<Rc<NativeFunctionData>>) -> Self {
        Self::with_globals(
            bytecode,
            builtins,
            Rc::new(RefCell::new(vec![Value::Nil; bytecode.num_globals])),
        )
    }

    /// Shares a pre-existing globals vector, e.g. a pooled `Vm` re-running
    /// the same module against state left by a previous call, or globals
    /// seeded by the host before the first run.
    pub fn with_globals(
        bytecode: &Bytecode,
        builtins: Vec<Rc<NativeFunctionData>>,
        globals: Rc<RefCell<Vec<Value>>>,
    ) -> Self {
        Self::with_globals_rc(
            Rc::new(bytecode.clone()),
            Rc::new(builtins),
            globals,
        )
    }

    /// Used by [`pool::VmPool`] to build a fresh `Vm` sharing an
    /// already-`Rc`-wrapped bytecode/builtin table instead of cloning
    /// them per checkout.
    pub(crate) fn with_globals_rc(
        bytecode: Rc<Bytecode>,
        builtins: Rc<Vec<Rc<NativeFunctionData>>>,
        globals: Rc<RefCell<Vec<Value>>>,
    ) -> Self {
        if globals.borrow().len() < bytecode.num_globals {
            globals.borrow_mut().resize(bytecode.num_globals, Value::Nil);
        }
        let mut frames = Vec::with_capacity(64);
        frames.push(Frame::new(bytecode.main.clone(), Rc::from([]), 0));
        Self {
            main: bytecode.main.clone(),
            constants: Rc::new(bytecode.constants.clone()),
            globals,
            builtins,
            stack: Vec::with_capacity(256),
            frames,
            iterators: Vec::new(),
            modules: ModuleCache::new(),
            pending_rethrow: None,
        }
    }

    pub fn globals(&self) -> Rc<RefCell<Vec<Value>>> {
        self.globals.clone()
    }

    /// Restores a checked-in `Vm` to a fresh-start state for its next
    /// checkout: a single frame at the entry function, empty operand
    /// stack, no live iterators or pending unwind, and its own module
    /// cache (module top-level side effects run again per checkout).
    fn reset_for_reuse(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.frames.push(Frame::new(self.main.clone(), Rc::from([]), 0));
        self.iterators.clear();
        self.modules = ModuleCache::new();
        self.pending_rethrow = None;
    }

    /// Runs until the frame stack empties, returning the last value left
    /// on the stack (the implicit result of the top-level script), or the
    /// uncaught error if one escaped every handler.
    pub fn run(&mut self) -> Result<Value, VmError> {
        self.run_to_depth(0)
    }

    /// Calls a first-class value from host (non-bytecode) code, e.g. a
    /// builtin invoking a script callback. Pushes a frame/executes a
    /// native function synchronously and runs until control returns to
    /// the caller's depth.
    pub fn invoke(&mut self, callee: &Value, args: CallArgs) -> Result<Value, VmError> {
        let depth = self.frames.len();
        self.dispatch_call(callee.clone(), args, false)?;
        if self.frames.len() <= depth {
            // a native function handled the call inline and already
            // pushed its result; nothing more to run.
            return Ok(self.stack.pop().unwrap_or(Value::Nil));
        }
        self.run_to_depth(depth)
    }

    fn run_to_depth(&mut self, target_depth: usize) -> Result<Value, VmError> {
        loop {
            if self.frames.len() <= target_depth {
                return Ok(self.stack.pop().unwrap_or(Value::Nil));
            }
            match self.step() {
                Ok(true) => continue,
                Ok(false) => {
                    if self.frames.len() <= target_depth {
                        return Ok(self.stack.pop().unwrap_or(Value::Nil));
                    }
                }
                Err(err) => {
                    if let Some(result) = self.propagate(err, target_depth)? {
                        return Ok(result);
                    }
                }
            }
        }
    }

    fn frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack underflow")
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("operand stack underflow")
    }

    fn read_u8(&mut self) -> u8 {
        let frame = self.frame();
        let b = frame.instructions()[frame.ip];
        frame.ip += 1;
        b
    }

    fn read_u16(&mut self) -> u16 {
        let frame = self.frame();
        let bytes = [frame.instructions()[frame.ip], frame.instructions()[frame.ip + 1]];
        frame.ip += 2;
        u16::from_be_bytes(bytes)
    }

    /// Executes one instruction. Returns `Ok(true)` to keep looping,
    /// `Ok(false)` when a `Return` just popped the last frame (caller
    /// re-checks the depth), or `Err` to start unwinding.
    fn step(&mut self) -> Result<bool, VmError> {
        let opcode = self.read_u8();
        match opcode {
            op::CONSTANT => {
                let idx = self.read_u16() as usize;
                self.push(self.constants[idx].clone());
            }
            op::NIL => self.push(Value::Nil),
            op::TRUE => self.push(Value::Bool(true)),
            op::FALSE => self.push(Value::Bool(false)),
            op::YES => self.push(Value::Flag(true)),
            op::NO => self.push(Value::Flag(false)),
            op::POP => {
                self.pop();
            }
            op::GET_LOCAL => {
                let idx = self.read_u8() as usize;
                let bp = self.frame().base_pointer;
                self.push(self.stack[bp + idx].deref_ptr());
            }
            op::SET_LOCAL | op::DEFINE_LOCAL => {
                let idx = self.read_u8() as usize;
                let value = self.pop();
                let bp = self.frame().base_pointer;
                self.write_local(bp + idx, value);
            }
            op::GET_LOCAL_PTR => {
                let idx = self.read_u8() as usize;
                let bp = self.frame().base_pointer;
                let cell = self.box_local(bp + idx);
                self.push(cell);
            }
            op::GET_FREE => {
                let idx = self.read_u8() as usize;
                let value = self.frame().free[idx].deref_ptr();
                self.push(value);
            }
            op::SET_FREE => {
                let idx = self.read_u8() as usize;
                let value = self.pop();
                match &self.frame().free[idx] {
                    Value::ObjectPtr(cell) => *cell.borrow_mut() = value,
                    _ => unreachable!("free variable not boxed"),
                }
            }
            op::GET_FREE_PTR => {
                let idx = self.read_u8() as usize;
                let value = self.frame().free[idx].clone();
                self.push(value);
            }
            op::GET_GLOBAL => {
                let idx = self.read_u16() as usize;
                let value = self.globals.borrow()[idx].deref_ptr();
                self.push(value);
            }
            op::SET_GLOBAL => {
                let idx = self.read_u16() as usize;
                let value = self.pop();
                let mut globals = self.globals.borrow_mut();
                if idx >= globals.len() {
                    globals.resize(idx + 1, Value::Nil);
                }
                globals[idx] = value;
            }
            op::GET_BUILTIN => {
                let idx = self.read_u16() as usize;
                self.push(Value::BuiltinFunction(self.builtins[idx].clone()));
            }
            op::ARRAY => {
                let n = self.read_u16() as usize;
                let items = self.pop_n(n);
                self.push(Value::array(items));
            }
            op::DICT => {
                let n = self.read_u16() as usize;
                let mut dict = OrderedDict::new();
                let entries = self.pop_n(n * 2);
                for pair in entries.chunks_exact(2) {
                    let key = match &pair[0] {
                        Value::String(s) | Value::RawString(s) => s.to_string(),
                        other => other.to_string(),
                    };
                    dict.insert(key, pair[1].clone());
                }
                self.push(Value::dict(dict));
            }
            op::KEY_VALUE_ARRAY => {
                let n = self.read_u16() as usize;
                let entries = self.pop_n(n * 2);
                let pairs = entries
                    .chunks_exact(2)
                    .map(|p| (p[0].clone(), p[1].clone()))
                    .collect();
                self.push(Value::KeyValueArray(Rc::new(RefCell::new(pairs))));
            }
            op::KEY_VALUE => {
                let value = self.pop();
                let key = self.pop();
                self.push(Value::KeyValue(Rc::new((key, value))));
            }
            op::GET_INDEX => {
                let n = self.read_u8() as usize;
                let indices = self.pop_n(n);
                let target = self.pop();
                self.push(index::get_index(target, &indices)?);
            }
            op::SET_INDEX => {
                let value = self.pop();
                let idx = self.pop();
                let target = self.pop();
                index::set_index(&target, &idx, value)?;
            }
            op::SLICE_INDEX => {
                let high = self.pop();
                let low = self.pop();
                let target = self.pop();
                self.push(index::slice_index(target, low, high)?);
            }
            op::BINARY_OP => {
                let code = self.read_u8();
                let right = self.pop();
                let left = self.pop();
                self.push(ops::binary_op(code, left, right)?);
            }
            op::UNARY => {
                let code = self.read_u8();
                let v = self.pop();
                self.push(ops::unary_op(code, v)?);
            }
            op::EQUAL => {
                let right = self.pop();
                let left = self.pop();
                self.push(Value::Bool(left.equal(&right)));
            }
            op::NOT_EQUAL => {
                let right = self.pop();
                let left = self.pop();
                self.push(Value::Bool(!left.equal(&right)));
            }
            op::JUMP => {
                let target = self.read_u16() as usize;
                self.frame().ip = target;
            }
            op::JUMP_FALSY => {
                let target = self.read_u16() as usize;
                let cond = self.pop();
                if cond.is_falsy() {
                    self.frame().ip = target;
                }
            }
            op::AND_JUMP => {
                let target = self.read_u16() as usize;
                let falsy = self.stack.last().expect("operand stack underflow").is_falsy();
                if falsy {
                    self.frame().ip = target;
                } else {
                    self.pop();
                }
            }
            op::OR_JUMP => {
                let target = self.read_u16() as usize;
                let truthy = !self.stack.last().expect("operand stack underflow").is_falsy();
                if truthy {
                    self.frame().ip = target;
                } else {
                    self.pop();
                }
            }
            op::JUMP_NIL => {
                let target = self.read_u16() as usize;
                let is_nil = matches!(self.stack.last(), Some(Value::Nil));
                if is_nil {
                    self.frame().ip = target;
                } else {
                    self.pop();
                }
            }
            op::JUMP_NOT_NIL => {
                let target = self.read_u16() as usize;
                let is_nil = matches!(self.stack.last(), Some(Value::Nil));
                if !is_nil {
                    self.frame().ip = target;
                } else {
                    self.pop();
                }
            }
            op::CLOSURE => {
                let const_idx = self.read_u16() as usize;
                let num_free = self.read_u8() as usize;
                let free = self.pop_n(num_free);
                let function = match &self.constants[const_idx] {
                    Value::CompiledFunction(f) => f.clone(),
                    _ => unreachable!("Closure constant is not a function"),
                };
                if free.is_empty() {
                    self.push(Value::CompiledFunction(function));
                } else {
                    self.push(Value::Closure(Rc::new(ClosureData::new(function, free))));
                }
            }
            op::CALL => {
                let num_args = self.read_u8() as usize;
                let flags = self.read_u8();
                let tail = flags & call_flag::TAIL != 0;
                self.exec_call(num_args, flags, tail)?;
            }
            op::RETURN => {
                let has_value = self.read_u8() != 0;
                let value = if has_value { self.pop() } else { Value::Nil };
                let frame = self.frames.pop().expect("frame stack underflow");
                self.stack.truncate(frame.base_pointer);
                self.push(value);
                return Ok(!self.frames.is_empty());
            }
            op::ITER_INIT => {
                let target = self.pop();
                self.iterators.push(IterState::from_value(&target)?);
            }
            op::ITER_NEXT => {
                let has_next = self.iterators.last().expect("no active iterator").has_next();
                self.push(Value::Bool(has_next));
            }
            op::ITER_KEY => {
                let key = self.iterators.last().expect("no active iterator").key();
                self.push(key);
            }
            op::ITER_VALUE => {
                let iter = self.iterators.last().expect("no active iterator");
                let value = iter.value();
                self.iterators.last_mut().unwrap().advance();
                self.push(value);
            }
            op::ITER_NEXT_ELSE => {
                let body_target = self.read_u16() as usize;
                let done_target = self.read_u16() as usize;
                let has_next = self.iterators.last().expect("no active iterator").has_next();
                if has_next {
                    self.frame().ip = body_target;
                } else {
                    self.iterators.pop();
                    self.frame().ip = done_target;
                }
            }
            op::LOAD_MODULE => {
                let name_idx = self.read_u16() as usize;
                let fn_idx = self.read_u16() as usize;
                let name = self.constants[name_idx].to_string();
                match self.modules.begin_load(&name)? {
                    modules::LoadAction::UseCached(v) => self.push(v),
                    modules::LoadAction::Proceed => {
                        let function = match &self.constants[fn_idx] {
                            Value::CompiledFunction(f) => f.clone(),
                            _ => unreachable!("LoadModule constant is not a function"),
                        };
                        self.push_call_frame(function, Rc::from([]), Vec::new(), false)?;
                    }
                }
            }
            op::STORE_MODULE => {
                let name_idx = self.read_u16() as usize;
                let name = self.constants[name_idx].to_string();
                let value = self.stack.last().expect("operand stack underflow").clone();
                self.modules.store(&name, value);
            }
            op::SETUP_TRY => {
                let catch_target = self.read_u16() as usize;
                let finally_target = self.read_u16() as usize;
                let stack_len = self.stack.len() - self.frame().base_pointer;
                let no_target = crate::instr::NO_TARGET as usize;
                let handler = Handler::new(
                    (catch_target != no_target).then_some(catch_target),
                    (finally_target != no_target).then_some(finally_target),
                    stack_len,
                );
                self.frame().handlers.push(handler);
            }
            op::SETUP_CATCH | op::SETUP_FINALLY => {
                // Entry markers only; the handler bookkeeping already
                // happened in `SetupTry`/`propagate`.
            }
            op::THROW => {
                let mode = self.read_u8();
                let value = if mode == throw_mode::VALUE {
                    self.pop()
                } else {
                    Value::Nil
                };
                return Err(VmError::User(value));
            }
            op::FINALIZER => {
                let mode = self.read_u8();
                self.frame().handlers.pop();
                if mode == finalizer_mode::RERAISE {
                    if let Some(err) = self.pending_rethrow.take() {
                        return Err(VmError::User(Value::RuntimeError(Rc::new(err))));
                    }
                }
            }
            op::NO_OP => {}
            other => {
                return Err(VmError::NotImplemented {
                    what: format!("opcode {other}"),
                })
            }
        }
        Ok(true)
    }

    fn pop_n(&mut self, n: usize) -> Vec<Value> {
        let at = self.stack.len() - n;
        self.stack.split_off(at)
    }

    fn write_local(&mut self, slot: usize, value: Value) {
        match &self.stack[slot] {
            Value::ObjectPtr(cell) => *cell.borrow_mut() = value,
            _ => self.stack[slot] = value,
        }
    }

    fn box_local(&mut self, slot: usize) -> Value {
        if let Value::ObjectPtr(cell) = &self.stack[slot] {
            return Value::ObjectPtr(cell.clone());
        }
        let current = self.stack[slot].clone();
        let cell = Rc::new(RefCell::new(current));
        self.stack[slot] = Value::ObjectPtr(cell.clone());
        Value::ObjectPtr(cell)
    }

    /// Assembles arguments per the `Call` flag byte and dispatches to
    /// whichever kind of callable sits below them on the stack.
    fn exec_call(&mut self, num_args: usize, flags: u8, tail: bool) -> Result<(), VmError> {
        let named = if flags & call_flag::NAMED_ARGS != 0 {
            match self.pop() {
                Value::Dict(d) => d.borrow().clone(),
                _ => OrderedDict::new(),
            }
        } else {
            OrderedDict::new()
        };
        let positional = if flags & call_flag::VAR_ARGS != 0 {
            let spread = self.pop();
            let mut fixed = self.pop_n(num_args);
            match spread.deref_ptr() {
                Value::Array(items) => fixed.extend(items.borrow().iter().cloned()),
                other => fixed.push(other),
            }
            fixed
        } else {
            self.pop_n(num_args)
        };
        let callee = self.pop();
        self.dispatch_call(callee, CallArgs { positional, named }, tail)
    }

    fn dispatch_call(&mut self, callee: Value, args: CallArgs, tail: bool) -> Result<(), VmError> {
        match callee {
            Value::CompiledFunction(f) => {
                self.push_call_frame(f, Rc::from([]), args.positional, tail)?;
                self.bind_named(args.named)
            }
            Value::Closure(c) => {
                let ClosureData { function, free } = (*c).clone();
                self.push_call_frame(function, Rc::from(free), args.positional, tail)?;
                self.bind_named(args.named)
            }
            Value::BuiltinFunction(f) | Value::Function(f) => {
                let result = f.call(self, &args)?;
                self.push(result);
                Ok(())
            }
            Value::CallWrapper(w) => {
                let CallWrapperData { callee, bound } = (*w).clone();
                let mut positional = bound;
                positional.extend(args.positional);
                self.dispatch_call(callee, CallArgs { positional, named: args.named }, tail)
            }
            Value::ObjectType(t) => match &t.constructor {
                Some(ctor) => {
                    let result = ctor(self, &args)?;
                    self.push(result);
                    Ok(())
                }
                None => Err(VmError::NotCallable { kind: crate::value::ValueKind::ObjectType }),
            },
            other => Err(VmError::NotCallable { kind: other.kind() }),
        }
    }

    /// Binds named arguments into their declared local slots after a
    /// bytecode-function frame has just been pushed with positional
    /// arguments already bound by `push_call_frame`.
    fn bind_named(&mut self, named: OrderedDict) -> Result<(), VmError> {
        if named.is_empty() {
            return Ok(());
        }
        let frame = self.frames.last().expect("frame stack underflow");
        let base = frame.base_pointer;
        let num_positional_slots = frame.function.num_parameters + frame.function.variadic as usize;
        let named_names = frame.function.named_param_names.clone();
        let variadic_named = frame.function.variadic_named;
        let mut extra = OrderedDict::new();
        for (key, value) in named.iter() {
            if let Some(slot) = named_names.iter().position(|n| n == key) {
                self.write_local(base + num_positional_slots + slot, value.clone());
            } else if variadic_named {
                extra.insert(key.clone(), value.clone());
            } else {
                return Err(VmError::UnexpectedNamedArgument { name: key.clone() });
            }
        }
        if variadic_named {
            let slot = base + num_positional_slots + named_names.len();
            self.write_local(slot, Value::dict(extra));
        }
        Ok(())
    }

    /// Binds positional arguments to parameter slots (padding missing
    /// ones with `Nil` for the compiler's default-value prologue to
    /// overwrite, collecting overflow into the variadic slot when
    /// declared) and pushes the new frame.
    fn push_call_frame(
        &mut self,
        function: Rc<CompiledFunction>,
        free: Rc<[Value]>,
        mut positional: Vec<Value>,
        tail: bool,
    ) -> Result<(), VmError> {
        if self.frames.len() >= MAX_FRAMES {
            return Err(VmError::StackOverflow);
        }
        let required = function.num_parameters;
        if !function.variadic {
            if positional.len() > required {
                return Err(VmError::WrongNumberOfArguments {
                    want: required.to_string(),
                    got: positional.len(),
                });
            }
            if positional.len() < function.num_required_parameters {
                return Err(VmError::WrongNumberOfArguments {
                    want: function.num_required_parameters.to_string(),
                    got: positional.len(),
                });
            }
        }
        let variadic_rest = if function.variadic && positional.len() > required {
            positional.split_off(required)
        } else {
            Vec::new()
        };
        positional.resize(required, Value::Nil);
        if function.variadic {
            positional.push(Value::array(variadic_rest));
        }
        positional.resize(function.num_locals, Value::Nil);

        let base_pointer = if tail {
            let old = self.frames.pop().expect("frame stack underflow");
            self.stack.truncate(old.base_pointer);
            old.base_pointer
        } else {
            self.stack.len()
        };
        self.stack.extend(positional);
        let mut frame = Frame::new(function, free, base_pointer);
        frame.is_tail_call = tail;
        self.frames.push(frame);
        Ok(())
    }

    /// Unwinds from a faulting opcode, consulting handler records of each
    /// frame from innermost outward. Returns `Ok(Some(value))` only when
    /// the error escaped every frame up to `target_depth` (the host sees
    /// it as the call's result being a `RuntimeError`... actually this
    /// always returns `Err` to the ultimate caller in that case; `Ok(None)`
    /// means the error was caught and execution should keep looping).
    fn propagate(&mut self, vm_error: VmError, target_depth: usize) -> Result<Option<Value>, VmError> {
        if !vm_error.is_catchable() {
            return Err(vm_error);
        }
        let mut runtime_err = match vm_error {
            VmError::User(Value::RuntimeError(e)) => (*e).clone(),
            other => RuntimeErrorData::new(other.into_error_data()),
        };
        loop {
            if self.frames.len() <= target_depth {
                return Err(VmError::User(Value::RuntimeError(Rc::new(runtime_err))));
            }
            let frame_ip = self.frame().ip;
            if let Some(pos) = self.frame().function.pos_at(frame_ip) {
                runtime_err.push_trace(pos);
            }
            let base_pointer = self.frame().base_pointer;
            let handler = self.frame().handlers.pop();
            match handler {
                Some(h) => {
                    self.stack.truncate(base_pointer + h.stack_len);
                    if let Some(catch_ip) = h.catch_ip {
                        self.push(Value::RuntimeError(Rc::new(runtime_err)));
                        if let Some(finally_ip) = h.finally_ip {
                            self.frame().handlers.push(Handler::new(None, Some(finally_ip), h.stack_len));
                        }
                        self.frame().ip = catch_ip;
                        return Ok(None);
                    } else if let Some(finally_ip) = h.finally_ip {
                        self.pending_rethrow = Some(runtime_err);
                        self.frame().ip = finally_ip;
                        return Ok(None);
                    }
                }
                None => {
                    self.frames.pop();
                    self.stack.truncate(base_pointer);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Bytecode;
    use crate::instr::{bin_op, make_instruction, op};

    fn run_program(instructions: Vec<u8>, constants: Vec<Value>) -> Result<Value, VmError> {
        let main = CompiledFunction::new(instructions, 0, 0);
        let bytecode = Bytecode::new(main, constants, 0);
        let mut vm = Vm::new(&bytecode, Vec::new());
        vm.run()
    }

    #[test]
    fn constant_and_pop_leaves_nothing() {
        let mut code = make_instruction(op::CONSTANT, &[0]);
        code.extend(make_instruction(op::RETURN, &[0]));
        let result = run_program(code, vec![Value::Int(42)]).unwrap();
        assert_eq!(result, Value::Nil);
    }

    #[test]
    fn binary_add_and_return() {
        let mut code = make_instruction(op::CONSTANT, &[0]);
        code.extend(make_instruction(op::CONSTANT, &[1]));
        code.extend(make_instruction(op::BINARY_OP, &[bin_op::ADD as usize]));
        code.extend(make_instruction(op::RETURN, &[1]));
        let result = run_program(code, vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[test]
    fn division_by_zero_becomes_runtime_error() {
        let mut code = make_instruction(op::CONSTANT, &[0]);
        code.extend(make_instruction(op::CONSTANT, &[1]));
        code.extend(make_instruction(op::BINARY_OP, &[bin_op::DIV as usize]));
        code.extend(make_instruction(op::RETURN, &[1]));
        let err = run_program(code, vec![Value::Int(1), Value::Int(0)]).unwrap_err();
        match err {
            VmError::User(Value::RuntimeError(e)) => assert_eq!(e.error.name, "ZeroDivisionError"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn jump_falsy_skips_block() {
        let mut code = make_instruction(op::FALSE, &[]);
        let jump_patch_at = code.len() + 1;
        code.extend(make_instruction(op::JUMP_FALSY, &[0]));
        code.extend(make_instruction(op::CONSTANT, &[0]));
        let target = code.len();
        code.extend(make_instruction(op::CONSTANT, &[1]));
        code.extend(make_instruction(op::RETURN, &[1]));
        crate::instr::patch_operand(&mut code, jump_patch_at - 1, 0, target);
        let result = run_program(code, vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(result, Value::Int(2));
    }

    #[test]
    fn a_successful_run_leaves_nothing_on_the_operand_stack() {
        use crate::compiler::{Compiler, NullResolver};
        use crate::fileset::FileSet;

        let source = r#"
            var add = func(a, b) {
                var sum = a + b
                return sum
            }
            var total = 0
            for i = 0; i < 4; i += 1 {
                total = add(total, i)
            }
            return total
        "#;
        let mut file_set = FileSet::new();
        let handle = file_set.add_file("test.ql", source);
        let file = quill_syntax::parse(source).unwrap();
        let resolver = NullResolver;
        let compiler = Compiler::new(&file_set, handle, "test.ql", &[], &resolver);
        let bytecode = compiler.compile_script(&file).unwrap();
        let mut vm = Vm::new(&bytecode, Vec::new());
        let result = vm.run().unwrap();
        assert_eq!(result, Value::Int(6));
        assert!(
            vm.stack.is_empty(),
            "every pushed temporary and call frame must be unwound by the time the script returns, left {:?}",
            vm.stack
        );
    }
}
