//! The stack-based virtual machine.
//!
//! The run loop caches the active frame's instruction pointer, stack base,
//! and closure id in local variables instead of indexing through
//! `self.frames` on every instruction, syncing back to the frame vector only
//! at call/return boundaries. This sidesteps the aliasing the borrow checker
//! would otherwise force (one long-lived `&mut CallFrame` fighting the rest
//! of `&mut self`).

pub mod native;

use crate::chunk::OpCode;
use crate::compiler;
use crate::error::InterpretResult;
use crate::gc::Gc;
use crate::table::Table;
use crate::value::{ClosureId, GcRef, UpvalueId, Value};
use std::io::Write;

const FRAMES_MAX: usize = 256;
/// Default operand-stack capacity: `FRAMES_MAX * 256` slots.
const STACK_MAX: usize = FRAMES_MAX * 256;

struct CallFrame {
    closure: ClosureId,
    ip: usize,
    slots_base: usize,
}

/// Compile-time-tunable knobs, surfaced as an explicit constructor option
/// rather than environment variables or a config file: an embedder gets a
/// typed options struct, not ambient process state.
#[derive(Debug, Clone, Copy)]
pub struct VmConfig {
    /// Call-frame stack depth cap.
    pub frames_max: usize,
    /// Force a GC cycle at every allocation growth point instead of only
    /// once the heap crosses its threshold.
    pub stress_gc: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            frames_max: FRAMES_MAX,
            stress_gc: false,
        }
    }
}

pub struct Vm<'out> {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    frames_max: usize,
    globals: Table,
    gc: Gc,
    open_upvalues: Vec<UpvalueId>,
    out: &'out mut dyn Write,
    err: &'out mut dyn Write,
}

/// Compile and run `source`, writing every `print` to `out` and every
/// diagnostic to `err`. This is the crate's main entry point: the CLI host
/// and integration tests both go through this function, differing only in
/// what `out`/`err` are.
pub fn interpret(source: &str, out: &mut dyn Write, err: &mut dyn Write) -> InterpretResult {
    interpret_with_config(source, out, err, VmConfig::default())
}

/// Like [`interpret`], but with an explicit [`VmConfig`] — the entry point
/// GC-soundness tests use to run under deterministic `stress_gc`.
pub fn interpret_with_config(
    source: &str,
    out: &mut dyn Write,
    err: &mut dyn Write,
    config: VmConfig,
) -> InterpretResult {
    let mut vm = Vm::with_config(out, err, config);
    vm.install_natives();

    let function_id = match compiler::compile(source, &mut vm.gc, &mut *vm.err) {
        Ok(id) => id,
        Err(()) => return InterpretResult::CompileError,
    };

    let closure_id = vm.gc.alloc_closure(function_id, Vec::new());
    vm.push(Value::closure(closure_id));
    vm.call(closure_id, 0).expect("calling the top-level script can't fail arity checks");

    vm.run()
}

impl<'out> Vm<'out> {
    fn with_config(out: &'out mut dyn Write, err: &'out mut dyn Write, config: VmConfig) -> Self {
        let mut gc = Gc::new();
        gc.set_stress_gc(config.stress_gc);
        let stack_capacity = config.frames_max.saturating_mul(256);
        Vm {
            stack: Vec::with_capacity(stack_capacity),
            frames: Vec::with_capacity(config.frames_max),
            frames_max: config.frames_max,
            globals: Table::new(),
            gc,
            open_upvalues: Vec::new(),
            out,
            err,
        }
    }

    fn install_natives(&mut self) {
        self.define_native("clock", Some(0), native::clock);
    }

    fn define_native(
        &mut self,
        name: &'static str,
        arity: Option<u8>,
        function: crate::gc::object::NativeFn,
    ) {
        let native_id = self.gc.alloc_native(name, arity, function);
        let name_id = self.gc.intern(name);
        self.globals.set(name_id, Value::native(native_id));
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow: compiler-emitted bytecode is stack-balanced")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    // ----- bytecode access ----------------------------------------------
    //
    // Each of these takes only what it needs and returns an owned `Copy`
    // value, so no borrow of `self.gc` is ever held across a call that
    // might need `&mut self.gc` (string interning, allocation).

    fn byte_at(&self, closure: ClosureId, ip: usize) -> u8 {
        let function = self.gc.closure(closure).function;
        self.gc.function(function).chunk.code[ip]
    }

    fn line_at(&self, closure: ClosureId, ip: usize) -> u32 {
        let function = self.gc.closure(closure).function;
        self.gc.function(function).chunk.lines[ip]
    }

    fn constant_at(&self, closure: ClosureId, index: u8) -> Value {
        let function = self.gc.closure(closure).function;
        self.gc.function(function).chunk.constants[index as usize]
    }

    // ----- calls -----------------------------------------------------------

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), String> {
        if let Some(id) = callee.as_closure() {
            return self.call(id, arg_count);
        }
        if let Some(id) = callee.as_native() {
            let native = self.gc.native(id);
            let expected_arity = native.arity;
            let function = native.function;
            if let Some(arity) = expected_arity {
                if arity != arg_count {
                    return Err(format!("Expected {arity} arguments but got {arg_count}."));
                }
            }
            let start = self.stack.len() - arg_count as usize;
            let result = function(&self.stack[start..])?;
            self.stack.truncate(start - 1);
            self.push(result);
            return Ok(());
        }
        Err("Can only call functions and classes.".to_string())
    }

    fn call(&mut self, closure_id: ClosureId, arg_count: u8) -> Result<(), String> {
        let function_id = self.gc.closure(closure_id).function;
        let arity = self.gc.function(function_id).arity;
        if arg_count != arity {
            return Err(format!(
                "Expected {arity} arguments but got {arg_count}."
            ));
        }
        if self.frames.len() >= self.frames_max {
            return Err("Stack overflow.".to_string());
        }
        let slots_base = self.stack.len() - arg_count as usize - 1;
        self.frames.push(CallFrame {
            closure: closure_id,
            ip: 0,
            slots_base,
        });
        Ok(())
    }

    // ----- upvalues -----------------------------------------------------

    fn capture_upvalue(&mut self, stack_index: usize) -> UpvalueId {
        for &id in &self.open_upvalues {
            if let crate::gc::object::Upvalue::Open(i) = self.gc.upvalue(id) {
                if *i == stack_index {
                    return id;
                }
            }
        }
        let id = self.gc.alloc_upvalue(stack_index);
        self.open_upvalues.push(id);
        id
    }

    fn close_upvalues(&mut self, from: usize) {
        let mut remaining = Vec::with_capacity(self.open_upvalues.len());
        for id in self.open_upvalues.drain(..) {
            let index = match self.gc.upvalue(id) {
                crate::gc::object::Upvalue::Open(i) => *i,
                crate::gc::object::Upvalue::Closed(_) => {
                    remaining.push(id);
                    continue;
                }
            };
            if index >= from {
                let value = self.stack[index];
                self.gc.close_upvalue(id, value);
            } else {
                remaining.push(id);
            }
        }
        self.open_upvalues = remaining;
    }

    // ----- garbage collection -----------------------------------------

    fn collect_garbage_if_needed(&mut self) {
        if !self.gc.should_collect() {
            return;
        }
        let mut roots: Vec<Value> = self.stack.clone();
        for frame in &self.frames {
            roots.push(Value::closure(frame.closure));
        }
        for (key, value) in self.globals.iter() {
            // Global keys are interned strings too: without rooting them
            // here, a key with no other live reference would be swept out
            // from under the table on the next sweep.
            roots.push(Value::string(key));
            roots.push(value);
        }
        let open = self.open_upvalues.clone();
        self.gc.collect(roots, open);
    }

    // ----- error reporting -----------------------------------------------

    fn runtime_error(&mut self, message: &str) -> InterpretResult {
        let _ = writeln!(self.err, "{message}");
        for frame in self.frames.iter().rev() {
            let function = self.gc.closure(frame.closure).function;
            let line = self.gc.function(function).chunk.lines[frame.ip.saturating_sub(1)];
            let name = match self.gc.function(function).name {
                Some(id) => self.gc.string(id).to_string(),
                None => "script".to_string(),
            };
            let _ = writeln!(self.err, "[line {line}] in {name}");
        }
        self.stack.clear();
        self.frames.clear();
        InterpretResult::RuntimeError
    }

    // ----- the run loop --------------------------------------------------

    fn run(&mut self) -> InterpretResult {
        let mut closure = self.frames.last().expect("run() called with no active frame").closure;
        let mut ip = 0usize;
        let mut slots_base = self.frames.last().unwrap().slots_base;

        macro_rules! read_byte {
            () => {{
                let b = self.byte_at(closure, ip);
                ip += 1;
                b
            }};
        }
        macro_rules! read_u16 {
            () => {{
                let hi = read_byte!() as u16;
                let lo = read_byte!() as u16;
                (hi << 8) | lo
            }};
        }
        macro_rules! read_constant {
            () => {{
                let index = read_byte!();
                self.constant_at(closure, index)
            }};
        }
        macro_rules! sync_frame {
            () => {{
                let frame = self.frames.last_mut().unwrap();
                frame.ip = ip;
            }};
        }
        macro_rules! runtime_err {
            ($msg:expr) => {{
                sync_frame!();
                return self.runtime_error(&$msg);
            }};
        }

        loop {
            #[cfg(feature = "trace_execution")]
            {
                crate::debug::trace_stack(&self.stack);
                crate::debug::disassemble_instruction(
                    &self.gc.function(self.gc.closure(closure).function).chunk,
                    ip,
                    &self.gc,
                );
            }

            let op = OpCode::from_u8(read_byte!());

            match op {
                OpCode::Constant => {
                    let value = read_constant!();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = read_byte!() as usize;
                    self.push(self.stack[slots_base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = read_byte!() as usize;
                    self.stack[slots_base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = read_constant!().as_string().expect("compiler only emits string constants for global names");
                    match self.globals.get(name) {
                        Some(value) => self.push(value),
                        None => runtime_err!(format!("Undefined variable '{}'.", self.gc.string(name))),
                    }
                }
                OpCode::DefineGlobal => {
                    let name = read_constant!().as_string().expect("compiler only emits string constants for global names");
                    let value = self.pop();
                    self.globals.set(name, value);
                }
                OpCode::SetGlobal => {
                    let name = read_constant!().as_string().expect("compiler only emits string constants for global names");
                    if self.globals.set(name, self.peek(0)) {
                        self.globals.delete(name);
                        runtime_err!(format!("Undefined variable '{}'.", self.gc.string(name)));
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = read_byte!() as usize;
                    let upvalue_id = self.gc.closure(closure).upvalues[slot];
                    let value = match self.gc.upvalue(upvalue_id) {
                        crate::gc::object::Upvalue::Open(i) => self.stack[*i],
                        crate::gc::object::Upvalue::Closed(v) => *v,
                    };
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let slot = read_byte!() as usize;
                    let upvalue_id = self.gc.closure(closure).upvalues[slot];
                    let value = self.peek(0);
                    let target_index = match self.gc.upvalue(upvalue_id) {
                        crate::gc::object::Upvalue::Open(i) => Some(*i),
                        crate::gc::object::Upvalue::Closed(_) => None,
                    };
                    match target_index {
                        Some(i) => self.stack[i] = value,
                        None => *self.gc.upvalue_mut(upvalue_id) = crate::gc::object::Upvalue::Closed(value),
                    }
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => {
                    let b = self.pop();
                    let a = self.pop();
                    match (a.as_number(), b.as_number()) {
                        (Some(a), Some(b)) => self.push(Value::Bool(a > b)),
                        _ => runtime_err!("Operands must be numbers.".to_string()),
                    }
                }
                OpCode::Less => {
                    let b = self.pop();
                    let a = self.pop();
                    match (a.as_number(), b.as_number()) {
                        (Some(a), Some(b)) => self.push(Value::Bool(a < b)),
                        _ => runtime_err!("Operands must be numbers.".to_string()),
                    }
                }
                OpCode::Add => {
                    let b = self.peek(0);
                    let a = self.peek(1);
                    match (a.as_string(), b.as_string()) {
                        (Some(a_id), Some(b_id)) => {
                            let mut concatenated = String::with_capacity(
                                self.gc.string(a_id).len() + self.gc.string(b_id).len(),
                            );
                            concatenated.push_str(self.gc.string(a_id));
                            concatenated.push_str(self.gc.string(b_id));
                            self.pop();
                            self.pop();
                            let id = self.gc.intern(&concatenated);
                            self.push(Value::string(id));
                            self.collect_garbage_if_needed();
                        }
                        _ => match (a.as_number(), b.as_number()) {
                            (Some(a), Some(b)) => {
                                self.pop();
                                self.pop();
                                self.push(Value::Number(a + b));
                            }
                            _ => runtime_err!(
                                "Operands must be two numbers or two strings.".to_string()
                            ),
                        },
                    }
                }
                OpCode::Subtract => {
                    let b = self.pop();
                    let a = self.pop();
                    match (a.as_number(), b.as_number()) {
                        (Some(a), Some(b)) => self.push(Value::Number(a - b)),
                        _ => runtime_err!("Operands must be numbers.".to_string()),
                    }
                }
                OpCode::Multiply => {
                    let b = self.pop();
                    let a = self.pop();
                    match (a.as_number(), b.as_number()) {
                        (Some(a), Some(b)) => self.push(Value::Number(a * b)),
                        _ => runtime_err!("Operands must be numbers.".to_string()),
                    }
                }
                OpCode::Divide => {
                    let b = self.pop();
                    let a = self.pop();
                    match (a.as_number(), b.as_number()) {
                        (Some(a), Some(b)) => self.push(Value::Number(a / b)),
                        _ => runtime_err!("Operands must be numbers.".to_string()),
                    }
                }
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => {
                    let value = self.pop();
                    match value.as_number() {
                        Some(n) => self.push(Value::Number(-n)),
                        None => runtime_err!("Operand must be a number.".to_string()),
                    }
                }
                OpCode::Print => {
                    let value = self.pop();
                    let rendered = self.gc.display_value(&value);
                    let _ = writeln!(self.out, "{rendered}");
                }
                OpCode::Jump => {
                    let offset = read_u16!();
                    ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = read_u16!();
                    if self.peek(0).is_falsey() {
                        ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = read_u16!();
                    ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = read_byte!();
                    let callee = self.peek(arg_count as usize);
                    sync_frame!();
                    if let Err(message) = self.call_value(callee, arg_count) {
                        return self.runtime_error(&message);
                    }
                    let frame = self.frames.last().unwrap();
                    closure = frame.closure;
                    ip = frame.ip;
                    slots_base = frame.slots_base;
                }
                OpCode::Closure => {
                    let function_value = read_constant!();
                    let function_id = match function_value {
                        Value::Object(GcRef::Function(id)) => id,
                        _ => unreachable!("compiler only emits OP_CLOSURE with a function constant"),
                    };
                    let upvalue_count = self.gc.function(function_id).upvalue_count;
                    let mut upvalues = Vec::with_capacity(upvalue_count as usize);
                    for _ in 0..upvalue_count {
                        let is_local = read_byte!() != 0;
                        let index = read_byte!() as usize;
                        if is_local {
                            upvalues.push(self.capture_upvalue(slots_base + index));
                            // capture_upvalue may have just allocated; check
                            // here too, not only after the closure itself,
                            // since stress_gc wants a collection at every
                            // growth point.
                            self.collect_garbage_if_needed();
                        } else {
                            upvalues.push(self.gc.closure(closure).upvalues[index]);
                        }
                    }
                    let closure_id = self.gc.alloc_closure(function_id, upvalues);
                    self.push(Value::closure(closure_id));
                    self.collect_garbage_if_needed();
                }
                OpCode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    self.close_upvalues(slots_base);
                    self.frames.pop();
                    if self.frames.is_empty() {
                        self.pop();
                        return InterpretResult::Ok;
                    }
                    self.stack.truncate(slots_base);
                    self.push(result);
                    let frame = self.frames.last().unwrap();
                    closure = frame.closure;
                    ip = frame.ip;
                    slots_base = frame.slots_base;
                }
            }
        }
    }
}
