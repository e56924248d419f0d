//! Bytecode disassembler and execution tracer.
//!
//! Pure consumers of `Chunk`/`Value`: nothing here participates in garbage
//! collection or affects interpretation, they only print. Compiled in under
//! `debug_assertions` or the `trace_execution`/`print_code` features so a
//! release build never pays for the formatting.

use crate::chunk::{Chunk, OpCode};
use crate::gc::Gc;
use crate::value::{GcRef, Value};

pub fn disassemble_chunk(chunk: &Chunk, name: &str, gc: &Gc) {
    println!("== {name} ==");
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, offset, gc);
    }
}

/// Print one instruction at `offset` and return the offset of the next one.
/// `gc` is needed to render string/function constants by content rather than
/// arena index, and to know how many upvalue-descriptor bytes follow an
/// `OP_CLOSURE`.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, gc: &Gc) -> usize {
    print!("{offset:04} ");
    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        print!("   | ");
    } else {
        print!("{:4} ", chunk.lines[offset]);
    }

    let op = OpCode::from_u8(chunk.code[offset]);
    match op {
        OpCode::Constant => constant_instruction("OP_CONSTANT", chunk, offset, gc),
        OpCode::Nil => simple_instruction("OP_NIL", offset),
        OpCode::True => simple_instruction("OP_TRUE", offset),
        OpCode::False => simple_instruction("OP_FALSE", offset),
        OpCode::Pop => simple_instruction("OP_POP", offset),
        OpCode::GetLocal => byte_instruction("OP_GET_LOCAL", chunk, offset),
        OpCode::SetLocal => byte_instruction("OP_SET_LOCAL", chunk, offset),
        OpCode::GetGlobal => constant_instruction("OP_GET_GLOBAL", chunk, offset, gc),
        OpCode::DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", chunk, offset, gc),
        OpCode::SetGlobal => constant_instruction("OP_SET_GLOBAL", chunk, offset, gc),
        OpCode::GetUpvalue => byte_instruction("OP_GET_UPVALUE", chunk, offset),
        OpCode::SetUpvalue => byte_instruction("OP_SET_UPVALUE", chunk, offset),
        OpCode::Equal => simple_instruction("OP_EQUAL", offset),
        OpCode::Greater => simple_instruction("OP_GREATER", offset),
        OpCode::Less => simple_instruction("OP_LESS", offset),
        OpCode::Add => simple_instruction("OP_ADD", offset),
        OpCode::Subtract => simple_instruction("OP_SUBTRACT", offset),
        OpCode::Multiply => simple_instruction("OP_MULTIPLY", offset),
        OpCode::Divide => simple_instruction("OP_DIVIDE", offset),
        OpCode::Not => simple_instruction("OP_NOT", offset),
        OpCode::Negate => simple_instruction("OP_NEGATE", offset),
        OpCode::Print => simple_instruction("OP_PRINT", offset),
        OpCode::Jump => jump_instruction("OP_JUMP", 1, chunk, offset),
        OpCode::JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset),
        OpCode::Loop => jump_instruction("OP_LOOP", -1, chunk, offset),
        OpCode::Call => byte_instruction("OP_CALL", chunk, offset),
        OpCode::Closure => closure_instruction(chunk, offset, gc),
        OpCode::CloseUpvalue => simple_instruction("OP_CLOSE_UPVALUE", offset),
        OpCode::Return => simple_instruction("OP_RETURN", offset),
    }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
    println!("{name}");
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    println!("{name:-16} {slot:4}");
    offset + 2
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize) -> usize {
    let hi = chunk.code[offset + 1] as u16;
    let lo = chunk.code[offset + 2] as u16;
    let jump = (hi << 8) | lo;
    let target = offset as i64 + 3 + sign as i64 * jump as i64;
    println!("{name:-16} {offset:4} -> {target}");
    offset + 3
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize, gc: &Gc) -> usize {
    let index = chunk.code[offset + 1];
    let value = &chunk.constants[index as usize];
    println!("{name:-16} {index:4} '{}'", display_constant(value, gc));
    offset + 2
}

/// An `OP_CLOSURE` is followed by one `(is_local, index)` byte pair per
/// upvalue the closed-over function captures; that count lives on the
/// `LoxFunction` the constant refers to, not in the chunk itself, so
/// skipping the right number of trailing bytes requires `gc`.
fn closure_instruction(chunk: &Chunk, offset: usize, gc: &Gc) -> usize {
    let index = chunk.code[offset + 1];
    let value = chunk.constants[index as usize];
    println!("OP_CLOSURE        {index:4} '{}'", display_constant(&value, gc));
    let mut next = offset + 2;

    let upvalue_count = match value {
        Value::Object(GcRef::Function(id)) => gc.function(id).upvalue_count,
        _ => 0,
    };
    for _ in 0..upvalue_count {
        let is_local = chunk.code[next];
        let index = chunk.code[next + 1];
        let kind = if is_local != 0 { "local" } else { "upvalue" };
        println!("{next:04}      |                     {kind} {index}");
        next += 2;
    }
    next
}

/// Render a constant-pool value, resolving strings/functions to their
/// actual content/name via `gc` rather than just their arena index.
fn display_constant(value: &Value, gc: &Gc) -> String {
    gc.display_value(value)
}

pub fn trace_stack(stack: &[Value]) {
    print!("          ");
    for value in stack {
        print!("[ {value} ]");
    }
    println!();
}
