//! Bytecode disassembler.
//!
//! A read-only rendering of chunks, used by the VM's execution trace and
//! handy when debugging the compiler. Lives here rather than in
//! `karst-bc` because rendering constants (strings, function names)
//! requires the heap.

use std::fmt::Write;

use karst_bc::{Chunk, OpCode};

use crate::heap::Heap;

/// Renders a whole chunk, one instruction per line.
pub fn disassemble_chunk(heap: &Heap, chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", name);

    let mut offset = 0;
    while offset < chunk.code.len() {
        let (text, next) = disassemble_instruction(heap, chunk, offset);
        let _ = writeln!(out, "{}", text);
        offset = next;
    }
    out
}

/// Renders the instruction at `offset`; returns the text and the offset of
/// the following instruction.
pub fn disassemble_instruction(heap: &Heap, chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut text = format!("{:04} ", offset);
    if offset > 0 && chunk.line_of(offset) == chunk.line_of(offset - 1) {
        text.push_str("   | ");
    } else {
        let _ = write!(text, "{:4} ", chunk.line_of(offset));
    }

    let byte = chunk.code[offset];
    let op = match OpCode::try_from(byte) {
        Ok(op) => op,
        Err(_) => {
            let _ = write!(text, "unknown opcode {}", byte);
            return (text, offset + 1);
        }
    };

    match op {
        OpCode::Constant
        | OpCode::GetGlobal
        | OpCode::DefineGlobal
        | OpCode::SetGlobal => constant_instruction(heap, chunk, op, offset, text),
        OpCode::ConstantLong => constant_long_instruction(heap, chunk, offset, text),
        OpCode::GetLocal
        | OpCode::SetLocal
        | OpCode::GetUpvalue
        | OpCode::SetUpvalue
        | OpCode::Call => byte_instruction(chunk, op, offset, text),
        OpCode::Jump | OpCode::JumpIfFalse => jump_instruction(chunk, op, offset, 1, text),
        OpCode::Loop => jump_instruction(chunk, op, offset, -1, text),
        OpCode::Closure => closure_instruction(heap, chunk, offset, text),
        _ => {
            let _ = write!(text, "{:?}", op);
            (text, offset + 1)
        }
    }
}

fn constant_instruction(
    heap: &Heap,
    chunk: &Chunk,
    op: OpCode,
    offset: usize,
    mut text: String,
) -> (String, usize) {
    let index = chunk.code[offset + 1] as usize;
    let _ = write!(
        text,
        "{:<16?} {:4} '{}'",
        op,
        index,
        heap.display_value(chunk.constants[index])
    );
    (text, offset + 2)
}

fn constant_long_instruction(
    heap: &Heap,
    chunk: &Chunk,
    offset: usize,
    mut text: String,
) -> (String, usize) {
    let index = chunk.read_u24(offset + 1);
    let _ = write!(
        text,
        "{:<16?} {:4} '{}'",
        OpCode::ConstantLong,
        index,
        heap.display_value(chunk.constants[index])
    );
    (text, offset + 4)
}

fn byte_instruction(chunk: &Chunk, op: OpCode, offset: usize, mut text: String) -> (String, usize) {
    let operand = chunk.code[offset + 1];
    let _ = write!(text, "{:<16?} {:4}", op, operand);
    (text, offset + 2)
}

fn jump_instruction(
    chunk: &Chunk,
    op: OpCode,
    offset: usize,
    sign: i64,
    mut text: String,
) -> (String, usize) {
    let jump = i64::from(chunk.read_u16(offset + 1));
    let target = offset as i64 + 3 + sign * jump;
    let _ = write!(text, "{:<16?} {:4} -> {}", op, offset, target);
    (text, offset + 3)
}

fn closure_instruction(
    heap: &Heap,
    chunk: &Chunk,
    offset: usize,
    mut text: String,
) -> (String, usize) {
    let index = chunk.code[offset + 1] as usize;
    let function = chunk.constants[index];
    let _ = write!(
        text,
        "{:<16?} {:4} {}",
        OpCode::Closure,
        index,
        heap.display_value(function)
    );

    // Each captured upvalue follows as an (is_local, index) byte pair.
    let mut offset = offset + 2;
    if let Some(function) = function.as_obj() {
        for _ in 0..heap.function(function).upvalue_count {
            let is_local = chunk.code[offset] == 1;
            let slot = chunk.code[offset + 1];
            let _ = write!(
                text,
                "\n{:04}    |   {} {}",
                offset,
                if is_local { "local" } else { "upvalue" },
                slot
            );
            offset += 2;
        }
    }
    (text, offset)
}
