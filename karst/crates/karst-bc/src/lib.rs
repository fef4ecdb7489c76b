//! karst-bc - Bytecode Data Model
//!
//! The shared vocabulary of the Karst compiler and virtual machine:
//!
//! - [`Value`]: the tagged runtime value (nil, booleans, numbers, object
//!   references)
//! - [`ObjRef`]: a handle into the managed heap's slot arena
//! - [`OpCode`]: the instruction set
//! - [`Chunk`]: an append-only block of compiled code with its constant
//!   pool and per-byte source lines
//!
//! This crate defines data only. The compiler (`karst-par`) fills chunks in,
//! the VM (`karst-vm`) executes them, and the heap (`kgc`) owns the objects
//! that `ObjRef` handles point at.

pub mod chunk;
pub mod opcode;
pub mod value;

pub use chunk::Chunk;
pub use opcode::OpCode;
pub use value::{ObjRef, Value};
