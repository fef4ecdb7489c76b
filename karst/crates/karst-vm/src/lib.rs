//! karst-vm - The Karst Virtual Machine
//!
//! A stack machine executing `karst-bc` bytecode: a value stack of
//! 64 x 256 slots, a frame stack of 64 calls, closures with shared
//! upvalues, interned strings, a globals table, and collection driving
//! for the `kgc` heap.
//!
//! ## Embedding
//!
//! ```no_run
//! use karst_vm::{Vm, VmConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut vm = Vm::new(VmConfig::default())?;
//!     vm.interpret("print 1 + 2;")?;
//!     Ok(())
//! }
//! ```
//!
//! `interpret` compiles the source, wraps the resulting function in a
//! closure, and runs it with zero arguments. A compile failure returns
//! [`InterpretError::Compile`]; a runtime failure returns
//! [`InterpretError::Runtime`] with a stack trace, after which the VM has
//! reset its stacks and remains usable.
//!
//! Native functions register through [`Vm::define_native`]; `clock` is
//! installed by default.

pub mod error;
pub mod natives;
pub mod vm;

pub use error::{InterpretError, RuntimeError};
pub use vm::{Vm, VmConfig, FRAMES_MAX, STACK_MAX};

// Re-exported for embedders registering natives or pushing values.
pub use karst_bc::{ObjRef, Value};
pub use kgc::{GcConfig, NativeFn};
