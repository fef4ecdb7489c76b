//! Interpreter error types.
//!
//! The embedding surface distinguishes exactly two failure classes:
//! compile errors (from `karst-par`, with source positions) and runtime
//! errors (from the dispatch loop, with a stack trace). Out-of-memory is
//! fatal and has no error value.

use std::fmt;

use karst_par::CompileError;
use thiserror::Error;

/// A runtime failure: the message plus one trace line per active frame,
/// innermost first.
#[derive(Debug)]
pub struct RuntimeError {
    pub message: String,
    /// `[line N] in f()` / `[line N] in script` lines.
    pub trace: Vec<String>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for line in &self.trace {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// The result classes of `Vm::interpret`.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError {
            message: "Operands must be numbers.".to_string(),
            trace: vec![
                "[line 2] in inner()".to_string(),
                "[line 5] in script".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Operands must be numbers.\n[line 2] in inner()\n[line 5] in script"
        );
    }
}
