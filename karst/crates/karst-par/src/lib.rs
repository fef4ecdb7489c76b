//! karst-par - One-Pass Compiler
//!
//! Lowers Karst source text straight to bytecode, no AST in between. The
//! parser pulls tokens from `karst-lex` and emits into `karst-bc` chunks
//! as it goes; when it finishes, the whole program is one `ObjFunction`
//! on the managed heap, ready for the VM to wrap in a closure and call.
//!
//! Expressions use Pratt precedence climbing ([`expr`]); declarations,
//! statements, and control flow live in [`stmt`]; the shared machinery
//! (function compilation states, scopes, locals, upvalue resolution, and
//! the emit helpers) is in [`compiler`].
//!
//! Errors are collected, not thrown: the parser enters panic mode at the
//! first error in a statement, synchronizes at the next statement
//! boundary, and keeps going so one compile reports everything it can.
//!
//! The compiler allocates (interned strings, finished functions) but never
//! triggers a collection; the VM only collects at its own dispatch points,
//! after the compiled function is rooted on its stack.

pub mod compiler;
pub mod expr;
pub mod stmt;

use std::fmt;

use karst_bc::ObjRef;
use karst_lex::TokenKind;
use kgc::{Heap, Table};
use thiserror::Error;

use compiler::Parser;

/// One compile-time error message with its source position.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub line: u32,
    /// `" at 'lexeme'"`, `" at end"`, or empty for lexical errors.
    pub location: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.line, self.location, self.message)
    }
}

/// Compilation failed; every collected diagnostic is included.
#[derive(Debug, Error)]
#[error("{}", render_diagnostics(.diagnostics))]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compiles `source` to a top-level function on `heap`.
///
/// String constants are canonicalized through `strings`, the caller's
/// intern pool, so every string the compiled code mentions shares
/// identity with runtime strings of the same content.
pub fn compile(
    source: &str,
    heap: &mut Heap,
    strings: &mut Table,
) -> Result<ObjRef, CompileError> {
    let mut parser = Parser::new(source, heap, strings);

    parser.advance();
    while !parser.match_token(TokenKind::Eof) {
        parser.declaration();
    }

    let (function, _) = parser.end_state();
    let diagnostics = parser.into_diagnostics();
    if diagnostics.is_empty() {
        Ok(function)
    } else {
        Err(CompileError { diagnostics })
    }
}
