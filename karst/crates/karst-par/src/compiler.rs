//! Shared compiler machinery: parser state, function compilation states,
//! scopes and locals, upvalue resolution, and bytecode emission.
//!
//! Each function being compiled gets a `FunctionState`; nesting forms a
//! stack with the innermost function on top. Locals resolve to stack slot
//! offsets within their function's frame window; names that miss fall
//! through to upvalue resolution against enclosing states, and finally to
//! globals by name constant.

use karst_bc::{Chunk, ObjRef, OpCode, Value};
use karst_lex::{Lexer, Token, TokenKind};
use kgc::{Heap, Obj, ObjFunction, Table};
use rustc_hash::FxHashMap;

use crate::Diagnostic;

/// Slot operands are single bytes; slot 0 is reserved for the function
/// itself.
pub(crate) const MAX_LOCALS: usize = 256;

/// Upvalue operands are single bytes.
pub(crate) const MAX_UPVALUES: usize = 256;

/// One local variable in scope.
pub(crate) struct Local<'src> {
    pub name: &'src str,
    /// Scope depth, or -1 between declaration and initialization.
    pub depth: i32,
    /// Set when a nested function captures this local; its slot is then
    /// closed instead of popped when it leaves scope.
    pub is_captured: bool,
}

/// One captured variable, as encoded in the `Closure` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CompiledUpvalue {
    pub index: u8,
    /// True when `index` is a slot in the enclosing function, false when
    /// it is an upvalue of the enclosing function (transitive capture).
    pub is_local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Script,
    Function,
}

/// Compilation state for one function.
pub(crate) struct FunctionState<'src> {
    pub kind: FunctionKind,
    pub name: Option<ObjRef>,
    pub arity: u8,
    pub chunk: Chunk,
    pub locals: Vec<Local<'src>>,
    pub upvalues: Vec<CompiledUpvalue>,
    pub scope_depth: i32,
    /// Cache of interned name -> constant index, so repeated references
    /// to a global reuse one pool entry.
    pub name_constants: FxHashMap<ObjRef, u8>,
}

impl<'src> FunctionState<'src> {
    fn new(kind: FunctionKind, name: Option<ObjRef>) -> Self {
        FunctionState {
            kind,
            name,
            arity: 0,
            chunk: Chunk::new(),
            // Slot 0 holds the called closure for the frame's lifetime.
            locals: vec![Local {
                name: "",
                depth: 0,
                is_captured: false,
            }],
            upvalues: Vec::new(),
            scope_depth: 0,
            name_constants: FxHashMap::default(),
        }
    }
}

/// The one-pass parser/compiler.
pub struct Parser<'src, 'ctx> {
    lexer: Lexer<'src>,
    pub(crate) current: Token<'src>,
    pub(crate) previous: Token<'src>,

    pub(crate) heap: &'ctx mut Heap,
    pub(crate) strings: &'ctx mut Table,

    /// Function states, innermost last. Never empty while parsing.
    pub(crate) states: Vec<FunctionState<'src>>,

    diagnostics: Vec<Diagnostic>,
    panic_mode: bool,
}

impl<'src, 'ctx> Parser<'src, 'ctx> {
    pub fn new(source: &'src str, heap: &'ctx mut Heap, strings: &'ctx mut Table) -> Self {
        Parser {
            lexer: Lexer::new(source),
            current: Token::placeholder(),
            previous: Token::placeholder(),
            heap,
            strings,
            states: vec![FunctionState::new(FunctionKind::Script, None)],
            diagnostics: Vec::new(),
            panic_mode: false,
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    /// Pulls the next real token, reporting any error tokens in between.
    pub fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.lexer.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme.to_string();
            self.error_at_current(&message);
        }
    }

    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    // ------------------------------------------------------------------
    // Error reporting
    // ------------------------------------------------------------------

    pub(crate) fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    pub(crate) fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    /// Records a diagnostic unless already panicking; panic mode suppresses
    /// the error cascade until the next statement boundary.
    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => " at end".to_string(),
            // The lexeme of an error token is the message, not source text.
            TokenKind::Error => String::new(),
            _ => format!(" at '{}'", token.lexeme),
        };

        self.diagnostics.push(Diagnostic {
            line: token.line,
            location,
            message: message.to_string(),
        });
    }

    /// Leaves panic mode by skipping to the next statement boundary.
    pub(crate) fn synchronize(&mut self) {
        self.panic_mode = false;

        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }

    pub(crate) fn in_panic_mode(&self) -> bool {
        self.panic_mode
    }

    // ------------------------------------------------------------------
    // Function states
    // ------------------------------------------------------------------

    pub(crate) fn state(&self) -> &FunctionState<'src> {
        let last = self.states.len() - 1;
        &self.states[last]
    }

    pub(crate) fn state_mut(&mut self) -> &mut FunctionState<'src> {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    pub(crate) fn begin_state(&mut self, kind: FunctionKind, name: Option<ObjRef>) {
        self.states.push(FunctionState::new(kind, name));
    }

    /// Finishes the innermost function: emits the implicit return, builds
    /// the function object, and hands back the upvalue descriptors the
    /// enclosing `Closure` instruction must encode.
    pub fn end_state(&mut self) -> (ObjRef, Vec<CompiledUpvalue>) {
        self.emit_return();

        let state = self.states.pop().expect("function state underflow");
        let function = ObjFunction {
            arity: state.arity,
            upvalue_count: state.upvalues.len(),
            chunk: state.chunk,
            name: state.name,
        };
        (self.heap.alloc(Obj::Function(function)), state.upvalues)
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    fn chunk_mut(&mut self) -> &mut Chunk {
        &mut self.state_mut().chunk
    }

    pub(crate) fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk_mut().write(byte, line);
    }

    pub(crate) fn emit_op(&mut self, op: OpCode) {
        let line = self.previous.line;
        self.chunk_mut().write_op(op, line);
    }

    pub(crate) fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    pub(crate) fn emit_return(&mut self) {
        self.emit_op(OpCode::Nil);
        self.emit_op(OpCode::Return);
    }

    /// Adds a constant addressable by a one-byte operand.
    pub(crate) fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.chunk_mut().add_constant(value);
        if index > u8::MAX as usize {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    /// Emits a constant load, using the long form when the pool demands it.
    pub(crate) fn emit_constant(&mut self, value: Value) {
        let line = self.previous.line;
        if self.chunk_mut().write_constant(value, line).is_none() {
            self.error("Too many constants in one chunk.");
        }
    }

    /// Interns `name` and returns its constant index, reusing the pool
    /// entry when this function has referenced the name before.
    pub(crate) fn identifier_constant(&mut self, name: &str) -> u8 {
        let key = self.strings.intern(self.heap, name);
        if let Some(&index) = self.state().name_constants.get(&key) {
            return index;
        }
        let index = self.make_constant(Value::Obj(key));
        self.state_mut().name_constants.insert(key, index);
        index
    }

    /// Emits a jump with a placeholder offset; returns the offset's
    /// position for patching.
    pub(crate) fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.state().chunk.code.len() - 2
    }

    /// Backpatches a forward jump to land on the next instruction.
    pub(crate) fn patch_jump(&mut self, offset: usize) {
        // -2 adjusts for the operand bytes themselves.
        let jump = self.state().chunk.code.len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
            return;
        }

        let code = &mut self.chunk_mut().code;
        code[offset] = (jump >> 8) as u8;
        code[offset + 1] = jump as u8;
    }

    /// Emits a backward jump to `loop_start`.
    pub(crate) fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);

        let offset = self.state().chunk.code.len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
            self.emit_byte(0xff);
            self.emit_byte(0xff);
            return;
        }

        self.emit_byte((offset >> 8) as u8);
        self.emit_byte(offset as u8);
    }

    // ------------------------------------------------------------------
    // Scopes and variables
    // ------------------------------------------------------------------

    pub(crate) fn begin_scope(&mut self) {
        self.state_mut().scope_depth += 1;
    }

    /// Ends a scope, popping (or closing, for captured variables) every
    /// local declared in it.
    pub(crate) fn end_scope(&mut self) {
        self.state_mut().scope_depth -= 1;

        loop {
            let captured = match self.state().locals.last() {
                Some(local) if local.depth > self.state().scope_depth => local.is_captured,
                _ => break,
            };
            if captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
            self.state_mut().locals.pop();
        }
    }

    /// Consumes a variable name; returns the name constant for globals,
    /// or 0 after registering a local.
    pub(crate) fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);

        self.declare_variable();
        if self.state().scope_depth > 0 {
            return 0;
        }

        let name = self.previous.lexeme;
        self.identifier_constant(name)
    }

    /// Registers a local in the current scope; globals are late-bound and
    /// need no declaration.
    pub(crate) fn declare_variable(&mut self) {
        if self.state().scope_depth == 0 {
            return;
        }

        let name = self.previous.lexeme;
        let mut duplicate = false;
        for local in self.state().locals.iter().rev() {
            if local.depth != -1 && local.depth < self.state().scope_depth {
                break;
            }
            if local.name == name {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }

        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        if self.state().locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }

        self.state_mut().locals.push(Local {
            name,
            depth: -1,
            is_captured: false,
        });
    }

    /// Marks the newest local as initialized, making it resolvable.
    pub(crate) fn mark_initialized(&mut self) {
        let state = self.state_mut();
        if state.scope_depth == 0 {
            return;
        }
        let depth = state.scope_depth;
        if let Some(local) = state.locals.last_mut() {
            local.depth = depth;
        }
    }

    pub(crate) fn define_variable(&mut self, global: u8) {
        if self.state().scope_depth > 0 {
            self.mark_initialized();
            return;
        }

        self.emit_op(OpCode::DefineGlobal);
        self.emit_byte(global);
    }

    /// Resolves `name` to a stack slot of the function at `state_index`.
    pub(crate) fn resolve_local(&mut self, state_index: usize, name: &str) -> Option<u8> {
        let mut uninitialized = false;
        let mut found = None;
        for (slot, local) in self.states[state_index].locals.iter().enumerate().rev() {
            if local.name == name {
                if local.depth == -1 {
                    uninitialized = true;
                }
                found = Some(slot as u8);
                break;
            }
        }

        if uninitialized {
            self.error("Can't read local variable in its own initializer.");
        }
        found
    }

    /// Resolves `name` to an upvalue of the function at `state_index`,
    /// capturing through enclosing functions as needed.
    pub(crate) fn resolve_upvalue(&mut self, state_index: usize, name: &str) -> Option<u8> {
        if state_index == 0 {
            return None;
        }

        if let Some(local) = self.resolve_local(state_index - 1, name) {
            self.states[state_index - 1].locals[local as usize].is_captured = true;
            return Some(self.add_upvalue(state_index, local, true));
        }

        if let Some(upvalue) = self.resolve_upvalue(state_index - 1, name) {
            return Some(self.add_upvalue(state_index, upvalue, false));
        }

        None
    }

    /// Adds an upvalue descriptor, deduplicating repeated captures of the
    /// same variable.
    fn add_upvalue(&mut self, state_index: usize, index: u8, is_local: bool) -> u8 {
        let descriptor = CompiledUpvalue { index, is_local };
        let upvalues = &self.states[state_index].upvalues;

        if let Some(existing) = upvalues.iter().position(|&u| u == descriptor) {
            return existing as u8;
        }

        if upvalues.len() == MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }

        self.states[state_index].upvalues.push(descriptor);
        (self.states[state_index].upvalues.len() - 1) as u8
    }
}
