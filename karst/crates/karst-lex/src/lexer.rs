//! Core lexer implementation.
//!
//! [`Lexer::next_token`] skips whitespace and comments, then dispatches on
//! the current character. Invalid input produces `TokenKind::Error` tokens
//! rather than failing the scan; the parser reports them.

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};

/// Lexer for Karst source code.
pub struct Lexer<'src> {
    /// Character cursor for source traversal.
    cursor: Cursor<'src>,

    /// Starting byte position of the current token.
    token_start: usize,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source code.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            token_start: 0,
        }
    }

    /// Returns the next token in the source stream, or `Eof` at the end.
    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_whitespace_and_comments();

        self.token_start = self.cursor.position();

        if self.cursor.is_at_end() {
            return self.make(TokenKind::Eof);
        }

        let c = self.cursor.current_char();
        self.cursor.advance();

        match c {
            '(' => self.make(TokenKind::LeftParen),
            ')' => self.make(TokenKind::RightParen),
            '{' => self.make(TokenKind::LeftBrace),
            '}' => self.make(TokenKind::RightBrace),
            ',' => self.make(TokenKind::Comma),
            '.' => self.make(TokenKind::Dot),
            '-' => self.make(TokenKind::Minus),
            '+' => self.make(TokenKind::Plus),
            ';' => self.make(TokenKind::Semicolon),
            '/' => self.make(TokenKind::Slash),
            '*' => self.make(TokenKind::Star),
            '!' => {
                if self.cursor.match_char('=') {
                    self.make(TokenKind::BangEqual)
                } else {
                    self.make(TokenKind::Bang)
                }
            }
            '=' => {
                if self.cursor.match_char('=') {
                    self.make(TokenKind::EqualEqual)
                } else {
                    self.make(TokenKind::Equal)
                }
            }
            '<' => {
                if self.cursor.match_char('=') {
                    self.make(TokenKind::LessEqual)
                } else {
                    self.make(TokenKind::Less)
                }
            }
            '>' => {
                if self.cursor.match_char('=') {
                    self.make(TokenKind::GreaterEqual)
                } else {
                    self.make(TokenKind::Greater)
                }
            }
            '"' => self.lex_string(),
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_ident_start(c) => self.lex_identifier(),
            _ => self.error_token("Unexpected character."),
        }
    }

    /// Builds a token spanning from the token start to the cursor.
    fn make(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: self.cursor.slice_from(self.token_start),
            line: self.cursor.line(),
        }
    }

    /// Builds an error token carrying `message` as its lexeme.
    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.cursor.line(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current_char() {
                ' ' | '\r' | '\t' | '\n' => self.cursor.advance(),
                '/' if self.cursor.peek_char(1) == '/' => {
                    while self.cursor.current_char() != '\n' && !self.cursor.is_at_end() {
                        self.cursor.advance();
                    }
                }
                _ => return,
            }
        }
    }

    /// Scans a string literal. Strings may span lines; there are no escape
    /// sequences.
    fn lex_string(&mut self) -> Token<'src> {
        while self.cursor.current_char() != '"' && !self.cursor.is_at_end() {
            self.cursor.advance();
        }

        if self.cursor.is_at_end() {
            return self.error_token("Unterminated string.");
        }

        // Closing quote
        self.cursor.advance();
        self.make(TokenKind::String)
    }

    /// Scans a number literal: digits with an optional fractional part.
    fn lex_number(&mut self) -> Token<'src> {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        // A '.' only belongs to the number when a digit follows it.
        if self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit() {
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        self.make(TokenKind::Number)
    }

    fn lex_identifier(&mut self) -> Token<'src> {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }

        self.make(self.identifier_kind())
    }

    /// Distinguishes keywords from plain identifiers.
    fn identifier_kind(&self) -> TokenKind {
        match self.cursor.slice_from(self.token_start) {
            "and" => TokenKind::And,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "fun" => TokenKind::Fun,
            "if" => TokenKind::If,
            "nil" => TokenKind::Nil,
            "or" => TokenKind::Or,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
