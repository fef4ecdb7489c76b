//! karst-lex - Lexical Scanner
//!
//! Turns Karst source text into a stream of tokens, one [`Lexer::next_token`]
//! call at a time. The compiler pulls tokens on demand; nothing is buffered.
//!
//! Tokens borrow their lexemes from the source string, so the scanner
//! allocates nothing. Lexical errors are not reported here: they surface as
//! [`TokenKind::Error`] tokens whose lexeme is the message, and the consumer
//! decides how to report them.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use token::{Token, TokenKind};
