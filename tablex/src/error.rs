//! Runtime error types raised while lexing and parsing.
//!
//! Both errors are synchronous and final: the runtime never retries or
//! resynchronizes, so a failed lex or parse yields no semantic value.
//!
//! # Examples
//!
//! ```rust
//! # use tablex::{LexicalError, ParseError, Position};
//! let err = LexicalError {
//!     offset: 3,
//!     position: Position::new(1, 3),
//!     found: '#',
//! };
//! assert!(err.to_string().contains("1:3"));
//!
//! let err: ParseError = err.into();
//! assert!(matches!(err, ParseError::Lexical(_)));
//! ```

use crate::Position;
use crate::cursor::Span;
use thiserror::Error;

/// No terminal matches the input at `offset`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no token matches {found:?} at offset {offset} ({}:{})", .position.line, .position.column)]
pub struct LexicalError {
    /// Character offset of the first unmatched character.
    pub offset: usize,
    /// Line/column of the first unmatched character.
    pub position: Position,
    /// The character at which no match could start.
    pub found: char,
}

/// Errors raised by the shift-reduce engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The lexer could not produce the next token.
    #[error(transparent)]
    Lexical(#[from] LexicalError),

    /// The table has no action for the current state and lookahead.
    #[error(
        "unexpected {found} at offset {offset} ({}:{}), expected one of: {}",
        .span.start.line,
        .span.start.column,
        .expected.join(", ")
    )]
    UnexpectedToken {
        /// Character offset of the offending token.
        offset: usize,
        /// Source range of the offending token.
        span: Span,
        /// Name of the offending token kind (and its text, when it has any).
        found: String,
        /// Names of the token kinds admissible in the current state.
        expected: Vec<String>,
    },

    /// The tables are inconsistent with the token stream (e.g. a missing
    /// goto entry); indicates tables built for a different grammar.
    #[error("internal parser error: {0}")]
    Internal(String),
}

/// Errors raised while encoding or decoding serialized tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table serialization failed: {0}")]
    Postcard(#[from] postcard::Error),

    #[error("malformed table: {0}")]
    Malformed(String),
}
