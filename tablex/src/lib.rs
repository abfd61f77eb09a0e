//! # tablex
//!
//! Runtime half of a table-driven lexer/parser pair.
//!
//! The crate executes artifacts produced by `tablex-gen`: a lexer automaton
//! (a dense [`TransitionTable`] or a direct [`Nfa`] walk) and an LR
//! [`ParseTable`]. A [`Lexer`] tokenizes by maximal munch; [`Parser::run`]
//! drives the shift-reduce loop and hands shifts and reductions to a
//! [`ParserDriver`].
//!
//! Built artifacts are immutable and can be shared across threads; all
//! mutable state lives in a [`LexerSession`] or a [`Parser`] owned by one
//! parse.
//!
//! Tables serialize with `serde` + `postcard` through `to_bytes` /
//! `from_bytes`.

pub mod automaton;
pub mod cursor;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod table;
pub mod token;

pub use automaton::{Automaton, DEAD, LexerAutomaton, Nfa, NfaState, TransitionTable};
pub use cursor::{LexerCursor, Position, Span};
pub use error::{LexicalError, ParseError, TableError};
pub use lexer::{Conversion, END_NAME, Lexer, LexerSession, LexerStats, PatternDef};
pub use parser::{Parser, ParserDriver, ParserStats};
pub use table::{NO_GOTO, ParseTable, ParserAction, RuleInfo};
pub use token::{LexedToken, ParseNode};
