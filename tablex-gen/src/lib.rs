//! Lexer automaton and LALR(1) table construction for `tablex`.
//!
//! Construction runs once per grammar:
//!
//!  * **lexer**: each terminal's regular expression is parsed
//!    ([`regex`]), compiled into one Thompson NFA ([`nfa`]), determinized
//!    and minimized into a dense transition table ([`dfa`]);
//!  * **parser**: the grammar ([`grammar`]) is augmented, its LR(0)
//!    collection built ([`lr0`]), reduce lookaheads computed
//!    ([`lookahead`]), and the ACTION/GOTO table filled with precedence
//!    based conflict resolution ([`table`]).
//!
//! [`create_parser`] wraps the result in a [`Parser`] that runs the
//! `tablex` engine. The tables can be serialized and later fed to
//! [`Parser::from_tables`] to skip construction.
//!
//! # Examples
//!
//! ```rust
//! use tablex_gen::{Associativity, GrammarBuilder, create_parser};
//!
//! let mut g = GrammarBuilder::<i64>::new();
//! let num = g.terminal_with("[0-9]+", |s| s.parse().unwrap_or_default())?;
//! let plus = g.literal("+")?;
//! let star = g.literal("*")?;
//! g.ignore("[ \t]+")?;
//! let e = g.non_terminal("Expr");
//! g.rule(e, &[e.into(), plus.into(), e.into()]).reduce(|v| v[0] + v[2]);
//! g.rule(e, &[e.into(), star.into(), e.into()]).reduce(|v| v[0] * v[2]);
//! g.rule(e, &[num.into()]);
//! g.precedence(Associativity::Left, &[plus]);
//! g.precedence(Associativity::Left, &[star]);
//!
//! let parser = create_parser(g.build()?)?;
//! assert_eq!(parser.parse("2 + 3 * 4").unwrap(), 14);
//! # Ok::<(), tablex_gen::ConfigError>(())
//! ```

pub mod dfa;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod lookahead;
pub mod lr0;
pub mod nfa;
pub mod parser;
pub mod regex;
pub mod report;
pub mod table;

pub use error::ConfigError;
pub use grammar::{
    AcceptFn, Associativity, Grammar, GrammarBuilder, NonTerminal, NonTerminalId, Pattern,
    PrecedenceGroup, ReduceFn, Rule, RuleHandle, RuleId, Symbol, Terminal, TerminalId,
};
pub use lexer::{LexerConfig, LexerRuntime, create_lexer};
pub use lookahead::LookaheadMode;
pub use parser::{Parser, ParserConfig, TreeDriver, ValueDriver, create_parser};
pub use table::{Conflict, ConflictKind};
