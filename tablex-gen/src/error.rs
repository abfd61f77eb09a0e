use smartstring::alias::String;
use thiserror::Error;

/// Errors raised while building a grammar, a lexer or a parser.
///
/// All of them are fatal: construction stops and nothing is produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("empty regular expression")]
    EmptyPattern,

    #[error("invalid regular expression {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: Box<regex_syntax::Error>,
    },

    #[error("unsupported construct in regular expression {pattern:?}: {what}")]
    UnsupportedRegex { pattern: String, what: String },

    #[error("regular expression {0:?} matches the empty string")]
    NullablePattern(String),

    #[error("no terminals or ignore patterns defined")]
    EmptyTerminalSet,

    #[error("terminal {0:?} redefined with a different conversion")]
    ConflictingTerminal(String),

    #[error("grammar has no production rules")]
    EmptyGrammar,

    #[error("non-terminal {name:?} has no production rules (used in {rule})")]
    UndefinedNonTerminal { name: String, rule: String },

    #[error("non-terminal {0:?} is unreachable from the start symbol")]
    UnreachableNonTerminal(String),

    #[error("symbol {0} was not registered with this grammar")]
    UnknownSymbol(String),

    #[error("terminal {0:?} is already in a precedence group")]
    DuplicatePrecedence(String),

    #[error("stored tables do not match the grammar: {0}")]
    TableMismatch(String),

    #[error(transparent)]
    Serialization(#[from] tablex::TableError),
}
