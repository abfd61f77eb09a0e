//! Lexer construction: terminal set → NFA → runtime automaton.

use crate::dfa;
use crate::error::ConfigError;
use crate::grammar::{Grammar, Pattern, Terminal, TerminalId, TerminalSet};
use crate::nfa;
use crate::report;
use smartstring::alias::String;
use std::sync::Arc;
use tablex::{Conversion, Lexer, LexerAutomaton, PatternDef};

/// How the built lexer executes its automaton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LexerRuntime {
    /// Minimized DFA as a dense transition table.
    #[default]
    Tabular,
    /// Walks the Thompson NFA directly, skipping subset construction.
    Nfa,
}

/// A bare terminal set, for lexing without a grammar.
///
/// Token kinds are terminal indices in registration order; earlier
/// terminals win ties between equally long matches.
pub struct LexerConfig<T> {
    symbols: TerminalSet<T>,
    runtime: LexerRuntime,
}

impl<T> Default for LexerConfig<T> {
    fn default() -> Self {
        Self {
            symbols: TerminalSet::default(),
            runtime: LexerRuntime::default(),
        }
    }
}

impl<T: 'static> LexerConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&mut self, regex: &str) -> Result<TerminalId, ConfigError> {
        self.symbols.intern(regex, None)
    }

    pub fn token_with<F>(&mut self, regex: &str, f: F) -> Result<TerminalId, ConfigError>
    where
        F: Fn(&str) -> T + Send + Sync + 'static,
    {
        self.symbols.intern(regex, Some(Arc::new(f)))
    }

    pub fn ignore(&mut self, regex: &str) -> Result<&mut Self, ConfigError> {
        self.symbols.ignore(regex)?;
        Ok(self)
    }

    pub fn runtime(&mut self, runtime: LexerRuntime) -> &mut Self {
        self.runtime = runtime;
        self
    }

    pub fn build(&self) -> Result<Lexer<T>, ConfigError> {
        assemble(&self.symbols.terminals, &self.symbols.ignores, self.runtime)
    }
}

/// Builds a table-driven lexer for `grammar`'s terminals and ignore
/// patterns.
pub fn create_lexer<T>(grammar: &Grammar<T>) -> Result<Lexer<T>, ConfigError> {
    assemble(grammar.terminals(), grammar.ignores(), LexerRuntime::Tabular)
}

pub(crate) fn assemble<T>(
    terminals: &[Terminal<T>],
    ignores: &[Pattern],
    runtime: LexerRuntime,
) -> Result<Lexer<T>, ConfigError> {
    if terminals.is_empty() && ignores.is_empty() {
        return Err(ConfigError::EmptyTerminalSet);
    }
    let nodes: Vec<_> = terminals
        .iter()
        .map(|t| t.pattern.node.clone())
        .chain(ignores.iter().map(|p| p.node.clone()))
        .collect();
    let nfa = nfa::compile(&nodes);
    let automaton = match runtime {
        LexerRuntime::Tabular => {
            let table = dfa::build_table(&nfa)?;
            report::log_debug("lexer table", |out| {
                use std::io::Write;
                writeln!(
                    out,
                    "{} states, {} character classes",
                    table.state_count(),
                    table.class_count()
                )
            });
            LexerAutomaton::Tabular(table)
        }
        LexerRuntime::Nfa => LexerAutomaton::Nfa(nfa),
    };
    with_automaton(terminals, ignores, automaton)
}

/// Wraps a ready automaton whose pattern `i` is terminal `i`, followed by
/// the ignore patterns.
pub(crate) fn with_automaton<T>(
    terminals: &[Terminal<T>],
    ignores: &[Pattern],
    automaton: LexerAutomaton,
) -> Result<Lexer<T>, ConfigError> {
    let patterns: Vec<PatternDef<T>> = terminals
        .iter()
        .enumerate()
        .map(|(i, t)| PatternDef {
            kind: Some(i),
            convert: t.convert.clone(),
        })
        .chain(ignores.iter().map(|_| PatternDef {
            kind: None,
            convert: None::<Conversion<T>>,
        }))
        .collect();
    let names: Vec<String> = terminals.iter().map(|t| t.name().into()).collect();
    Ok(Lexer::new(automaton, patterns, names)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;
    use tablex::LexicalError;

    fn config(runtime: LexerRuntime) -> LexerConfig<i64> {
        let mut c = LexerConfig::new();
        c.token("if").unwrap();
        c.token("[a-z]+").unwrap();
        c.token_with("[0-9]+", |s| s.parse().unwrap_or_default())
            .unwrap();
        c.ignore("[ \t\n]+").unwrap().runtime(runtime);
        c
    }

    fn kinds(lexer: &Lexer<i64>, input: &str) -> Vec<(usize, std::string::String, i64)> {
        lexer
            .tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text.to_string(), t.value))
            .collect()
    }

    #[test]
    fn both_runtimes_agree() {
        let input = "if iffy 42\n  x 7";
        let table = config(LexerRuntime::Tabular).build().unwrap();
        let nfa = config(LexerRuntime::Nfa).build().unwrap();
        assert!(matches!(table.automaton(), LexerAutomaton::Tabular(_)));
        assert!(matches!(nfa.automaton(), LexerAutomaton::Nfa(_)));
        let expected = vec![
            (0, "if".to_string(), 0),
            (1, "iffy".to_string(), 0),
            (2, "42".to_string(), 42),
            (1, "x".to_string(), 0),
            (2, "7".to_string(), 7),
            (3, "".to_string(), 0),
        ];
        assert_eq!(kinds(&table, input), expected);
        assert_eq!(kinds(&nfa, input), expected);
    }

    #[test]
    fn no_match_is_a_lexical_error() {
        let lexer = config(LexerRuntime::Tabular).build().unwrap();
        let err: LexicalError = lexer.tokenize("ab ?").unwrap_err();
        assert_eq!(err.offset, 3);
        assert_eq!(err.found, '?');
    }

    #[test]
    fn empty_set_is_rejected() {
        assert!(matches!(
            LexerConfig::<i64>::new().build(),
            Err(ConfigError::EmptyTerminalSet)
        ));
    }

    #[test]
    fn grammar_lexer_names_kinds_by_regex() {
        let mut g = GrammarBuilder::<i64>::new();
        let plus = g.literal("+").unwrap();
        let num = g.terminal("[0-9]+").unwrap();
        let e = g.non_terminal("E");
        g.rule(e, &[num.into(), plus.into(), num.into()]);
        g.ignore(" +").unwrap();
        let g = g.build().unwrap();
        let lexer = create_lexer(&g).unwrap();
        assert_eq!(lexer.kind_count(), 3);
        assert_eq!(lexer.token_name(0), "\\+");
        assert_eq!(lexer.token_name(1), "[0-9]+");
        assert_eq!(lexer.token_name(2), tablex::END_NAME);
        let tokens = lexer.tokenize("1 + 2").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![1, 0, 1, 2]
        );
    }
}
