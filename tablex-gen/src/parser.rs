//! Parser construction and the ready-to-use [`Parser`].
//!
//! [`ParserConfig::build`] runs the whole pipeline: LR(0) collection,
//! lookaheads, table fill with conflict resolution, and the lexer for the
//! grammar's terminals. The resulting [`Parser`] is immutable; each call to
//! [`Parser::parse`] runs a fresh [`tablex::Parser`] engine over a fresh
//! lexer session.

use crate::error::ConfigError;
use crate::grammar::{Grammar, RuleId};
use crate::lexer::{self, LexerRuntime};
use crate::lookahead::{self, LookaheadMode};
use crate::lr0;
use crate::report;
use crate::table::{Conflict, construct_table};
use std::sync::Arc;
use tablex::{
    LexedToken, Lexer, LexerAutomaton, ParseError, ParseNode, ParseTable, ParserDriver, Position,
    TransitionTable,
};

/// Construction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserConfig {
    pub lookahead: LookaheadMode,
    pub lexer_runtime: LexerRuntime,
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookahead(mut self, mode: LookaheadMode) -> Self {
        self.lookahead = mode;
        self
    }

    pub fn lexer_runtime(mut self, runtime: LexerRuntime) -> Self {
        self.lexer_runtime = runtime;
        self
    }

    /// Builds the tables and the lexer for `grammar`.
    ///
    /// Unresolved conflicts do not fail the build; they are logged and kept
    /// in [`Parser::conflicts`].
    pub fn build<T>(&self, grammar: Grammar<T>) -> Result<Parser<T>, ConfigError> {
        let collection = lr0::construct_set(&grammar);
        let lookaheads = lookahead::compute(&grammar, &collection, self.lookahead);
        let (table, conflicts) = construct_table(&grammar, &collection, &lookaheads);

        report::log_debug("rules", |out| report::write_rules(out, &grammar));
        report::log_debug("item sets", |out| {
            report::write_states(out, &grammar, &collection)
        });
        report::log_debug("FIRST/FOLLOW", |out| {
            let first = lookahead::first_sets(&grammar);
            let follow = lookahead::follow_sets(&grammar, &first);
            report::write_first_follow(out, &grammar, &first, &follow)
        });
        report::log_debug("actions", |out| {
            report::write_actions(out, &grammar, &table)
        });

        let lexer = lexer::assemble(grammar.terminals(), grammar.ignores(), self.lexer_runtime)?;
        Ok(Parser {
            grammar: Arc::new(grammar),
            lexer,
            table: Arc::new(table),
            conflicts: conflicts.into(),
        })
    }
}

/// Builds a parser with the default configuration (LALR(1), tabular lexer).
pub fn create_parser<T>(grammar: Grammar<T>) -> Result<Parser<T>, ConfigError> {
    ParserConfig::default().build(grammar)
}

/// A grammar together with its lexer and parse table.
pub struct Parser<T> {
    grammar: Arc<Grammar<T>>,
    lexer: Lexer<T>,
    table: Arc<ParseTable>,
    conflicts: Arc<[Conflict]>,
}

impl<T> Clone for Parser<T> {
    fn clone(&self) -> Self {
        Self {
            grammar: Arc::clone(&self.grammar),
            lexer: self.lexer.clone(),
            table: Arc::clone(&self.table),
            conflicts: Arc::clone(&self.conflicts),
        }
    }
}

impl<T> std::fmt::Debug for Parser<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("grammar", &self.grammar)
            .field("lexer", &self.lexer)
            .field("states", &self.table.state_count())
            .field("conflicts", &self.conflicts.len())
            .finish()
    }
}

impl<T> Parser<T> {
    /// Rebuilds a parser from stored tables, checking their shape against
    /// `grammar`.
    pub fn from_tables(
        grammar: Grammar<T>,
        transitions: TransitionTable,
        table: ParseTable,
    ) -> Result<Self, ConfigError> {
        let terminals = grammar.end_terminal() + 1;
        if table.terminal_count() != terminals {
            return Err(ConfigError::TableMismatch(
                format!(
                    "{} terminal columns, grammar has {}",
                    table.terminal_count(),
                    terminals
                )
                .into(),
            ));
        }
        if table.nonterminal_count() != grammar.nonterminals().len() {
            return Err(ConfigError::TableMismatch(
                format!(
                    "{} non-terminal columns, grammar has {}",
                    table.nonterminal_count(),
                    grammar.nonterminals().len()
                )
                .into(),
            ));
        }
        if table.rules().len() != grammar.rules().len() {
            return Err(ConfigError::TableMismatch(
                format!(
                    "{} rules, grammar has {}",
                    table.rules().len(),
                    grammar.rules().len()
                )
                .into(),
            ));
        }
        for (i, (info, rule)) in table.rules().iter().zip(grammar.rules()).enumerate() {
            if info.lhs as usize != rule.lhs.0 || info.len as usize != rule.rhs.len() {
                return Err(ConfigError::TableMismatch(
                    format!("rule {i} differs from {}", grammar.rule_to_string(RuleId(i)))
                        .into(),
                ));
            }
        }
        let patterns = grammar.terminals().len() + grammar.ignores().len();
        if let Some(max) = transitions.max_pattern()
            && max >= patterns
        {
            return Err(ConfigError::TableMismatch(
                format!("lexer accepts pattern {max}, grammar has {patterns}").into(),
            ));
        }

        let lexer = lexer::with_automaton(
            grammar.terminals(),
            grammar.ignores(),
            LexerAutomaton::Tabular(transitions),
        )?;
        Ok(Self {
            grammar: Arc::new(grammar),
            lexer,
            table: Arc::new(table),
            conflicts: Arc::from(Vec::new()),
        })
    }

    pub fn grammar(&self) -> &Grammar<T> {
        &self.grammar
    }

    pub fn lexer(&self) -> &Lexer<T> {
        &self.lexer
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// The lexer's transition table, unless it runs on the NFA.
    pub fn transition_table(&self) -> Option<&TransitionTable> {
        match self.lexer.automaton() {
            LexerAutomaton::Tabular(t) => Some(t),
            LexerAutomaton::Nfa(_) => None,
        }
    }

    /// Conflicts left unresolved by precedence, with the action installed
    /// for each.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }
}

impl<T: Default> Parser<T> {
    /// Parses `input` with a custom driver.
    pub fn parse_with<D>(&self, input: &str, driver: &mut D) -> Result<D::Item, ParseError>
    where
        D: ParserDriver<Value = T>,
    {
        let mut session = self.lexer.begin(input);
        let mut engine = tablex::Parser::new(&self.table);
        let result = engine.run(&mut session, driver);
        let stats = engine.stats();
        log::debug!(
            "{} tokens, {} shifts, {} reductions, {} characters backtracked",
            stats.tokens,
            stats.shifts,
            stats.reductions,
            session.stats().backtracked
        );
        result
    }

    /// Parses `input` and returns the start symbol's value.
    pub fn parse(&self, input: &str) -> Result<T, ParseError> {
        self.parse_with(input, &mut ValueDriver::new(&self.grammar))
    }
}

impl<T: Default + Clone> Parser<T> {
    /// Parses `input` into a tree of tokens and reduced nodes. Node values
    /// are computed as in [`parse`](Self::parse).
    pub fn parse_tree(&self, input: &str) -> Result<ParseNode<T>, ParseError> {
        self.parse_with(input, &mut TreeDriver::new(&self.grammar))
    }
}

/// Keeps only semantic values on the stack.
pub struct ValueDriver<'g, T> {
    grammar: &'g Grammar<T>,
}

impl<'g, T> ValueDriver<'g, T> {
    pub fn new(grammar: &'g Grammar<T>) -> Self {
        Self { grammar }
    }
}

impl<T: Default> ParserDriver for ValueDriver<'_, T> {
    type Value = T;
    type Item = T;

    fn shift(&mut self, token: LexedToken<T>) -> T {
        token.value
    }

    fn reduce(&mut self, rule: usize, _lhs: usize, children: Vec<T>) -> T {
        self.grammar.reduce_values(rule, children)
    }

    fn accept(&mut self, item: T) -> T {
        self.grammar.accept_value(item)
    }
}

/// Builds a [`ParseNode`] tree.
///
/// Nodes of empty rules are zero-length and sit where the last shifted
/// token ends, so a parent's span never reaches past its matched text.
pub struct TreeDriver<'g, T> {
    grammar: &'g Grammar<T>,
    /// End offset and position of the last shifted token.
    last_end: (usize, Position),
}

impl<'g, T> TreeDriver<'g, T> {
    pub fn new(grammar: &'g Grammar<T>) -> Self {
        Self {
            grammar,
            last_end: (0, Position::START),
        }
    }
}

impl<T: Default + Clone> ParserDriver for TreeDriver<'_, T> {
    type Value = T;
    type Item = ParseNode<T>;

    fn shift(&mut self, token: LexedToken<T>) -> ParseNode<T> {
        self.last_end = (token.end_offset(), token.span.end);
        ParseNode::Leaf(token)
    }

    fn reduce(&mut self, rule: usize, lhs: usize, children: Vec<ParseNode<T>>) -> ParseNode<T> {
        let values = children.iter().map(|c| c.value().clone()).collect();
        let value = self.grammar.reduce_values(rule, values);
        let (at_offset, at) = self.last_end;
        ParseNode::node(lhs, rule, value, children, at_offset, at)
    }

    fn accept(&mut self, mut item: ParseNode<T>) -> ParseNode<T> {
        let value = std::mem::take(item.value_mut());
        *item.value_mut() = self.grammar.accept_value(value);
        item
    }
}
