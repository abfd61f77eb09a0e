//! Table-driven shift-reduce engine.
//!
//! The engine pulls tokens lazily from a [`LexerSession`], consults the
//! [`ParseTable`] for each (state, lookahead) pair, and leaves the meaning
//! of shifts and reductions to a [`ParserDriver`]. The driver decides what
//! sits on the value stack: plain semantic values, tree nodes, or anything
//! else.

use crate::error::ParseError;
use crate::lexer::{Lexer, LexerSession};
use crate::table::{ParseTable, ParserAction};
use crate::token::LexedToken;

/// Callbacks invoked by [`Parser::run`].
pub trait ParserDriver {
    /// Semantic value carried by tokens.
    type Value;
    /// What the value stack holds.
    type Item;

    /// Wraps a shifted token.
    fn shift(&mut self, token: LexedToken<Self::Value>) -> Self::Item;

    /// Combines the popped `children` (left to right) of `rule`, which
    /// produces non-terminal `lhs`. `children` is empty for an empty rule.
    fn reduce(&mut self, rule: usize, lhs: usize, children: Vec<Self::Item>) -> Self::Item;

    /// Finishes the parse with the item left on the stack.
    fn accept(&mut self, item: Self::Item) -> Self::Item;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserStats {
    pub tokens: usize,
    pub shifts: usize,
    pub reductions: usize,
}

/// Per-parse engine state: the state stack and counters.
#[derive(Debug)]
pub struct Parser<'t> {
    table: &'t ParseTable,
    states: Vec<u32>,
    stats: ParserStats,
}

impl<'t> Parser<'t> {
    pub fn new(table: &'t ParseTable) -> Self {
        Self {
            table,
            states: Vec::new(),
            stats: ParserStats::default(),
        }
    }

    pub fn stats(&self) -> ParserStats {
        self.stats.clone()
    }

    fn pull<T: Default>(
        &mut self,
        session: &mut LexerSession<'_, T>,
    ) -> Result<LexedToken<T>, ParseError> {
        self.stats.tokens += 1;
        match session.try_next()? {
            Some(t) => Ok(t),
            None => Err(ParseError::Internal(
                "token stream ended without an end token".into(),
            )),
        }
    }

    /// Parses the whole token stream of `session`.
    pub fn run<D>(
        &mut self,
        session: &mut LexerSession<'_, D::Value>,
        driver: &mut D,
    ) -> Result<D::Item, ParseError>
    where
        D: ParserDriver,
        D::Value: Default,
    {
        let table = self.table;
        let lexer = session.lexer();
        if lexer.kind_count() != table.terminal_count() {
            return Err(ParseError::Internal(format!(
                "lexer has {} token kinds but the table has {} terminal columns",
                lexer.kind_count(),
                table.terminal_count()
            )));
        }

        self.states.clear();
        let mut items: Vec<D::Item> = Vec::new();
        let mut token = self.pull(session)?;
        self.states.push(0);
        if log::log_enabled!(log::Level::Trace) {
            self.dump_state(lexer, &token);
        }

        loop {
            let state = match self.states.last() {
                Some(&s) => s as usize,
                None => return Err(ParseError::Internal("state stack underflow".into())),
            };
            match table.action(state, token.kind) {
                ParserAction::Shift(next) => {
                    log::trace!("Shift {}", next);
                    let lookahead = self.pull(session)?;
                    items.push(driver.shift(std::mem::replace(&mut token, lookahead)));
                    self.states.push(next);
                    self.stats.shifts += 1;
                }

                ParserAction::Reduce(rule) => {
                    let info = table.rule(rule as usize).ok_or_else(|| {
                        ParseError::Internal(format!("reduce by unknown rule {rule}"))
                    })?;
                    log::trace!("Reduce {} (lhs {}, len {})", rule, info.lhs, info.len);
                    let n = info.len as usize;
                    if items.len() < n || self.states.len() <= n {
                        return Err(ParseError::Internal(format!(
                            "stack underflow reducing rule {rule}"
                        )));
                    }
                    let children = items.split_off(items.len() - n);
                    self.states.truncate(self.states.len() - n);
                    let top = self.states[self.states.len() - 1] as usize;
                    let target = table.goto(top, info.lhs as usize).ok_or_else(|| {
                        ParseError::Internal(format!(
                            "no goto from state {top} on non-terminal {}",
                            info.lhs
                        ))
                    })?;
                    items.push(driver.reduce(rule as usize, info.lhs as usize, children));
                    self.states.push(target);
                    self.stats.reductions += 1;
                }

                ParserAction::Accept => {
                    log::trace!("Accept");
                    let item = items
                        .pop()
                        .ok_or_else(|| ParseError::Internal("accept with empty stack".into()))?;
                    if !items.is_empty() {
                        return Err(ParseError::Internal(format!(
                            "accept with {} extra items on the stack",
                            items.len()
                        )));
                    }
                    return Ok(driver.accept(item));
                }

                ParserAction::Error => {
                    return Err(self.unexpected(lexer, state, &token));
                }
            }

            if log::log_enabled!(log::Level::Trace) {
                self.dump_state(lexer, &token);
            }
        }
    }

    fn unexpected<T>(&self, lexer: &Lexer<T>, state: usize, token: &LexedToken<T>) -> ParseError {
        let name = lexer.token_name(token.kind);
        let found = if token.text.is_empty() {
            name.to_string()
        } else {
            format!("{name} {:?}", token.text.as_str())
        };
        ParseError::UnexpectedToken {
            offset: token.offset,
            span: token.span,
            found,
            expected: self
                .table
                .expected(state)
                .into_iter()
                .map(|k| lexer.token_name(k).to_string())
                .collect(),
        }
    }

    fn dump_state<T>(&self, lexer: &Lexer<T>, incoming: &LexedToken<T>) {
        let mut output = String::new();
        for state in &self.states {
            output.push_str(&format!("<{state}>  "));
        }
        output.push_str(&format!(
            "<-  {} {:?}",
            lexer.token_name(incoming.kind),
            incoming.text.as_str()
        ));
        log::trace!("{}", output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{DEAD, LexerAutomaton, TransitionTable};
    use crate::lexer::{Conversion, PatternDef};
    use crate::table::RuleInfo;
    use std::sync::Arc;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Kinds: 0 = number, 1 = `+`, 2 = end; spaces are skipped.
    fn lexer() -> Lexer<i64> {
        let starts = vec![0, 32, 33, 43, 44, 48, 58];
        #[rustfmt::skip]
        let next = vec![
            DEAD, 3,    DEAD, 2,    DEAD, 1,    DEAD,
            DEAD, DEAD, DEAD, DEAD, DEAD, 1,    DEAD,
            DEAD, DEAD, DEAD, DEAD, DEAD, DEAD, DEAD,
            DEAD, 3,    DEAD, DEAD, DEAD, DEAD, DEAD,
        ];
        let table =
            TransitionTable::new(starts, next, vec![None, Some(0), Some(1), Some(2)]).unwrap();
        let parse: Conversion<i64> = Arc::new(|s: &str| s.parse().unwrap_or_default());
        Lexer::new(
            LexerAutomaton::Tabular(table),
            vec![
                PatternDef {
                    kind: Some(0),
                    convert: Some(parse),
                },
                PatternDef {
                    kind: Some(1),
                    convert: None,
                },
                PatternDef {
                    kind: None,
                    convert: None,
                },
            ],
            vec!["num".into(), "+".into()],
        )
        .unwrap()
    }

    /// `E → E + num` (rule 0), `E → num` (rule 1), `E' → E` (rule 2).
    fn table() -> ParseTable {
        let rules = vec![
            RuleInfo { lhs: 0, len: 3 },
            RuleInfo { lhs: 0, len: 1 },
            RuleInfo { lhs: 1, len: 1 },
        ];
        let mut t = ParseTable::new(5, 3, 2, rules);
        t.set_action(0, 0, ParserAction::Shift(1));
        t.set_goto(0, 0, 2);
        t.set_action(1, 1, ParserAction::Reduce(1));
        t.set_action(1, 2, ParserAction::Reduce(1));
        t.set_action(2, 1, ParserAction::Shift(3));
        t.set_action(2, 2, ParserAction::Accept);
        t.set_action(3, 0, ParserAction::Shift(4));
        t.set_action(4, 1, ParserAction::Reduce(0));
        t.set_action(4, 2, ParserAction::Reduce(0));
        t
    }

    struct Sum;

    impl ParserDriver for Sum {
        type Value = i64;
        type Item = i64;

        fn shift(&mut self, token: LexedToken<i64>) -> i64 {
            token.value
        }

        fn reduce(&mut self, rule: usize, _lhs: usize, children: Vec<i64>) -> i64 {
            match rule {
                0 => children[0] + children[2],
                _ => children[0],
            }
        }

        fn accept(&mut self, item: i64) -> i64 {
            item
        }
    }

    /// Renders the derivation with explicit grouping.
    struct Shape;

    impl ParserDriver for Shape {
        type Value = i64;
        type Item = String;

        fn shift(&mut self, token: LexedToken<i64>) -> String {
            token.text.to_string()
        }

        fn reduce(&mut self, rule: usize, _: usize, children: Vec<String>) -> String {
            match rule {
                0 => format!("({})", children.concat()),
                _ => children.concat(),
            }
        }

        fn accept(&mut self, item: String) -> String {
            format!("[{item}]")
        }
    }

    #[test]
    fn sums_left_to_right() {
        init_logger();
        let lexer = lexer();
        let table = table();
        let mut parser = Parser::new(&table);
        let value = parser.run(&mut lexer.begin("1 + 2 + 39"), &mut Sum).unwrap();
        assert_eq!(value, 42);
        let stats = parser.stats();
        assert_eq!(stats.shifts, 5);
        assert_eq!(stats.reductions, 3);
        assert_eq!(stats.tokens, 6);
    }

    #[test]
    fn reductions_are_left_associative() {
        let lexer = lexer();
        let table = table();
        let shape = Parser::new(&table)
            .run(&mut lexer.begin("1+2+3"), &mut Shape)
            .unwrap();
        assert_eq!(shape, "[((1+2)+3)]");
    }

    #[test]
    fn premature_end_lists_expected_tokens() {
        let lexer = lexer();
        let table = table();
        let err = Parser::new(&table)
            .run(&mut lexer.begin("1 +"), &mut Sum)
            .unwrap_err();
        match err {
            ParseError::UnexpectedToken {
                offset,
                found,
                expected,
                ..
            } => {
                assert_eq!(offset, 3);
                assert_eq!(found, "$end");
                assert_eq!(expected, vec!["num"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unexpected_token_names_its_text() {
        let lexer = lexer();
        let table = table();
        let err = Parser::new(&table)
            .run(&mut lexer.begin("+"), &mut Sum)
            .unwrap_err();
        assert!(err.to_string().starts_with("unexpected + \"+\" at offset 0"));
    }

    #[test]
    fn lexical_errors_propagate() {
        let lexer = lexer();
        let table = table();
        let err = Parser::new(&table)
            .run(&mut lexer.begin("1 + x"), &mut Sum)
            .unwrap_err();
        assert!(matches!(err, ParseError::Lexical(e) if e.offset == 4));
    }

    #[test]
    fn mismatched_table_is_an_internal_error() {
        let lexer = lexer();
        let table = ParseTable::new(1, 7, 1, Vec::new());
        let err = Parser::new(&table)
            .run(&mut lexer.begin("1"), &mut Sum)
            .unwrap_err();
        assert!(matches!(err, ParseError::Internal(_)));
    }
}
