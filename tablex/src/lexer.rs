//! Maximal-munch lexer driven by an [`Automaton`].
//!
//! A [`Lexer`] owns its automaton and the table of registered patterns and
//! is immutable; [`Lexer::begin`] starts a [`LexerSession`] over one input
//! string. The session scans ahead from the cursor, remembering the last
//! accepting position, and emits a token there once the automaton can no
//! longer advance. Patterns without a token kind (ignore patterns) are
//! matched the same way and dropped. After the input is exhausted the
//! session yields a single end token and then stops.

use crate::automaton::{Automaton, LexerAutomaton};
use crate::cursor::{LexerCursor, Span};
use crate::error::LexicalError;
use crate::token::LexedToken;
use smartstring::alias::String;
use std::iter::FusedIterator;
use std::sync::Arc;

/// Converts matched text into a semantic value.
pub type Conversion<T> = Arc<dyn Fn(&str) -> T + Send + Sync>;

/// Name of the synthetic end-of-input token kind.
pub const END_NAME: &str = "$end";

/// What the lexer does when a pattern matches.
pub struct PatternDef<T> {
    /// Emitted token kind, or `None` to discard the match.
    pub kind: Option<usize>,
    pub convert: Option<Conversion<T>>,
}

impl<T> Clone for PatternDef<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            convert: self.convert.clone(),
        }
    }
}

impl<T> std::fmt::Debug for PatternDef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternDef")
            .field("kind", &self.kind)
            .field("convert", &self.convert.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexerStats {
    /// Characters fed to the automaton.
    pub chars: usize,
    /// Successful matches, including discarded ones.
    pub matches: usize,
    /// Characters scanned past the end of a match and scanned again.
    pub backtracked: usize,
}

/// An immutable, shareable lexer.
pub struct Lexer<T> {
    automaton: Arc<LexerAutomaton>,
    patterns: Arc<[PatternDef<T>]>,
    names: Arc<[String]>,
}

impl<T> Clone for Lexer<T> {
    fn clone(&self) -> Self {
        Self {
            automaton: Arc::clone(&self.automaton),
            patterns: Arc::clone(&self.patterns),
            names: Arc::clone(&self.names),
        }
    }
}

impl<T> std::fmt::Debug for Lexer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("automaton", &self.automaton)
            .field("patterns", &self.patterns)
            .field("names", &self.names)
            .finish()
    }
}

impl<T> Lexer<T> {
    /// Creates a lexer.
    ///
    /// `patterns[i]` describes what to do when the automaton accepts pattern
    /// `i`; `names[k]` names token kind `k`. The end token's kind is
    /// `names.len()`.
    pub fn new(
        automaton: LexerAutomaton,
        patterns: Vec<PatternDef<T>>,
        names: Vec<String>,
    ) -> Result<Self, crate::TableError> {
        if let Some(max) = automaton.max_pattern()
            && max >= patterns.len()
        {
            return Err(crate::TableError::Malformed(format!(
                "automaton accepts pattern {max} but only {} patterns are defined",
                patterns.len()
            )));
        }
        if let Some(kind) = patterns
            .iter()
            .filter_map(|p| p.kind)
            .find(|&k| k >= names.len())
        {
            return Err(crate::TableError::Malformed(format!(
                "pattern emits unknown token kind {kind}"
            )));
        }
        Ok(Self {
            automaton: Arc::new(automaton),
            patterns: patterns.into(),
            names: names.into(),
        })
    }

    pub fn automaton(&self) -> &LexerAutomaton {
        &self.automaton
    }

    pub fn patterns(&self) -> &[PatternDef<T>] {
        &self.patterns
    }

    /// Kind of the synthetic end token.
    pub fn end_kind(&self) -> usize {
        self.names.len()
    }

    /// Number of token kinds, the end kind included.
    pub fn kind_count(&self) -> usize {
        self.names.len() + 1
    }

    /// Display name of a token kind.
    pub fn token_name(&self, kind: usize) -> &str {
        match self.names.get(kind) {
            Some(name) => name.as_str(),
            None => END_NAME,
        }
    }

    /// Starts lexing `input`.
    pub fn begin<'a>(&'a self, input: &'a str) -> LexerSession<'a, T> {
        LexerSession {
            lexer: self,
            input,
            cursor: LexerCursor::new(),
            end_flag: false,
            failed: false,
            stats: LexerStats::default(),
        }
    }
}

impl<T: Default> Lexer<T> {
    /// Lexes all of `input`, the end token included.
    pub fn tokenize(&self, input: &str) -> Result<Vec<LexedToken<T>>, LexicalError> {
        let mut session = self.begin(input);
        let mut tokens = Vec::new();
        while let Some(t) = session.try_next()? {
            tokens.push(t);
        }
        Ok(tokens)
    }
}

/// Outcome of one scan: accepted pattern, matched bytes, matched chars.
#[derive(Debug, Clone, Copy)]
struct Match {
    pattern: usize,
    bytes: usize,
    chars: usize,
}

/// Per-input lexing state.
///
/// A session borrows its lexer and is restartable only by calling
/// [`Lexer::begin`] again.
pub struct LexerSession<'a, T> {
    lexer: &'a Lexer<T>,
    input: &'a str,
    cursor: LexerCursor,
    end_flag: bool,
    failed: bool,
    stats: LexerStats,
}

impl<'a, T> LexerSession<'a, T> {
    pub fn lexer(&self) -> &'a Lexer<T> {
        self.lexer
    }

    pub fn stats(&self) -> LexerStats {
        self.stats.clone()
    }

    pub fn cursor(&self) -> &LexerCursor {
        &self.cursor
    }

    fn try_match(&mut self) -> Result<Match, LexicalError> {
        let lexer = self.lexer;
        match lexer.automaton.as_ref() {
            LexerAutomaton::Tabular(table) => self.scan(table),
            LexerAutomaton::Nfa(nfa) => self.scan(nfa),
        }
    }

    fn scan<A: Automaton>(&mut self, automaton: &A) -> Result<Match, LexicalError> {
        let rest = &self.input[self.cursor.byte_offset..];
        let mut state = automaton.start();
        log::trace!("START: offset={}, s={:?}", self.cursor.offset, state);
        let mut last_match = None;
        let mut chars = 0;

        for (i, c) in rest.char_indices() {
            self.stats.chars += 1;
            match automaton.step(&state, c) {
                Some(next) => {
                    state = next;
                    chars += 1;
                    if let Some(pattern) = automaton.accept(&state) {
                        log::trace!("MATCH: i={}, c={:?}, p={}, s={:?}", i, c, pattern, state);
                        last_match = Some(Match {
                            pattern,
                            bytes: i + c.len_utf8(),
                            chars,
                        });
                    }
                }
                None => {
                    log::trace!("DEAD: i={}, c={:?}, s={:?}", i, c, state);
                    break;
                }
            }
        }

        match last_match {
            Some(m) => {
                self.stats.matches += 1;
                self.stats.backtracked += chars - m.chars;
                Ok(m)
            }
            None => Err(LexicalError {
                offset: self.cursor.offset,
                position: self.cursor.position,
                found: rest.chars().next().unwrap_or_default(),
            }),
        }
    }
}

impl<'a, T: Default> LexerSession<'a, T> {
    /// Returns the next token, the end token once input is exhausted, and
    /// `None` afterwards.
    pub fn try_next(&mut self) -> Result<Option<LexedToken<T>>, LexicalError> {
        if self.end_flag || self.failed {
            return Ok(None);
        }

        while self.cursor.byte_offset < self.input.len() {
            let m = match self.try_match() {
                Ok(m) => m,
                Err(e) => {
                    self.failed = true;
                    return Err(e);
                }
            };
            let start = self.cursor.clone();
            let text = &self.input[start.byte_offset..start.byte_offset + m.bytes];
            self.cursor.advance_str(text);

            let def = &self.lexer.patterns[m.pattern];
            let Some(kind) = def.kind else {
                log::trace!("SKIP: pattern={}, text={:?}", m.pattern, text);
                continue;
            };
            let value = match &def.convert {
                Some(f) => f(text),
                None => T::default(),
            };
            let token = LexedToken {
                kind,
                text: text.into(),
                value,
                offset: start.offset,
                length: m.chars,
                span: Span::new(start.position, self.cursor.position),
            };
            log::trace!("TOKEN: {} {}", self.lexer.token_name(kind), token);
            return Ok(Some(token));
        }

        self.end_flag = true;
        Ok(Some(LexedToken {
            kind: self.lexer.end_kind(),
            text: String::new(),
            value: T::default(),
            offset: self.cursor.offset,
            length: 0,
            span: Span::at(self.cursor.position),
        }))
    }
}

impl<'a, T: Default> Iterator for LexerSession<'a, T> {
    type Item = Result<LexedToken<T>, LexicalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().transpose()
    }
}

impl<'a, T: Default> FusedIterator for LexerSession<'a, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{DEAD, Nfa, TransitionTable};
    use crate::cursor::Position;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Patterns: 0 = `[0-9]+` (kind 0, parsed), 1 = `[a-z]+` (kind 1),
    /// 2 = `[ \n]+` (ignored).
    fn table() -> TransitionTable {
        // classes: [0,'\n') '\n' ('\n',' ') ' ' (' ','0') ['0','9'] (':','a') ['a','z'] ('z',..]
        let starts = vec![
            0,
            '\n' as u32,
            '\n' as u32 + 1,
            ' ' as u32,
            ' ' as u32 + 1,
            '0' as u32,
            ':' as u32,
            'a' as u32,
            '{' as u32,
        ];
        #[rustfmt::skip]
        let next = vec![
            DEAD, 3,    DEAD, 3,    DEAD, 1,    DEAD, 2,    DEAD,
            DEAD, DEAD, DEAD, DEAD, DEAD, 1,    DEAD, DEAD, DEAD,
            DEAD, DEAD, DEAD, DEAD, DEAD, DEAD, DEAD, 2,    DEAD,
            DEAD, 3,    DEAD, 3,    DEAD, DEAD, DEAD, DEAD, DEAD,
        ];
        TransitionTable::new(starts, next, vec![None, Some(0), Some(1), Some(2)]).unwrap()
    }

    fn nfa() -> Nfa {
        let mut nfa = Nfa::new();
        let start = nfa.add_state();
        for (pattern, ranges) in [
            (0, vec![('0', '9')]),
            (1, vec![('a', 'z')]),
            (2, vec![(' ', ' '), ('\n', '\n')]),
        ] {
            let body = nfa.add_state();
            let done = nfa.add_state();
            nfa.add_epsilon(start, body);
            for (lo, hi) in ranges {
                nfa.add_range(body, lo, hi, done);
            }
            nfa.add_epsilon(done, body);
            nfa.set_accept(done, pattern);
        }
        nfa.set_start(start);
        nfa
    }

    fn lexer(automaton: LexerAutomaton) -> Lexer<i64> {
        let parse: Conversion<i64> = Arc::new(|s: &str| s.parse().unwrap_or_default());
        Lexer::new(
            automaton,
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
            vec!["num".into(), "word".into()],
        )
        .unwrap()
    }

    fn kinds_and_text(lexer: &Lexer<i64>, input: &str) -> Vec<(usize, std::string::String)> {
        lexer
            .tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    #[test]
    fn emits_tokens_and_end_marker() {
        init_logger();
        let lexer = lexer(LexerAutomaton::Tabular(table()));
        let tokens = lexer.tokenize("abc 123\nxy").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].value, 123);
        assert_eq!(tokens[1].offset, 4);
        assert_eq!(tokens[1].span, Span::new(Position::new(1, 4), Position::new(1, 7)));
        assert_eq!(tokens[2].text.as_str(), "xy");
        assert_eq!(tokens[2].span.start, Position::new(2, 0));
        assert_eq!(tokens[3].kind, lexer.end_kind());
        assert_eq!(tokens[3].offset, 10);
        assert_eq!(lexer.token_name(tokens[3].kind), END_NAME);
    }

    #[test]
    fn both_runtimes_agree() {
        init_logger();
        let tabular = lexer(LexerAutomaton::Tabular(table()));
        let walk = lexer(LexerAutomaton::Nfa(nfa()));
        for input in ["", "a1b2", "  42  foo\n\n7", "zz9"] {
            assert_eq!(
                kinds_and_text(&tabular, input),
                kinds_and_text(&walk, input),
                "{input:?}"
            );
        }
    }

    #[test]
    fn end_token_is_emitted_once() {
        let lexer = lexer(LexerAutomaton::Tabular(table()));
        let mut session = lexer.begin("");
        let end = session.try_next().unwrap().unwrap();
        assert_eq!(end.kind, lexer.end_kind());
        assert!(session.try_next().unwrap().is_none());
        assert!(session.next().is_none());
    }

    #[test]
    fn lexical_error_reports_position() {
        let lexer = lexer(LexerAutomaton::Nfa(nfa()));
        let mut session = lexer.begin("ab\n1 #");
        let err = session
            .by_ref()
            .find_map(|r| r.err())
            .expect("lexing should fail");
        assert_eq!(err.offset, 5);
        assert_eq!(err.position, Position::new(2, 2));
        assert_eq!(err.found, '#');
        assert!(session.next().is_none());
    }

    #[test]
    fn stats_count_matches_and_chars() {
        let lexer = lexer(LexerAutomaton::Tabular(table()));
        let mut session = lexer.begin("ab 12");
        while session.try_next().unwrap().is_some() {}
        let stats = session.stats();
        assert_eq!(stats.matches, 3);
        // each match stops one character past its end, except the last
        assert_eq!(stats.chars, 7);
        assert_eq!(stats.backtracked, 0);
    }

    #[test]
    fn rejects_patterns_the_automaton_cannot_name() {
        let err = Lexer::<i64>::new(LexerAutomaton::Tabular(table()), Vec::new(), Vec::new());
        assert!(err.is_err());
    }
}
