//! Lexer automata: the dense transition table and the runtime NFA.
//!
//! Both implement [`Automaton`], the seam the lexer scans through. A pattern
//! index returned by [`Automaton::accept`] identifies which registered
//! pattern (terminal or ignore pattern) the current state accepts; lower
//! indices were registered earlier and win ties.

use crate::error::TableError;
use serde::{Deserialize, Serialize};

/// Failure sentinel in [`TransitionTable`] rows.
pub const DEAD: u32 = u32::MAX;

const ASCII: usize = 128;

/// A character-driven automaton with an optional accept decision per state.
pub trait Automaton {
    type State: Clone + std::fmt::Debug;

    /// The initial state.
    fn start(&self) -> Self::State;

    /// The successor of `state` on `c`, or `None` when no match can continue.
    fn step(&self, state: &Self::State, c: char) -> Option<Self::State>;

    /// The pattern accepted in `state`, if any.
    fn accept(&self, state: &Self::State) -> Option<usize>;
}

/// A dense DFA over a partitioned alphabet.
///
/// Characters are first mapped to a character class (a maximal range of code
/// points on which every transition agrees), then `next[state * classes +
/// class]` gives the successor or [`DEAD`]. State 0 is the start state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    /// First code point of every class, strictly increasing, starting at 0.
    class_starts: Vec<u32>,
    next: Vec<u32>,
    accept: Vec<Option<u32>>,
    #[serde(skip)]
    ascii: Vec<u32>,
}

impl TransitionTable {
    /// Builds a table from its raw parts, checking that they are consistent.
    pub fn new(
        class_starts: Vec<u32>,
        next: Vec<u32>,
        accept: Vec<Option<u32>>,
    ) -> Result<Self, TableError> {
        let mut table = Self {
            class_starts,
            next,
            accept,
            ascii: Vec::new(),
        };
        table.validate()?;
        table.index_ascii();
        Ok(table)
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.class_starts.first() != Some(&0) {
            return Err(TableError::Malformed(
                "character classes must start at code point 0".into(),
            ));
        }
        if self.class_starts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TableError::Malformed(
                "character classes are not strictly increasing".into(),
            ));
        }
        let states = self.accept.len();
        if states == 0 {
            return Err(TableError::Malformed("table has no states".into()));
        }
        if self.next.len() != states * self.class_starts.len() {
            return Err(TableError::Malformed(format!(
                "expected {} transitions for {} states x {} classes, found {}",
                states * self.class_starts.len(),
                states,
                self.class_starts.len(),
                self.next.len()
            )));
        }
        if let Some(bad) = self
            .next
            .iter()
            .find(|&&s| s != DEAD && s as usize >= states)
        {
            return Err(TableError::Malformed(format!(
                "transition to unknown state {bad}"
            )));
        }
        Ok(())
    }

    fn index_ascii(&mut self) {
        self.ascii = (0..ASCII as u32)
            .map(|cp| self.lookup_class(cp) as u32)
            .collect();
    }

    fn lookup_class(&self, cp: u32) -> usize {
        self.class_starts
            .partition_point(|&s| s <= cp)
            .saturating_sub(1)
    }

    /// Character class of `c`.
    #[inline]
    pub fn class_of(&self, c: char) -> usize {
        let cp = c as u32;
        match self.ascii.get(cp as usize) {
            Some(&class) => class as usize,
            None => self.lookup_class(cp),
        }
    }

    pub fn state_count(&self) -> usize {
        self.accept.len()
    }

    pub fn class_count(&self) -> usize {
        self.class_starts.len()
    }

    pub fn class_starts(&self) -> &[u32] {
        &self.class_starts
    }

    /// Raw successor of `state` on class `class`, possibly [`DEAD`].
    #[inline]
    pub fn next_state(&self, state: u32, class: usize) -> u32 {
        self.next[state as usize * self.class_starts.len() + class]
    }

    pub fn accept_of(&self, state: u32) -> Option<usize> {
        self.accept
            .get(state as usize)
            .copied()
            .flatten()
            .map(|p| p as usize)
    }

    /// Largest pattern index any state accepts.
    pub fn max_pattern(&self) -> Option<usize> {
        self.accept.iter().flatten().max().map(|&p| p as usize)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TableError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let mut table: Self = postcard::from_bytes(bytes)?;
        table.validate()?;
        table.index_ascii();
        Ok(table)
    }
}

impl Automaton for TransitionTable {
    type State = u32;

    #[inline]
    fn start(&self) -> u32 {
        0
    }

    #[inline]
    fn step(&self, state: &u32, c: char) -> Option<u32> {
        match self.next_state(*state, self.class_of(c)) {
            DEAD => None,
            s => Some(s),
        }
    }

    #[inline]
    fn accept(&self, state: &u32) -> Option<usize> {
        self.accept_of(*state)
    }
}

/// One state of an [`Nfa`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfaState {
    /// Inclusive character ranges and their targets.
    pub ranges: Vec<(char, char, u32)>,
    /// Epsilon targets.
    pub epsilon: Vec<u32>,
    /// Pattern accepted in this state.
    pub accept: Option<u32>,
}

/// A non-deterministic automaton with character-range and epsilon edges.
///
/// Used directly by the lexer when no dense table is wanted, and as the input
/// of subset construction. A runtime state is the sorted, epsilon-closed set
/// of NFA states reached so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: u32,
}

impl Nfa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self) -> u32 {
        self.states.push(NfaState::default());
        (self.states.len() - 1) as u32
    }

    pub fn add_range(&mut self, from: u32, lo: char, hi: char, to: u32) {
        self.states[from as usize].ranges.push((lo, hi, to));
    }

    pub fn add_epsilon(&mut self, from: u32, to: u32) {
        self.states[from as usize].epsilon.push(to);
    }

    pub fn set_accept(&mut self, state: u32, pattern: u32) {
        self.states[state as usize].accept = Some(pattern);
    }

    pub fn set_start(&mut self, state: u32) {
        self.start = state;
    }

    pub fn start_state(&self) -> u32 {
        self.start
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Largest pattern index any state accepts.
    pub fn max_pattern(&self) -> Option<usize> {
        self.states
            .iter()
            .filter_map(|s| s.accept)
            .max()
            .map(|p| p as usize)
    }

    /// Epsilon closure of `seeds`, sorted and deduplicated.
    pub fn closure(&self, seeds: impl IntoIterator<Item = u32>) -> Vec<u32> {
        let mut seen = vec![false; self.states.len()];
        let mut stack: Vec<u32> = seeds.into_iter().collect();
        let mut out = Vec::new();
        while let Some(s) = stack.pop() {
            if std::mem::replace(&mut seen[s as usize], true) {
                continue;
            }
            out.push(s);
            stack.extend(self.states[s as usize].epsilon.iter().copied());
        }
        out.sort_unstable();
        out
    }

    /// States reached from `set` on `c`, before closure.
    pub fn targets<'a>(&'a self, set: &'a [u32], c: char) -> impl Iterator<Item = u32> + 'a {
        set.iter().flat_map(move |&s| {
            self.states[s as usize]
                .ranges
                .iter()
                .filter(move |&&(lo, hi, _)| lo <= c && c <= hi)
                .map(|&(_, _, t)| t)
        })
    }

    /// Lowest pattern accepted by any state of `set`.
    pub fn accept_of(&self, set: &[u32]) -> Option<usize> {
        set.iter()
            .filter_map(|&s| self.states[s as usize].accept)
            .min()
            .map(|p| p as usize)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TableError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let nfa: Self = postcard::from_bytes(bytes)?;
        let n = nfa.states.len() as u32;
        if n == 0 || nfa.start >= n {
            return Err(TableError::Malformed("NFA start state out of range".into()));
        }
        let dangling = nfa.states.iter().any(|s| {
            s.epsilon.iter().any(|&t| t >= n) || s.ranges.iter().any(|&(_, _, t)| t >= n)
        });
        if dangling {
            return Err(TableError::Malformed("NFA edge to unknown state".into()));
        }
        Ok(nfa)
    }
}

impl Automaton for Nfa {
    type State = Vec<u32>;

    fn start(&self) -> Vec<u32> {
        if self.states.is_empty() {
            return Vec::new();
        }
        self.closure([self.start])
    }

    fn step(&self, state: &Vec<u32>, c: char) -> Option<Vec<u32>> {
        let next = self.closure(self.targets(state, c).collect::<Vec<_>>());
        if next.is_empty() { None } else { Some(next) }
    }

    fn accept(&self, state: &Vec<u32>) -> Option<usize> {
        self.accept_of(state)
    }
}

/// The automaton a lexer scans with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexerAutomaton {
    /// Precompiled dense table, one lookup per character.
    Tabular(TransitionTable),
    /// Direct NFA walk, no precompiled table.
    Nfa(Nfa),
}

impl LexerAutomaton {
    pub fn max_pattern(&self) -> Option<usize> {
        match self {
            LexerAutomaton::Tabular(t) => t.max_pattern(),
            LexerAutomaton::Nfa(n) => n.max_pattern(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `[0-9]+` as pattern 0, `[a-z]+` as pattern 1.
    fn digits_and_words() -> TransitionTable {
        // classes: [0,'0') ['0','9'] (':','a') ['a','z'] ('z',..]
        let starts = vec![0, '0' as u32, ':' as u32, 'a' as u32, '{' as u32];
        #[rustfmt::skip]
        let next = vec![
            DEAD, 1, DEAD, 2, DEAD,
            DEAD, 1, DEAD, DEAD, DEAD,
            DEAD, DEAD, DEAD, 2, DEAD,
        ];
        TransitionTable::new(starts, next, vec![None, Some(0), Some(1)]).unwrap()
    }

    fn run<A: Automaton>(a: &A, s: &str) -> Option<usize> {
        let mut state = a.start();
        for c in s.chars() {
            state = a.step(&state, c)?;
        }
        a.accept(&state)
    }

    #[test]
    fn class_lookup_uses_ascii_and_binary_search() {
        let t = digits_and_words();
        assert_eq!(t.class_of('\0'), 0);
        assert_eq!(t.class_of('5'), 1);
        assert_eq!(t.class_of('q'), 3);
        assert_eq!(t.class_of('ж'), 4);
        assert_eq!(t.class_of(char::MAX), 4);
    }

    #[test]
    fn table_steps_and_accepts() {
        let t = digits_and_words();
        assert_eq!(run(&t, "123"), Some(0));
        assert_eq!(run(&t, "abc"), Some(1));
        assert_eq!(run(&t, "a1"), None);
        assert_eq!(run(&t, ""), None);
        assert_eq!(t.max_pattern(), Some(1));
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert!(matches!(
            TransitionTable::new(vec![1], vec![DEAD], vec![None]),
            Err(TableError::Malformed(_))
        ));
        assert!(matches!(
            TransitionTable::new(vec![0], vec![DEAD, DEAD], vec![None]),
            Err(TableError::Malformed(_))
        ));
        assert!(matches!(
            TransitionTable::new(vec![0], vec![7], vec![None]),
            Err(TableError::Malformed(_))
        ));
    }

    #[test]
    fn table_bytes_round_trip() {
        let t = digits_and_words();
        let bytes = t.to_bytes().unwrap();
        let back = TransitionTable::from_bytes(&bytes).unwrap();
        assert_eq!(back, t);
        assert_eq!(run(&back, "42"), Some(0));
    }

    #[test]
    fn nfa_prefers_lowest_pattern() {
        // "if" as pattern 0, [a-z]+ as pattern 1
        let mut nfa = Nfa::new();
        let start = nfa.add_state();
        let i = nfa.add_state();
        let f = nfa.add_state();
        let w = nfa.add_state();
        nfa.add_range(start, 'i', 'i', i);
        nfa.add_range(i, 'f', 'f', f);
        nfa.set_accept(f, 0);
        let w0 = nfa.add_state();
        nfa.add_epsilon(start, w0);
        nfa.add_range(w0, 'a', 'z', w);
        nfa.add_epsilon(w, w0);
        nfa.set_accept(w, 1);
        nfa.set_start(start);

        assert_eq!(run(&nfa, "if"), Some(0));
        assert_eq!(run(&nfa, "iff"), Some(1));
        assert_eq!(run(&nfa, "i"), Some(1));
        assert_eq!(run(&nfa, "9"), None);
        assert_eq!(nfa.max_pattern(), Some(1));
    }

    #[test]
    fn nfa_closure_is_sorted_and_deduplicated() {
        let mut nfa = Nfa::new();
        let a = nfa.add_state();
        let b = nfa.add_state();
        let c = nfa.add_state();
        nfa.add_epsilon(a, c);
        nfa.add_epsilon(a, b);
        nfa.add_epsilon(b, c);
        nfa.add_epsilon(c, a);
        assert_eq!(nfa.closure([a]), vec![0, 1, 2]);
    }

    #[test]
    fn nfa_bytes_reject_dangling_edges() {
        let mut nfa = Nfa::new();
        let a = nfa.add_state();
        nfa.add_epsilon(a, 5);
        let bytes = nfa.to_bytes().unwrap();
        assert!(matches!(Nfa::from_bytes(&bytes), Err(TableError::Malformed(_))));
    }
}
