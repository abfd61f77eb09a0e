//! Subset construction and minimization of the lexer DFA.
//!
//! The pipeline is [`alphabet`] → [`subset`] → [`minimize`] →
//! [`Dfa::into_table`]; [`build_table`] runs all of it. A [`Dfa`] is
//! itself an [`Automaton`], so the intermediate results can be run and
//! compared directly.

use crate::error::ConfigError;
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeSet, VecDeque};
use tablex::{Automaton, DEAD, Nfa, TransitionTable};

const MAX_CODE_POINT: u32 = char::MAX as u32;

/// A DFA over a partitioned alphabet. State 0 is the start state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    /// First code point of every character class.
    pub class_starts: Vec<u32>,
    /// `next[state][class]`, [`DEAD`] for no transition.
    pub next: Vec<Vec<u32>>,
    /// Pattern accepted by each state.
    pub accept: Vec<Option<u32>>,
}

impl Dfa {
    pub fn state_count(&self) -> usize {
        self.accept.len()
    }

    fn class_of(&self, c: char) -> usize {
        self.class_starts
            .partition_point(|&s| s <= c as u32)
            .saturating_sub(1)
    }

    /// Flattens into the runtime table.
    pub fn into_table(self) -> Result<TransitionTable, ConfigError> {
        let next = self.next.into_iter().flatten().collect();
        Ok(TransitionTable::new(self.class_starts, next, self.accept)?)
    }
}

impl Automaton for Dfa {
    type State = u32;

    fn start(&self) -> u32 {
        0
    }

    fn step(&self, state: &u32, c: char) -> Option<u32> {
        match self.next[*state as usize][self.class_of(c)] {
            DEAD => None,
            s => Some(s),
        }
    }

    fn accept(&self, state: &u32) -> Option<usize> {
        self.accept[*state as usize].map(|p| p as usize)
    }
}

/// Splits the code-point space into classes on which every NFA edge is
/// either fully inside or fully outside. Returns the first code point of
/// each class.
pub fn alphabet(nfa: &Nfa) -> Vec<u32> {
    let mut bounds = BTreeSet::from([0u32]);
    for state in nfa.states() {
        for &(lo, hi, _) in &state.ranges {
            bounds.insert(lo as u32);
            if (hi as u32) < MAX_CODE_POINT {
                bounds.insert(hi as u32 + 1);
            }
        }
    }
    bounds.into_iter().collect()
}

/// Subset construction. States are NFA state sets, interned in discovery
/// order; an accepting set takes the lowest pattern index it contains.
pub fn subset(nfa: &Nfa) -> Dfa {
    let class_starts = alphabet(nfa);
    let mut sets: IndexSet<Vec<u32>> = IndexSet::new();
    sets.insert(nfa.closure([nfa.start_state()]));

    let mut next = Vec::new();
    let mut accept = Vec::new();
    let mut i = 0;
    while i < sets.len() {
        let set = sets[i].clone();
        let mut row = Vec::with_capacity(class_starts.len());
        for &cp in &class_starts {
            let targets = set.iter().flat_map(|&s| {
                nfa.states()[s as usize]
                    .ranges
                    .iter()
                    .filter(move |&&(lo, hi, _)| lo as u32 <= cp && cp <= hi as u32)
                    .map(|&(_, _, t)| t)
            });
            let target = nfa.closure(targets.collect::<Vec<_>>());
            if target.is_empty() {
                row.push(DEAD);
            } else {
                let (j, _) = sets.insert_full(target);
                row.push(j as u32);
            }
        }
        next.push(row);
        accept.push(nfa.accept_of(&set).map(|p| p as u32));
        i += 1;
    }
    log::debug!(
        "DFA: {} states over {} character classes",
        sets.len(),
        class_starts.len()
    );
    Dfa {
        class_starts,
        next,
        accept,
    }
}

/// States from which some accepting state is reachable.
fn live_states(dfa: &Dfa) -> Vec<bool> {
    let n = dfa.state_count();
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (s, row) in dfa.next.iter().enumerate() {
        for &t in row {
            if t != DEAD {
                preds[t as usize].push(s);
            }
        }
    }
    let mut live: Vec<bool> = dfa.accept.iter().map(Option::is_some).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&s| live[s]).collect();
    while let Some(s) = queue.pop_front() {
        for &p in &preds[s] {
            if !live[p] {
                live[p] = true;
                queue.push_back(p);
            }
        }
    }
    live
}

/// Minimizes by Moore partition refinement.
///
/// States that cannot reach an accepting state are folded into [`DEAD`], so
/// a scan stops as soon as no longer match is possible. The result is
/// renumbered breadth-first from the start state.
pub fn minimize(dfa: &Dfa) -> Dfa {
    let live = live_states(dfa);
    let classes = dfa.class_starts.len();
    let target = |t: u32| -> u32 {
        if t != DEAD && live[t as usize] {
            t
        } else {
            DEAD
        }
    };

    // Refine blocks, starting from one block per accept decision.
    let mut block: Vec<u32> = {
        let mut ids: IndexMap<Option<u32>, u32> = IndexMap::new();
        dfa.accept
            .iter()
            .map(|a| {
                let n = ids.len() as u32;
                *ids.entry(*a).or_insert(n)
            })
            .collect()
    };
    let mut count = block.iter().collect::<BTreeSet<_>>().len();
    loop {
        let mut ids: IndexMap<(u32, Vec<u32>), u32> = IndexMap::new();
        let refined: Vec<u32> = (0..dfa.state_count())
            .map(|s| {
                let signature: Vec<u32> = dfa.next[s]
                    .iter()
                    .map(|&t| match target(t) {
                        DEAD => DEAD,
                        t => block[t as usize],
                    })
                    .collect();
                let n = ids.len() as u32;
                *ids.entry((block[s], signature)).or_insert(n)
            })
            .collect();
        let refined_count = ids.len();
        block = refined;
        if refined_count == count {
            break;
        }
        count = refined_count;
    }

    // Renumber breadth-first from the start block.
    let mut order: IndexSet<u32> = IndexSet::new();
    let mut queue = VecDeque::from([0usize]);
    order.insert(block[0]);
    let mut next = Vec::new();
    let mut accept = Vec::new();
    while let Some(s) = queue.pop_front() {
        let mut row = Vec::with_capacity(classes);
        for &t in &dfa.next[s] {
            match target(t) {
                DEAD => row.push(DEAD),
                t => {
                    let b = block[t as usize];
                    let idx = match order.get_index_of(&b) {
                        Some(idx) => idx,
                        None => {
                            queue.push_back(t as usize);
                            order.insert_full(b).0
                        }
                    };
                    row.push(idx as u32);
                }
            }
        }
        next.push(row);
        accept.push(dfa.accept[s]);
    }
    log::debug!(
        "minimized DFA: {} -> {} states",
        dfa.state_count(),
        next.len()
    );
    compress_classes(Dfa {
        class_starts: dfa.class_starts.clone(),
        next,
        accept,
    })
}

/// Merges adjacent character classes whose columns are identical.
fn compress_classes(dfa: Dfa) -> Dfa {
    let column = |k: usize| -> Vec<u32> { dfa.next.iter().map(|row| row[k]).collect() };
    let mut keep = vec![0usize];
    for k in 1..dfa.class_starts.len() {
        let last = keep[keep.len() - 1];
        if column(k) != column(last) {
            keep.push(k);
        }
    }
    if keep.len() == dfa.class_starts.len() {
        return dfa;
    }
    Dfa {
        class_starts: keep.iter().map(|&k| dfa.class_starts[k]).collect(),
        next: dfa
            .next
            .iter()
            .map(|row| keep.iter().map(|&k| row[k]).collect())
            .collect(),
        accept: dfa.accept,
    }
}

/// NFA → minimized transition table.
pub fn build_table(nfa: &Nfa) -> Result<TransitionTable, ConfigError> {
    minimize(&subset(nfa)).into_table()
}
