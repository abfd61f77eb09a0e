//! FIRST/FOLLOW sets and reduce lookaheads (LALR(1) or SLR(1)).
//!
//! Terminals are numbered by [`TerminalId`](crate::grammar::TerminalId)
//! index; the end-of-input marker is `grammar.end_terminal()`.

use crate::grammar::{Grammar, RuleId, Symbol};
use crate::lr0::{Collection, Item};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};

/// How reduce lookaheads are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookaheadMode {
    /// LALR(1): LR(1) lookaheads merged over states with the same core.
    #[default]
    Lalr,
    /// SLR(1): FOLLOW of the rule's left-hand side.
    Slr,
}

/// For each state, the lookahead set of every complete rule.
pub type Lookaheads = Vec<BTreeMap<usize, BTreeSet<usize>>>;

/// FIRST sets and nullability, per non-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSets {
    pub first: Vec<BTreeSet<usize>>,
    pub nullable: Vec<bool>,
}

impl FirstSets {
    /// FIRST of a symbol sequence and whether the whole sequence is nullable.
    pub fn of_seq(&self, seq: &[Symbol]) -> (BTreeSet<usize>, bool) {
        let mut out = BTreeSet::new();
        for sym in seq {
            match *sym {
                Symbol::Term(t) => {
                    out.insert(t.0);
                    return (out, false);
                }
                Symbol::NonTerm(n) => {
                    out.extend(self.first[n.0].iter().copied());
                    if !self.nullable[n.0] {
                        return (out, false);
                    }
                }
            }
        }
        (out, true)
    }
}

/// Computes FIRST sets and nullability by fixpoint iteration.
pub fn first_sets<T>(grammar: &Grammar<T>) -> FirstSets {
    let n = grammar.nonterminals().len();
    let mut sets = FirstSets {
        first: vec![BTreeSet::new(); n],
        nullable: vec![false; n],
    };
    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules() {
            let lhs = rule.lhs.0;
            let (first, nullable) = sets.of_seq(&rule.rhs);
            let before = sets.first[lhs].len();
            sets.first[lhs].extend(first);
            if sets.first[lhs].len() != before {
                changed = true;
            }
            if nullable && !sets.nullable[lhs] {
                sets.nullable[lhs] = true;
                changed = true;
            }
        }
    }
    sets
}

/// Computes FOLLOW sets per non-terminal; the augmented symbol is followed
/// by end of input.
pub fn follow_sets<T>(grammar: &Grammar<T>, first: &FirstSets) -> Vec<BTreeSet<usize>> {
    let mut follow: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); grammar.nonterminals().len()];
    follow[grammar.augmented().0].insert(grammar.end_terminal());
    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules() {
            let lhs = rule.lhs.0;
            for (i, sym) in rule.rhs.iter().enumerate() {
                let Symbol::NonTerm(b) = *sym else { continue };
                let (first_beta, beta_nullable) = first.of_seq(&rule.rhs[i + 1..]);
                let before = follow[b.0].len();
                follow[b.0].extend(first_beta);
                if beta_nullable {
                    let follow_lhs = follow[lhs].clone();
                    follow[b.0].extend(follow_lhs);
                }
                if follow[b.0].len() != before {
                    changed = true;
                }
            }
        }
    }
    follow
}

/// SLR(1): a complete rule reduces on FOLLOW of its left-hand side.
pub fn slr_lookaheads<T>(
    grammar: &Grammar<T>,
    collection: &Collection,
    follow: &[BTreeSet<usize>],
) -> Lookaheads {
    collection
        .states
        .iter()
        .map(|state| {
            state
                .iter()
                .filter(|item| item.is_complete(grammar))
                .map(|item| {
                    let lhs = grammar.rule(RuleId(item.rule)).lhs.0;
                    (item.rule, follow[lhs].clone())
                })
                .collect()
        })
        .collect()
}

/// LR(1) closure of items carrying lookahead sets.
fn closure1<T>(
    grammar: &Grammar<T>,
    first: &FirstSets,
    kernel: impl IntoIterator<Item = (Item, BTreeSet<usize>)>,
) -> BTreeMap<Item, BTreeSet<usize>> {
    let mut items: BTreeMap<Item, BTreeSet<usize>> = BTreeMap::new();
    let mut work = Vec::new();
    for (item, la) in kernel {
        items.entry(item).or_default().extend(la);
        work.push(item);
    }
    while let Some(item) = work.pop() {
        let rule = grammar.rule(RuleId(item.rule));
        let Some(&Symbol::NonTerm(b)) = rule.rhs.get(item.dot) else {
            continue;
        };
        let (mut add, nullable) = first.of_seq(&rule.rhs[item.dot + 1..]);
        if nullable {
            add.extend(items[&item].iter().copied());
        }
        for &r in &grammar.nonterminals()[b.0].rules {
            let new_item = Item { rule: r.0, dot: 0 };
            let entry = items.entry(new_item);
            let is_new = matches!(entry, std::collections::btree_map::Entry::Vacant(_));
            let set = entry.or_default();
            let before = set.len();
            set.extend(add.iter().copied());
            if is_new || set.len() != before {
                work.push(new_item);
            }
        }
    }
    items
}

/// LALR(1) lookaheads by spontaneous generation and propagation over the
/// LR(0) kernels.
pub fn lalr_lookaheads<T>(
    grammar: &Grammar<T>,
    collection: &Collection,
    first: &FirstSets,
) -> Lookaheads {
    let end = grammar.end_terminal();
    let dummy = end + 1;
    let n_states = collection.len();

    let mut kernels: Vec<IndexMap<Item, BTreeSet<usize>>> = (0..n_states)
        .map(|s| {
            collection
                .kernel(s, grammar)
                .into_iter()
                .map(|item| (item, BTreeSet::new()))
                .collect()
        })
        .collect();
    kernels[0]
        .entry(Item {
            rule: grammar.augmented_rule().0,
            dot: 0,
        })
        .or_default()
        .insert(end);

    // (from state, kernel index) → [(to state, kernel index)]
    let mut propagate: Vec<Vec<Vec<(usize, usize)>>> =
        kernels.iter().map(|k| vec![Vec::new(); k.len()]).collect();

    for state in 0..n_states {
        let kernel: Vec<Item> = kernels[state].keys().copied().collect();
        for (ki, &k) in kernel.iter().enumerate() {
            let j = closure1(grammar, first, [(k, BTreeSet::from([dummy]))]);
            for (item, las) in &j {
                let Some(sym) = item.next_symbol(grammar) else {
                    continue;
                };
                let Some(&target) = collection.transitions[state].get(&sym) else {
                    continue;
                };
                let advanced = item.advance();
                let Some(ti) = kernels[target].get_index_of(&advanced) else {
                    continue;
                };
                for &a in las {
                    if a == dummy {
                        propagate[state][ki].push((target, ti));
                    } else {
                        kernels[target][ti].insert(a);
                    }
                }
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for state in 0..n_states {
            for ki in 0..kernels[state].len() {
                let las = kernels[state][ki].clone();
                for &(target, ti) in &propagate[state][ki] {
                    let set = &mut kernels[target][ti];
                    let before = set.len();
                    set.extend(las.iter().copied());
                    if set.len() != before {
                        changed = true;
                    }
                }
            }
        }
    }

    kernels
        .into_iter()
        .map(|kernel| {
            closure1(grammar, first, kernel)
                .into_iter()
                .filter(|(item, _)| item.is_complete(grammar))
                .fold(BTreeMap::new(), |mut acc, (item, las)| {
                    acc.entry(item.rule)
                        .or_insert_with(BTreeSet::new)
                        .extend(las);
                    acc
                })
        })
        .collect()
}

/// Reduce lookaheads for `mode`.
pub fn compute<T>(grammar: &Grammar<T>, collection: &Collection, mode: LookaheadMode) -> Lookaheads {
    let first = first_sets(grammar);
    match mode {
        LookaheadMode::Lalr => lalr_lookaheads(grammar, collection, &first),
        LookaheadMode::Slr => {
            let follow = follow_sets(grammar, &first);
            slr_lookaheads(grammar, collection, &follow)
        }
    }
}
