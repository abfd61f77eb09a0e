//! LR(0) items and the canonical collection of item sets.

use crate::grammar::{Grammar, RuleId, Symbol};
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet};

/// An LR(0) item: a rule with a dot before `rhs[dot]`.
///
/// `dot == rhs.len()` means the rule is complete.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Item {
    pub rule: usize,
    pub dot: usize,
}

impl Item {
    /// The symbol right after the dot, if any.
    pub fn next_symbol<T>(&self, grammar: &Grammar<T>) -> Option<Symbol> {
        grammar.rule(RuleId(self.rule)).rhs.get(self.dot).copied()
    }

    pub fn is_complete<T>(&self, grammar: &Grammar<T>) -> bool {
        self.dot >= grammar.rule(RuleId(self.rule)).rhs.len()
    }

    pub fn advance(&self) -> Item {
        Item {
            rule: self.rule,
            dot: self.dot + 1,
        }
    }
}

/// A set of LR(0) items.
pub type ItemSet = BTreeSet<Item>;

/// Adds `B → •γ` for every item with a non-terminal `B` after the dot,
/// until nothing changes.
pub fn closure<T>(items: &ItemSet, grammar: &Grammar<T>) -> ItemSet {
    let mut c = items.clone();
    let mut stack: Vec<Item> = items.iter().copied().collect();
    while let Some(item) = stack.pop() {
        if let Some(Symbol::NonTerm(b)) = item.next_symbol(grammar) {
            for &r in &grammar.nonterminals()[b.0].rules {
                let new_item = Item { rule: r.0, dot: 0 };
                if c.insert(new_item) {
                    stack.push(new_item);
                }
            }
        }
    }
    c
}

/// Items of `items` advanced past `sym`, closed.
pub fn goto<T>(items: &ItemSet, sym: Symbol, grammar: &Grammar<T>) -> ItemSet {
    let moved: ItemSet = items
        .iter()
        .filter(|item| item.next_symbol(grammar) == Some(sym))
        .map(Item::advance)
        .collect();
    closure(&moved, grammar)
}

/// The canonical collection: states in breadth-first discovery order
/// (state 0 is the closure of `'S → •S`) and their goto edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub states: IndexSet<ItemSet>,
    pub transitions: Vec<BTreeMap<Symbol, usize>>,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Kernel items of `state`: those with the dot past the start, plus the
    /// augmented start item.
    pub fn kernel<T>(&self, state: usize, grammar: &Grammar<T>) -> Vec<Item> {
        let augmented = grammar.augmented_rule().0;
        self.states[state]
            .iter()
            .filter(|item| item.dot > 0 || item.rule == augmented)
            .copied()
            .collect()
    }
}

/// Builds the canonical collection of LR(0) item sets.
pub fn construct_set<T>(grammar: &Grammar<T>) -> Collection {
    let start = ItemSet::from([Item {
        rule: grammar.augmented_rule().0,
        dot: 0,
    }]);
    let mut states = IndexSet::new();
    states.insert(closure(&start, grammar));
    let mut transitions = Vec::new();

    let mut i = 0;
    while i < states.len() {
        let state = states[i].clone();
        let symbols: BTreeSet<Symbol> = state
            .iter()
            .filter_map(|item| item.next_symbol(grammar))
            .collect();
        let mut edges = BTreeMap::new();
        for sym in symbols {
            let nxt = goto(&state, sym, grammar);
            let (j, _) = states.insert_full(nxt);
            edges.insert(sym, j);
        }
        transitions.push(edges);
        i += 1;
    }
    log::debug!("LR(0) collection: {} states", states.len());
    Collection {
        states,
        transitions,
    }
}
