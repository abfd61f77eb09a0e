//! Fills the ACTION/GOTO tables from the LR(0) collection and lookaheads,
//! resolving conflicts with precedence and associativity.

use crate::grammar::{Associativity, Grammar, RuleId, Symbol};
use crate::lookahead::Lookaheads;
use crate::lr0::{Collection, Item};
use smartstring::alias::String;
use std::collections::BTreeSet;
use std::fmt;
use tablex::{ParseTable, ParserAction, RuleInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::ShiftReduce => write!(f, "shift/reduce"),
            ConflictKind::ReduceReduce => write!(f, "reduce/reduce"),
        }
    }
}

/// A conflict that precedence could not settle. The table holds `chosen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: usize,
    pub terminal: usize,
    pub terminal_name: String,
    pub kind: ConflictKind,
    /// The reduction that lost, or that won against another one.
    pub rule: usize,
    pub chosen: ParserAction,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conflict in state {} on {:?} (rule {}), using {}",
            self.kind, self.state, self.terminal_name, self.rule, self.chosen
        )
    }
}

/// How a shift/reduce clash is settled.
enum Resolution {
    Shift,
    Reduce,
    Error,
    Unresolved,
}

fn resolve<T>(grammar: &Grammar<T>, terminal: usize, rule: usize) -> Resolution {
    let term = grammar.terminals().get(terminal).and_then(|t| t.precedence);
    let rule = grammar.rule(RuleId(rule)).precedence;
    match (term, rule) {
        (Some(t), Some(r)) if r.level > t.level => Resolution::Reduce,
        (Some(t), Some(r)) if r.level < t.level => Resolution::Shift,
        (Some(t), Some(_)) => match t.assoc {
            Associativity::Left => Resolution::Reduce,
            Associativity::Right => Resolution::Shift,
            Associativity::NonAssoc => Resolution::Error,
        },
        _ => Resolution::Unresolved,
    }
}

/// Builds the parse table. Columns are the grammar's terminals followed by
/// the end marker; rows are the collection's states.
pub fn construct_table<T>(
    grammar: &Grammar<T>,
    collection: &Collection,
    lookaheads: &Lookaheads,
) -> (ParseTable, Vec<Conflict>) {
    let terminals = grammar.end_terminal() + 1;
    let rules: Vec<RuleInfo> = grammar
        .rules()
        .iter()
        .map(|r| RuleInfo {
            lhs: r.lhs.0 as u32,
            len: r.rhs.len() as u32,
        })
        .collect();
    let mut table = ParseTable::new(
        collection.len(),
        terminals,
        grammar.nonterminals().len(),
        rules,
    );
    let mut conflicts = Vec::new();
    let augmented = grammar.augmented_rule().0;
    let end = grammar.end_terminal();

    for (state, edges) in collection.transitions.iter().enumerate() {
        for (&sym, &target) in edges {
            match sym {
                Symbol::Term(t) => table.set_action(state, t.0, ParserAction::Shift(target as u32)),
                Symbol::NonTerm(n) => table.set_goto(state, n.0, target as u32),
            }
        }

        if collection.states[state].contains(&Item {
            rule: augmented,
            dot: 1,
        }) {
            table.set_action(state, end, ParserAction::Accept);
        }

        // Cells a non-associative group closed; later reductions stay out.
        let mut closed = BTreeSet::new();
        let Some(reductions) = lookaheads.get(state) else {
            continue;
        };
        for (&rule, las) in reductions {
            if rule == augmented {
                continue;
            }
            for &a in las {
                if closed.contains(&a) {
                    continue;
                }
                let reduce = ParserAction::Reduce(rule as u32);
                match table.action(state, a) {
                    ParserAction::Error => table.set_action(state, a, reduce),
                    ParserAction::Shift(_) => match resolve(grammar, a, rule) {
                        Resolution::Shift => {}
                        Resolution::Reduce => table.set_action(state, a, reduce),
                        Resolution::Error => {
                            table.set_action(state, a, ParserAction::Error);
                            closed.insert(a);
                        }
                        Resolution::Unresolved => conflicts.push(Conflict {
                            state,
                            terminal: a,
                            terminal_name: grammar.terminal_name(a).into(),
                            kind: ConflictKind::ShiftReduce,
                            rule,
                            chosen: table.action(state, a),
                        }),
                    },
                    chosen @ (ParserAction::Reduce(_) | ParserAction::Accept) => {
                        conflicts.push(Conflict {
                            state,
                            terminal: a,
                            terminal_name: grammar.terminal_name(a).into(),
                            kind: ConflictKind::ReduceReduce,
                            rule,
                            chosen,
                        })
                    }
                }
            }
        }
    }

    for c in &conflicts {
        log::warn!("{c}");
    }
    log::debug!(
        "parse table: {} states x {} terminals, {} unresolved conflicts",
        table.state_count(),
        table.terminal_count(),
        conflicts.len()
    );
    (table, conflicts)
}
