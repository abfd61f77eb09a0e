//! ACTION/GOTO tables for the shift-reduce engine.

use crate::error::TableError;
use serde::{Deserialize, Serialize};

/// Marks an empty GOTO cell.
pub const NO_GOTO: u32 = u32::MAX;

/// One ACTION cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParserAction {
    #[default]
    Error,
    Accept,
    Shift(u32),
    Reduce(u32),
}

impl std::fmt::Display for ParserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserAction::Error => write!(f, "error"),
            ParserAction::Accept => write!(f, "accept"),
            ParserAction::Shift(s) => write!(f, "s{s}"),
            ParserAction::Reduce(r) => write!(f, "r{r}"),
        }
    }
}

/// What the engine needs to know about a rule when reducing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleInfo {
    /// Non-terminal produced by the rule.
    pub lhs: u32,
    /// Number of symbols popped.
    pub len: u32,
}

/// Dense ACTION (`state × terminal`) and GOTO (`state × non-terminal`)
/// tables. Terminal columns follow the lexer's token kinds, the end kind
/// being the last column. State 0 is the start state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTable {
    terminals: usize,
    nonterminals: usize,
    actions: Vec<ParserAction>,
    gotos: Vec<u32>,
    rules: Vec<RuleInfo>,
}

impl ParseTable {
    /// An all-error table for `states` states.
    pub fn new(states: usize, terminals: usize, nonterminals: usize, rules: Vec<RuleInfo>) -> Self {
        Self {
            terminals,
            nonterminals,
            actions: vec![ParserAction::Error; states * terminals],
            gotos: vec![NO_GOTO; states * nonterminals],
            rules,
        }
    }

    pub fn state_count(&self) -> usize {
        if self.terminals == 0 {
            0
        } else {
            self.actions.len() / self.terminals
        }
    }

    /// Number of terminal columns, the end column included.
    pub fn terminal_count(&self) -> usize {
        self.terminals
    }

    pub fn nonterminal_count(&self) -> usize {
        self.nonterminals
    }

    pub fn rules(&self) -> &[RuleInfo] {
        &self.rules
    }

    pub fn rule(&self, rule: usize) -> Option<RuleInfo> {
        self.rules.get(rule).copied()
    }

    #[inline]
    pub fn action(&self, state: usize, terminal: usize) -> ParserAction {
        if terminal >= self.terminals {
            return ParserAction::Error;
        }
        self.actions
            .get(state * self.terminals + terminal)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_action(&mut self, state: usize, terminal: usize, action: ParserAction) {
        self.actions[state * self.terminals + terminal] = action;
    }

    #[inline]
    pub fn goto(&self, state: usize, nonterminal: usize) -> Option<u32> {
        if nonterminal >= self.nonterminals {
            return None;
        }
        match self.gotos.get(state * self.nonterminals + nonterminal) {
            Some(&NO_GOTO) | None => None,
            Some(&s) => Some(s),
        }
    }

    pub fn set_goto(&mut self, state: usize, nonterminal: usize, target: u32) {
        self.gotos[state * self.nonterminals + nonterminal] = target;
    }

    /// Terminals with a non-error action in `state`.
    pub fn expected(&self, state: usize) -> Vec<usize> {
        (0..self.terminals)
            .filter(|&t| self.action(state, t) != ParserAction::Error)
            .collect()
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.terminals == 0 || self.actions.len() % self.terminals != 0 {
            return Err(TableError::Malformed("ACTION table is not rectangular".into()));
        }
        let states = self.state_count();
        if states == 0 {
            return Err(TableError::Malformed("table has no states".into()));
        }
        if self.gotos.len() != states * self.nonterminals {
            return Err(TableError::Malformed(format!(
                "GOTO table has {} cells, expected {}",
                self.gotos.len(),
                states * self.nonterminals
            )));
        }
        for action in &self.actions {
            match *action {
                ParserAction::Shift(s) if s as usize >= states => {
                    return Err(TableError::Malformed(format!("shift to unknown state {s}")));
                }
                ParserAction::Reduce(r) if r as usize >= self.rules.len() => {
                    return Err(TableError::Malformed(format!("reduce by unknown rule {r}")));
                }
                _ => {}
            }
        }
        if let Some(&s) = self
            .gotos
            .iter()
            .find(|&&s| s != NO_GOTO && s as usize >= states)
        {
            return Err(TableError::Malformed(format!("goto to unknown state {s}")));
        }
        if let Some(r) = self
            .rules
            .iter()
            .find(|r| r.lhs as usize >= self.nonterminals)
        {
            return Err(TableError::Malformed(format!(
                "rule produces unknown non-terminal {}",
                r.lhs
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TableError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let table: Self = postcard::from_bytes(bytes)?;
        table.validate()?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ParseTable {
        let mut t = ParseTable::new(3, 2, 1, vec![RuleInfo { lhs: 0, len: 1 }]);
        t.set_action(0, 0, ParserAction::Shift(1));
        t.set_action(1, 1, ParserAction::Reduce(0));
        t.set_action(2, 1, ParserAction::Accept);
        t.set_goto(0, 0, 2);
        t
    }

    #[test]
    fn lookups_and_expected_sets() {
        let t = small();
        assert_eq!(t.state_count(), 3);
        assert_eq!(t.action(0, 0), ParserAction::Shift(1));
        assert_eq!(t.action(0, 1), ParserAction::Error);
        assert_eq!(t.action(0, 9), ParserAction::Error);
        assert_eq!(t.goto(0, 0), Some(2));
        assert_eq!(t.goto(1, 0), None);
        assert_eq!(t.expected(1), vec![1]);
        assert!(t.expected(0).contains(&0));
    }

    #[test]
    fn bytes_round_trip() {
        let t = small();
        let back = ParseTable::from_bytes(&t.to_bytes().unwrap()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn rejects_dangling_references() {
        let mut t = small();
        t.set_action(0, 1, ParserAction::Reduce(5));
        let bytes = t.to_bytes().unwrap();
        assert!(matches!(
            ParseTable::from_bytes(&bytes),
            Err(TableError::Malformed(_))
        ));
    }

    #[test]
    fn actions_display_compactly() {
        assert_eq!(ParserAction::Shift(4).to_string(), "s4");
        assert_eq!(ParserAction::Reduce(2).to_string(), "r2");
        assert_eq!(ParserAction::Accept.to_string(), "accept");
    }
}
