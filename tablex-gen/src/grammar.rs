//! Grammar model and builder.
//!
//! A [`GrammarBuilder`] collects terminals, non-terminals, production rules,
//! precedence groups and ignore patterns, and [`GrammarBuilder::build`]
//! validates them into an immutable [`Grammar`]. The built grammar is
//! augmented with a synthetic rule `'S → S` over the start symbol `S`; that
//! rule and its non-terminal come after every user-declared one.

use crate::error::ConfigError;
use crate::regex::{self, RegexNode};
use indexmap::{IndexMap, IndexSet};
use smartstring::alias::String;
use std::collections::VecDeque;
use std::sync::Arc;
use tablex::Conversion;

/// Combines the values of a rule's children, left to right.
pub type ReduceFn<T> = Arc<dyn Fn(Vec<T>) -> T + Send + Sync>;

/// Post-processes the value of the start symbol.
pub type AcceptFn<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TerminalId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonTerminalId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub usize);

/// A grammar symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Term(TerminalId),
    NonTerm(NonTerminalId),
}

impl From<TerminalId> for Symbol {
    fn from(id: TerminalId) -> Self {
        Symbol::Term(id)
    }
}

impl From<NonTerminalId> for Symbol {
    fn from(id: NonTerminalId) -> Self {
        Symbol::NonTerm(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
    NonAssoc,
}

/// A declared precedence level. Higher levels bind tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrecedenceGroup {
    pub level: usize,
    pub assoc: Associativity,
}

/// A regular expression together with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: String,
    pub node: RegexNode,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            source: source.into(),
            node: regex::parse(source)?,
        })
    }
}

pub struct Terminal<T> {
    pub pattern: Pattern,
    pub convert: Option<Conversion<T>>,
    pub precedence: Option<PrecedenceGroup>,
}

impl<T> Terminal<T> {
    /// Display name: the regex source.
    pub fn name(&self) -> &str {
        &self.pattern.source
    }
}

impl<T> Clone for Terminal<T> {
    fn clone(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            convert: self.convert.clone(),
            precedence: self.precedence,
        }
    }
}

impl<T> std::fmt::Debug for Terminal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("pattern", &self.pattern.source)
            .field("convert", &self.convert.is_some())
            .field("precedence", &self.precedence)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonTerminal {
    pub name: String,
    pub rules: Vec<RuleId>,
}

pub struct Rule<T> {
    pub lhs: NonTerminalId,
    pub rhs: Vec<Symbol>,
    pub reduce: Option<ReduceFn<T>>,
    /// Explicit precedence, or that of the rightmost terminal (possibly none).
    pub precedence: Option<PrecedenceGroup>,
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Self {
        Self {
            lhs: self.lhs,
            rhs: self.rhs.clone(),
            reduce: self.reduce.clone(),
            precedence: self.precedence,
        }
    }
}

impl<T> std::fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("lhs", &self.lhs)
            .field("rhs", &self.rhs)
            .field("reduce", &self.reduce.is_some())
            .field("precedence", &self.precedence)
            .finish()
    }
}

/// Terminals and ignore patterns, deduplicated by regex source.
pub(crate) struct TerminalSet<T> {
    pub(crate) terminals: Vec<Terminal<T>>,
    by_source: IndexMap<String, TerminalId>,
    pub(crate) ignores: Vec<Pattern>,
}

impl<T> Default for TerminalSet<T> {
    fn default() -> Self {
        Self {
            terminals: Vec::new(),
            by_source: IndexMap::new(),
            ignores: Vec::new(),
        }
    }
}

impl<T> TerminalSet<T> {
    /// Registers `source`, reusing an existing terminal with the same regex
    /// and the same conversion.
    pub(crate) fn intern(
        &mut self,
        source: &str,
        convert: Option<Conversion<T>>,
    ) -> Result<TerminalId, ConfigError> {
        if let Some(&id) = self.by_source.get(source) {
            let same = match (&self.terminals[id.0].convert, &convert) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            };
            return if same {
                Ok(id)
            } else {
                Err(ConfigError::ConflictingTerminal(source.into()))
            };
        }
        let pattern = Pattern::parse(source)?;
        let id = TerminalId(self.terminals.len());
        self.terminals.push(Terminal {
            pattern,
            convert,
            precedence: None,
        });
        self.by_source.insert(source.into(), id);
        Ok(id)
    }

    pub(crate) fn ignore(&mut self, source: &str) -> Result<(), ConfigError> {
        self.ignores.push(Pattern::parse(source)?);
        Ok(())
    }
}

/// Incrementally describes a grammar.
///
/// # Examples
///
/// ```rust
/// use tablex_gen::{Associativity, GrammarBuilder};
///
/// let mut g = GrammarBuilder::<i64>::new();
/// let num = g.terminal_with("[0-9]+", |s| s.parse().unwrap_or_default())?;
/// let plus = g.literal("+")?;
/// g.ignore(" +")?;
/// let expr = g.non_terminal("Expr");
/// g.rule(expr, &[expr.into(), plus.into(), expr.into()])
///     .reduce(|v| v[0] + v[2]);
/// g.rule(expr, &[num.into()]);
/// g.precedence(Associativity::Left, &[plus]);
/// let grammar = g.build()?;
/// assert_eq!(grammar.rules().len(), 3);
/// # Ok::<(), tablex_gen::ConfigError>(())
/// ```
pub struct GrammarBuilder<T> {
    symbols: TerminalSet<T>,
    names: IndexSet<String>,
    rules: Vec<Rule<T>>,
    explicit: Vec<bool>,
    groups: usize,
    start: Option<NonTerminalId>,
    accept: Option<AcceptFn<T>>,
    /// First misuse of [`precedence`](Self::precedence), reported by `build`.
    deferred: Option<ConfigError>,
}

impl<T> Default for GrammarBuilder<T> {
    fn default() -> Self {
        Self {
            symbols: TerminalSet::default(),
            names: IndexSet::new(),
            rules: Vec::new(),
            explicit: Vec::new(),
            groups: 0,
            start: None,
            accept: None,
            deferred: None,
        }
    }
}

/// Returned by [`GrammarBuilder::rule`] to attach behavior to the new rule.
pub struct RuleHandle<'b, T> {
    builder: &'b mut GrammarBuilder<T>,
    rule: RuleId,
}

impl<'b, T> RuleHandle<'b, T> {
    pub fn id(&self) -> RuleId {
        self.rule
    }

    /// Sets the reduction function.
    pub fn reduce<F>(self, f: F) -> Self
    where
        F: Fn(Vec<T>) -> T + Send + Sync + 'static,
    {
        self.builder.rules[self.rule.0].reduce = Some(Arc::new(f));
        self
    }

    /// Gives the rule an explicit precedence, overriding its terminals'.
    pub fn precedence(self, group: PrecedenceGroup) -> Self {
        self.builder.rules[self.rule.0].precedence = Some(group);
        self.builder.explicit[self.rule.0] = true;
        self
    }
}

impl<T: 'static> GrammarBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a terminal whose tokens carry `T::default()`.
    pub fn terminal(&mut self, regex: &str) -> Result<TerminalId, ConfigError> {
        self.symbols.intern(regex, None)
    }

    /// Registers a terminal whose tokens carry `f(text)`.
    pub fn terminal_with<F>(&mut self, regex: &str, f: F) -> Result<TerminalId, ConfigError>
    where
        F: Fn(&str) -> T + Send + Sync + 'static,
    {
        self.symbols.intern(regex, Some(Arc::new(f)))
    }

    /// Like [`terminal_with`](Self::terminal_with), with a conversion that
    /// may be shared: registering the same regex with the same `Arc` again
    /// returns the same terminal.
    pub fn terminal_shared(
        &mut self,
        regex: &str,
        convert: Conversion<T>,
    ) -> Result<TerminalId, ConfigError> {
        self.symbols.intern(regex, Some(convert))
    }

    /// Registers a terminal matching `text` literally.
    pub fn literal(&mut self, text: &str) -> Result<TerminalId, ConfigError> {
        self.symbols.intern(&regex::escape(text), None)
    }

    /// Declares a non-terminal; declaring a name twice returns the same id.
    pub fn non_terminal(&mut self, name: &str) -> NonTerminalId {
        NonTerminalId(self.names.insert_full(name.into()).0)
    }

    /// Adds the production `lhs → rhs`.
    pub fn rule(&mut self, lhs: NonTerminalId, rhs: &[Symbol]) -> RuleHandle<'_, T> {
        let rule = RuleId(self.rules.len());
        self.rules.push(Rule {
            lhs,
            rhs: rhs.to_vec(),
            reduce: None,
            precedence: None,
        });
        self.explicit.push(false);
        RuleHandle {
            builder: self,
            rule,
        }
    }

    /// Declares a precedence group. Each group binds tighter than the ones
    /// declared before it.
    ///
    /// A terminal belongs to at most one group. Unregistered or repeated
    /// terminals make [`build`](Self::build) fail.
    pub fn precedence(&mut self, assoc: Associativity, terminals: &[TerminalId]) -> PrecedenceGroup {
        self.groups += 1;
        let group = PrecedenceGroup {
            level: self.groups,
            assoc,
        };
        for t in terminals {
            let err = match self.symbols.terminals.get_mut(t.0) {
                Some(term) if term.precedence.is_none() => {
                    term.precedence = Some(group);
                    continue;
                }
                Some(term) => ConfigError::DuplicatePrecedence(term.name().into()),
                None => ConfigError::UnknownSymbol(format!("terminal #{}", t.0).into()),
            };
            self.deferred.get_or_insert(err);
        }
        group
    }

    /// Matches `regex` between tokens and discards it.
    pub fn ignore(&mut self, regex: &str) -> Result<(), ConfigError> {
        self.symbols.ignore(regex)
    }

    /// Sets the start symbol (default: the first declared non-terminal).
    pub fn start(&mut self, nt: NonTerminalId) -> &mut Self {
        self.start = Some(nt);
        self
    }

    /// Sets the function applied to the start symbol's value on accept.
    pub fn on_accept<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.accept = Some(Arc::new(f));
        self
    }

    /// Validates and freezes the grammar.
    pub fn build(self) -> Result<Grammar<T>, ConfigError> {
        let GrammarBuilder {
            symbols,
            names,
            mut rules,
            explicit,
            groups: _,
            start,
            accept,
            deferred,
        } = self;
        if let Some(err) = deferred {
            return Err(err);
        }
        let TerminalSet {
            terminals, ignores, ..
        } = symbols;

        if names.is_empty() || rules.is_empty() {
            return Err(ConfigError::EmptyGrammar);
        }
        let start = start.unwrap_or(NonTerminalId(0));

        let mut nonterminals: Vec<NonTerminal> = names
            .iter()
            .map(|name| NonTerminal {
                name: name.clone(),
                rules: Vec::new(),
            })
            .collect();
        if start.0 >= nonterminals.len() {
            return Err(ConfigError::UnknownSymbol(format!("non-terminal #{}", start.0).into()));
        }
        for (i, rule) in rules.iter().enumerate() {
            let lhs = nonterminals.get_mut(rule.lhs.0).ok_or_else(|| {
                ConfigError::UnknownSymbol(format!("non-terminal #{}", rule.lhs.0).into())
            })?;
            lhs.rules.push(RuleId(i));
            for sym in &rule.rhs {
                match *sym {
                    Symbol::Term(t) if t.0 >= terminals.len() => {
                        return Err(ConfigError::UnknownSymbol(format!("terminal #{}", t.0).into()));
                    }
                    Symbol::NonTerm(n) if n.0 >= names.len() => {
                        return Err(ConfigError::UnknownSymbol(
                            format!("non-terminal #{}", n.0).into(),
                        ));
                    }
                    _ => {}
                }
            }
        }

        // Without an explicit one, a rule takes its last terminal's precedence.
        for (rule, explicit) in rules.iter_mut().zip(explicit) {
            if !explicit {
                rule.precedence = rule
                    .rhs
                    .iter()
                    .rev()
                    .find_map(|sym| match sym {
                        Symbol::Term(t) => Some(terminals[t.0].precedence),
                        Symbol::NonTerm(_) => None,
                    })
                    .flatten();
            }
        }

        // Augment with 'S → S.
        let augmented = NonTerminalId(nonterminals.len());
        let augmented_rule = RuleId(rules.len());
        nonterminals.push(NonTerminal {
            name: format!("'{}", nonterminals[start.0].name).into(),
            rules: vec![augmented_rule],
        });
        rules.push(Rule {
            lhs: augmented,
            rhs: vec![Symbol::NonTerm(start)],
            reduce: None,
            precedence: None,
        });

        let grammar = Grammar {
            terminals,
            nonterminals,
            rules,
            ignores,
            start,
            augmented_rule,
            accept: accept.unwrap_or_else(|| Arc::new(|v: T| v)),
        };
        grammar.validate()?;
        log::debug!(
            "grammar: {} terminals, {} non-terminals, {} rules",
            grammar.terminals.len(),
            grammar.nonterminals.len(),
            grammar.rules.len()
        );
        Ok(grammar)
    }
}

/// An immutable, validated grammar.
pub struct Grammar<T> {
    terminals: Vec<Terminal<T>>,
    nonterminals: Vec<NonTerminal>,
    rules: Vec<Rule<T>>,
    ignores: Vec<Pattern>,
    start: NonTerminalId,
    augmented_rule: RuleId,
    accept: AcceptFn<T>,
}

impl<T> Clone for Grammar<T> {
    fn clone(&self) -> Self {
        Self {
            terminals: self.terminals.clone(),
            nonterminals: self.nonterminals.clone(),
            rules: self.rules.clone(),
            ignores: self.ignores.clone(),
            start: self.start,
            augmented_rule: self.augmented_rule,
            accept: Arc::clone(&self.accept),
        }
    }
}

impl<T> std::fmt::Debug for Grammar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("terminals", &self.terminals)
            .field("nonterminals", &self.nonterminals)
            .field("rules", &self.rules)
            .field("ignores", &self.ignores)
            .field("start", &self.start)
            .finish()
    }
}

impl<T> Grammar<T> {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut reachable = vec![false; self.nonterminals.len()];
        let mut queue = VecDeque::from([self.start]);
        reachable[self.start.0] = true;
        while let Some(nt) = queue.pop_front() {
            if self.nonterminals[nt.0].rules.is_empty() {
                let rule = self
                    .rules
                    .iter()
                    .position(|r| r.rhs.contains(&Symbol::NonTerm(nt)))
                    .map(|r| self.rule_to_string(RuleId(r)))
                    .unwrap_or_else(|| "the start symbol".into());
                return Err(ConfigError::UndefinedNonTerminal {
                    name: self.nonterminals[nt.0].name.clone(),
                    rule,
                });
            }
            for &r in &self.nonterminals[nt.0].rules {
                for sym in &self.rules[r.0].rhs {
                    if let Symbol::NonTerm(n) = *sym
                        && !reachable[n.0]
                    {
                        reachable[n.0] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        let augmented = self.augmented();
        match self
            .nonterminals
            .iter()
            .enumerate()
            .find(|&(i, _)| !reachable[i] && i != augmented.0)
        {
            Some((_, nt)) => Err(ConfigError::UnreachableNonTerminal(nt.name.clone())),
            None => Ok(()),
        }
    }

    pub fn terminals(&self) -> &[Terminal<T>] {
        &self.terminals
    }

    pub fn nonterminals(&self) -> &[NonTerminal] {
        &self.nonterminals
    }

    pub fn rules(&self) -> &[Rule<T>] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> &Rule<T> {
        &self.rules[id.0]
    }

    pub fn ignores(&self) -> &[Pattern] {
        &self.ignores
    }

    /// The user's start symbol.
    pub fn start(&self) -> NonTerminalId {
        self.start
    }

    /// The synthetic non-terminal `'S`.
    pub fn augmented(&self) -> NonTerminalId {
        self.rules[self.augmented_rule.0].lhs
    }

    /// The synthetic rule `'S → S`.
    pub fn augmented_rule(&self) -> RuleId {
        self.augmented_rule
    }

    /// Column of the end-of-input marker: one past the last terminal.
    pub fn end_terminal(&self) -> usize {
        self.terminals.len()
    }

    pub fn terminal_name(&self, t: usize) -> &str {
        match self.terminals.get(t) {
            Some(term) => term.name(),
            None => tablex::END_NAME,
        }
    }

    pub fn symbol_name(&self, sym: Symbol) -> &str {
        match sym {
            Symbol::Term(t) => self.terminal_name(t.0),
            Symbol::NonTerm(n) => &self.nonterminals[n.0].name,
        }
    }

    /// Renders `rule` as `A → x y z` (`A → ε` when empty).
    pub fn rule_to_string(&self, rule: RuleId) -> String {
        let rule = &self.rules[rule.0];
        let mut out = String::new();
        out.push_str(&self.nonterminals[rule.lhs.0].name);
        out.push_str(" →");
        if rule.rhs.is_empty() {
            out.push_str(" ε");
        }
        for &sym in &rule.rhs {
            out.push(' ');
            out.push_str(self.symbol_name(sym));
        }
        out
    }

    /// Applies `rule`'s reduction to the children's values. Without a
    /// reduction function the first child's value is passed through.
    pub fn reduce_values(&self, rule: usize, values: Vec<T>) -> T
    where
        T: Default,
    {
        match self.rules.get(rule).and_then(|r| r.reduce.as_ref()) {
            Some(f) => f(values),
            None => values.into_iter().next().unwrap_or_default(),
        }
    }

    pub fn accept_value(&self, value: T) -> T {
        (self.accept)(value)
    }
}
