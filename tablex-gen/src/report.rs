//! Human-readable dumps of the construction stages.

use crate::grammar::{Grammar, RuleId, Symbol};
use crate::lookahead::FirstSets;
use crate::lr0::Collection;
use std::collections::BTreeSet;
use std::io::{self, Write};
use tablex::{ParseTable, ParserAction};

/// Writes every rule as `P,<index>,<lhs> → <rhs>`.
pub fn write_rules<T, W: Write>(out: &mut W, grammar: &Grammar<T>) -> io::Result<()> {
    writeln!(out, "PS,{}\n", grammar.rules().len())?;
    for i in 0..grammar.rules().len() {
        writeln!(out, "P,{},{}", i, grammar.rule_to_string(RuleId(i)))?;
    }
    Ok(())
}

/// Writes each item set with `•` marking the dot.
pub fn write_states<T, W: Write>(
    out: &mut W,
    grammar: &Grammar<T>,
    collection: &Collection,
) -> io::Result<()> {
    writeln!(out, "CS,{}\n", collection.len())?;
    for (i, state) in collection.states.iter().enumerate() {
        for item in state {
            let rule = grammar.rule(RuleId(item.rule));
            write!(out, "C,{},{} →", i, grammar.nonterminals()[rule.lhs.0].name)?;
            for (j, &sym) in rule.rhs.iter().enumerate() {
                if j == item.dot {
                    write!(out, " •")?;
                }
                write!(out, " {}", grammar.symbol_name(sym))?;
            }
            if item.dot >= rule.rhs.len() {
                write!(out, " •")?;
            }
            writeln!(out)?;
        }
        for (&sym, &target) in &collection.transitions[i] {
            let kind = match sym {
                Symbol::Term(_) => "shift",
                Symbol::NonTerm(_) => "goto",
            };
            writeln!(out, "T,{},{},{},{}", i, grammar.symbol_name(sym), kind, target)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_terminal_set<T, W: Write>(
    out: &mut W,
    grammar: &Grammar<T>,
    set: &BTreeSet<usize>,
) -> io::Result<()> {
    for &t in set {
        write!(out, "{}, ", grammar.terminal_name(t))?;
    }
    Ok(())
}

/// Writes FIRST sets (with `` `empty' `` for nullable non-terminals) and
/// FOLLOW sets.
pub fn write_first_follow<T, W: Write>(
    out: &mut W,
    grammar: &Grammar<T>,
    first: &FirstSets,
    follow: &[BTreeSet<usize>],
) -> io::Result<()> {
    for (i, nt) in grammar.nonterminals().iter().enumerate() {
        write!(out, "FIRST,{},{{", nt.name)?;
        if first.nullable[i] {
            write!(out, "`empty', ")?;
        }
        write_terminal_set(out, grammar, &first.first[i])?;
        writeln!(out, "}}")?;
    }
    for (i, nt) in grammar.nonterminals().iter().enumerate() {
        write!(out, "FOLLOW,{},{{", nt.name)?;
        write_terminal_set(out, grammar, &follow[i])?;
        writeln!(out, "}}")?;
    }
    Ok(())
}

/// Writes the non-error ACTION cells and the GOTO entries, one state per
/// line.
pub fn write_actions<T, W: Write>(
    out: &mut W,
    grammar: &Grammar<T>,
    table: &ParseTable,
) -> io::Result<()> {
    for state in 0..table.state_count() {
        write!(out, "A,{}:", state)?;
        for t in 0..table.terminal_count() {
            let action = table.action(state, t);
            if action != ParserAction::Error {
                write!(out, " {}={}", grammar.terminal_name(t), action)?;
            }
        }
        for n in 0..table.nonterminal_count() {
            if let Some(target) = table.goto(state, n) {
                write!(out, " {}->{}", grammar.nonterminals()[n].name, target)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Runs `write` into a buffer and logs the result at `debug` level.
pub(crate) fn log_debug<F>(what: &str, write: F)
where
    F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
{
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let mut buf = Vec::new();
    match write(&mut buf) {
        Ok(()) => log::debug!("{what}:\n{}", String::from_utf8_lossy(&buf)),
        Err(e) => log::debug!("{what}: could not render: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;
    use crate::lookahead::{LookaheadMode, compute, first_sets, follow_sets};
    use crate::lr0::construct_set;
    use crate::table::construct_table;

    fn grammar() -> Grammar<i64> {
        let mut g = GrammarBuilder::new();
        let n = g.literal("n").unwrap();
        let comma = g.literal(",").unwrap();
        let list = g.non_terminal("List");
        let tail = g.non_terminal("Tail");
        g.rule(list, &[n.into(), tail.into()]);
        g.rule(tail, &[comma.into(), n.into(), tail.into()]);
        g.rule(tail, &[]);
        g.build().unwrap()
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> std::string::String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        std::string::String::from_utf8(buf).unwrap()
    }

    #[test]
    fn rules_dump() {
        let g = grammar();
        let s = render(|out| write_rules(out, &g));
        assert!(s.starts_with("PS,4\n"));
        assert!(s.contains("P,0,List → n Tail\n"));
        assert!(s.contains("P,2,Tail → ε\n"));
        assert!(s.contains("P,3,'List → List\n"));
    }

    #[test]
    fn states_dump_marks_the_dot() {
        let g = grammar();
        let c = construct_set(&g);
        let s = render(|out| write_states(out, &g, &c));
        assert!(s.contains("C,0,'List → • List\n"));
        assert!(s.contains("T,0,n,shift,"));
        assert!(s.contains("Tail → •\n"));
    }

    #[test]
    fn first_follow_dump() {
        let g = grammar();
        let f = first_sets(&g);
        let follow = follow_sets(&g, &f);
        let s = render(|out| write_first_follow(out, &g, &f, &follow));
        assert!(s.contains("FIRST,Tail,{`empty', ,, }\n"));
        assert!(s.contains("FOLLOW,Tail,{$end, }\n"));
    }

    #[test]
    fn actions_dump() {
        let g = grammar();
        let c = construct_set(&g);
        let la = compute(&g, &c, LookaheadMode::Lalr);
        let (table, _) = construct_table(&g, &c, &la);
        let s = render(|out| write_actions(out, &g, &table));
        assert!(s.starts_with("A,0: n=s"));
        assert!(s.contains("$end=accept"));
    }
}
