//! Thompson construction of the lexer NFA.

use crate::regex::RegexNode;
use tablex::Nfa;

/// Builds one NFA recognizing every pattern.
///
/// Each pattern becomes a fragment reached by an epsilon edge from the shared
/// start state; the fragment's exit accepts the pattern's index.
pub fn compile(patterns: &[RegexNode]) -> Nfa {
    let mut nfa = Nfa::new();
    let start = nfa.add_state();
    nfa.set_start(start);
    for (i, p) in patterns.iter().enumerate() {
        let (entry, exit) = fragment(&mut nfa, p);
        nfa.add_epsilon(start, entry);
        nfa.set_accept(exit, i as u32);
    }
    log::debug!(
        "NFA: {} patterns, {} states",
        patterns.len(),
        nfa.state_count()
    );
    nfa
}

/// Adds a fragment for `node`, returning its entry and exit states.
fn fragment(nfa: &mut Nfa, node: &RegexNode) -> (u32, u32) {
    match node {
        RegexNode::Empty => {
            let s = nfa.add_state();
            (s, s)
        }
        RegexNode::Literal(chars) => {
            let entry = nfa.add_state();
            let mut cur = entry;
            for &c in chars {
                let next = nfa.add_state();
                nfa.add_range(cur, c, c, next);
                cur = next;
            }
            (entry, cur)
        }
        RegexNode::Class(ranges) => {
            let entry = nfa.add_state();
            let exit = nfa.add_state();
            for &(lo, hi) in ranges {
                nfa.add_range(entry, lo, hi, exit);
            }
            (entry, exit)
        }
        RegexNode::Concat(parts) => {
            let mut iter = parts.iter();
            let Some(first) = iter.next() else {
                return fragment(nfa, &RegexNode::Empty);
            };
            let (entry, mut exit) = fragment(nfa, first);
            for part in iter {
                let (s, e) = fragment(nfa, part);
                nfa.add_epsilon(exit, s);
                exit = e;
            }
            (entry, exit)
        }
        RegexNode::Alt(parts) => {
            let entry = nfa.add_state();
            let exit = nfa.add_state();
            for part in parts {
                let (s, e) = fragment(nfa, part);
                nfa.add_epsilon(entry, s);
                nfa.add_epsilon(e, exit);
            }
            (entry, exit)
        }
        RegexNode::Star(sub) => {
            let entry = nfa.add_state();
            let exit = nfa.add_state();
            let (s, e) = fragment(nfa, sub);
            nfa.add_epsilon(entry, s);
            nfa.add_epsilon(entry, exit);
            nfa.add_epsilon(e, s);
            nfa.add_epsilon(e, exit);
            (entry, exit)
        }
        RegexNode::Plus(sub) => {
            let entry = nfa.add_state();
            let exit = nfa.add_state();
            let (s, e) = fragment(nfa, sub);
            nfa.add_epsilon(entry, s);
            nfa.add_epsilon(e, s);
            nfa.add_epsilon(e, exit);
            (entry, exit)
        }
        RegexNode::Optional(sub) => {
            let entry = nfa.add_state();
            let exit = nfa.add_state();
            let (s, e) = fragment(nfa, sub);
            nfa.add_epsilon(entry, s);
            nfa.add_epsilon(entry, exit);
            nfa.add_epsilon(e, exit);
            (entry, exit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::parse;
    use tablex::Automaton;

    fn matches(nfa: &Nfa, s: &str) -> Option<usize> {
        let mut state = nfa.start();
        for c in s.chars() {
            state = nfa.step(&state, c)?;
        }
        nfa.accept(&state)
    }

    #[test]
    fn earlier_pattern_wins_ties() {
        let patterns = vec![parse("if").unwrap(), parse("[a-z]+").unwrap()];
        let nfa = compile(&patterns);
        assert_eq!(matches(&nfa, "if"), Some(0));
        assert_eq!(matches(&nfa, "ifs"), Some(1));
        assert_eq!(matches(&nfa, "IF"), None);
    }

    #[test]
    fn operators_compose() {
        let nfa = compile(&[parse("a(b|cd)*e?f+").unwrap()]);
        for ok in ["af", "abff", "acdbf", "aef", "abcdcdeff"] {
            assert_eq!(matches(&nfa, ok), Some(0), "{ok}");
        }
        for bad in ["a", "ae", "abe", "acf"] {
            assert_eq!(matches(&nfa, bad), None, "{bad}");
        }
    }

    #[test]
    fn unicode_literal_and_bounded_repetition() {
        let nfa = compile(&[parse("خنزير").unwrap(), parse("[0-9]{2,3}").unwrap()]);
        assert_eq!(matches(&nfa, "خنزير"), Some(0));
        assert_eq!(matches(&nfa, "12"), Some(1));
        assert_eq!(matches(&nfa, "123"), Some(1));
        assert_eq!(matches(&nfa, "1"), None);
        assert_eq!(matches(&nfa, "1234"), None);
    }
}
