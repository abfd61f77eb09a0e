//! Regular expressions accepted as terminal patterns.
//!
//! Surface syntax is whatever `regex-syntax` understands; the parsed HIR is
//! lowered into [`RegexNode`], a small tree over characters that the
//! Thompson construction consumes. Anchors and word boundaries have no
//! meaning inside a token and are rejected, as are patterns that match the
//! empty string.

use crate::error::ConfigError;
use regex_automata::util::syntax;
use regex_syntax::hir::{Class, Hir, HirKind};

/// Repetition bounds above this are rejected instead of expanded.
pub const MAX_REPEAT: u32 = 1000;

/// A lowered regular expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexNode {
    /// Matches the empty string.
    Empty,
    /// A fixed sequence of characters.
    Literal(Vec<char>),
    /// Any character in one of the inclusive ranges. Empty matches nothing.
    Class(Vec<(char, char)>),
    Concat(Vec<RegexNode>),
    Alt(Vec<RegexNode>),
    Star(Box<RegexNode>),
    Plus(Box<RegexNode>),
    Optional(Box<RegexNode>),
}

impl RegexNode {
    /// Can this expression match the empty string?
    pub fn nullable(&self) -> bool {
        match self {
            RegexNode::Empty => true,
            RegexNode::Literal(cs) => cs.is_empty(),
            RegexNode::Class(_) => false,
            RegexNode::Concat(parts) => parts.iter().all(RegexNode::nullable),
            RegexNode::Alt(parts) => parts.iter().any(RegexNode::nullable),
            RegexNode::Star(_) | RegexNode::Optional(_) => true,
            RegexNode::Plus(sub) => sub.nullable(),
        }
    }
}

/// Parses and lowers `pattern`.
pub fn parse(pattern: &str) -> Result<RegexNode, ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::EmptyPattern);
    }
    let hir = syntax::parse_with(pattern, &syntax::Config::new()).map_err(|e| {
        ConfigError::InvalidRegex {
            pattern: pattern.into(),
            source: Box::new(e),
        }
    })?;
    let node = lower(&hir, pattern)?;
    if node.nullable() {
        return Err(ConfigError::NullablePattern(pattern.into()));
    }
    Ok(node)
}

/// Escapes `text` so that it matches itself literally.
pub fn escape(text: &str) -> String {
    regex_syntax::escape(text)
}

fn unsupported(pattern: &str, what: impl Into<smartstring::alias::String>) -> ConfigError {
    ConfigError::UnsupportedRegex {
        pattern: pattern.into(),
        what: what.into(),
    }
}

fn lower(hir: &Hir, pattern: &str) -> Result<RegexNode, ConfigError> {
    Ok(match hir.kind() {
        HirKind::Empty => RegexNode::Empty,
        HirKind::Literal(lit) => {
            let text = std::str::from_utf8(&lit.0)
                .map_err(|_| unsupported(pattern, "literal is not valid UTF-8"))?;
            RegexNode::Literal(text.chars().collect())
        }
        HirKind::Class(Class::Unicode(class)) => RegexNode::Class(
            class
                .ranges()
                .iter()
                .map(|r| (r.start(), r.end()))
                .collect(),
        ),
        HirKind::Class(Class::Bytes(class)) => {
            if class.ranges().iter().any(|r| r.end() > 0x7F) {
                return Err(unsupported(pattern, "byte class outside ASCII"));
            }
            RegexNode::Class(
                class
                    .ranges()
                    .iter()
                    .map(|r| (char::from(r.start()), char::from(r.end())))
                    .collect(),
            )
        }
        HirKind::Look(look) => {
            return Err(unsupported(pattern, format!("assertion {look:?}")));
        }
        HirKind::Repetition(rep) => {
            let sub = lower(&rep.sub, pattern)?;
            repeat(sub, rep.min, rep.max, pattern)?
        }
        HirKind::Capture(cap) => lower(&cap.sub, pattern)?,
        HirKind::Concat(parts) => RegexNode::Concat(
            parts
                .iter()
                .map(|p| lower(p, pattern))
                .collect::<Result<_, _>>()?,
        ),
        HirKind::Alternation(parts) => RegexNode::Alt(
            parts
                .iter()
                .map(|p| lower(p, pattern))
                .collect::<Result<_, _>>()?,
        ),
    })
}

/// Expands `sub{min,max}` into star/plus/optional and concatenation.
fn repeat(
    sub: RegexNode,
    min: u32,
    max: Option<u32>,
    pattern: &str,
) -> Result<RegexNode, ConfigError> {
    if min > MAX_REPEAT || max.is_some_and(|m| m > MAX_REPEAT) {
        return Err(unsupported(
            pattern,
            format!("repetition bound above {MAX_REPEAT}"),
        ));
    }
    Ok(match (min, max) {
        (0, None) => RegexNode::Star(Box::new(sub)),
        (1, None) => RegexNode::Plus(Box::new(sub)),
        (0, Some(1)) => RegexNode::Optional(Box::new(sub)),
        (_, Some(0)) => RegexNode::Empty,
        (1, Some(1)) => sub,
        (n, None) => {
            let mut parts = vec![sub.clone(); n as usize - 1];
            parts.push(RegexNode::Plus(Box::new(sub)));
            RegexNode::Concat(parts)
        }
        (n, Some(m)) => {
            let mut parts = vec![sub.clone(); n as usize];
            parts.extend(std::iter::repeat_n(
                RegexNode::Optional(Box::new(sub)),
                (m - n) as usize,
            ));
            RegexNode::Concat(parts)
        }
    })
}
