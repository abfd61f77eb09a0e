//! Lexed tokens and concrete parse-tree nodes.
//!
//! A [`LexedToken`] is what the lexer emits: the token kind, the matched
//! text, its semantic value and where it was found. In tree-building mode the
//! parser wraps tokens in [`ParseNode::Leaf`] and combines reduced children
//! into [`ParseNode::Node`], which also records the non-terminal that produced
//! it.

use crate::cursor::{Position, Span};
use smartstring::alias::String;

/// A token accepted by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct LexedToken<T> {
    /// Token kind: a terminal index, or the lexer's end kind.
    pub kind: usize,
    /// The matched substring (empty for the end token).
    pub text: String,
    /// Semantic value produced by the terminal's conversion.
    pub value: T,
    /// Absolute character offset (0-based).
    pub offset: usize,
    /// Length in characters.
    pub length: usize,
    /// Line/column range covered by the token.
    pub span: Span,
}

impl<T> LexedToken<T> {
    /// Starting line (1-based).
    pub fn line(&self) -> usize {
        self.span.start.line
    }

    /// Starting column (0-based).
    pub fn column(&self) -> usize {
        self.span.start.column
    }

    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }
}

impl<T> std::fmt::Display for LexedToken<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}..{}] {:?} at ({}:{})",
            self.offset,
            self.end_offset(),
            self.text.as_str(),
            self.line(),
            self.column()
        )
    }
}

/// A node of the concrete parse tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseNode<T> {
    /// A shifted terminal.
    Leaf(LexedToken<T>),
    /// A reduced non-terminal with its children ordered by offset.
    Node {
        /// Index of the producing non-terminal.
        symbol: usize,
        /// Index of the rule that was reduced.
        rule: usize,
        value: T,
        offset: usize,
        length: usize,
        span: Span,
        children: Vec<ParseNode<T>>,
    },
}

impl<T> ParseNode<T> {
    /// Builds a node spanning `children`.
    ///
    /// Children are sorted by offset; the node covers the smallest start to
    /// the largest end among them. A node without children is empty and
    /// positioned at `(at_offset, at)`.
    pub fn node(
        symbol: usize,
        rule: usize,
        value: T,
        mut children: Vec<ParseNode<T>>,
        at_offset: usize,
        at: Position,
    ) -> Self {
        children.sort_by_key(|c| c.offset());
        let (offset, length, span) = match (children.first(), children.last()) {
            (Some(first), Some(_)) => {
                let start = first.offset();
                let end = children
                    .iter()
                    .map(|c| c.offset() + c.len())
                    .max()
                    .unwrap_or(start);
                let span = children
                    .iter()
                    .skip(1)
                    .fold(*first.span(), |acc, c| acc.merge(c.span()));
                (start, end - start, span)
            }
            _ => (at_offset, 0, Span::at(at)),
        };
        ParseNode::Node {
            symbol,
            rule,
            value,
            offset,
            length,
            span,
            children,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            ParseNode::Leaf(token) => &token.value,
            ParseNode::Node { value, .. } => value,
        }
    }

    pub fn value_mut(&mut self) -> &mut T {
        match self {
            ParseNode::Leaf(token) => &mut token.value,
            ParseNode::Node { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ParseNode::Leaf(token) => token.value,
            ParseNode::Node { value, .. } => value,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ParseNode::Leaf(token) => &token.span,
            ParseNode::Node { span, .. } => span,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            ParseNode::Leaf(token) => token.offset,
            ParseNode::Node { offset, .. } => *offset,
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        match self {
            ParseNode::Leaf(token) => token.length,
            ParseNode::Node { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, ParseNode::Leaf(_))
    }

    pub fn children(&self) -> &[ParseNode<T>] {
        match self {
            ParseNode::Leaf(_) => &[],
            ParseNode::Node { children, .. } => children,
        }
    }

    /// Depth-first, left-to-right iterator over the leaves.
    pub fn leaves(&self) -> Vec<&LexedToken<T>> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            match n {
                ParseNode::Leaf(token) => out.push(token),
                ParseNode::Node { children, .. } => stack.extend(children.iter().rev()),
            }
        }
        out
    }
}
