/*!
Pattern trees accepted by the compiler.

A [`Node`] describes a pattern over elements of type `E`. Most nodes have a
direct counterpart in regular expression syntax, for instance `ab|c*`
corresponds to:

```text
Alternation([
    Concat([Element('a'), Element('b')]),
    Quantification { amount: ZeroOrMore, kind: Greedy, node: Element('c') },
])
```

Patterns can also refer to named productions in a [`Grammar`], which allows
describing recursive languages like balanced parentheses.
 */

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::engine::{ConsumeFunction, Predicate};

/// How many times a quantified node can be repeated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Amount {
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `?`
    ZeroOrOne,
    /// `{n}`
    Exactly(u32),
    /// `{n,}`
    NOrMore(u32),
    /// `{,n}`
    UpToN(u32),
    /// `{n,m}`
    Range(u32, u32),
}

impl Amount {
    /// Returns the minimum and maximum number of repetitions. The maximum is
    /// [`None`] if the number of repetitions is unbounded.
    pub fn bounds(&self) -> (u32, Option<u32>) {
        match *self {
            Amount::ZeroOrMore => (0, None),
            Amount::OneOrMore => (1, None),
            Amount::ZeroOrOne => (0, Some(1)),
            Amount::Exactly(n) => (n, Some(n)),
            Amount::NOrMore(n) => (n, None),
            Amount::UpToN(n) => (0, Some(n)),
            Amount::Range(n, m) => (n, Some(m)),
        }
    }
}

/// How a quantified node chooses among its possible repetitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuantKind {
    /// Tries as many repetitions as possible first.
    Greedy,
    /// Tries as few repetitions as possible first.
    Reluctant,
    /// Takes as many repetitions as possible and never gives them back.
    Possessive,
}

/// Kind of lookaround assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lookaround {
    /// `(?=...)`
    Ahead,
    /// `(?!...)`
    NegativeAhead,
}

/// Zero-width assertions about the position within the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// The current position is the start of the input.
    StartOfInput,
    /// The current position is the end of the search range.
    EndOfInput,
}

/// A node in a pattern tree.
#[derive(Clone)]
pub enum Node<E> {
    /// Matches the empty string.
    Empty,
    /// Matches any single element.
    Any,
    /// Matches a single element equal to the given one.
    Element(E),
    /// Matches a sequence of elements.
    Literal(Vec<E>),
    /// Matches a single element for which the predicate returns true.
    Predicate(Predicate<E>),
    /// Matches whatever the consume function consumes. See
    /// [`ConsumeFunction`].
    Consumer(ConsumeFunction<E>),
    /// Matches each child in sequence.
    Concat(Vec<Node<E>>),
    /// Matches the first child that leads to an overall match, trying them
    /// from left to right.
    Alternation(Vec<Node<E>>),
    /// Matches the child repeatedly.
    Quantification {
        amount: Amount,
        kind: QuantKind,
        node: Box<Node<E>>,
    },
    /// Matches the child and records the matched range in the capture group
    /// with the given index. Indexes start at zero.
    Capture { index: usize, name: Option<String>, node: Box<Node<E>> },
    /// Matches the production with the given name.
    Reference(String),
    /// Checks whether the child matches at the current position, without
    /// consuming any input.
    Lookaround { kind: Lookaround, node: Box<Node<E>> },
    /// Matches the child, and discards any alternative left by it once it
    /// has matched.
    Atomic(Box<Node<E>>),
    /// Zero-width assertion about the current position.
    Anchor(Anchor),
    /// Matches the same elements that were matched by a capture group.
    Backreference(usize),
}

impl<E> Node<E> {
    /// Creates a [`Node::Literal`] from a sequence of elements.
    pub fn literal<I: IntoIterator<Item = E>>(elements: I) -> Self {
        Node::Literal(elements.into_iter().collect())
    }

    /// Creates a [`Node::Predicate`] from a closure.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Node::Predicate(Arc::new(f))
    }

    /// Creates a [`Node::Consumer`] from a closure.
    pub fn consumer<F>(f: F) -> Self
    where
        F: Fn(&[E], std::ops::Range<usize>) -> Option<usize>
            + Send
            + Sync
            + 'static,
    {
        Node::Consumer(Arc::new(f))
    }

    /// Creates a [`Node::Quantification`].
    pub fn repeat(self, amount: Amount, kind: QuantKind) -> Self {
        Node::Quantification { amount, kind, node: Box::new(self) }
    }

    /// `self*`
    pub fn zero_or_more(self) -> Self {
        self.repeat(Amount::ZeroOrMore, QuantKind::Greedy)
    }

    /// `self+`
    pub fn one_or_more(self) -> Self {
        self.repeat(Amount::OneOrMore, QuantKind::Greedy)
    }

    /// `self?`
    pub fn optional(self) -> Self {
        self.repeat(Amount::ZeroOrOne, QuantKind::Greedy)
    }

    /// Wraps the node in the capture group with the given index.
    pub fn capture(self, index: usize) -> Self {
        Node::Capture { index, name: None, node: Box::new(self) }
    }

    /// Wraps the node in a lookaround assertion.
    pub fn lookaround(self, kind: Lookaround) -> Self {
        Node::Lookaround { kind, node: Box::new(self) }
    }

    /// Wraps the node in an atomic group.
    pub fn atomic(self) -> Self {
        Node::Atomic(Box::new(self))
    }

    /// Creates a [`Node::Reference`].
    pub fn reference<S: Into<String>>(name: S) -> Self {
        Node::Reference(name.into())
    }

    /// Returns true if the node can match without consuming any input.
    ///
    /// The result is conservative: nodes whose behaviour is not known
    /// statically, like consumers and references, are assumed to be able to
    /// match the empty string.
    pub fn can_match_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Any | Node::Element(_) | Node::Predicate(_) => false,
            Node::Literal(elements) => elements.is_empty(),
            Node::Consumer(_) => true,
            Node::Concat(children) => {
                children.iter().all(|child| child.can_match_empty())
            }
            Node::Alternation(children) => {
                children.iter().any(|child| child.can_match_empty())
            }
            Node::Quantification { amount, node, .. } => {
                amount.bounds().0 == 0 || node.can_match_empty()
            }
            Node::Capture { node, .. } | Node::Atomic(node) => {
                node.can_match_empty()
            }
            Node::Reference(_) => true,
            Node::Lookaround { .. } | Node::Anchor(_) => true,
            Node::Backreference(_) => true,
        }
    }

    /// Returns the largest index of the capture groups in this node, if
    /// there is some capture group.
    pub(crate) fn max_capture_index(&self) -> Option<usize> {
        match self {
            Node::Capture { index, node, .. } => Some(
                node.max_capture_index().map_or(*index, |i| i.max(*index)),
            ),
            Node::Concat(children) | Node::Alternation(children) => children
                .iter()
                .filter_map(|child| child.max_capture_index())
                .max(),
            Node::Quantification { node, .. }
            | Node::Lookaround { node, .. }
            | Node::Atomic(node) => node.max_capture_index(),
            _ => None,
        }
    }
}

impl<E: Debug> Debug for Node<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Empty => write!(f, "Empty"),
            Node::Any => write!(f, "Any"),
            Node::Element(e) => f.debug_tuple("Element").field(e).finish(),
            Node::Literal(l) => f.debug_tuple("Literal").field(l).finish(),
            Node::Predicate(_) => write!(f, "Predicate(..)"),
            Node::Consumer(_) => write!(f, "Consumer(..)"),
            Node::Concat(c) => f.debug_tuple("Concat").field(c).finish(),
            Node::Alternation(c) => {
                f.debug_tuple("Alternation").field(c).finish()
            }
            Node::Quantification { amount, kind, node } => f
                .debug_struct("Quantification")
                .field("amount", amount)
                .field("kind", kind)
                .field("node", node)
                .finish(),
            Node::Capture { index, name, node } => f
                .debug_struct("Capture")
                .field("index", index)
                .field("name", name)
                .field("node", node)
                .finish(),
            Node::Reference(name) => {
                f.debug_tuple("Reference").field(name).finish()
            }
            Node::Lookaround { kind, node } => f
                .debug_struct("Lookaround")
                .field("kind", kind)
                .field("node", node)
                .finish(),
            Node::Atomic(node) => f.debug_tuple("Atomic").field(node).finish(),
            Node::Anchor(a) => f.debug_tuple("Anchor").field(a).finish(),
            Node::Backreference(i) => {
                f.debug_tuple("Backreference").field(i).finish()
            }
        }
    }
}

/// A set of named productions, one of which is the start production.
#[derive(Clone, Debug)]
pub struct Grammar<E> {
    pub(crate) start: String,
    pub(crate) productions: IndexMap<String, Node<E>>,
}

impl<E> Grammar<E> {
    /// Creates a grammar whose start production is `start`.
    pub fn new<S: Into<String>>(start: S) -> Self {
        Self { start: start.into(), productions: IndexMap::new() }
    }

    /// Adds a production to the grammar, replacing any previous production
    /// with the same name.
    pub fn production<S: Into<String>>(
        mut self,
        name: S,
        node: Node<E>,
    ) -> Self {
        self.productions.insert(name.into(), node);
        self
    }

    /// Name of the start production.
    #[inline]
    pub fn start(&self) -> &str {
        self.start.as_str()
    }

    /// Returns the production with the given name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Node<E>> {
        self.productions.get(name)
    }
}
