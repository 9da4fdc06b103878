use std::cmp::Ordering;
use std::ops::Range;

use regex_syntax::hir::{
    Class, Hir, HirKind, Literal, Look, Repetition, Visitor,
};

use crate::compiler::ast::{Amount, Anchor, Node, QuantKind};
use crate::errors::CompileError;

/// Converts the HIR produced by [`regex_syntax`] into a [`Node`].
///
/// Capture groups are renumbered so that the first explicit group has index
/// zero. Look-around assertions that are not simple anchors, like `\b` or
/// the multi-line `^` and `$`, become zero-width consume functions that
/// inspect the elements around the current position.
pub fn lower(hir: &Hir) -> Result<Node<char>, CompileError> {
    regex_syntax::hir::visit(hir, Lowering::default())
}

/// Builds the tree bottom-up. Each call to `visit_post` pops the nodes
/// produced for the children of the HIR node being visited, and pushes the
/// node for the HIR node itself.
#[derive(Default)]
struct Lowering {
    stack: Vec<Node<char>>,
}

impl Lowering {
    fn pop(&mut self) -> Node<char> {
        self.stack.pop().expect("lowering stack is empty")
    }

    fn pop_n(&mut self, n: usize) -> Vec<Node<char>> {
        assert!(self.stack.len() >= n, "lowering stack is too short");
        self.stack.split_off(self.stack.len() - n)
    }
}

impl Visitor for Lowering {
    type Output = Node<char>;
    type Err = CompileError;

    fn finish(mut self) -> Result<Self::Output, Self::Err> {
        debug_assert_eq!(self.stack.len(), 1);
        Ok(self.pop())
    }

    fn visit_post(&mut self, hir: &Hir) -> Result<(), Self::Err> {
        let node = match hir.kind() {
            HirKind::Empty => Node::Empty,
            HirKind::Literal(literal) => lower_literal(literal)?,
            HirKind::Class(class) => lower_class(class),
            HirKind::Look(look) => lower_look(*look)?,
            HirKind::Repetition(rep) => {
                let sub = self.pop();
                lower_repetition(rep, sub)
            }
            HirKind::Capture(cap) => {
                let sub = self.pop();
                Node::Capture {
                    index: cap.index as usize - 1,
                    name: cap.name.as_deref().map(String::from),
                    node: Box::new(sub),
                }
            }
            HirKind::Concat(subs) => Node::Concat(self.pop_n(subs.len())),
            HirKind::Alternation(subs) => {
                Node::Alternation(self.pop_n(subs.len()))
            }
        };

        self.stack.push(node);
        Ok(())
    }
}

fn lower_literal(literal: &Literal) -> Result<Node<char>, CompileError> {
    let s = std::str::from_utf8(&literal.0).map_err(|_| {
        CompileError::Unsupported("literal is not valid UTF-8".to_string())
    })?;

    let mut chars = s.chars();

    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Node::Element(c)),
        _ => Ok(Node::literal(s.chars())),
    }
}

fn lower_class(class: &Class) -> Node<char> {
    // Byte classes only contain ASCII bytes, the parser rejects any class
    // that could match invalid UTF-8.
    let ranges: Vec<(char, char)> = match class {
        Class::Unicode(class) => {
            class.ranges().iter().map(|r| (r.start(), r.end())).collect()
        }
        Class::Bytes(class) => class
            .ranges()
            .iter()
            .map(|r| (r.start() as char, r.end() as char))
            .collect(),
    };

    if ranges == [('\0', char::MAX)] {
        return Node::Any;
    }

    // The ranges are sorted and don't overlap.
    Node::predicate(move |c: &char| {
        ranges
            .binary_search_by(|(start, end)| {
                if end < c {
                    Ordering::Less
                } else if start > c {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    })
}

fn lower_repetition(rep: &Repetition, sub: Node<char>) -> Node<char> {
    let amount = match (rep.min, rep.max) {
        (0, None) => Amount::ZeroOrMore,
        (1, None) => Amount::OneOrMore,
        (0, Some(1)) => Amount::ZeroOrOne,
        (n, None) => Amount::NOrMore(n),
        (0, Some(m)) => Amount::UpToN(m),
        (n, Some(m)) if n == m => Amount::Exactly(n),
        (n, Some(m)) => Amount::Range(n, m),
    };

    let kind =
        if rep.greedy { QuantKind::Greedy } else { QuantKind::Reluctant };

    sub.repeat(amount, kind)
}

fn lower_look(look: Look) -> Result<Node<char>, CompileError> {
    let node = match look {
        Look::Start => Node::Anchor(Anchor::StartOfInput),
        Look::End => Node::Anchor(Anchor::EndOfInput),
        Look::StartLF => {
            zero_width(|input, pos, _| pos == 0 || input[pos - 1] == '\n')
        }
        Look::EndLF => {
            zero_width(|input, pos, end| pos == end || input[pos] == '\n')
        }
        Look::StartCRLF => zero_width(|input, pos, end| {
            pos == 0
                || input[pos - 1] == '\n'
                || (input[pos - 1] == '\r'
                    && (pos == end || input[pos] != '\n'))
        }),
        Look::EndCRLF => zero_width(|input, pos, end| {
            pos == end
                || input[pos] == '\r'
                || (input[pos] == '\n'
                    && (pos == 0 || input[pos - 1] != '\r'))
        }),
        Look::WordAscii => word_boundary(is_word_ascii, false),
        Look::WordAsciiNegate => word_boundary(is_word_ascii, true),
        Look::WordUnicode => word_boundary(is_word_unicode, false),
        Look::WordUnicodeNegate => word_boundary(is_word_unicode, true),
        other => {
            return Err(CompileError::Unsupported(format!(
                "look-around assertion {:?}",
                other
            )))
        }
    };

    Ok(node)
}

/// Returns a node that matches the empty string at positions where `f`
/// returns true. `f` receives the whole input, the current position and
/// the end of the search range.
fn zero_width<F>(f: F) -> Node<char>
where
    F: Fn(&[char], usize, usize) -> bool + Send + Sync + 'static,
{
    Node::consumer(move |input: &[char], range: Range<usize>| {
        f(input, range.start, range.end).then_some(range.start)
    })
}

fn word_boundary(is_word: fn(char) -> bool, negate: bool) -> Node<char> {
    zero_width(move |input, pos, end| {
        let before = pos > 0 && is_word(input[pos - 1]);
        let after = pos < end && is_word(input[pos]);
        (before != after) != negate
    })
}

fn is_word_ascii(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_word_unicode(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
