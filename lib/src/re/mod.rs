/*! Regular expressions on top of the backtracking VM.

The parsing of regular expressions is actually done by the [`regex-syntax`][1]
crate, which produces a high-level intermediate representation (HIR) for a
given regular expression in text form. The HIR is then lowered into a
[`Node`] by [`hir::lower`], and the node is compiled by the same
[`Compiler`] used for hand-written patterns.

Regular expressions are matched over the characters of the input string,
but every offset returned by [`Regex`] is a byte offset within the string,
so it can be used for slicing the string directly.

[1]: https://docs.rs/regex-syntax
*/

use std::ops::Range;

use log::warn;

use crate::compiler::ast::Node;
use crate::compiler::Compiler;
use crate::config::Config;
use crate::engine::{Engine, Match, MatchMode, Program};
use crate::Error;

pub mod hir;
pub mod parser;

pub use parser::Parser;

#[cfg(test)]
mod tests;

/// A compiled regular expression.
#[derive(Clone)]
pub struct Regex {
    pattern: String,
    engine: Engine<char>,
}

impl Regex {
    /// Compiles a regular expression with the default configuration.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Self::with_config(pattern, &Config::default())
    }

    /// Compiles a regular expression with the given configuration.
    pub fn with_config(pattern: &str, config: &Config) -> Result<Self, Error> {
        let node: Node<char> =
            Parser::with_config(&config.syntax).parse_node(pattern)?;

        let program = Compiler::new()
            .max_instructions(config.engine.max_instructions)
            .compile(&node)?;

        Ok(Self {
            pattern: pattern.to_string(),
            engine: Engine::with_config(program, &config.engine),
        })
    }

    /// Returns the source code of the regular expression.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    #[inline]
    pub fn engine(&self) -> &Engine<char> {
        &self.engine
    }

    #[inline]
    pub fn program(&self) -> &Program<char> {
        self.engine.program()
    }

    /// Returns true if the regular expression matches the whole `haystack`.
    pub fn matches(&self, haystack: &str) -> bool {
        let input: Vec<char> = haystack.chars().collect();
        self.engine
            .consume(&input, 0..input.len(), MatchMode::Whole)
            .is_some()
    }

    /// Returns the longest prefix of `haystack` matched by the regular
    /// expression, according to the priorities of its alternatives and
    /// quantifiers. [`None`] means that no prefix, not even the empty one,
    /// matches.
    pub fn match_prefix<'h>(&self, haystack: &'h str) -> Option<&'h str> {
        let input: Vec<char> = haystack.chars().collect();
        let end =
            self.engine.consume(&input, 0..input.len(), MatchMode::Prefix)?;
        let offsets = byte_offsets(haystack);
        Some(&haystack[..offsets[end]])
    }

    /// Returns the range of the leftmost match in `haystack`.
    pub fn find(&self, haystack: &str) -> Option<Range<usize>> {
        self.captures(haystack)?.into_iter().next().flatten()
    }

    /// Returns the ranges of the leftmost match in `haystack` and of each
    /// capture group. The first item in the result is the range of the
    /// whole match, followed by the range of each group in the order in
    /// which they appear in the regular expression. Groups that didn't
    /// participate in the match are [`None`].
    pub fn captures(
        &self,
        haystack: &str,
    ) -> Option<Vec<Option<Range<usize>>>> {
        let input: Vec<char> = haystack.chars().collect();
        let m = self.search(&input)?;
        let offsets = byte_offsets(haystack);
        let to_bytes = |r: Range<usize>| offsets[r.start]..offsets[r.end];

        let mut result = vec![Some(to_bytes(m.range))];
        result.extend(m.captures.into_iter().map(|c| c.map(to_bytes)));
        Some(result)
    }

    /// Tries a match at each position of `input`, from left to right, and
    /// returns the first one found.
    fn search(&self, input: &[char]) -> Option<Match> {
        for start in 0..=input.len() {
            match self.engine.find_match(
                input,
                start..input.len(),
                MatchMode::Prefix,
            ) {
                Ok(Some(m)) => return Some(m),
                Ok(None) => {}
                Err(err) => {
                    warn!("search for /{}/ aborted: {}", self.pattern, err);
                    return None;
                }
            }
        }
        None
    }
}

/// Returns the byte offset of each character in `s`, followed by the length
/// of `s`.
fn byte_offsets(s: &str) -> Vec<usize> {
    s.char_indices().map(|(i, _)| i).chain([s.len()]).collect()
}
