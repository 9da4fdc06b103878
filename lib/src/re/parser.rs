use regex_syntax::hir::Hir;

use crate::compiler::ast::Node;
use crate::config::SyntaxConfig;
use crate::errors::CompileError;
use crate::re::hir::lower;

/// A regular expression parser.
///
/// Takes the source code of a regular expression and produces its
/// corresponding [`regex_syntax::hir::Hir`], or directly the [`Node`] that
/// can be passed to the compiler.
pub struct Parser {
    case_insensitive: bool,
    dot_matches_new_line: bool,
    unicode: bool,
    multi_line: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::with_config(&SyntaxConfig::default())
    }

    /// Creates a parser that uses the options in `config`.
    pub fn with_config(config: &SyntaxConfig) -> Self {
        Self {
            case_insensitive: config.case_insensitive,
            dot_matches_new_line: config.dot_matches_new_line,
            unicode: config.unicode,
            multi_line: config.multi_line,
        }
    }

    /// Parses the regexp as a case-insensitive one, even if it doesn't use
    /// the `i` flag.
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// If true, the dot (`.`) also matches new line characters.
    pub fn dot_matches_new_line(mut self, yes: bool) -> Self {
        self.dot_matches_new_line = yes;
        self
    }

    /// If false, classes like `\w` only contain ASCII characters.
    pub fn unicode(mut self, yes: bool) -> Self {
        self.unicode = yes;
        self
    }

    /// If true, `^` and `$` also match at the start and end of each line.
    pub fn multi_line(mut self, yes: bool) -> Self {
        self.multi_line = yes;
        self
    }

    /// Parses the regexp and returns its HIR.
    ///
    /// The HIR is always valid UTF-8, as the matching is done over
    /// characters. Patterns that could match invalid UTF-8, like `(?-u:\xFF)`,
    /// are rejected.
    pub fn parse(&self, pattern: &str) -> Result<Hir, CompileError> {
        let hir = regex_syntax::ParserBuilder::new()
            .case_insensitive(self.case_insensitive)
            .dot_matches_new_line(self.dot_matches_new_line)
            .unicode(self.unicode)
            .multi_line(self.multi_line)
            .utf8(true)
            .build()
            .parse(pattern)?;

        Ok(hir)
    }

    /// Parses the regexp and lowers its HIR into a [`Node`].
    pub fn parse_node(
        &self,
        pattern: &str,
    ) -> Result<Node<char>, CompileError> {
        lower(&self.parse(pattern)?)
    }
}
