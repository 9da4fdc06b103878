/*!
Compiles pattern trees into programs for the backtracking VM.

Each kind of [`Node`] is translated into a fixed sequence of instructions.
For example, the greedy repetition `p*` produces:

```text
start:
    SAVE done
    ... code for p ...
    BRANCH start
done:
```

while the alternation `p1|p2|p3` produces:

```text
    SAVE next1
    ... code for p1 ...
    BRANCH done
next1:
    SAVE next2
    ... code for p2 ...
    BRANCH done
next2:
    ... code for p3 ...
done:
```

Grammars are compiled into a set of functions, one per production, that
call each other with `CALL` and return with `RET`. Productions are compiled
on demand, the first time they are referenced, so each one is compiled at
most once even if the grammar is recursive.
 */

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::compiler::ast::{Anchor, Grammar, Lookaround, Node, QuantKind};
use crate::config::DEFAULT_MAX_INSTRUCTIONS;
use crate::engine::{
    AddressToken, BoolRegister, Builder, CaptureRegister, Operand,
    PositionRegister, Program,
};
use crate::errors::CompileError;

pub mod ast;

#[cfg(test)]
mod tests;

/// Compiles a [`Node`] or a [`Grammar`] into a [`Program`].
pub struct Compiler<E> {
    builder: Builder<E>,
    /// Capture register for each capture group index.
    captures: Vec<CaptureRegister>,
    /// Entry point of each production referenced so far.
    functions: FxHashMap<String, AddressToken>,
    /// Productions that have been referenced but not compiled yet.
    worklist: Vec<String>,
    /// Bool register used by the progress checks in loops. It is allocated
    /// the first time it is needed, and shared by every loop, as its value
    /// is consumed by the instruction that follows the one that sets it.
    progress: Option<BoolRegister>,
    max_instructions: usize,
}

impl<E> Default for Compiler<E>
where
    E: Clone + Eq + Hash + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Compiler<E>
where
    E: Clone + Eq + Hash + 'static,
{
    /// Creates a new compiler.
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
            captures: Vec::new(),
            functions: FxHashMap::default(),
            worklist: Vec::new(),
            progress: None,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
        }
    }

    /// Maximum number of instructions in the compiled program. When the
    /// program would be larger, [`CompileError::TooLarge`] is returned.
    pub fn max_instructions(mut self, limit: usize) -> Self {
        self.max_instructions = limit.min(Operand::MAX_PAYLOAD as usize);
        self
    }

    /// Compiles a single pattern. The resulting program accepts the input
    /// once the pattern has been matched.
    pub fn compile(
        mut self,
        node: &Node<E>,
    ) -> Result<Program<E>, CompileError> {
        self.allocate_captures(node.max_capture_index());
        self.emit(node, None)?;
        self.builder.build_accept();
        self.check_size()?;
        Ok(self.builder.assemble())
    }

    /// Compiles a grammar. The resulting program accepts the input once the
    /// start production has been matched.
    pub fn compile_grammar(
        mut self,
        grammar: &Grammar<E>,
    ) -> Result<Program<E>, CompileError> {
        self.allocate_captures(
            grammar
                .productions
                .values()
                .filter_map(|node| node.max_capture_index())
                .max(),
        );

        let start = self.function(grammar.start(), Some(grammar))?;

        self.builder.build_branch(start);

        while let Some(name) = self.worklist.pop() {
            let token = self.functions[&name];
            // `function` only adds productions that exist to the worklist.
            let node = &grammar.productions[&name];
            self.builder.label(token);
            self.builder.build_nop(Some(name.as_str()));
            self.emit(node, Some(grammar))?;
            // When the start production returns with an empty call stack
            // the input is accepted.
            self.builder.build_ret();
        }

        self.check_size()?;
        Ok(self.builder.assemble())
    }

    fn allocate_captures(&mut self, max_index: Option<usize>) {
        if let Some(max_index) = max_index {
            for _ in 0..=max_index {
                let c = self.builder.make_capture_register();
                self.captures.push(c);
            }
        }
    }

    /// Returns the entry point for the production with the given name,
    /// scheduling the production for compilation if this is the first time
    /// it is referenced.
    fn function(
        &mut self,
        name: &str,
        grammar: Option<&Grammar<E>>,
    ) -> Result<AddressToken, CompileError> {
        if let Some(token) = self.functions.get(name) {
            return Ok(*token);
        }

        if grammar.and_then(|g| g.get(name)).is_none() {
            return Err(CompileError::UndefinedProduction(name.to_string()));
        }

        let token = self.builder.make_address();
        self.functions.insert(name.to_string(), token);
        self.worklist.push(name.to_string());

        Ok(token)
    }

    fn progress_register(&mut self) -> BoolRegister {
        *self
            .progress
            .get_or_insert_with(|| self.builder.make_bool_register())
    }

    #[inline]
    fn check_size(&self) -> Result<(), CompileError> {
        if self.builder.len() > self.max_instructions {
            Err(CompileError::TooLarge)
        } else {
            Ok(())
        }
    }

    fn emit(
        &mut self,
        node: &Node<E>,
        grammar: Option<&Grammar<E>>,
    ) -> Result<(), CompileError> {
        self.check_size()?;

        match node {
            Node::Empty => {}
            Node::Any => {
                self.builder.build_consume(1);
            }
            Node::Element(e) => {
                self.builder.build_match(e.clone());
            }
            Node::Literal(elements) => {
                for e in elements {
                    self.builder.build_match(e.clone());
                }
            }
            Node::Predicate(p) => {
                let p = self.builder.add_predicate(p.clone());
                self.builder.build_match_predicate(p);
            }
            Node::Consumer(f) => {
                let f = self.builder.add_consume_function(f.clone());
                self.builder.build_consume_by(f);
            }
            Node::Concat(children) => {
                for child in children {
                    self.emit(child, grammar)?;
                }
            }
            Node::Alternation(children) => {
                self.emit_alternation(children, grammar)?;
            }
            Node::Quantification { amount, kind, node } => {
                let (min, max) = amount.bounds();
                self.emit_quantification(min, max, *kind, node, grammar)?;
            }
            Node::Capture { index, node, .. } => {
                let c = self.captures[*index];
                self.builder.build_begin_capture(c);
                self.emit(node, grammar)?;
                self.builder.build_end_capture(c);
            }
            Node::Reference(name) => {
                let f = self.function(name, grammar)?;
                self.builder.build_call(f);
            }
            Node::Lookaround { kind, node } => {
                self.emit_lookaround(*kind, node, grammar)?;
            }
            Node::Atomic(node) => {
                self.emit_atomic(|c| c.emit(node, grammar))?;
            }
            Node::Anchor(Anchor::StartOfInput) => {
                let f = self.builder.make_consume_function(|_, range| {
                    (range.start == 0).then_some(range.start)
                });
                self.builder.build_consume_by(f);
            }
            Node::Anchor(Anchor::EndOfInput) => {
                self.emit_lookaround(
                    Lookaround::NegativeAhead,
                    &Node::Any,
                    grammar,
                )?;
            }
            Node::Backreference(index) => {
                let c = self
                    .captures
                    .get(*index)
                    .copied()
                    .ok_or(CompileError::InvalidBackreference(*index))?;
                self.builder.build_backreference(c);
            }
        }

        Ok(())
    }

    fn emit_alternation(
        &mut self,
        children: &[Node<E>],
        grammar: Option<&Grammar<E>>,
    ) -> Result<(), CompileError> {
        let Some((last, rest)) = children.split_last() else {
            // An alternation without alternatives never matches.
            self.builder.build_fail();
            return Ok(());
        };

        let done = self.builder.make_address();

        for child in rest {
            let next = self.builder.make_address();
            self.builder.build_save(next);
            self.emit(child, grammar)?;
            self.builder.build_branch(done);
            self.builder.label(next);
        }

        self.emit(last, grammar)?;
        self.builder.label(done);

        Ok(())
    }

    fn emit_quantification(
        &mut self,
        min: u32,
        max: Option<u32>,
        kind: QuantKind,
        node: &Node<E>,
        grammar: Option<&Grammar<E>>,
    ) -> Result<(), CompileError> {
        if let Some(max) = max {
            if min > max {
                return Err(CompileError::Unsupported(format!(
                    "repetition with min ({}) greater than max ({})",
                    min, max
                )));
            }
        }

        if kind == QuantKind::Possessive {
            return self.emit_atomic(|c| {
                let greedy = QuantKind::Greedy;
                c.emit_quantification(min, max, greedy, node, grammar)
            });
        }

        for _ in 0..min {
            self.emit(node, grammar)?;
        }

        match max {
            None => self.emit_star(kind, node, grammar),
            Some(max) => self.emit_optional(max - min, kind, node, grammar),
        }
    }

    /// Emits `n` optional copies of `node`, each of them only tried if the
    /// previous one matched.
    fn emit_optional(
        &mut self,
        n: u32,
        kind: QuantKind,
        node: &Node<E>,
        grammar: Option<&Grammar<E>>,
    ) -> Result<(), CompileError> {
        if n == 0 {
            return Ok(());
        }

        let done = self.builder.make_address();

        for _ in 0..n {
            if kind == QuantKind::Greedy {
                self.builder.build_save(done);
            } else {
                let elem = self.builder.make_address();
                self.builder.build_save(elem);
                self.builder.build_branch(done);
                self.builder.label(elem);
            }
            self.emit(node, grammar)?;
        }

        self.builder.label(done);

        Ok(())
    }

    /// Emits an unbounded repetition of `node`.
    ///
    /// If `node` can match the empty string the body of the loop is
    /// bracketed by a progress check, which exits the loop when an
    /// iteration didn't consume anything. Otherwise the loop could run
    /// forever without advancing.
    fn emit_star(
        &mut self,
        kind: QuantKind,
        node: &Node<E>,
        grammar: Option<&Grammar<E>>,
    ) -> Result<(), CompileError> {
        let check = if node.can_match_empty() {
            Some(self.builder.make_position_register())
        } else {
            None
        };

        let start = self.builder.make_address();
        let exit = self.builder.make_address();

        self.builder.label(start);

        if kind == QuantKind::Greedy {
            self.builder.build_save(exit);
        } else {
            let elem = self.builder.make_address();
            self.builder.build_save(elem);
            self.builder.build_branch(exit);
            self.builder.label(elem);
        }

        self.emit_iteration(node, check, exit, grammar)?;
        self.builder.build_branch(start);
        self.builder.label(exit);

        Ok(())
    }

    fn emit_iteration(
        &mut self,
        node: &Node<E>,
        check: Option<PositionRegister>,
        exit: AddressToken,
        grammar: Option<&Grammar<E>>,
    ) -> Result<(), CompileError> {
        if let Some(r) = check {
            self.builder.build_move_position(r);
        }

        self.emit(node, grammar)?;

        if let Some(r) = check {
            let no_progress = self.progress_register();
            self.builder.build_compare_position(r, no_progress);
            self.builder.build_cond_branch(no_progress, exit);
        }

        Ok(())
    }

    /// Emits the code produced by `f` inside an atomic group. Once the code
    /// matches, every save point pushed by it is discarded.
    ///
    /// ```text
    ///     SAVE intercept
    ///     ... code emitted by f ...
    ///     CLEAR_THROUGH intercept
    ///     BRANCH done
    /// intercept:
    ///     FAIL
    /// done:
    /// ```
    fn emit_atomic<F>(&mut self, f: F) -> Result<(), CompileError>
    where
        F: FnOnce(&mut Self) -> Result<(), CompileError>,
    {
        let intercept = self.builder.make_address();
        let done = self.builder.make_address();

        self.builder.build_save(intercept);
        f(self)?;
        self.builder.build_clear_through(intercept);
        self.builder.build_branch(done);
        self.builder.label(intercept);
        self.builder.build_fail();
        self.builder.label(done);

        Ok(())
    }

    /// Emits a lookahead assertion. Both kinds push a save point that
    /// resumes after the assertion at the current position, and another
    /// one that intercepts the failure of `node`.
    ///
    /// ```text
    ///     SAVE success
    ///     SAVE intercept
    ///     ... code for node ...
    ///     CLEAR_THROUGH intercept
    ///     FAIL                   (positive)   |   CLEAR; FAIL   (negative)
    /// intercept:
    ///     CLEAR; FAIL            (positive)   |   FAIL          (negative)
    /// success:
    /// ```
    ///
    /// Anything done by `node` (including captures) is undone when the
    /// processor backtracks to `success`.
    fn emit_lookaround(
        &mut self,
        kind: Lookaround,
        node: &Node<E>,
        grammar: Option<&Grammar<E>>,
    ) -> Result<(), CompileError> {
        let success = self.builder.make_address();
        let intercept = self.builder.make_address();

        self.builder.build_save(success);
        self.builder.build_save(intercept);
        self.emit(node, grammar)?;
        self.builder.build_clear_through(intercept);

        match kind {
            Lookaround::Ahead => {
                self.builder.build_fail();
                self.builder.label(intercept);
                self.builder.build_clear();
                self.builder.build_fail();
            }
            Lookaround::NegativeAhead => {
                self.builder.build_clear();
                self.builder.build_fail();
                self.builder.label(intercept);
                self.builder.build_fail();
            }
        }

        self.builder.label(success);

        Ok(())
    }
}
