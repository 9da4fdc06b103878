use std::fmt::{Debug, Display, Formatter};
use std::ops::Range;
use std::sync::Arc;

use crate::engine::instr::Instruction;
use crate::engine::registers::RegisterInfo;

/// Predicate over a single input element, used by `MATCH_PREDICATE`.
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Custom consumer used by `CONSUME_BY`.
///
/// Receives the whole input and the range that goes from the current
/// position to the end of the search range. Returns the new position, which
/// must lie within that range, or [`None`] if the input doesn't match.
pub type ConsumeFunction<E> =
    Arc<dyn Fn(&[E], Range<usize>) -> Option<usize> + Send + Sync>;

/// An assembled program, ready to be executed.
///
/// Programs are produced by [`crate::engine::Builder::assemble`] and are
/// immutable. The same program can be executed by any number of processors,
/// in any number of threads.
#[derive(Clone)]
pub struct Program<E> {
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) static_elements: Vec<E>,
    pub(crate) static_strings: Vec<String>,
    pub(crate) static_predicates: Vec<Predicate<E>>,
    pub(crate) static_consume_functions: Vec<ConsumeFunction<E>>,
    pub(crate) register_info: RegisterInfo,
}

impl<E> Program<E> {
    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        self.instructions.as_slice()
    }

    #[inline]
    pub fn elements(&self) -> &[E] {
        self.static_elements.as_slice()
    }

    #[inline]
    pub fn strings(&self) -> &[String] {
        self.static_strings.as_slice()
    }

    #[inline]
    pub fn predicates(&self) -> &[Predicate<E>] {
        self.static_predicates.as_slice()
    }

    #[inline]
    pub fn consume_functions(&self) -> &[ConsumeFunction<E>] {
        self.static_consume_functions.as_slice()
    }

    #[inline]
    pub fn register_info(&self) -> &RegisterInfo {
        &self.register_info
    }

    /// Number of instructions in the program.
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl<E: Debug> Debug for Program<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Disassembles the program.
///
/// ```text
/// elements: ['a']
/// strings: []
/// [0] SAVE @3 // ACCEPT
/// [1] MATCH %e0
/// [2] BRANCH @0 // SAVE @3
/// [3] ACCEPT
/// ```
impl<E: Debug> Display for Program<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "elements: {:?}", self.static_elements)?;
        writeln!(f, "strings: {:?}", self.static_strings)?;

        if !self.static_predicates.is_empty() {
            writeln!(f, "predicates: {}", self.static_predicates.len())?;
        }

        if !self.static_consume_functions.is_empty() {
            writeln!(
                f,
                "consume functions: {}",
                self.static_consume_functions.len()
            )?;
        }

        for (idx, instr) in self.instructions.iter().enumerate() {
            write!(f, "[{}] {}", idx, instr)?;
            if let Some(s) = instr.string() {
                write!(f, " // {:?}", self.static_strings[s.index()])?;
            }
            if let Some(target) = instr.target() {
                match self.instructions.get(target.index()) {
                    Some(target) => write!(f, " // {}", target)?,
                    None => write!(f, " // <end>")?,
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
