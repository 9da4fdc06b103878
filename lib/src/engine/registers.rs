use bitvec::vec::BitVec;

use crate::engine::program::{ConsumeFunction, Predicate, Program};
use crate::engine::typed::{
    BoolRegister, CaptureRegister, ConsumeFunctionRegister, ElementRegister,
    PositionRegister, PredicateRegister, StringRegister,
};

/// Number of registers of each kind used by a program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RegisterInfo {
    pub elements: usize,
    pub strings: usize,
    pub bools: usize,
    pub predicates: usize,
    pub consume_functions: usize,
    pub positions: usize,
    pub captures: usize,
}

/// State of a capture register.
///
/// `BEGIN_CAPTURE` pushes the current position onto `open`, and
/// `END_CAPTURE` pops it and stores the matched range in `value`. A group
/// can be open more than once at the same time when it is re-entered by a
/// recursive call. Each activation closes the start it opened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureSlot {
    pub open: Vec<usize>,
    pub value: Option<(usize, usize)>,
}

/// The register file of a processor.
///
/// Static registers are borrowed from the [`Program`], while bool, position
/// and capture registers are owned by the processor and mutated while the
/// program runs.
pub(crate) struct Registers<'a, E> {
    elements: &'a [E],
    strings: &'a [String],
    predicates: &'a [Predicate<E>],
    consume_functions: &'a [ConsumeFunction<E>],
    bools: BitVec,
    positions: Vec<usize>,
    captures: Vec<CaptureSlot>,
}

impl<'a, E> Registers<'a, E> {
    /// Creates the register file for running `program`. Position registers
    /// are initialized to `sentinel`, which is never a valid position inside
    /// the search range before the end is reached.
    pub fn new(program: &'a Program<E>, sentinel: usize) -> Self {
        let info = program.register_info();
        Self {
            elements: program.elements(),
            strings: program.strings(),
            predicates: program.predicates(),
            consume_functions: program.consume_functions(),
            bools: BitVec::repeat(false, info.bools),
            positions: vec![sentinel; info.positions],
            captures: vec![CaptureSlot::default(); info.captures],
        }
    }

    #[inline]
    pub fn element(&self, r: ElementRegister) -> &'a E {
        let elements = self.elements;
        &elements[r.index()]
    }

    #[inline]
    pub fn string(&self, r: StringRegister) -> &'a str {
        let strings = self.strings;
        strings[r.index()].as_str()
    }

    #[inline]
    pub fn predicate(&self, r: PredicateRegister) -> &'a Predicate<E> {
        let predicates = self.predicates;
        &predicates[r.index()]
    }

    #[inline]
    pub fn consume_function(
        &self,
        r: ConsumeFunctionRegister,
    ) -> &'a ConsumeFunction<E> {
        let functions = self.consume_functions;
        &functions[r.index()]
    }

    #[inline]
    pub fn bool(&self, r: BoolRegister) -> bool {
        self.bools[r.index()]
    }

    /// Sets a bool register, returning its previous value.
    #[inline]
    pub fn set_bool(&mut self, r: BoolRegister, value: bool) -> bool {
        self.bools.replace(r.index(), value)
    }

    #[inline]
    pub fn position(&self, r: PositionRegister) -> usize {
        self.positions[r.index()]
    }

    /// Sets a position register, returning its previous value.
    #[inline]
    pub fn set_position(
        &mut self,
        r: PositionRegister,
        value: usize,
    ) -> usize {
        std::mem::replace(&mut self.positions[r.index()], value)
    }

    #[inline]
    pub fn capture(&self, r: CaptureRegister) -> Option<(usize, usize)> {
        self.captures[r.index()].value
    }

    /// Opens a new activation of a capture group starting at `pos`.
    #[inline]
    pub fn begin_capture(&mut self, r: CaptureRegister, pos: usize) {
        self.captures[r.index()].open.push(pos);
    }

    /// Discards the most recent activation opened by
    /// [`Registers::begin_capture`].
    #[inline]
    pub fn undo_begin_capture(&mut self, r: CaptureRegister) {
        self.captures[r.index()].open.pop();
    }

    /// Closes the most recent activation of a capture group at `pos`.
    /// Returns the start of the activation and the previous value of the
    /// register, or [`None`] if the group is not open.
    pub fn end_capture(
        &mut self,
        r: CaptureRegister,
        pos: usize,
    ) -> Option<(usize, Option<(usize, usize)>)> {
        let slot = &mut self.captures[r.index()];
        let start = slot.open.pop()?;
        let old = slot.value.replace((start, pos));
        Some((start, old))
    }

    /// Reopens the activation closed by [`Registers::end_capture`] and
    /// restores the previous value.
    pub fn undo_end_capture(
        &mut self,
        r: CaptureRegister,
        start: usize,
        old: Option<(usize, usize)>,
    ) {
        let slot = &mut self.captures[r.index()];
        slot.open.push(start);
        slot.value = old;
    }

    /// Returns the ranges matched by each capture group, in register order.
    pub fn captures(
        &self,
    ) -> impl Iterator<Item = Option<(usize, usize)>> + '_ {
        self.captures.iter().map(|slot| slot.value)
    }
}
