/*!
The backtracking processor.

A [`Processor`] executes a [`Program`] over an input, one instruction per
call to [`Processor::cycle`]. Alternatives are explored depth-first: before
trying one of them the program pushes a save point that records where to
resume if the alternative fails. When some instruction fails, the most recent
save point is popped and execution continues from there, with the input
position, the call stack and the mutable registers restored to the state
they had when the save point was pushed.

Mutable state is restored by means of an undo trail. Each time a bool,
position or capture register changes, or the call stack is pushed or popped,
the old value is appended to the trail. Save points remember the length of
the trail, and restoring one undoes every entry above that length in reverse
order.
 */

use std::ops::Range;

use log::{debug, trace};

use crate::engine::instr::{Instruction, OpCode};
use crate::engine::program::Program;
use crate::engine::registers::Registers;
use crate::engine::typed::{
    marker, BoolRegister, CaptureRegister, InstructionAddress,
    PositionRegister,
};
use crate::engine::MatchMode;
use crate::MatchError;

/// Default value for [`Processor::max_save_points`].
pub const DEFAULT_MAX_SAVE_POINTS: usize = 1 << 20;

/// State of a processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// The program is still running.
    InProgress,
    /// The program has accepted the input.
    Accept,
    /// The program has rejected the input, or has been aborted.
    Fail,
}

/// Holds the program counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Controller {
    pub pc: InstructionAddress,
}

impl Controller {
    /// Advances to the next instruction.
    #[inline]
    pub fn step(&mut self) {
        self.pc = self.pc.next();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SavePoint {
    /// Address where execution resumes.
    pc: InstructionAddress,
    /// Input position restored when resuming. [`None`] for save points
    /// pushed by `SAVE_ADDRESS`.
    pos: Option<usize>,
    /// Length of the call stack when the save point was pushed.
    stack_end: usize,
    /// Length of the undo trail when the save point was pushed.
    trail_end: usize,
}

#[derive(Clone, Copy, Debug)]
enum Undo {
    Bool(BoolRegister, bool),
    Position(PositionRegister, usize),
    BeginCapture(CaptureRegister),
    EndCapture(CaptureRegister, usize, Option<(usize, usize)>),
    Call,
    Ret(InstructionAddress),
}

/// Executes a [`Program`] over some input.
pub struct Processor<'a, E> {
    instructions: &'a [Instruction],
    input: &'a [E],
    range: Range<usize>,
    controller: Controller,
    current_position: usize,
    registers: Registers<'a, E>,
    save_points: Vec<SavePoint>,
    call_stack: Vec<InstructionAddress>,
    trail: Vec<Undo>,
    state: State,
    match_mode: MatchMode,
    cycle_count: u64,
    max_save_points: usize,
    cycle_limit: Option<u64>,
    enable_tracing: bool,
    abort_reason: Option<&'a str>,
    error: Option<MatchError>,
}

impl<'a, E> Processor<'a, E>
where
    E: PartialEq,
{
    /// Creates a processor that runs `program` over `input[range]`.
    ///
    /// The elements of `input` outside `range` are never consumed, but
    /// consume functions can look at them, for instance for finding out if
    /// the current position is at a word boundary.
    ///
    /// # Panics
    ///
    /// If `range` is not a valid range within `input`.
    pub fn new(
        program: &'a Program<E>,
        input: &'a [E],
        range: Range<usize>,
    ) -> Self {
        assert!(
            range.start <= range.end && range.end <= input.len(),
            "range {:?} out of bounds for input of length {}",
            range,
            input.len()
        );
        Self {
            instructions: program.instructions(),
            input,
            current_position: range.start,
            registers: Registers::new(program, range.end),
            range,
            controller: Controller { pc: InstructionAddress::new(0) },
            save_points: Vec::new(),
            call_stack: Vec::new(),
            trail: Vec::new(),
            state: State::InProgress,
            match_mode: MatchMode::Prefix,
            cycle_count: 0,
            max_save_points: DEFAULT_MAX_SAVE_POINTS,
            cycle_limit: None,
            enable_tracing: false,
            abort_reason: None,
            error: None,
        }
    }

    /// Sets the match mode. The default is [`MatchMode::Prefix`].
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Maximum number of save points that can be on the stack at the same
    /// time. When the limit is exceeded the processor fails with
    /// [`MatchError::BacktrackLimitExceeded`].
    pub fn max_save_points(mut self, limit: usize) -> Self {
        self.max_save_points = limit;
        self
    }

    /// Maximum number of cycles. When the limit is reached the processor
    /// fails with [`MatchError::CycleLimitExceeded`].
    pub fn cycle_limit(mut self, limit: Option<u64>) -> Self {
        self.cycle_limit = limit;
        self
    }

    /// If true, every executed instruction is logged.
    pub fn enable_tracing(mut self, yes: bool) -> Self {
        self.enable_tracing = yes;
        self
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn pc(&self) -> InstructionAddress {
        self.controller.pc
    }

    #[inline]
    pub fn current_position(&self) -> usize {
        self.current_position
    }

    #[inline]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Number of save points currently on the stack.
    #[inline]
    pub fn save_point_count(&self) -> usize {
        self.save_points.len()
    }

    /// Number of return addresses currently on the call stack.
    #[inline]
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// The reason given by the `ABORT` instruction that ended the execution,
    /// if any.
    #[inline]
    pub fn abort_reason(&self) -> Option<&'a str> {
        self.abort_reason
    }

    /// The error that ended the execution, if some resource limit was
    /// exceeded.
    #[inline]
    pub fn error(&self) -> Option<MatchError> {
        self.error
    }

    /// Ranges matched by each capture group. Groups that didn't participate
    /// in the match are [`None`].
    pub fn captures(&self) -> Vec<Option<Range<usize>>> {
        self.registers
            .captures()
            .map(|value| value.map(|(start, end)| start..end))
            .collect()
    }

    /// Runs the processor until it either accepts or fails.
    pub fn run(&mut self) -> State {
        while self.state == State::InProgress {
            self.cycle();
        }
        self.state
    }

    /// Executes a single instruction.
    ///
    /// # Panics
    ///
    /// If the processor is not in the [`State::InProgress`] state, or if the
    /// program is malformed.
    pub fn cycle(&mut self) {
        assert_eq!(
            self.state,
            State::InProgress,
            "cycle() called on a processor that has already halted"
        );

        self.check_invariants();

        if let Some(limit) = self.cycle_limit {
            if self.cycle_count >= limit {
                self.halt_with(MatchError::CycleLimitExceeded { limit });
                return;
            }
        }

        let pc = self.controller.pc;
        let instr = *self.instructions.get(pc.index()).unwrap_or_else(|| {
            panic!("pc {} is past the end of the program", pc)
        });

        if self.enable_tracing {
            trace!(
                "[{}] pos={} {} (save points: {}, call depth: {})",
                pc.index(),
                self.current_position,
                instr,
                self.save_points.len(),
                self.call_stack.len(),
            );
        }

        self.cycle_count += 1;

        match instr.opcode() {
            OpCode::Invalid => panic!("invalid instruction at {}", pc),
            OpCode::Nop => {
                if let Some(s) = instr.string() {
                    if self.enable_tracing {
                        trace!("{}", self.registers.string(s));
                    }
                }
                self.controller.step();
            }
            OpCode::Print => {
                let s = instr.payload::<marker::StringRegister>();
                debug!("{}", self.registers.string(s));
                self.controller.step();
            }
            OpCode::Branch => {
                self.controller.pc = instr.payload();
            }
            OpCode::CondBranch => {
                if self.registers.bool(instr.condition()) {
                    self.controller.pc = instr.payload();
                } else {
                    self.controller.step();
                }
            }
            OpCode::Save => {
                let pos = Some(self.current_position);
                self.push_save_point(instr.payload(), pos);
            }
            OpCode::SaveAddress => {
                self.push_save_point(instr.payload(), None);
            }
            OpCode::Clear => {
                self.save_points
                    .pop()
                    .expect("CLEAR executed with an empty save point stack");
                self.discard_trail_if_unused();
                self.controller.step();
            }
            OpCode::ClearThrough => {
                let target: InstructionAddress = instr.payload();
                loop {
                    let sp = self.save_points.pop().unwrap_or_else(|| {
                        panic!("no save point to clear through {}", target)
                    });
                    if sp.pc == target {
                        break;
                    }
                }
                self.discard_trail_if_unused();
                self.controller.step();
            }
            OpCode::Restore | OpCode::Fail => {
                self.signal_failure();
            }
            OpCode::Call => {
                self.controller.step();
                self.call_stack.push(self.controller.pc);
                self.record(Undo::Call);
                self.controller.pc = instr.payload();
            }
            OpCode::Ret => match self.call_stack.pop() {
                Some(addr) => {
                    self.record(Undo::Ret(addr));
                    self.controller.pc = addr;
                }
                None => self.accept(),
            },
            OpCode::Accept => {
                self.accept();
            }
            OpCode::Abort => {
                self.abort_reason =
                    instr.string().map(|s| self.registers.string(s));
                if self.enable_tracing {
                    trace!("aborted: {}", self.abort_reason.unwrap_or(""));
                }
                self.state = State::Fail;
            }
            OpCode::Consume => {
                let n = instr.payload::<marker::Distance>().index();
                if self.range.end - self.current_position >= n {
                    self.current_position += n;
                    self.controller.step();
                } else {
                    self.signal_failure();
                }
            }
            OpCode::ConsumeBy => {
                let f = self.registers.consume_function(instr.payload());
                let from = self.current_position;
                match f(self.input, from..self.range.end) {
                    Some(pos) => {
                        assert!(
                            (from..=self.range.end).contains(&pos),
                            "consume function returned {} outside {}..={}",
                            pos,
                            from,
                            self.range.end
                        );
                        self.current_position = pos;
                        self.controller.step();
                    }
                    None => self.signal_failure(),
                }
            }
            OpCode::Match => {
                let expected = self.registers.element(instr.payload());
                if self.load() == Some(expected) {
                    self.current_position += 1;
                    self.controller.step();
                } else {
                    self.signal_failure();
                }
            }
            OpCode::MatchPredicate => {
                let predicate = self.registers.predicate(instr.payload());
                match self.load() {
                    Some(e) if predicate(e) => {
                        self.current_position += 1;
                        self.controller.step();
                    }
                    _ => self.signal_failure(),
                }
            }
            OpCode::Assertion => {
                let expected = self.registers.element(instr.payload());
                let value = self.load() == Some(expected);
                self.set_bool(instr.condition(), value);
                self.controller.step();
            }
            OpCode::MovePosition => {
                let r = instr.payload();
                let pos = self.current_position;
                let old = self.registers.set_position(r, pos);
                self.record(Undo::Position(r, old));
                self.controller.step();
            }
            OpCode::ComparePosition => {
                let r = instr.payload();
                let pos = self.registers.position(r);
                let value = pos == self.current_position;
                self.set_bool(instr.condition(), value);
                self.controller.step();
            }
            OpCode::BeginCapture => {
                let c = instr.payload();
                self.registers.begin_capture(c, self.current_position);
                self.record(Undo::BeginCapture(c));
                self.controller.step();
            }
            OpCode::EndCapture => {
                let c = instr.payload();
                let (start, old) = self
                    .registers
                    .end_capture(c, self.current_position)
                    .unwrap_or_else(|| {
                        panic!("END_CAPTURE {} without BEGIN_CAPTURE", c)
                    });
                self.record(Undo::EndCapture(c, start, old));
                self.controller.step();
            }
            OpCode::Backreference => {
                let c = instr.payload();
                match self.registers.capture(c) {
                    Some((start, end)) if self.matches_at(start..end) => {
                        self.current_position += end - start;
                        self.controller.step();
                    }
                    _ => self.signal_failure(),
                }
            }
        }
    }

    /// Returns the element at the current position, or [`None`] if the end
    /// of the search range has been reached.
    #[inline]
    fn load(&self) -> Option<&'a E> {
        let input = self.input;
        if self.current_position < self.range.end {
            Some(&input[self.current_position])
        } else {
            None
        }
    }

    /// True if the input at the current position starts with
    /// `input[captured]`.
    fn matches_at(&self, captured: Range<usize>) -> bool {
        let len = captured.len();
        let pos = self.current_position;
        self.range.end - pos >= len
            && self.input[captured] == self.input[pos..pos + len]
    }

    fn accept(&mut self) {
        if self.match_mode == MatchMode::Whole
            && self.current_position != self.range.end
        {
            self.signal_failure();
        } else {
            self.state = State::Accept;
        }
    }

    fn halt_with(&mut self, err: MatchError) {
        if self.enable_tracing {
            trace!("halted: {}", err);
        }
        self.error = Some(err);
        self.state = State::Fail;
    }

    fn push_save_point(&mut self, pc: InstructionAddress, pos: Option<usize>) {
        if self.save_points.len() >= self.max_save_points {
            self.halt_with(MatchError::BacktrackLimitExceeded {
                limit: self.max_save_points,
            });
            return;
        }
        self.save_points.push(SavePoint {
            pc,
            pos,
            stack_end: self.call_stack.len(),
            trail_end: self.trail.len(),
        });
        self.controller.step();
    }

    /// Backtracks to the most recent save point. If there is none, the
    /// processor fails.
    fn signal_failure(&mut self) {
        let Some(sp) = self.save_points.pop() else {
            self.state = State::Fail;
            return;
        };

        self.unwind(sp.trail_end);

        debug_assert_eq!(
            self.call_stack.len(),
            sp.stack_end,
            "call stack not restored to its depth at save time"
        );

        self.controller.pc = sp.pc;

        if let Some(pos) = sp.pos {
            self.current_position = pos;
        }

        self.discard_trail_if_unused();
    }

    /// Appends an entry to the undo trail. Nothing is recorded when there is
    /// no save point that could be restored.
    #[inline]
    fn record(&mut self, undo: Undo) {
        if !self.save_points.is_empty() {
            self.trail.push(undo);
        }
    }

    #[inline]
    fn discard_trail_if_unused(&mut self) {
        if self.save_points.is_empty() {
            self.trail.clear();
        }
    }

    fn unwind(&mut self, trail_end: usize) {
        for undo in self.trail.drain(trail_end..).rev() {
            match undo {
                Undo::Bool(r, old) => {
                    self.registers.set_bool(r, old);
                }
                Undo::Position(r, old) => {
                    self.registers.set_position(r, old);
                }
                Undo::BeginCapture(r) => {
                    self.registers.undo_begin_capture(r);
                }
                Undo::EndCapture(r, start, old) => {
                    self.registers.undo_end_capture(r, start, old);
                }
                Undo::Call => {
                    self.call_stack.pop();
                }
                Undo::Ret(addr) => {
                    self.call_stack.push(addr);
                }
            }
        }
    }

    fn set_bool(&mut self, r: BoolRegister, value: bool) {
        let old = self.registers.set_bool(r, value);
        self.record(Undo::Bool(r, old));
    }

    #[inline]
    fn check_invariants(&self) {
        debug_assert!(
            self.range.start <= self.current_position
                && self.current_position <= self.range.end
        );
        // Trail ends never decrease along the save point stack.
        debug_assert!(self
            .save_points
            .last()
            .map_or(true, |sp| sp.trail_end <= self.trail.len()));
    }
}
