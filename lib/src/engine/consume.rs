use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Range;

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::processor::{Processor, State, DEFAULT_MAX_SAVE_POINTS};
use crate::engine::program::Program;
use crate::MatchError;

/// Determines which positions are accepted as the end of a match.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The match can end anywhere. The first acceptance wins.
    #[default]
    Prefix,
    /// The match must end exactly at the end of the search range. Reaching
    /// `ACCEPT` anywhere else is treated as a failure, and the search
    /// continues with the next alternative.
    Whole,
}

/// A successful match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    /// Range of the input covered by the match.
    pub range: Range<usize>,
    /// Ranges matched by each capture group. Groups that didn't participate
    /// in the match are [`None`].
    pub captures: Vec<Option<Range<usize>>>,
}

impl Match {
    /// Position where the match ends.
    #[inline]
    pub fn end(&self) -> usize {
        self.range.end
    }
}

/// Runs a [`Program`] against inputs.
///
/// An engine is immutable once configured and can be shared among threads.
/// Each call to a matching function creates its own [`Processor`].
#[derive(Clone)]
pub struct Engine<E> {
    program: Program<E>,
    enable_tracing: bool,
    match_mode: MatchMode,
    max_save_points: usize,
    cycle_limit: Option<u64>,
}

impl<E> Engine<E>
where
    E: Clone + Eq + Hash + Debug,
{
    /// Creates an engine that runs `program` with the default settings.
    pub fn new(program: Program<E>) -> Self {
        Self {
            program,
            enable_tracing: false,
            match_mode: MatchMode::Prefix,
            max_save_points: DEFAULT_MAX_SAVE_POINTS,
            cycle_limit: None,
        }
    }

    /// Creates an engine that runs `program` with the given settings.
    pub fn with_config(program: Program<E>, config: &EngineConfig) -> Self {
        Self::new(program)
            .enable_tracing(config.enable_tracing)
            .match_mode(config.match_mode)
            .max_save_points(config.max_save_points)
            .cycle_limit(config.cycle_limit)
    }

    /// If true, the input, every executed instruction and the result of each
    /// run are logged at the `trace` level.
    pub fn enable_tracing(mut self, yes: bool) -> Self {
        self.enable_tracing = yes;
        self
    }

    /// Match mode used by [`Engine::consume_all`].
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// See [`Processor::max_save_points`].
    pub fn max_save_points(mut self, limit: usize) -> Self {
        self.max_save_points = limit;
        self
    }

    /// See [`Processor::cycle_limit`].
    pub fn cycle_limit(mut self, limit: Option<u64>) -> Self {
        self.cycle_limit = limit;
        self
    }

    #[inline]
    pub fn program(&self) -> &Program<E> {
        &self.program
    }

    /// Creates a processor for running the program over `input[range]`,
    /// configured with the engine's settings.
    pub fn create_processor<'a>(
        &'a self,
        input: &'a [E],
        range: Range<usize>,
        mode: MatchMode,
    ) -> Processor<'a, E> {
        Processor::new(&self.program, input, range)
            .match_mode(mode)
            .enable_tracing(self.enable_tracing)
            .max_save_points(self.max_save_points)
            .cycle_limit(self.cycle_limit)
    }

    /// Matches the program against `input[range]`, returning the position
    /// where the match ends, or [`None`] if there's no match.
    ///
    /// Exceeding a resource limit is reported as a non-match. Use
    /// [`Engine::try_consume`] for telling both cases apart.
    pub fn consume(
        &self,
        input: &[E],
        range: Range<usize>,
        mode: MatchMode,
    ) -> Option<usize> {
        match self.try_consume(input, range, mode) {
            Ok(end) => end,
            Err(err) => {
                warn!("matching aborted: {}", err);
                None
            }
        }
    }

    /// Matches the program against the whole input, using the engine's
    /// match mode.
    pub fn consume_all(&self, input: &[E]) -> Option<usize> {
        self.consume(input, 0..input.len(), self.match_mode)
    }

    /// Like [`Engine::consume`], but returns an error if some resource limit
    /// was exceeded.
    pub fn try_consume(
        &self,
        input: &[E],
        range: Range<usize>,
        mode: MatchMode,
    ) -> Result<Option<usize>, MatchError> {
        Ok(self.find_match(input, range, mode)?.map(|m| m.end()))
    }

    /// Matches the program against `input[range]`, returning the matched
    /// range together with the ranges of every capture group.
    pub fn find_match(
        &self,
        input: &[E],
        range: Range<usize>,
        mode: MatchMode,
    ) -> Result<Option<Match>, MatchError> {
        if self.enable_tracing {
            trace!("consume: {:?} ({:?})", &input[range.clone()], mode);
        }

        let start = range.start;
        let mut cpu = self.create_processor(input, range, mode);
        let state = cpu.run();

        if self.enable_tracing {
            trace!(
                "result: {:?} at position {} after {} cycles",
                state,
                cpu.current_position(),
                cpu.cycle_count()
            );
        }

        if let Some(err) = cpu.error() {
            return Err(err);
        }

        Ok(match state {
            State::Accept => Some(Match {
                range: start..cpu.current_position(),
                captures: cpu.captures(),
            }),
            State::Fail => None,
            State::InProgress => unreachable!(),
        })
    }
}
