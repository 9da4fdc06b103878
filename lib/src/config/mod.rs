use serde::{Deserialize, Serialize};

use crate::engine::{MatchMode, DEFAULT_MAX_SAVE_POINTS};

/// Default value for [`EngineConfig::max_instructions`].
pub const DEFAULT_MAX_INSTRUCTIONS: usize = 1 << 24;

/// Configuration for compiling and running patterns.
///
/// Every field has a default, so a partial configuration can be
/// deserialized. For instance, the JSON document below only overrides the
/// match mode:
///
/// ```json
/// { "engine": { "match_mode": "whole" } }
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Options that control how patterns are parsed.
    pub syntax: SyntaxConfig,
    /// Options that control how programs are compiled and executed.
    pub engine: EngineConfig,
}

/// Options that control how patterns are parsed.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SyntaxConfig {
    /// Letters match both their upper-case and lower-case forms.
    pub case_insensitive: bool,
    /// `.` also matches `\n`.
    pub dot_matches_new_line: bool,
    /// Classes like `\w` and `\d` are Unicode-aware.
    pub unicode: bool,
    /// `^` and `$` also match at the start and end of each line.
    pub multi_line: bool,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            dot_matches_new_line: false,
            unicode: true,
            multi_line: false,
        }
    }
}

/// Options that control how programs are compiled and executed.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Log every executed instruction at the `trace` level.
    pub enable_tracing: bool,
    /// Match mode used when none is given explicitly.
    pub match_mode: MatchMode,
    /// Maximum number of save points on the backtracking stack.
    pub max_save_points: usize,
    /// Maximum number of instructions executed by a single search.
    pub cycle_limit: Option<u64>,
    /// Maximum number of instructions in a compiled program.
    pub max_instructions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_tracing: false,
            match_mode: MatchMode::Prefix,
            max_save_points: DEFAULT_MAX_SAVE_POINTS,
            cycle_limit: None,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
        }
    }
}
