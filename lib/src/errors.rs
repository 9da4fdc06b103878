use thiserror::Error;

/// Errors returned while compiling a pattern.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum CompileError {
    #[error("syntax error: {msg}")]
    Syntax { msg: String },

    #[error("undefined production `{0}`")]
    UndefinedProduction(String),

    #[error("backreference to undefined capture group {0}")]
    InvalidBackreference(usize),

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("program too large")]
    TooLarge,
}

impl From<regex_syntax::Error> for CompileError {
    fn from(err: regex_syntax::Error) -> Self {
        Self::Syntax { msg: err.to_string() }
    }
}

/// Errors returned while matching. They indicate that the search was
/// abandoned because some resource limit was exceeded, not that the input
/// doesn't match.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum MatchError {
    #[error("backtrack limit exceeded (max save points: {limit})")]
    BacktrackLimitExceeded { limit: usize },

    #[error("cycle limit exceeded (max cycles: {limit})")]
    CycleLimitExceeded { limit: u64 },
}

/// Errors returned by this crate.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    #[error(transparent)]
    CompileError(#[from] CompileError),

    #[error(transparent)]
    MatchError(#[from] MatchError),
}
