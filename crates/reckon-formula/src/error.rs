//! Error types for reckon-formula
//!
//! Two channels that never mix: these host-facing failures mean the
//! engine could not construct or run a program at all. Formula-value
//! errors (`#DIV/0!` and friends) are ordinary [`Value`]s and travel
//! through evaluation like any number or string.
//!
//! [`Value`]: crate::value::Value

use thiserror::Error;

/// Result alias for parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Result alias for evaluation
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Errors raised while parsing formula text
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Structurally invalid formula text
    #[error("syntax error at position {pos}: {message}")]
    Syntax { pos: usize, message: String },

    /// An identifier that is neither a valid reference nor a known name
    #[error("unknown name: {0}")]
    UnknownName(String),

    /// A sheet qualifier that matches no sheet in the document
    #[error("unknown sheet: {0}")]
    UnknownSheet(String),
}

impl ParseError {
    pub(crate) fn syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            message: message.into(),
        }
    }
}

/// Errors raised while evaluating a program
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// An external-workbook reference whose index has no registered
    /// evaluator. Distinct from `#REF!` so the host can tell a missing
    /// link from a broken formula.
    #[error("no workbook linked at index {0}")]
    Unlinked(u32),

    /// The token program violated the RPN invariant (stack underflow,
    /// leftover operands). Programs built by the parser never do this.
    #[error("malformed formula program: {0}")]
    InvalidProgram(&'static str),

    /// A cell's stored formula text failed to parse
    #[error(transparent)]
    Parse(#[from] ParseError),
}
