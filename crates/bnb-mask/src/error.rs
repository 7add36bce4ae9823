//! Error types for the masking solver.

use bnb_core::InvariantViolation;
use thiserror::Error;

/// Errors that can occur while preparing inputs or running a solve.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    /// The search core rejected an operation.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    /// The padding token already occurs in the input.
    #[error("pad token {token} occurs in sequence {row} at position {position}")]
    PadTokenPresent {
        token: i32,
        row: usize,
        position: usize,
    },

    /// The mask token already occurs in the input.
    #[error("mask token {token} occurs in sequence {row} at position {position}")]
    MaskValuePresent {
        token: i32,
        row: usize,
        position: usize,
    },

    /// The requested minimum length cannot hold the longest sequence.
    #[error("min_length {min_length} is shorter than the longest sequence ({longest})")]
    MinLengthTooShort { min_length: usize, longest: usize },

    /// The initial keep matrix does not match the sequences.
    #[error("keep matrix row {row} has length {got}, expected {expected}")]
    KeepShape {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// The initial keep matrix has a different number of rows.
    #[error("keep matrix has {got} rows, expected {expected}")]
    KeepRows { expected: usize, got: usize },

    /// The model returned a tensor of the wrong shape.
    #[error("model output shape mismatch: {0}")]
    ModelOutputShape(String),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolveError>;
