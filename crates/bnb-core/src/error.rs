//! Error type for the branch-and-bound masking search.

use thiserror::Error;

/// A broken precondition of the search.
///
/// None of these are transient: each one means the caller, or the search
/// itself, violated the protocol. They are never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvariantViolation {
    /// Entropy budget below zero.
    #[error("entropy budget must be non-negative, got {0}")]
    NegativeBudget(f64),

    /// Mask and keep vectors differ in length.
    #[error("mask has length {mask} but keep has length {keep}")]
    LengthMismatch { mask: usize, keep: usize },

    /// A position was masked while also committed to being kept.
    #[error("position {0} is masked but committed to keep")]
    MaskedKeptPosition(usize),

    /// An entropy vector does not match the node's sequence length.
    #[error("entropy vector has length {got}, expected {expected}")]
    EntropyLength { expected: usize, got: usize },

    /// `tighten` or `branch` was called on a solved node.
    #[error("node is already terminal")]
    NodeTerminal,

    /// `branch` was called before `tighten` reached a fixed point.
    #[error("node has not finished tightening")]
    NotTightened,

    /// `tighten` was called again after it returned `false`.
    #[error("node already reached its tightening fixed point")]
    AlreadySettled,

    /// No undecided position is left to branch on.
    #[error("node has no undecided position")]
    NothingToBranch,

    /// The branching position would overspend the budget.
    #[error("branch position {index} costs {entropy} which exceeds budget {budget}")]
    BranchOverBudget {
        index: usize,
        entropy: f64,
        budget: f64,
    },

    /// The primal bound overtook the dual bound.
    #[error("primal bound {primal} exceeds dual bound {dual}")]
    BoundsCrossed { primal: usize, dual: usize },

    /// `get_updates` was called on a converged frontier or scheduler.
    #[error("search is already done")]
    AlreadyDone,

    /// `update` received a number of results outside the permitted range.
    #[error("expected between {min} and {max} results, got {got}")]
    ResultCount { min: usize, max: usize, got: usize },

    /// A result was pushed without a matching outstanding pop.
    #[error("result pushed with no outstanding update")]
    UnexpectedResult,

    /// `get_updates` was called again before `update` answered the last batch.
    #[error("previous batch has not been answered")]
    BatchOutstanding,

    /// `update` was called with no batch in flight.
    #[error("no batch is awaiting results")]
    NoBatchInFlight,

    /// Batch size of zero.
    #[error("batch size must be positive")]
    ZeroBatchSize,

    /// Frontier and sequence counts differ.
    #[error("{frontiers} frontiers but {sequences} sequences")]
    SequenceCount { frontiers: usize, sequences: usize },

    /// A sequence, mask or result row has the wrong length.
    #[error("row {row} has length {got}, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// A result matrix has the wrong number of rows.
    #[error("expected {expected} rows, got {got}")]
    RowCount { expected: usize, got: usize },

    /// Early-stopping parameter out of range.
    #[error("relative gap must lie in [0, 1], got {0}")]
    InvalidStopParameter(f64),

    /// Solutions were requested before every instance converged.
    #[error("search has not converged")]
    NotConverged,
}

/// Result alias for search operations.
pub type Result<T> = std::result::Result<T, InvariantViolation>;
