//! Branch-and-bound search for entropy-budgeted token masking.
//!
//! Given a sequence of tokens and a black-box model that predicts a
//! distribution at every masked position, the search looks for the largest
//! set of positions that can be masked at once while the total predicted
//! entropy of that set stays within a budget.
//!
//! # Overview
//!
//! - [`Node`]: one subproblem, holding a primal (achievable) and dual
//!   (upper) bound on the number of maskable positions
//! - [`NodeFrontier`]: all live nodes for one sequence, driven by a
//!   request/response protocol of masking vectors and entropy vectors
//! - [`BufferedFrontier`]: the same protocol, one row at a time
//! - [`NodeFrontierBatch`]: many frontiers sharing fixed-size model
//!   batches, filled by round-robin ([`Zigzag`]) scheduling
//!
//! All state is owned and single-threaded. The only suspension point is the
//! caller's model call between [`NodeFrontierBatch::get_updates`] and
//! [`NodeFrontierBatch::update`].
//!
//! # Example
//!
//! ```
//! use bnb_core::{Frontier, NodeFrontier};
//!
//! // Ten positions, every one costs one nat when masked
//! let mut frontier = NodeFrontier::from_parts(vec![0; 10], vec![1; 10], 4.2).unwrap();
//!
//! while !frontier.done() {
//!     let updates = frontier.get_updates().unwrap();
//!     let results = vec![vec![1.0; 10]; updates.mandatory.len()];
//!     frontier.update(&results).unwrap();
//! }
//!
//! assert_eq!(frontier.primal(), 4);
//! assert_eq!(frontier.dual(), 4);
//! ```

pub mod batch;
pub mod buffered;
pub mod error;
pub mod frontier;
pub mod node;
pub mod stop;
pub mod zigzag;

pub use batch::NodeFrontierBatch;
pub use buffered::BufferedFrontier;
pub use error::{InvariantViolation, Result};
pub use frontier::{Frontier, NodeFrontier, Updates};
pub use node::Node;
pub use stop::StopPolicy;
pub use zigzag::{UpdateSource, Zigzag};

/// Per-position decision vector: 1 = masked.
pub type MaskVec = Vec<u8>;

/// Batch of token sequences, one row per sequence.
pub type TokenMatrix = Vec<Vec<i32>>;

/// Batch of per-position entropies, one row per sequence.
pub type EntropyMatrix = Vec<Vec<f64>>;
