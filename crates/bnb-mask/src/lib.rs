//! Model-driven masking on top of the `bnb-core` search.
//!
//! This crate connects the search to a masked-token model: it pads ragged
//! input, turns model predictions into per-position entropies, and runs the
//! batched solve loop until every sequence has converged.
//!
//! # Example
//!
//! ```
//! use bnb_mask::{padded_batch, MaskSolver, SolveConfig};
//!
//! // A model that knows nothing: uniform over four tokens everywhere
//! let mut model = |tokens: &[Vec<i32>]| -> Vec<Vec<Vec<f64>>> {
//!     tokens
//!         .iter()
//!         .map(|row| vec![vec![0.25; 4]; row.len()])
//!         .collect()
//! };
//!
//! let (seqs, keeps) = padded_batch(&[vec![1, 2, 3], vec![1, 2]], -1, None).unwrap();
//! let solver = MaskSolver::new(SolveConfig::new(3.0, 0, 8)).unwrap();
//! let report = solver.solve(&mut model, &seqs, &keeps).unwrap();
//!
//! // ln 4 per masked position, so two fit into a budget of 3 nats
//! assert_eq!(report.primal, vec![2, 2]);
//! ```

pub mod config;
pub mod entropy;
pub mod error;
pub mod model;
pub mod padding;
pub mod solve;

pub use bnb_core;
pub use config::SolveConfig;
pub use entropy::{entropies, entropy};
pub use error::{Result, SolveError};
pub use model::Model;
pub use padding::{keep_boundary_tokens, padded_batch};
pub use solve::{solve_mask, MaskSolver, SolveReport};
