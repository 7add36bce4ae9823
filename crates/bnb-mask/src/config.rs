//! Solver configuration.

use bnb_core::StopPolicy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolveError};

/// Parameters of one masking solve.
///
/// Every field has a default, so a partial document deserializes to a
/// complete configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    /// Total entropy, in nats, the masked positions of a sequence may carry.
    pub entropy_budget: f64,
    /// Token the model reads as "masked". Must not occur in the input.
    pub mask_value: i32,
    /// Number of rows in every model call.
    pub batch_size: usize,
    /// Early-stopping policy for every search tree.
    pub stop: StopPolicy,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            entropy_budget: 1.0,
            mask_value: 0,
            batch_size: 32,
            stop: StopPolicy::Exact,
        }
    }
}

impl SolveConfig {
    /// Create a configuration that solves to optimality.
    pub fn new(entropy_budget: f64, mask_value: i32, batch_size: usize) -> Self {
        Self {
            entropy_budget,
            mask_value,
            batch_size,
            stop: StopPolicy::Exact,
        }
    }

    /// Use `stop` as the early-stopping policy.
    pub fn with_stop(mut self, stop: StopPolicy) -> Self {
        self.stop = stop;
        self
    }

    /// Check the parameters before any work is done.
    pub fn validate(&self) -> Result<()> {
        if !(self.entropy_budget >= 0.0) || self.entropy_budget.is_infinite() {
            return Err(SolveError::InvalidConfig(format!(
                "entropy budget must be finite and non-negative, got {}",
                self.entropy_budget
            )));
        }
        if self.batch_size == 0 {
            return Err(SolveError::InvalidConfig(
                "batch size must be positive".to_string(),
            ));
        }
        if let StopPolicy::RelGap(p) = self.stop {
            if !(0.0..=1.0).contains(&p) {
                return Err(SolveError::InvalidConfig(format!(
                    "relative gap must lie in [0, 1], got {}",
                    p
                )));
            }
        }
        Ok(())
    }
}
