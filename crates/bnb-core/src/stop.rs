//! Early-stopping policies for search nodes.

use serde::{Deserialize, Serialize};

use crate::error::{InvariantViolation, Result};

/// When a node may stop before its bounds meet.
///
/// A stopped node reports its primal as its dual, which makes it terminal.
/// Nodes whose bounds meet are terminal under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Solve to optimality.
    #[default]
    Exact,
    /// Stop once `dual - primal <= k`.
    AbsGap(usize),
    /// Stop once `1 - primal / dual <= p`.
    RelGap(f64),
}

impl StopPolicy {
    /// Stop within an absolute gap of `k` masked positions.
    pub fn abs_gap(k: usize) -> Self {
        StopPolicy::AbsGap(k)
    }

    /// Stop within a relative gap `p`, which must lie in `[0, 1]`.
    pub fn rel_gap(p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(InvariantViolation::InvalidStopParameter(p));
        }
        Ok(StopPolicy::RelGap(p))
    }

    /// Whether a node with these bounds should stop.
    pub fn should_stop(&self, primal: usize, dual: usize) -> bool {
        match *self {
            StopPolicy::Exact => false,
            StopPolicy::AbsGap(k) => dual.saturating_sub(primal) <= k,
            StopPolicy::RelGap(p) => {
                if dual == 0 {
                    return true;
                }
                1.0 - primal as f64 / dual as f64 <= p
            }
        }
    }
}
