//! Queue-like adapter over a [`Frontier`].
//!
//! A frontier hands out a mandatory and an optional list per round and
//! expects the results back in one call. That is awkward to interleave across
//! many independent instances, so [`BufferedFrontier`] buffers both sides and
//! lets the caller pop one request and push one result at a time.

use std::collections::VecDeque;

use crate::error::{InvariantViolation, Result};
use crate::frontier::{Frontier, NodeFrontier};

/// A frontier that behaves like a queue of single model rows.
#[derive(Debug, Clone)]
pub struct BufferedFrontier<F = NodeFrontier> {
    frontier: F,
    out_q: VecDeque<Vec<u8>>,
    in_q: Vec<Vec<f64>>,
    num_popped: usize,
    num_popped_required: usize,
}

impl<F: Frontier> BufferedFrontier<F> {
    /// Wrap `frontier`, buffering its first round of requests.
    pub fn new(frontier: F) -> Result<Self> {
        let mut buffered = Self {
            frontier,
            out_q: VecDeque::new(),
            in_q: Vec::new(),
            num_popped: 0,
            num_popped_required: 0,
        };
        buffered.reset_out_q()?;
        Ok(buffered)
    }

    fn reset_out_q(&mut self) -> Result<()> {
        self.out_q.clear();
        self.num_popped_required = 0;
        if self.frontier.done() {
            return Ok(());
        }
        let updates = self.frontier.get_updates()?;
        // Optional requests must come after the mandatory ones
        self.num_popped_required = updates.mandatory.len();
        self.out_q.extend(updates.mandatory);
        self.out_q.extend(updates.optional);
        Ok(())
    }

    /// Take the next request of this round, or `None` once it is exhausted.
    pub fn pop_update(&mut self) -> Option<Vec<u8>> {
        let update = self.out_q.pop_front()?;
        self.num_popped += 1;
        Some(update)
    }

    /// Return the entropies for the oldest unanswered request.
    ///
    /// Once every popped request is answered and all mandatory ones were
    /// popped, the round is forwarded to the frontier and the next round is
    /// buffered.
    ///
    /// # Errors
    ///
    /// Returns an error if no request is outstanding, or if the frontier
    /// rejects the round. A rejected round stays open and the rejected row
    /// is discarded.
    pub fn push_update(&mut self, entropies: Vec<f64>) -> Result<()> {
        if self.in_q.len() >= self.num_popped {
            return Err(InvariantViolation::UnexpectedResult);
        }
        self.in_q.push(entropies);

        if self.in_q.len() == self.num_popped && self.num_popped >= self.num_popped_required {
            if let Err(e) = self.frontier.update(&self.in_q) {
                // Leave the round open so the row can be pushed again
                self.in_q.pop();
                return Err(e);
            }
            self.in_q.clear();
            self.num_popped = 0;
            self.reset_out_q()?;
        }
        Ok(())
    }

    /// Whether the search has converged.
    ///
    /// Never true while a round is partially answered.
    pub fn done(&self) -> bool {
        self.num_popped == 0 && self.frontier.done()
    }

    /// Requests still buffered for this round.
    pub fn pending(&self) -> usize {
        self.out_q.len()
    }

    /// Best dual bound of the wrapped frontier.
    pub fn dual(&self) -> usize {
        self.frontier.dual()
    }

    /// Best primal bound of the wrapped frontier.
    pub fn primal(&self) -> usize {
        self.frontier.primal()
    }

    /// Mask vector witnessing [`BufferedFrontier::primal`].
    pub fn primal_value(&self) -> Option<&[u8]> {
        self.frontier.primal_value()
    }

    /// The wrapped frontier.
    pub fn frontier(&self) -> &F {
        &self.frontier
    }

    /// Unwrap into the underlying frontier.
    pub fn into_inner(self) -> F {
        self.frontier
    }
}
