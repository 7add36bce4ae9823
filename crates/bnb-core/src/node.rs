//! Search nodes for the masking problem.
//!
//! A node is one subproblem of the search for a single sequence. It
//! partitions the token positions into three sets:
//!
//! - **mask**: committed to being hidden (`mask[i] == 1`)
//! - **keep**: committed to being shown to the model (`keep[i] == 0`)
//! - **remaining**: still undecided (`mask[i] == 0 && keep[i] == 1`)
//!
//! Note the polarity of `keep`: a 1 means "masked or undecided", so the
//! dual bound is simply the number of ones in `keep`.
//!
//! The lifecycle is `new -> tighten* -> (terminal | branch)`. Each call to
//! [`Node::tighten`] is preceded by one model call on [`Node::masking`],
//! and each call to [`Node::branch`] by one model call on
//! [`Node::conditioned_masking`].

use tracing::trace;

use crate::error::{InvariantViolation, Result};
use crate::stop::StopPolicy;

/// A single subproblem in the branch-and-bound tree.
///
/// Invariant: `primal <= dual`, and the node is terminal exactly when
/// they meet (or when its [`StopPolicy`] says so).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    mask: Vec<u8>,
    keep: Vec<u8>,
    remaining: Vec<u8>,
    budget: f64,
    primal: usize,
    dual: usize,
    primal_value: Vec<u8>,
    /// Entropies from the most recent `tighten`, spent when branching.
    entropies: Vec<f64>,
    /// Set once `tighten` reaches a fixed point; only `branch` may follow.
    settled: bool,
    stop: StopPolicy,
}

impl Node {
    /// Create a node that is solved to optimality.
    ///
    /// The bounds are only those implied by `mask` and `keep`; call
    /// [`Node::tighten`] at least once to improve them.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `budget` is negative (or NaN)
    /// - `mask` and `keep` differ in length
    /// - some position is masked but committed to keep
    pub fn new(mask: Vec<u8>, keep: Vec<u8>, budget: f64) -> Result<Self> {
        Self::with_stop_policy(mask, keep, budget, StopPolicy::Exact)
    }

    /// Create a node that may stop early according to `stop`.
    pub fn with_stop_policy(
        mask: Vec<u8>,
        keep: Vec<u8>,
        budget: f64,
        stop: StopPolicy,
    ) -> Result<Self> {
        if !(budget >= 0.0) {
            return Err(InvariantViolation::NegativeBudget(budget));
        }
        if mask.len() != keep.len() {
            return Err(InvariantViolation::LengthMismatch {
                mask: mask.len(),
                keep: keep.len(),
            });
        }
        if let Some(i) = mask
            .iter()
            .zip(&keep)
            .position(|(&m, &k)| m != 0 && k == 0)
        {
            return Err(InvariantViolation::MaskedKeptPosition(i));
        }

        let mask: Vec<u8> = mask.into_iter().map(|m| u8::from(m != 0)).collect();
        let keep: Vec<u8> = keep.into_iter().map(|k| u8::from(k != 0)).collect();
        let primal = popcount(&mask);
        let dual = popcount(&keep);

        let mut node = Self {
            primal_value: mask.clone(),
            remaining: vec![0; mask.len()],
            mask,
            keep,
            budget,
            primal,
            dual,
            entropies: Vec::new(),
            settled: false,
            stop,
        };
        node.update_remaining();
        node.check_bounds()?;
        Ok(node)
    }

    /// Sequence length this node covers.
    pub fn len(&self) -> usize {
        self.mask.len()
    }

    /// Whether the node covers an empty sequence.
    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Positions committed to being masked.
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    /// Keep vector (0 = kept, 1 = masked or undecided).
    pub fn keep(&self) -> &[u8] {
        &self.keep
    }

    /// Remaining entropy budget.
    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// The early-stopping policy inherited by this node's children.
    pub fn stop_policy(&self) -> StopPolicy {
        self.stop
    }

    /// Masking for the next tightening model call.
    ///
    /// 0 marks positions the node definitely keeps (so the model conditions
    /// on them), 1 everything else. On a terminal node a 1 is a committed
    /// decision to mask.
    pub fn masking(&self) -> &[u8] {
        &self.keep
    }

    /// Masking for the branching model call: 1 exactly on undecided positions.
    pub fn conditioned_masking(&self) -> &[u8] {
        &self.remaining
    }

    /// Number of positions proven maskable within the budget.
    pub fn primal(&self) -> usize {
        self.primal
    }

    /// Upper bound on the number of positions that could be masked.
    ///
    /// Once the stop policy fires this reports the primal instead.
    pub fn dual(&self) -> usize {
        if self.stopped() {
            self.primal
        } else {
            self.dual
        }
    }

    /// Mask vector witnessing [`Node::primal`].
    pub fn primal_value(&self) -> &[u8] {
        &self.primal_value
    }

    /// Is this subproblem solved?
    pub fn terminal(&self) -> bool {
        self.stopped() || self.primal == self.dual
    }

    /// Improve the bounds using entropies computed on [`Node::masking`].
    ///
    /// Forces at most one over-budget undecided position into the keep set.
    /// If that lowered the dual, returns `true` straight away: the caller
    /// must re-run the model and call `tighten` again before the greedy
    /// primal is worth computing. Otherwise the primal is recomputed and
    /// `false` is returned, meaning a fixed point for this round: the node
    /// is either terminal or ready to branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is terminal, already reached its fixed
    /// point, or `entropies` has the wrong length.
    pub fn tighten(&mut self, entropies: &[f64]) -> Result<bool> {
        if self.terminal() {
            return Err(InvariantViolation::NodeTerminal);
        }
        if self.settled {
            return Err(InvariantViolation::AlreadySettled);
        }
        self.check_entropies(entropies)?;

        let old_dual = self.dual;
        self.entropies.clear();
        self.entropies.extend_from_slice(entropies);

        if let Some(i) = self.most_over_budget() {
            self.keep[i] = 0;
            self.update_remaining();
            self.dual = popcount(&self.keep);
            trace!(
                position = i,
                entropy = entropies[i],
                budget = self.budget,
                dual = self.dual,
                "forced position into keep"
            );
        }

        if self.dual < old_dual && !self.terminal() {
            self.check_bounds()?;
            return Ok(true);
        }

        self.tighten_primal();
        self.settled = true;
        self.check_bounds()?;
        Ok(false)
    }

    /// Split this node on the undecided position with the largest entropy.
    ///
    /// `entropies` must come from a model call on
    /// [`Node::conditioned_masking`]. The first child masks the position and
    /// spends its cached tightening entropy; the second keeps it, getting
    /// back the newly supplied entropy minus the same amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is terminal, has not reached its
    /// tightening fixed point, or the branching position does not fit the
    /// budget.
    pub fn branch(self, entropies: &[f64]) -> Result<[Node; 2]> {
        if self.terminal() {
            return Err(InvariantViolation::NodeTerminal);
        }
        self.check_entropies(entropies)?;
        if !self.settled {
            return Err(InvariantViolation::NotTightened);
        }

        let i = self
            .branching_index(entropies)
            .ok_or(InvariantViolation::NothingToBranch)?;
        let spent = self.entropies[i];
        if spent > self.budget {
            return Err(InvariantViolation::BranchOverBudget {
                index: i,
                entropy: spent,
                budget: self.budget,
            });
        }

        let take_budget = self.budget - spent;
        let skip_budget = self.budget - spent + entropies[i];

        let mut masked = self.mask.clone();
        masked[i] = 1;
        let mut kept = self.keep.clone();
        kept[i] = 0;

        trace!(
            position = i,
            take_budget,
            skip_budget,
            "branching node"
        );

        let take = Node::with_stop_policy(masked, self.keep, take_budget, self.stop)?;
        let skip = Node::with_stop_policy(self.mask, kept, skip_budget, self.stop)?;
        Ok([take, skip])
    }

    fn stopped(&self) -> bool {
        self.stop.should_stop(self.primal, self.dual)
    }

    fn update_remaining(&mut self) {
        for ((r, &m), &k) in self.remaining.iter_mut().zip(&self.mask).zip(&self.keep) {
            *r = u8::from(m == 0 && k != 0);
        }
    }

    /// Undecided position with the largest entropy above the budget.
    fn most_over_budget(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &e) in self.entropies.iter().enumerate() {
            if self.remaining[i] == 0 || !(e > self.budget) {
                continue;
            }
            match best {
                Some(b) if self.entropies[b] >= e => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// First undecided position attaining the maximum entropy.
    fn branching_index(&self, entropies: &[f64]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &e) in entropies.iter().enumerate() {
            if self.remaining[i] == 0 {
                continue;
            }
            match best {
                Some(b) if entropies[b] >= e => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Greedy primal: mask the cheapest undecided positions while the
    /// running entropy total stays within budget.
    fn tighten_primal(&mut self) {
        let mut order: Vec<usize> = (0..self.len())
            .filter(|&i| self.remaining[i] != 0)
            .collect();
        order.sort_by(|&a, &b| self.entropies[a].total_cmp(&self.entropies[b]));

        let mut candidate = self.mask.clone();
        let mut spent = 0.0;
        for i in order {
            spent += self.entropies[i];
            if spent > self.budget {
                break;
            }
            candidate[i] = 1;
        }

        // The witness starts from `mask`, so this never lowers the primal
        self.primal = popcount(&candidate);
        self.primal_value = candidate;
    }

    fn check_entropies(&self, entropies: &[f64]) -> Result<()> {
        if entropies.len() != self.len() {
            return Err(InvariantViolation::EntropyLength {
                expected: self.len(),
                got: entropies.len(),
            });
        }
        Ok(())
    }

    fn check_bounds(&self) -> Result<()> {
        if self.primal > self.dual {
            return Err(InvariantViolation::BoundsCrossed {
                primal: self.primal,
                dual: self.dual,
            });
        }
        Ok(())
    }
}

fn popcount(v: &[u8]) -> usize {
    v.iter().filter(|&&x| x != 0).count()
}
