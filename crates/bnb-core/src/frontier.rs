//! The population of search nodes solving one sequence.
//!
//! Unlike a textbook branch-and-bound loop, a node here may need an
//! arbitrary number of tightening rounds before it can branch or be
//! classed as terminated, and several branching nodes may be expanded in
//! the same round when there is spare room in a model batch.

use tracing::debug;

use crate::error::{InvariantViolation, Result};
use crate::node::Node;
use crate::stop::StopPolicy;

/// Masking vectors requested for the next model call.
///
/// Every `mandatory` vector must be run; any prefix of `optional` may be
/// run as well to fill a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Updates {
    pub mandatory: Vec<Vec<u8>>,
    pub optional: Vec<Vec<u8>>,
}

impl Updates {
    /// Total number of requested model rows.
    pub fn len(&self) -> usize {
        self.mandatory.len() + self.optional.len()
    }

    /// Whether nothing is requested.
    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty() && self.optional.is_empty()
    }
}

/// The two-list request/response protocol of a search frontier.
pub trait Frontier {
    /// Masking vectors to run the model on next.
    fn get_updates(&self) -> Result<Updates>;

    /// Apply entropies for all mandatory vectors followed by a prefix of
    /// the optional ones, in the order [`Frontier::get_updates`] gave them.
    fn update(&mut self, results: &[Vec<f64>]) -> Result<()>;

    /// Whether the search has converged.
    fn done(&self) -> bool;

    /// Best dual bound over all live nodes.
    fn dual(&self) -> usize;

    /// Best primal bound over all live nodes.
    fn primal(&self) -> usize;

    /// Mask vector witnessing [`Frontier::primal`].
    fn primal_value(&self) -> Option<&[u8]>;
}

/// Live search nodes for one sequence instance.
///
/// Nodes move `tightening -> branching -> terminated`, may stay in
/// `tightening` while their bounds keep improving, and leave `branching`
/// as two fresh children. After every round any node whose dual falls
/// below the instance-wide primal is pruned.
#[derive(Debug, Clone)]
pub struct NodeFrontier {
    tightening: Vec<Node>,
    branching: Vec<Node>,
    terminated: Vec<Node>,
}

impl NodeFrontier {
    /// Start a search from a single root node.
    pub fn new(root: Node) -> Self {
        let mut frontier = Self {
            tightening: Vec::new(),
            branching: Vec::new(),
            terminated: Vec::new(),
        };
        if root.terminal() {
            frontier.terminated.push(root);
        } else {
            frontier.tightening.push(root);
        }
        frontier
    }

    /// Start a search from an initial mask, keep vector and budget.
    pub fn from_parts(mask: Vec<u8>, keep: Vec<u8>, budget: f64) -> Result<Self> {
        Ok(Self::new(Node::new(mask, keep, budget)?))
    }

    /// Start a search that may stop early according to `stop`.
    pub fn with_stop_policy(
        mask: Vec<u8>,
        keep: Vec<u8>,
        budget: f64,
        stop: StopPolicy,
    ) -> Result<Self> {
        Ok(Self::new(Node::with_stop_policy(mask, keep, budget, stop)?))
    }

    /// Nodes awaiting another tightening round.
    pub fn tightening(&self) -> &[Node] {
        &self.tightening
    }

    /// Nodes ready to branch, best dual first.
    pub fn branching(&self) -> &[Node] {
        &self.branching
    }

    /// Solved nodes.
    pub fn terminated(&self) -> &[Node] {
        &self.terminated
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.tightening.len() + self.branching.len() + self.terminated.len()
    }

    /// Whether no node is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.tightening
            .iter()
            .chain(&self.branching)
            .chain(&self.terminated)
    }

    /// Drop every node whose dual is below the current global primal.
    fn prune(&mut self) -> usize {
        let p = self.primal();
        let before = self.len();
        self.tightening.retain(|n| n.dual() >= p);
        self.branching.retain(|n| n.dual() >= p);
        self.terminated.retain(|n| n.dual() >= p);
        before - self.len()
    }

    fn required_results(&self) -> usize {
        self.tightening.len() + usize::from(!self.branching.is_empty())
    }
}

impl Frontier for NodeFrontier {
    fn get_updates(&self) -> Result<Updates> {
        if self.done() {
            return Err(InvariantViolation::AlreadyDone);
        }

        let mut mandatory: Vec<Vec<u8>> = self
            .tightening
            .iter()
            .map(|n| n.masking().to_vec())
            .collect();
        let mut optional = self
            .branching
            .iter()
            .map(|n| n.conditioned_masking().to_vec());

        // One branching request is always mandatory so the search makes
        // progress even with a batch of one.
        if let Some(first) = optional.next() {
            mandatory.push(first);
        }

        Ok(Updates {
            mandatory,
            optional: optional.collect(),
        })
    }

    fn update(&mut self, results: &[Vec<f64>]) -> Result<()> {
        let min = self.required_results();
        let max = self.tightening.len() + self.branching.len();
        if results.len() < min || results.len() > max {
            return Err(InvariantViolation::ResultCount {
                min,
                max,
                got: results.len(),
            });
        }

        // Reject bad rows before any node leaves its collection
        let requested = self.tightening.iter().chain(&self.branching);
        if let Some((node, row)) = requested.zip(results).find(|(n, r)| r.len() != n.len()) {
            return Err(InvariantViolation::EntropyLength {
                expected: node.len(),
                got: row.len(),
            });
        }

        let (tighten_results, branch_results) = results.split_at(self.tightening.len());

        let mut to_tighten = Vec::new();
        let mut to_branch = Vec::new();

        for (mut node, entropies) in std::mem::take(&mut self.tightening)
            .into_iter()
            .zip(tighten_results)
        {
            if node.tighten(entropies)? {
                to_tighten.push(node);
            } else if !node.terminal() {
                to_branch.push(node);
            } else {
                self.terminated.push(node);
            }
        }

        let mut branching = std::mem::take(&mut self.branching);
        let untouched = branching.split_off(branch_results.len());
        for (node, entropies) in branching.into_iter().zip(branch_results) {
            for child in node.branch(entropies)? {
                if child.terminal() {
                    self.terminated.push(child);
                } else {
                    to_tighten.push(child);
                }
            }
        }
        to_branch.extend(untouched);

        self.tightening = to_tighten;
        self.branching = to_branch;

        let pruned = self.prune();
        self.branching.sort_by_key(|n| std::cmp::Reverse(n.dual()));

        debug!(
            tightening = self.tightening.len(),
            branching = self.branching.len(),
            terminated = self.terminated.len(),
            pruned,
            primal = self.primal(),
            dual = self.dual(),
            "frontier round complete"
        );
        Ok(())
    }

    fn done(&self) -> bool {
        if !self.tightening.is_empty() || !self.branching.is_empty() {
            return false;
        }
        let d = self.dual();
        self.terminated
            .iter()
            .all(|n| n.dual() == d && n.primal() == d)
    }

    fn dual(&self) -> usize {
        self.nodes().map(Node::dual).max().unwrap_or(0)
    }

    fn primal(&self) -> usize {
        self.nodes().map(Node::primal).max().unwrap_or(0)
    }

    fn primal_value(&self) -> Option<&[u8]> {
        let p = self.primal();
        self.nodes()
            .find(|n| n.primal() == p)
            .map(Node::primal_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_uniform(frontier: &mut NodeFrontier, n: usize, take_optional: bool) {
        while !frontier.done() {
            let updates = frontier.get_updates().unwrap();
            let count = if take_optional {
                updates.len()
            } else {
                updates.mandatory.len()
            };
            frontier.update(&vec![vec![1.0; n]; count]).unwrap();
        }
    }

    #[test]
    fn test_terminal_root_is_done() {
        let frontier = NodeFrontier::from_parts(vec![0; 3], vec![0; 3], 1.0).unwrap();
        assert!(frontier.done());
        assert_eq!(
            frontier.get_updates(),
            Err(InvariantViolation::AlreadyDone)
        );
        assert_eq!(frontier.primal_value(), Some(&[0u8, 0, 0][..]));
    }

    #[test]
    fn test_first_round_requests_root_masking() {
        let frontier = NodeFrontier::from_parts(vec![0; 3], vec![1, 0, 1], 1.0).unwrap();
        let updates = frontier.get_updates().unwrap();
        assert_eq!(updates.mandatory, vec![vec![1, 0, 1]]);
        assert!(updates.optional.is_empty());
    }

    #[test]
    fn test_branching_request_is_promoted() {
        let mut frontier = NodeFrontier::from_parts(vec![0; 4], vec![1; 4], 2.0).unwrap();
        frontier.update(&[vec![1.0; 4]]).unwrap();
        assert_eq!(frontier.branching().len(), 1);

        let updates = frontier.get_updates().unwrap();
        assert_eq!(updates.mandatory, vec![vec![1, 1, 1, 1]]);
        assert!(updates.optional.is_empty());
    }

    #[test]
    fn test_result_count_checked() {
        let mut frontier = NodeFrontier::from_parts(vec![0; 2], vec![1; 2], 1.0).unwrap();
        assert_eq!(
            frontier.update(&[]),
            Err(InvariantViolation::ResultCount {
                min: 1,
                max: 1,
                got: 0
            })
        );
        assert!(frontier.update(&[vec![0.5; 2], vec![0.5; 2]]).is_err());
    }

    #[test]
    fn test_converges_mandatory_only() {
        let mut frontier = NodeFrontier::from_parts(vec![0; 6], vec![1; 6], 2.5).unwrap();
        solve_uniform(&mut frontier, 6, false);
        assert_eq!(frontier.primal(), 2);
        assert_eq!(frontier.dual(), 2);
    }

    #[test]
    fn test_converges_with_all_optional() {
        let mut frontier = NodeFrontier::from_parts(vec![0; 6], vec![1; 6], 2.5).unwrap();
        solve_uniform(&mut frontier, 6, true);
        assert_eq!(frontier.primal(), 2);
        assert_eq!(frontier.dual(), 2);
        let witness = frontier.primal_value().unwrap();
        assert_eq!(witness.iter().filter(|&&m| m == 1).count(), 2);
    }

    #[test]
    fn test_branching_sorted_by_dual() {
        let mut frontier = NodeFrontier::from_parts(vec![0; 6], vec![1; 6], 2.5).unwrap();
        for _ in 0..6 {
            if frontier.done() {
                break;
            }
            let updates = frontier.get_updates().unwrap();
            frontier.update(&vec![vec![1.0; 6]; updates.len()]).unwrap();
            let duals: Vec<usize> = frontier.branching().iter().map(Node::dual).collect();
            assert!(duals.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn test_all_partitions_hold_bound() {
        let mut frontier = NodeFrontier::from_parts(vec![0; 5], vec![1; 5], 1.5).unwrap();
        while !frontier.done() {
            let updates = frontier.get_updates().unwrap();
            frontier
                .update(&vec![vec![1.0; 5]; updates.mandatory.len()])
                .unwrap();
            let p = frontier.primal();
            for node in frontier
                .tightening()
                .iter()
                .chain(frontier.branching())
                .chain(frontier.terminated())
            {
                assert!(node.primal() <= node.dual());
                assert!(node.dual() >= p);
            }
        }
        assert_eq!(frontier.primal(), 1);
    }

    #[test]
    fn test_rejected_update_keeps_nodes() {
        let mut frontier = NodeFrontier::from_parts(vec![0; 3], vec![1; 3], 1.0).unwrap();
        assert_eq!(
            frontier.update(&[vec![1.0; 2]]),
            Err(InvariantViolation::EntropyLength {
                expected: 3,
                got: 2
            })
        );
        assert!(!frontier.done());
        assert_eq!(frontier.tightening().len(), 1);
        assert_eq!(frontier.primal_value(), Some(&[0u8, 0, 0][..]));

        // The same round can be answered again
        frontier.update(&[vec![1.0; 3]]).unwrap();
        assert_eq!(frontier.branching().len(), 1);
    }

    #[test]
    fn test_rejected_branch_row_keeps_nodes() {
        let mut frontier = NodeFrontier::from_parts(vec![0; 4], vec![1; 4], 2.0).unwrap();
        frontier.update(&[vec![1.0; 4]]).unwrap();
        assert_eq!(frontier.branching().len(), 1);

        assert!(frontier.update(&[vec![1.0; 5]]).is_err());
        assert!(!frontier.done());
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.branching().len(), 1);
        assert_eq!(frontier.primal(), 2);
        assert_eq!(frontier.dual(), 4);

        frontier.update(&[vec![1.0; 4]]).unwrap();
        assert_eq!(frontier.tightening().len(), 2);
    }
}
