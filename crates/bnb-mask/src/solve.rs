//! The outer solve loop.
//!
//! Builds one search tree per sequence, then alternates between asking the
//! batch for model input and feeding the resulting entropies back until
//! every tree has converged.

use bnb_core::{MaskVec, Node, NodeFrontier, NodeFrontierBatch, StopPolicy, TokenMatrix};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SolveConfig;
use crate::entropy::entropies;
use crate::error::{Result, SolveError};
use crate::model::Model;

/// Outcome of a solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveReport {
    /// Each sequence with its chosen positions replaced by the mask token.
    pub solutions: TokenMatrix,
    /// Chosen positions of each sequence (1 = masked).
    pub masks: Vec<MaskVec>,
    /// Masked position count of each sequence.
    pub primal: Vec<usize>,
    /// Proven upper bound on the masked count of each sequence.
    pub dual: Vec<usize>,
    /// Number of model invocations.
    pub model_calls: usize,
}

/// Finds, for each sequence, the largest set of positions that can be
/// masked while the model's total entropy over them stays within budget.
#[derive(Debug, Clone)]
pub struct MaskSolver {
    config: SolveConfig,
}

impl MaskSolver {
    /// Create a solver, validating `config`.
    pub fn new(config: SolveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The solver's configuration.
    pub fn config(&self) -> &SolveConfig {
        &self.config
    }

    /// Solve every sequence of `seqs`.
    ///
    /// All sequences must share one length (see
    /// [`padded_batch`](crate::padded_batch)). `init_keeps` marks positions
    /// that must stay visible with 0, which lets repeated calls reveal
    /// tokens incrementally.
    ///
    /// # Errors
    ///
    /// Returns an error if the mask token occurs in `seqs`, the shapes of
    /// `seqs` and `init_keeps` disagree, or the model returns a tensor of
    /// the wrong shape.
    pub fn solve<M>(
        &self,
        model: &mut M,
        seqs: &[Vec<i32>],
        init_keeps: &[MaskVec],
    ) -> Result<SolveReport>
    where
        M: Model + ?Sized,
    {
        let config = &self.config;
        self.check_inputs(seqs, init_keeps)?;

        let frontiers = init_keeps
            .iter()
            .map(|keep| {
                let root = Node::with_stop_policy(
                    vec![0; keep.len()],
                    keep.clone(),
                    config.entropy_budget,
                    config.stop,
                )?;
                Ok(NodeFrontier::new(root))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut batch = NodeFrontierBatch::from_frontiers(
            frontiers,
            seqs.to_vec(),
            config.mask_value,
            config.batch_size,
        )?;

        info!(
            instances = seqs.len(),
            seq_len = batch.seq_len(),
            batch_size = config.batch_size,
            budget = config.entropy_budget,
            "starting solve"
        );

        let mut model_calls = 0;
        while !batch.done() {
            let tokens = batch.get_updates()?;
            let probs = model.predict(&tokens);
            check_output(&probs, config.batch_size, batch.seq_len())?;
            batch.update(entropies(&probs))?;
            model_calls += 1;
            debug!(
                call = model_calls,
                fill = batch.last_fill(),
                "model call complete"
            );
        }

        let primal: Vec<usize> = batch.frontiers().iter().map(|f| f.primal()).collect();
        let dual: Vec<usize> = batch.frontiers().iter().map(|f| f.dual()).collect();
        info!(
            model_calls,
            masked = primal.iter().sum::<usize>(),
            "solve complete"
        );

        Ok(SolveReport {
            solutions: batch.solutions()?,
            masks: batch.masks()?,
            primal,
            dual,
            model_calls,
        })
    }

    fn check_inputs(&self, seqs: &[Vec<i32>], init_keeps: &[MaskVec]) -> Result<()> {
        if seqs.len() != init_keeps.len() {
            return Err(SolveError::KeepRows {
                expected: seqs.len(),
                got: init_keeps.len(),
            });
        }
        for (row, (seq, keep)) in seqs.iter().zip(init_keeps).enumerate() {
            if seq.len() != keep.len() {
                return Err(SolveError::KeepShape {
                    row,
                    expected: seq.len(),
                    got: keep.len(),
                });
            }
            if let Some(position) = seq.iter().position(|&t| t == self.config.mask_value) {
                return Err(SolveError::MaskValuePresent {
                    token: self.config.mask_value,
                    row,
                    position,
                });
            }
        }
        Ok(())
    }
}

/// Solve a masking problem and return only the masked sequences.
///
/// `stop` of `None` solves every sequence to optimality.
///
/// # Errors
///
/// See [`MaskSolver::new`] and [`MaskSolver::solve`].
pub fn solve_mask<M>(
    model: &mut M,
    entropy_budget: f64,
    seqs: &[Vec<i32>],
    init_keeps: &[MaskVec],
    mask_value: i32,
    batch_size: usize,
    stop: Option<StopPolicy>,
) -> Result<TokenMatrix>
where
    M: Model + ?Sized,
{
    let config = SolveConfig::new(entropy_budget, mask_value, batch_size)
        .with_stop(stop.unwrap_or_default());
    let report = MaskSolver::new(config)?.solve(model, seqs, init_keeps)?;
    Ok(report.solutions)
}

fn check_output(probs: &[Vec<Vec<f64>>], batch_size: usize, seq_len: usize) -> Result<()> {
    if probs.len() != batch_size {
        return Err(SolveError::ModelOutputShape(format!(
            "expected {} rows, got {}",
            batch_size,
            probs.len()
        )));
    }
    if let Some((row, r)) = probs.iter().enumerate().find(|(_, r)| r.len() != seq_len) {
        return Err(SolveError::ModelOutputShape(format!(
            "row {} has {} positions, expected {}",
            row,
            r.len(),
            seq_len
        )));
    }
    Ok(())
}
