//! Batching many independent frontiers into fixed-size model calls.
//!
//! [`NodeFrontierBatch`] owns one [`BufferedFrontier`] per sequence and the
//! sequences themselves. Each call to [`NodeFrontierBatch::get_updates`]
//! zigzags across the unfinished frontiers to fill exactly one batch, and
//! [`NodeFrontierBatch::update`] routes each result row back to the frontier
//! that asked for it.

use tracing::debug;

use crate::buffered::BufferedFrontier;
use crate::error::{InvariantViolation, Result};
use crate::frontier::{Frontier, NodeFrontier};
use crate::zigzag::Zigzag;
use crate::{EntropyMatrix, TokenMatrix};

/// A batch of frontiers driven through one shared model.
#[derive(Debug)]
pub struct NodeFrontierBatch<F = NodeFrontier> {
    frontiers: Vec<BufferedFrontier<F>>,
    seqs: TokenMatrix,
    seq_len: usize,
    mask_value: i32,
    batch_size: usize,
    /// Frontier that produced each slot of the outstanding batch.
    cur_sources: Vec<Option<usize>>,
    in_flight: bool,
}

impl<F: Frontier> NodeFrontierBatch<F> {
    /// Build a batch from unbuffered frontiers, one per sequence.
    pub fn from_frontiers(
        frontiers: Vec<F>,
        seqs: TokenMatrix,
        mask_value: i32,
        batch_size: usize,
    ) -> Result<Self> {
        let buffered = frontiers
            .into_iter()
            .map(BufferedFrontier::new)
            .collect::<Result<Vec<_>>>()?;
        Self::new(buffered, seqs, mask_value, batch_size)
    }

    /// Build a batch from buffered frontiers, one per sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the frontier and sequence counts differ, the
    /// sequences are not all the same length, or `batch_size` is zero.
    pub fn new(
        frontiers: Vec<BufferedFrontier<F>>,
        seqs: TokenMatrix,
        mask_value: i32,
        batch_size: usize,
    ) -> Result<Self> {
        if frontiers.len() != seqs.len() {
            return Err(InvariantViolation::SequenceCount {
                frontiers: frontiers.len(),
                sequences: seqs.len(),
            });
        }
        if batch_size == 0 {
            return Err(InvariantViolation::ZeroBatchSize);
        }
        let seq_len = seqs.first().map_or(0, Vec::len);
        if let Some((row, s)) = seqs.iter().enumerate().find(|(_, s)| s.len() != seq_len) {
            return Err(InvariantViolation::RowLength {
                row,
                expected: seq_len,
                got: s.len(),
            });
        }

        Ok(Self {
            frontiers,
            seqs,
            seq_len,
            mask_value,
            batch_size,
            cur_sources: Vec::new(),
            in_flight: false,
        })
    }

    /// Model batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Common sequence length.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// The token that stands for a masked position.
    pub fn mask_value(&self) -> i32 {
        self.mask_value
    }

    /// The buffered frontiers, in sequence order.
    pub fn frontiers(&self) -> &[BufferedFrontier<F>] {
        &self.frontiers
    }

    /// Source frontier of each slot in the outstanding batch.
    pub fn cur_sources(&self) -> &[Option<usize>] {
        &self.cur_sources
    }

    /// Number of slots in the last batch that carry real work.
    pub fn last_fill(&self) -> usize {
        self.cur_sources.iter().filter(|s| s.is_some()).count()
    }

    /// Assemble the next `batch_size x seq_len` model input.
    ///
    /// Slots beyond the available work are filled with `mask_value` and
    /// their results are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if every frontier is done, if the previous batch
    /// was not answered, or a frontier produced a masking of the wrong
    /// length.
    pub fn get_updates(&mut self) -> Result<TokenMatrix> {
        if self.in_flight {
            return Err(InvariantViolation::BatchOutstanding);
        }
        if self.done() {
            return Err(InvariantViolation::AlreadyDone);
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        self.cur_sources.clear();
        for (masking, source) in Zigzag::new(&mut self.frontiers).take(self.batch_size) {
            batch.push(apply_mask(&self.seqs[source], &masking, self.mask_value, source)?);
            self.cur_sources.push(Some(source));
        }

        let fill = batch.len();
        batch.resize(self.batch_size, vec![self.mask_value; self.seq_len]);
        self.cur_sources.resize(self.batch_size, None);
        self.in_flight = true;

        debug!(fill, batch_size = self.batch_size, "assembled batch");
        Ok(batch)
    }

    /// Feed back the per-position entropies for the outstanding batch.
    ///
    /// # Errors
    ///
    /// Returns an error if no batch is outstanding, the matrix has the wrong
    /// shape, or a frontier rejects its round.
    pub fn update(&mut self, entropies: EntropyMatrix) -> Result<()> {
        if !self.in_flight {
            return Err(InvariantViolation::NoBatchInFlight);
        }
        if entropies.len() != self.batch_size {
            return Err(InvariantViolation::RowCount {
                expected: self.batch_size,
                got: entropies.len(),
            });
        }
        if let Some((row, e)) = entropies
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != self.seq_len)
        {
            return Err(InvariantViolation::RowLength {
                row,
                expected: self.seq_len,
                got: e.len(),
            });
        }

        self.in_flight = false;
        for (source, row) in self.cur_sources.iter().zip(entropies) {
            if let Some(j) = *source {
                self.frontiers[j].push_update(row)?;
            }
        }
        Ok(())
    }

    /// Whether every frontier has converged.
    pub fn done(&self) -> bool {
        self.frontiers.iter().all(BufferedFrontier::done)
    }

    /// Each sequence with its best known masking applied.
    ///
    /// # Errors
    ///
    /// Returns an error if some frontier has not converged.
    pub fn solutions(&self) -> Result<TokenMatrix> {
        if !self.done() {
            return Err(InvariantViolation::NotConverged);
        }
        self.frontiers
            .iter()
            .zip(&self.seqs)
            .enumerate()
            .map(|(i, (f, seq))| {
                let masking = f.primal_value().ok_or(InvariantViolation::NotConverged)?;
                apply_mask(seq, masking, self.mask_value, i)
            })
            .collect()
    }

    /// The best known mask vector of each frontier.
    pub fn masks(&self) -> Result<Vec<Vec<u8>>> {
        if !self.done() {
            return Err(InvariantViolation::NotConverged);
        }
        self.frontiers
            .iter()
            .map(|f| {
                f.primal_value()
                    .map(<[u8]>::to_vec)
                    .ok_or(InvariantViolation::NotConverged)
            })
            .collect()
    }
}

/// Replace every masked position of `seq` with `mask_value`.
fn apply_mask(seq: &[i32], masking: &[u8], mask_value: i32, row: usize) -> Result<Vec<i32>> {
    if masking.len() != seq.len() {
        return Err(InvariantViolation::RowLength {
            row,
            expected: seq.len(),
            got: masking.len(),
        });
    }
    Ok(seq
        .iter()
        .zip(masking)
        .map(|(&t, &m)| if m != 0 { mask_value } else { t })
        .collect())
}
