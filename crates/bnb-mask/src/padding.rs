//! Preparing ragged token sequences for a solve.

use bnb_core::{MaskVec, TokenMatrix};

use crate::error::{Result, SolveError};

/// Right-pad `seqs` to a common length and derive the initial keep matrix.
///
/// Padding positions are marked kept (0) so they are never masked; every
/// real token starts undecided (1). With `min_length` the rows are padded
/// further to at least that length.
///
/// # Errors
///
/// Returns an error if `pad_token` occurs in the input, or if `min_length`
/// is shorter than the longest sequence.
pub fn padded_batch(
    seqs: &[Vec<i32>],
    pad_token: i32,
    min_length: Option<usize>,
) -> Result<(TokenMatrix, Vec<MaskVec>)> {
    for (row, seq) in seqs.iter().enumerate() {
        if let Some(position) = seq.iter().position(|&t| t == pad_token) {
            return Err(SolveError::PadTokenPresent {
                token: pad_token,
                row,
                position,
            });
        }
    }

    let longest = seqs.iter().map(Vec::len).max().unwrap_or(0);
    let len = match min_length {
        Some(min_length) if min_length < longest => {
            return Err(SolveError::MinLengthTooShort {
                min_length,
                longest,
            })
        }
        Some(min_length) => min_length,
        None => longest,
    };

    let mut padded = Vec::with_capacity(seqs.len());
    let mut keep = Vec::with_capacity(seqs.len());
    for seq in seqs {
        let mut row = seq.clone();
        row.resize(len, pad_token);
        let mut k = vec![1; seq.len()];
        k.resize(len, 0);
        padded.push(row);
        keep.push(k);
    }
    Ok((padded, keep))
}

/// Additionally keep every occurrence of the start and separator symbols.
///
/// The start symbol is the first token of the first row and the separator
/// its last token. Models see these for free, so they are never worth
/// masking. Paired inputs may carry the separator mid-sequence too.
pub fn keep_boundary_tokens(seqs: &[Vec<i32>], mut init_keep: Vec<MaskVec>) -> Vec<MaskVec> {
    let Some(first) = seqs.first() else {
        return init_keep;
    };
    let (Some(&start), Some(&sep)) = (first.first(), first.last()) else {
        return init_keep;
    };

    for (seq, keep) in seqs.iter().zip(init_keep.iter_mut()) {
        for (t, k) in seq.iter().zip(keep.iter_mut()) {
            if *t == start || *t == sep {
                *k = 0;
            }
        }
    }
    init_keep
}
