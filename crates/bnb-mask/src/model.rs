//! The seam between the solver and a masked-token model.

/// A model that predicts a distribution at every position of every row.
///
/// Given a `[batch][len]` token matrix, returns a `[batch][len][vocab]`
/// probability tensor. Masked positions carry the configured mask token.
pub trait Model {
    fn predict(&mut self, tokens: &[Vec<i32>]) -> Vec<Vec<Vec<f64>>>;
}

impl<F> Model for F
where
    F: FnMut(&[Vec<i32>]) -> Vec<Vec<Vec<f64>>>,
{
    fn predict(&mut self, tokens: &[Vec<i32>]) -> Vec<Vec<Vec<f64>>> {
        self(tokens)
    }
}
