//! Shannon entropy of model predictions.

/// Entropy in nats of one probability distribution.
///
/// Zero-probability outcomes contribute nothing.
pub fn entropy(dist: &[f64]) -> f64 {
    -dist
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.ln())
        .sum::<f64>()
}

/// Collapse a `[batch][position][vocab]` tensor to per-position entropies.
pub fn entropies(probs: &[Vec<Vec<f64>>]) -> Vec<Vec<f64>> {
    probs
        .iter()
        .map(|row| row.iter().map(|dist| entropy(dist)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform() {
        let dist = vec![1.0 / 16.0; 16];
        assert!((entropy(&dist) - 16f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_certain_outcome() {
        assert_eq!(entropy(&[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(entropy(&[]), 0.0);
    }

    #[test]
    fn test_coin() {
        assert!((entropy(&[0.5, 0.5]) - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_tensor_shape() {
        let probs = vec![
            vec![vec![0.5, 0.5], vec![1.0, 0.0], vec![0.25; 4]],
            vec![vec![0.0, 1.0], vec![0.5, 0.5], vec![1.0]],
        ];
        let ents = entropies(&probs);
        assert_eq!(ents.len(), 2);
        assert!(ents.iter().all(|r| r.len() == 3));
        assert_eq!(ents[0][1], 0.0);
        assert!((ents[0][2] - 4f64.ln()).abs() < 1e-12);
        assert_eq!(ents[1][2], 0.0);
    }
}
