//! End-to-end solves against small synthetic models.

use std::str::FromStr;

use bnb_core::StopPolicy;
use bnb_mask::{entropy, padded_batch, solve_mask, MaskSolver, SolveConfig};
use tracing::Level;

#[ctor::ctor]
fn init_tracing() {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|l| Level::from_str(&l).ok())
        .unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}

const BATCH_SIZE: usize = 32;

/// Uniform over 16 tokens at every position, checking the batch size.
fn uniform_model(tokens: &[Vec<i32>]) -> Vec<Vec<Vec<f64>>> {
    assert_eq!(tokens.len(), BATCH_SIZE);
    tokens
        .iter()
        .map(|row| vec![vec![1.0 / 16.0; 16]; row.len()])
        .collect()
}

/// Two groups of positions, `0..3` and `3..5`. A position is certain when
/// any token of its group is visible and a fair coin otherwise.
fn grouped_model(tokens: &[Vec<i32>]) -> Vec<Vec<Vec<f64>>> {
    tokens
        .iter()
        .map(|row| {
            assert_eq!(row.len(), 5);
            let know_first = row[..3].iter().any(|&t| t != 3);
            let know_second = row[3..].iter().any(|&t| t != 3);
            (0..5)
                .map(|i| match (i < 3, know_first, know_second) {
                    (true, true, _) => vec![1.0, 0.0],
                    (false, _, true) => vec![0.0, 1.0],
                    _ => vec![0.5, 0.5],
                })
                .collect()
        })
        .collect()
}

fn sequences() -> Vec<Vec<i32>> {
    vec![
        vec![0, 1, 2, 3, 4, 5, 6, 0],
        vec![6, 6, 5, 1, 0, 2, 4, 3],
        vec![2, 2, 2, 2, 2, 2, 2, 2],
        vec![1, 0, 1, 0, 1, 0, 1, 0],
    ]
}

#[test]
fn test_solve_mask_uniform() {
    let seqs = sequences();
    let keeps = vec![vec![1; 8]; seqs.len()];
    let result = solve_mask(&mut uniform_model, 6.0, &seqs, &keeps, 8, BATCH_SIZE, None).unwrap();

    // ln 16 per position: two fit into six nats
    for (solved, original) in result.iter().zip(&seqs) {
        assert_eq!(solved.iter().filter(|&&t| t == 8).count(), 2);
        for (&s, &o) in solved.iter().zip(original) {
            assert!(s == 8 || s == o);
        }
    }
}

#[test]
fn test_solve_mask_early_stopping() {
    let seqs = sequences();
    let keeps = vec![vec![1; 8]; seqs.len()];
    let config = SolveConfig::new(12.0, 8, BATCH_SIZE).with_stop(StopPolicy::abs_gap(3));
    let report = MaskSolver::new(config)
        .unwrap()
        .solve(&mut uniform_model, &seqs, &keeps)
        .unwrap();

    // The optimum is four
    for (&primal, &dual) in report.primal.iter().zip(&report.dual) {
        assert!(primal + 3 >= 4);
        assert!(primal <= 4);
        assert_eq!(primal, dual);
    }
    for (solved, &primal) in report.solutions.iter().zip(&report.primal) {
        assert_eq!(solved.iter().filter(|&&t| t == 8).count(), primal);
    }
}

#[test]
fn test_solve_grouped_model() {
    let seqs = vec![vec![0, 0, 0, 1, 1]];
    let keeps = vec![vec![1; 5]];
    let budget = entropy(&[0.5, 0.5]);
    let result = solve_mask(&mut grouped_model, budget, &seqs, &keeps, 3, 8, None).unwrap();

    // One token of each group must stay visible
    let masked = result[0].iter().filter(|&&t| t == 3).count();
    assert_eq!(masked, 3);
    assert!(result[0][..3].iter().any(|&t| t != 3));
    assert!(result[0][3..].iter().any(|&t| t != 3));
}

#[test]
fn test_padding_is_never_masked() {
    let (seqs, keeps) = padded_batch(&[vec![1, 2, 3, 4], vec![5, 6]], -1, Some(6)).unwrap();
    let mut model = |tokens: &[Vec<i32>]| -> Vec<Vec<Vec<f64>>> {
        tokens
            .iter()
            .map(|row| vec![vec![0.5, 0.5]; row.len()])
            .collect()
    };
    let report = MaskSolver::new(SolveConfig::new(100.0, 0, 4))
        .unwrap()
        .solve(&mut model, &seqs, &keeps)
        .unwrap();

    assert_eq!(report.primal, vec![4, 2]);
    assert_eq!(report.solutions[0], vec![0, 0, 0, 0, -1, -1]);
    assert_eq!(report.solutions[1], vec![0, 0, -1, -1, -1, -1]);
    assert_eq!(report.masks[1], vec![1, 1, 0, 0, 0, 0]);
    assert!(report.model_calls >= 1);
}

#[test]
fn test_incremental_keep() {
    // Positions revealed by an earlier solve stay visible in the next
    let seqs = vec![vec![4, 5, 6, 7]];
    let keeps = vec![vec![0, 1, 0, 1]];
    let mut model = |tokens: &[Vec<i32>]| -> Vec<Vec<Vec<f64>>> {
        tokens
            .iter()
            .map(|row| vec![vec![0.5, 0.5]; row.len()])
            .collect()
    };
    let report = MaskSolver::new(SolveConfig::new(10.0, 0, 2))
        .unwrap()
        .solve(&mut model, &seqs, &keeps)
        .unwrap();
    assert_eq!(report.solutions, vec![vec![4, 0, 6, 0]]);
}

#[test]
fn test_config_from_json() {
    let config: SolveConfig =
        serde_json::from_str(r#"{"entropy_budget": 2.5, "stop": {"abs_gap": 2}}"#).unwrap();
    assert_eq!(config.entropy_budget, 2.5);
    assert_eq!(config.stop, StopPolicy::AbsGap(2));
    assert_eq!(config.batch_size, SolveConfig::default().batch_size);
    assert_eq!(config.mask_value, SolveConfig::default().mask_value);

    let exact: SolveConfig = serde_json::from_str(r#"{"stop": "exact"}"#).unwrap();
    assert_eq!(exact, SolveConfig::default());

    let json = serde_json::to_string(&config).unwrap();
    let back: SolveConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
