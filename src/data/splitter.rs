// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles row indices with a seeded RNG and splits the dataset
// into two disjoint sets:
//   - Training set: used by the grid search (and its CV folds)
//   - Test set:     held out, scored once after the refit
//
// The permutation depends only on (row count, seed), so the same
// dataset and seed always produce the same split. That makes a
// rerun of training reproduce the same artifact.
//
// Test size is a fraction of the rows, rounded up:
//   n_test  = ceil(n * test_size)
//   n_train = n - n_test
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom over a
// StdRng seeded with seed_from_u64.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::dataset::Dataset;
use crate::error::{PredictorError, Result};

/// Seeded shuffle-and-split into (train, test).
///
/// # Errors
/// `Dataset` when `test_size` is outside (0, 1) or when either
/// side of the split would be empty.
pub fn train_test_split(dataset: &Dataset, test_size: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PredictorError::Dataset(format!(
            "test size must be in (0, 1), got {test_size}"
        )));
    }

    let total  = dataset.len();
    let n_test = ((total as f64) * test_size).ceil() as usize;
    if n_test == 0 || n_test >= total {
        return Err(PredictorError::Dataset(format!(
            "cannot split {total} rows with test size {test_size}"
        )));
    }

    let mut indices: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let train = dataset.select(train_idx);
    let test  = dataset.select(test_idx);

    tracing::debug!(
        "Dataset split: {} training, {} test (seed {})",
        train.len(),
        test.len(),
        seed,
    );

    Ok((train, test))
}
