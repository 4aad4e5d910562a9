// ============================================================
// Layer 5 — K-Fold Cross-Validation
// ============================================================
// Splits n rows into k contiguous folds, without shuffling:
//
//   n = 11, k = 5 → fold sizes 3, 2, 2, 2, 2
//
// The first n % k folds get one extra row. Each fold is held out
// once while a fresh pipeline is fitted on the remaining k − 1
// folds, then scored with R² on the held-out fold.
//
// Preprocessing is fitted inside each fold, so imputation and
// scaling statistics never see the held-out rows.

use crate::domain::features::FeatureVector;
use crate::ml::model::FitError;
use crate::ml::pipeline::Pipeline;
use crate::ml::scoring;

/// One train/held-out partition of row indices
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test:  Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    /// # Panics
    /// Panics if `n_splits < 2`
    pub fn new(n_splits: usize) -> Self {
        assert!(n_splits >= 2, "k-fold needs at least 2 splits, got {n_splits}");
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Contiguous folds over `0..n_samples`. Folds are empty when
    /// `n_samples < n_splits`; callers check that first.
    pub fn split(&self, n_samples: usize) -> Vec<Fold> {
        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = fold_size + usize::from(k < remainder);
            let end  = start + size;
            let test: Vec<usize>  = (start..end).collect();
            let train: Vec<usize> = (0..start).chain(end..n_samples).collect();
            folds.push(Fold { train, test });
            start = end;
        }
        folds
    }
}

/// Per-fold R² scores of one parameter combination
#[derive(Debug, Clone, PartialEq)]
pub struct CvScores {
    pub scores: Vec<f64>,
}

impl CvScores {
    pub fn mean(&self) -> f64 {
        scoring::mean(&self.scores)
    }

    pub fn std(&self) -> f64 {
        scoring::std_dev(&self.scores)
    }
}

/// Fit on the fold's training rows, return R² on its held-out rows
pub fn score_fold(
    pipeline: &Pipeline,
    x:        &[FeatureVector],
    y:        &[f64],
    fold:     &Fold,
) -> Result<f64, FitError> {
    let (train_x, train_y) = gather(x, y, &fold.train);
    let (test_x, test_y)   = gather(x, y, &fold.test);
    let fitted = pipeline.fit(&train_x, &train_y)?;
    Ok(fitted.score(&test_x, &test_y))
}

fn gather(x: &[FeatureVector], y: &[f64], indices: &[usize]) -> (Vec<FeatureVector>, Vec<f64>) {
    (
        indices.iter().map(|&i| x[i]).collect(),
        indices.iter().map(|&i| y[i]).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessor::{ImputeStrategy, QuantileRange};
    use crate::ml::model::{Gamma, SvrSettings};
    use crate::ml::pipeline::{PipelineBuilder, PipelineParams};

    #[test]
    fn test_first_folds_take_the_remainder() {
        let sizes: Vec<usize> = KFold::new(5).split(11).iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![3, 2, 2, 2, 2]);
    }

    #[test]
    fn test_every_index_held_out_exactly_once() {
        let folds = KFold::new(4).split(10);
        let mut held: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        held.sort_unstable();
        assert_eq!(held, (0..10).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 10);
            assert!(fold.test.iter().all(|i| !fold.train.contains(i)));
        }
    }

    #[test]
    fn test_folds_are_contiguous() {
        let folds = KFold::new(3).split(6);
        assert_eq!(folds[1].test, vec![2, 3]);
        assert_eq!(folds[1].train, vec![0, 1, 4, 5]);
    }

    #[test]
    #[should_panic]
    fn test_single_split_panics() {
        let _ = KFold::new(1);
    }

    #[test]
    fn test_score_fold_on_each_fold() {
        let x: Vec<FeatureVector> = (0..30)
            .map(|i| {
                let v = (i % 10) as f64 / 10.0;
                [v, 1.0 - v, v * v, 0.5, v, 0.2, 35.0 + v, -120.0 - v]
            })
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 2.0 * r[0] + 1.0).collect();

        let params = PipelineParams {
            strategy:       ImputeStrategy::Mean,
            quantile_range: QuantileRange::new(25.0, 75.0),
            c:              10.0,
            gamma:          Gamma::Auto,
        };
        let pipeline = PipelineBuilder::new(SvrSettings::default()).build(&params);
        let scores = KFold::new(3)
            .split(x.len())
            .iter()
            .map(|fold| score_fold(&pipeline, &x, &y, fold).unwrap())
            .collect();
        let cv = CvScores { scores };
        assert_eq!(cv.scores.len(), 3);
        assert!(cv.mean() > 0.5, "mean R² {}", cv.mean());
        assert!(cv.std() >= 0.0);
    }
}
