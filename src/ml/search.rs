// ============================================================
// Layer 5 — Grid Search with Cross-Validation
// ============================================================
// Exhaustive model selection:
//
//   for every combination in the grid (grid order)
//     for every fold of k-fold CV
//       fit a fresh pipeline on k − 1 folds, R² on the held-out fold
//   best = highest mean R²  (ties → earliest combination)
//   refit best on the full training set
//
// Every (combination, fold) pair is an independent task run on
// the current rayon pool. Results are collected in task order,
// so the winner does not depend on scheduling.
//
// Any fit failure aborts the whole search with SearchFailure;
// partial results are never returned.

use rayon::prelude::*;

use crate::domain::features::FeatureVector;
use crate::error::{PredictorError, Result};
use crate::ml::cross_val::{score_fold, CvScores, KFold};
use crate::ml::grid::PipelineConfiguration;
use crate::ml::pipeline::{FittedPipeline, PipelineBuilder, PipelineParams};

/// Cross-validation summary of one grid combination
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub params:     PipelineParams,
    pub cv:         CvScores,
    pub mean_score: f64,
    pub std_score:  f64,
    /// 1 = best; NaN means rank last
    pub rank:       usize,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_index:  usize,
    pub best_params: PipelineParams,
    pub best_score:  f64,
    /// One entry per combination, in grid order
    pub candidates:  Vec<CandidateResult>,
    /// Best combination refit on all training rows
    pub model:       FittedPipeline,
}

pub struct GridSearch {
    configuration: PipelineConfiguration,
    builder:       PipelineBuilder,
    kfold:         KFold,
}

impl GridSearch {
    /// # Panics
    /// Panics if `folds < 2`
    pub fn new(configuration: PipelineConfiguration, builder: PipelineBuilder, folds: usize) -> Self {
        Self { configuration, builder, kfold: KFold::new(folds) }
    }

    pub fn run(&self, x: &[FeatureVector], y: &[f64]) -> Result<SearchOutcome> {
        // ── Step 1: expand the grid ──
        let combos = self
            .configuration
            .combinations()
            .map_err(PredictorError::SearchFailure)?;

        let folds = self.kfold.n_splits();
        if x.len() != y.len() {
            return Err(PredictorError::SearchFailure(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if x.len() < folds {
            return Err(PredictorError::SearchFailure(format!(
                "{} training rows cannot be split into {} folds",
                x.len(),
                folds
            )));
        }

        tracing::info!(
            "Fitting {} folds for each of {} candidates, totalling {} fits",
            folds,
            combos.len(),
            folds * combos.len(),
        );

        // ── Step 2: score every (combination, fold) in parallel ──
        let splits = self.kfold.split(x.len());
        let tasks: Vec<(usize, usize)> = (0..combos.len())
            .flat_map(|ci| (0..folds).map(move |fi| (ci, fi)))
            .collect();

        let scores: Vec<f64> = tasks
            .par_iter()
            .map(|&(ci, fi)| {
                let pipeline = self.builder.build(&combos[ci]);
                score_fold(&pipeline, x, y, &splits[fi]).map_err(|e| {
                    PredictorError::SearchFailure(format!("{} (fold {}): {e}", combos[ci], fi + 1))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // ── Step 3: summarise per combination ──
        let mut candidates: Vec<CandidateResult> = combos
            .iter()
            .zip(scores.chunks(folds))
            .map(|(params, chunk)| {
                let cv = CvScores { scores: chunk.to_vec() };
                let (mean_score, std_score) = (cv.mean(), cv.std());
                CandidateResult { params: *params, cv, mean_score, std_score, rank: 0 }
            })
            .collect();
        assign_ranks(&mut candidates);

        for (i, c) in candidates.iter().enumerate() {
            tracing::debug!(
                "#{:>2} {} → mean R² {:.3} (±{:.3})",
                i,
                c.params,
                c.mean_score,
                c.std_score
            );
        }

        // ── Step 4: pick the winner ──
        let best_index = select_best(&candidates).ok_or_else(|| {
            PredictorError::SearchFailure("every combination produced a NaN score".to_string())
        })?;
        let best = &candidates[best_index];

        // ── Step 5: refit on the full training set ──
        let model = self
            .builder
            .build(&best.params)
            .fit(x, y)
            .map_err(|e| PredictorError::SearchFailure(format!("refit of {} failed: {e}", best.params)))?;

        Ok(SearchOutcome {
            best_index,
            best_params: best.params,
            best_score:  best.mean_score,
            model,
            candidates,
        })
    }
}

/// First index with the strictly greatest non-NaN mean
pub fn select_best(candidates: &[CandidateResult]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in candidates.iter().enumerate() {
        if c.mean_score.is_nan() {
            continue;
        }
        match best {
            Some((_, score)) if c.mean_score <= score => {}
            _ => best = Some((i, c.mean_score)),
        }
    }
    best.map(|(i, _)| i)
}

/// 1 + number of strictly better candidates; NaN ranks below every score
fn assign_ranks(candidates: &mut [CandidateResult]) {
    let means: Vec<f64> = candidates.iter().map(|c| c.mean_score).collect();
    for (i, c) in candidates.iter_mut().enumerate() {
        let better = means
            .iter()
            .filter(|&&m| !m.is_nan() && (means[i].is_nan() || m > means[i]))
            .count();
        c.rank = better + 1;
    }
}
