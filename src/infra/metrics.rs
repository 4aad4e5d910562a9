// ============================================================
// Layer 6 — Search Metrics Logger
// ============================================================
// Records the grid-search table to a CSV file after training,
// one row per combination in grid order.
//
// Output file: cv_results.csv, next to the model artifact
//
// Example CSV output (5 folds):
//   rank,strategy,quantile_range,C,gamma,mean_test_score,std_test_score,split0,...,split4
//   9,mean,"(25, 75)",0.1,auto,0.652301,0.011284,0.661102,...
//   1,median,"(25, 75)",1,0.1,0.742918,0.008713,0.751230,...
//
// The file is rewritten on every training run.

use anyhow::{Context, Result};
use csv::Writer;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ml::search::CandidateResult;

pub const CV_RESULTS_FILE: &str = "cv_results.csv";

/// Writes the per-combination cross-validation scores.
pub struct CvResultsLogger {
    csv_path: PathBuf,
}

impl CvResultsLogger {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self { csv_path: csv_path.into() }
    }

    /// Logger writing `cv_results.csv` into the artifact's directory
    pub fn beside(artifact_path: &Path) -> Self {
        let dir = artifact_path.parent().unwrap_or_else(|| Path::new(""));
        Self::new(dir.join(CV_RESULTS_FILE))
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn write(&self, candidates: &[CandidateResult]) -> Result<()> {
        if let Some(parent) = self.csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = Writer::from_path(&self.csv_path)
            .with_context(|| format!("Cannot create '{}'", self.csv_path.display()))?;

        let n_splits = candidates.first().map_or(0, |c| c.cv.scores.len());
        let mut header: Vec<String> = [
            "rank", "strategy", "quantile_range", "C", "gamma", "mean_test_score", "std_test_score",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend((0..n_splits).map(|k| format!("split{k}")));
        writer.write_record(&header)?;

        for c in candidates {
            let mut row = vec![
                c.rank.to_string(),
                c.params.strategy.to_string(),
                c.params.quantile_range.to_string(),
                c.params.c.to_string(),
                c.params.gamma.to_string(),
                format!("{:.6}", c.mean_score),
                format!("{:.6}", c.std_score),
            ];
            row.extend(c.cv.scores.iter().map(|s| format!("{s:.6}")));
            writer.write_record(&row)?;
        }
        writer.flush()?;

        tracing::debug!(
            "Wrote {} search results to '{}'",
            candidates.len(),
            self.csv_path.display()
        );
        Ok(())
    }
}
