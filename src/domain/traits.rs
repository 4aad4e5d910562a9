// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between layers. The application layer talks to these
// traits so that data sources and models can be swapped, and
// so the inference engine can be tested with a stand-in model.

use crate::domain::dataset::Dataset;
use crate::domain::features::FeatureVector;
use crate::error::Result;

// ─── DatasetSource ────────────────────────────────────────────────────────────
/// Anything that can produce the full labelled dataset.
///
/// Implementations:
///   - CsvDatasetLoader → local CSV or raw StatLib file
pub trait DatasetSource {
    /// Fetch every labelled row. A failure is fatal to training.
    fn fetch(&self) -> Result<Dataset>;
}

// ─── Predictor ────────────────────────────────────────────────────────────────
/// A read-only model that maps feature vectors to predictions.
///
/// Implementations:
///   - FittedPipeline → imputer + scaler + SVR
pub trait Predictor: Send + Sync {
    /// One prediction per input row, in input order
    fn predict(&self, rows: &[FeatureVector]) -> Vec<f64>;
}
