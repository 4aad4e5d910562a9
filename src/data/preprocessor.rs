// ============================================================
// Layer 4 — Feature Preprocessor
// ============================================================
// The two preprocessing stages that sit in front of the SVR:
//
//   SimpleImputer → fills missing values (NaN) per column with
//                   the column mean or median of observed values
//   RobustScaler  → centres each column on its median and divides
//                   by an inter-quantile range
//
// Each stage has an unfitted form holding hyperparameters and a
// fitted form holding the statistics learned from training rows.
// Only the fitted forms are persisted in the model artifact.
//
// Percentiles use linear interpolation between the two closest
// ranks, so the median of an even-length column is the mean of
// the two middle values.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::features::{FeatureVector, N_FEATURES};

// ─── ImputeStrategy ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "lowercase")]
pub enum ImputeStrategy {
    Mean,
    Median,
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputeStrategy::Mean   => write!(f, "mean"),
            ImputeStrategy::Median => write!(f, "median"),
        }
    }
}

// ─── SimpleImputer ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self { strategy }
    }

    /// Learn one fill value per column. A column with no observed
    /// values fills with 0.0.
    pub fn fit(&self, rows: &[FeatureVector]) -> FittedImputer {
        let mut statistics = [0.0; N_FEATURES];
        for (col, stat) in statistics.iter_mut().enumerate() {
            let observed = observed_sorted(rows, col);
            if observed.is_empty() {
                continue;
            }
            *stat = match self.strategy {
                ImputeStrategy::Mean   => observed.iter().sum::<f64>() / observed.len() as f64,
                ImputeStrategy::Median => percentile(&observed, 50.0),
            };
        }
        FittedImputer { strategy: self.strategy, statistics }
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FittedImputer {
    strategy:   ImputeStrategy,
    statistics: FeatureVector,
}

impl FittedImputer {
    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    pub fn statistics(&self) -> &FeatureVector {
        &self.statistics
    }

    pub fn transform_row(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = *row;
        for (value, fill) in out.iter_mut().zip(&self.statistics) {
            if value.is_nan() {
                *value = *fill;
            }
        }
        out
    }

    pub fn transform(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

// ─── QuantileRange ────────────────────────────────────────────────────────────
/// Lower and upper percentiles (0–100) bounding the scaling range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct QuantileRange {
    pub low:  f64,
    pub high: f64,
}

impl QuantileRange {
    /// # Panics
    /// Panics unless `0 <= low < high <= 100`
    pub fn new(low: f64, high: f64) -> Self {
        assert!(
            (0.0..=100.0).contains(&low) && (0.0..=100.0).contains(&high) && low < high,
            "invalid quantile range ({low}, {high})"
        );
        Self { low, high }
    }
}

impl fmt::Display for QuantileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}

// ─── RobustScaler ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustScaler {
    quantile_range: QuantileRange,
}

impl RobustScaler {
    pub fn new(quantile_range: QuantileRange) -> Self {
        Self { quantile_range }
    }

    /// Learn the per-column median and inter-quantile range.
    /// A zero range (constant column) scales by 1.0.
    pub fn fit(&self, rows: &[FeatureVector]) -> FittedScaler {
        let mut center = [0.0; N_FEATURES];
        let mut scale  = [1.0; N_FEATURES];

        for col in 0..N_FEATURES {
            let observed = observed_sorted(rows, col);
            if observed.is_empty() {
                continue;
            }
            center[col] = percentile(&observed, 50.0);
            let range = percentile(&observed, self.quantile_range.high)
                - percentile(&observed, self.quantile_range.low);
            if range != 0.0 {
                scale[col] = range;
            }
        }

        FittedScaler { quantile_range: self.quantile_range, center, scale }
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FittedScaler {
    quantile_range: QuantileRange,
    center:         FeatureVector,
    scale:          FeatureVector,
}

impl FittedScaler {
    pub fn quantile_range(&self) -> QuantileRange {
        self.quantile_range
    }

    pub fn center(&self) -> &FeatureVector {
        &self.center
    }

    pub fn scale(&self) -> &FeatureVector {
        &self.scale
    }

    pub fn transform_row(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = *row;
        for ((value, c), s) in out.iter_mut().zip(&self.center).zip(&self.scale) {
            *value = (*value - c) / s;
        }
        out
    }

    pub fn transform(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

// ─── Column statistics ────────────────────────────────────────────────────────
/// Non-missing values of one column, ascending
fn observed_sorted(rows: &[FeatureVector], col: usize) -> Vec<f64> {
    let mut values: Vec<f64> = rows.iter().map(|r| r[col]).filter(|v| !v.is_nan()).collect();
    values.sort_by(f64::total_cmp);
    values
}

/// Linear-interpolated percentile `q` (0–100) of a sorted, non-empty slice
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank  = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac  = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
