// ============================================================
// Layer 5 — Preprocessing + Model Pipeline
// ============================================================
// The one pipeline shape this crate knows:
//
//   SimpleImputer(strategy)
//       │
//       ▼
//   RobustScaler(quantile_range)
//       │
//       ▼
//   Svr(C, gamma)
//
// PipelineBuilder composes an unfitted Pipeline from one grid
// combination. Pipeline::fit fits each stage on the output of
// the previous one and returns an immutable FittedPipeline,
// which is what the artifact store persists and what serving
// predicts with.

use bincode::{Decode, Encode};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::preprocessor::{
    FittedImputer, FittedScaler, ImputeStrategy, QuantileRange, RobustScaler, SimpleImputer,
};
use crate::domain::features::{FeatureVector, FEATURE_NAMES};
use crate::domain::traits::Predictor;
use crate::ml::model::{FitError, FittedSvr, Gamma, Svr, SvrSettings};
use crate::ml::scoring::r2_score;

// ─── PipelineParams ───────────────────────────────────────────────────────────
/// One point in the hyperparameter grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PipelineParams {
    pub strategy:       ImputeStrategy,
    pub quantile_range: QuantileRange,
    pub c:              f64,
    pub gamma:          Gamma,
}

impl fmt::Display for PipelineParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{simple_imputer__strategy: {}, robust_scaler__quantile_range: {}, svr__C: {}, svr__gamma: {}}}",
            self.strategy, self.quantile_range, self.c, self.gamma
        )
    }
}

// ─── PipelineBuilder ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineBuilder {
    settings: SvrSettings,
}

impl PipelineBuilder {
    pub fn new(settings: SvrSettings) -> Self {
        Self { settings }
    }

    /// Compose the unfitted chain. Nothing is learned here.
    pub fn build(&self, params: &PipelineParams) -> Pipeline {
        Pipeline {
            params:  *params,
            imputer: SimpleImputer::new(params.strategy),
            scaler:  RobustScaler::new(params.quantile_range),
            svr:     Svr::new(params.c, params.gamma).with_settings(self.settings),
        }
    }
}

// ─── Pipeline (unfitted) ──────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct Pipeline {
    params:  PipelineParams,
    imputer: SimpleImputer,
    scaler:  RobustScaler,
    svr:     Svr,
}

impl Pipeline {
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub fn fit(&self, x: &[FeatureVector], y: &[f64]) -> Result<FittedPipeline, FitError> {
        if x.is_empty() {
            return Err(FitError::Empty);
        }

        // ── Step 1: imputation ──
        let imputer = self.imputer.fit(x);
        let imputed = imputer.transform(x);

        // ── Step 2: scaling ──
        let scaler = self.scaler.fit(&imputed);
        let scaled = scaler.transform(&imputed);

        // ── Step 3: regressor ──
        let svr = self.svr.fit(&scaled, y)?;

        Ok(FittedPipeline {
            params:        self.params,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            imputer,
            scaler,
            svr,
        })
    }
}

// ─── FittedPipeline ───────────────────────────────────────────────────────────
/// Trained, immutable imputer + scaler + SVR
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FittedPipeline {
    params:        PipelineParams,
    feature_names: Vec<String>,
    imputer:       FittedImputer,
    scaler:        FittedScaler,
    svr:           FittedSvr,
}

impl FittedPipeline {
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Column order the model was trained with
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn imputer(&self) -> &FittedImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &FittedScaler {
        &self.scaler
    }

    pub fn svr(&self) -> &FittedSvr {
        &self.svr
    }

    pub fn predict_row(&self, row: &FeatureVector) -> f64 {
        let imputed = self.imputer.transform_row(row);
        let scaled  = self.scaler.transform_row(&imputed);
        self.svr.predict_row(&scaled)
    }

    /// R² on the given rows
    pub fn score(&self, x: &[FeatureVector], y: &[f64]) -> f64 {
        r2_score(y, &Predictor::predict(self, x))
    }
}

impl Predictor for FittedPipeline {
    fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.par_iter().map(|row| self.predict_row(row)).collect()
    }
}
