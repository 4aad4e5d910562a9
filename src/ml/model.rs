// ============================================================
// Layer 5 — Support Vector Regressor
// ============================================================
// Epsilon-SVR with an RBF kernel:
//
//   k(a, b) = exp(-gamma * ‖a − b‖²)
//   f(x)    = Σ coefᵢ · k(svᵢ, x) + intercept
//
// Points predicted within `epsilon` of their target cost nothing;
// `C` weighs the penalty for points outside that tube.
//
// `gamma = auto` resolves to 1 / n_features at fit time, so the
// fitted model always stores a concrete value.
//
// Fitting is delegated to the SMO solver in ml::solver; this file
// holds the hyperparameters and the fitted, serialisable model.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::features::{FeatureVector, N_FEATURES};
use crate::ml::solver;

// ─── Gamma ────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "lowercase")]
pub enum Gamma {
    /// 1 / n_features
    Auto,
    Value(f64),
}

impl Gamma {
    pub fn resolve(self, n_features: usize) -> f64 {
        match self {
            Gamma::Auto     => 1.0 / n_features as f64,
            Gamma::Value(g) => g,
        }
    }
}

impl fmt::Display for Gamma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gamma::Auto     => write!(f, "auto"),
            Gamma::Value(g) => write!(f, "{g}"),
        }
    }
}

// ─── SvrSettings ──────────────────────────────────────────────────────────────
/// Solver settings shared by every grid combination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvrSettings {
    /// Half-width of the insensitive tube
    pub epsilon: f64,

    /// Stopping tolerance on the maximal KKT violation
    pub tol: f64,

    /// Optimisation stops (with a warning) after this many SMO steps
    pub max_iter: usize,

    /// Memory bound for cached kernel rows, in megabytes
    pub kernel_cache_mb: usize,
}

impl Default for SvrSettings {
    fn default() -> Self {
        Self {
            epsilon:         0.1,
            tol:             1e-3,
            max_iter:        1_000_000,
            kernel_cache_mb: 100,
        }
    }
}

// ─── FitError ─────────────────────────────────────────────────────────────────
#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("cannot fit on an empty training set")]
    Empty,

    #[error("{rows} feature rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("training data contains non-finite values")]
    NonFinite,

    #[error("invalid hyperparameter: {0}")]
    InvalidParameter(String),
}

// ─── Svr (unfitted) ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Svr {
    c:        f64,
    gamma:    Gamma,
    settings: SvrSettings,
}

impl Svr {
    pub fn new(c: f64, gamma: Gamma) -> Self {
        Self { c, gamma, settings: SvrSettings::default() }
    }

    pub fn with_settings(mut self, settings: SvrSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn fit(&self, x: &[FeatureVector], y: &[f64]) -> Result<FittedSvr, FitError> {
        if x.is_empty() {
            return Err(FitError::Empty);
        }
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch { rows: x.len(), targets: y.len() });
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(FitError::InvalidParameter(format!("C must be positive, got {}", self.c)));
        }
        let gamma = self.gamma.resolve(N_FEATURES);
        if !(gamma > 0.0 && gamma.is_finite()) {
            return Err(FitError::InvalidParameter(format!("gamma must be positive, got {gamma}")));
        }
        if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite);
        }

        let solution = solver::solve_epsilon_svr(x, y, self.c, gamma, &self.settings);

        let (support_vectors, dual_coef): (Vec<FeatureVector>, Vec<f64>) = x
            .iter()
            .zip(&solution.coef)
            .filter(|(_, &coef)| coef != 0.0)
            .map(|(row, &coef)| (*row, coef))
            .unzip();

        tracing::debug!(
            "SVR fitted: C={}, gamma={}, {} support vectors, {} iterations",
            self.c,
            gamma,
            support_vectors.len(),
            solution.iterations,
        );

        Ok(FittedSvr {
            support_vectors,
            dual_coef,
            intercept: solution.intercept,
            gamma,
        })
    }
}

// ─── FittedSvr ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FittedSvr {
    support_vectors: Vec<FeatureVector>,
    dual_coef:       Vec<f64>,
    intercept:       f64,
    gamma:           f64,
}

impl FittedSvr {
    pub fn n_support(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn predict_row(&self, x: &FeatureVector) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| coef * rbf_kernel(sv, x, self.gamma))
            .sum::<f64>()
            + self.intercept
    }

    pub fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }
}

/// exp(-gamma * ‖a − b‖²)
pub fn rbf_kernel(a: &FeatureVector, b: &FeatureVector, gamma: f64) -> f64 {
    let sq_dist: f64 = a.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum();
    (-gamma * sq_dist).exp()
}
