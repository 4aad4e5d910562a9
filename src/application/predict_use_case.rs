// ============================================================
// Layer 2 — PredictUseCase (Inference Engine)
// ============================================================
// Serves predictions for one request at a time:
//
//   Step 1: Parse the body as JSON        (Layer 3 - domain)
//   Step 2: Validate into FeatureRecords  (Layer 3 - domain)
//   Step 3: Vectorize                     (Layer 3 - domain)
//   Step 4: Fingerprint the request       (Layer 6 - infra)
//   Step 5: Cache hit → return it         (Layer 6 - infra)
//   Step 6: Miss → predict, store, return (Layer 5 - ml)
//
// The engine owns its model and cache handles; there is no global
// state. The model is loaded once and shared read-only, so one
// engine serves any number of concurrent callers.
//
// A cache that errors is treated as a miss: the request is served
// straight from the model and a warning is logged.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::features::{vectorize, vectorize_batch};
use crate::domain::traits::Predictor;
use crate::domain::validation::Validator;
use crate::error::{PredictorError, Result};
use crate::infra::artifact::ArtifactStore;
use crate::infra::cache::{fingerprint, CacheConfig, ResultCache};

pub const METHOD: &str = "POST";

// ─── Route ────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// One record in, one prediction out
    SinglePredict,
    /// `{"houses": [...]}` in, one prediction per record out
    MultiplePredict,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::SinglePredict   => "/single-predict",
            Route::MultiplePredict => "/multiple-predict",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/single-predict"   => Some(Route::SinglePredict),
            "/multiple-predict" => Some(Route::MultiplePredict),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Accepts the path with or without its leading slash
impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let path = if s.starts_with('/') { s.to_string() } else { format!("/{s}") };
        Route::from_path(&path).ok_or_else(|| {
            format!("unknown route '{s}', expected single-predict or multiple-predict")
        })
    }
}

// ─── PredictResponse ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Single { prediction: f64 },
    Batch { predictions: Vec<f64> },
}

// ─── Serving Configuration ───────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    pub model_path: PathBuf,
    pub cache:      CacheConfig,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.pkl"),
            cache:      CacheConfig::from_env(),
        }
    }
}

// ─── InferenceEngine ──────────────────────────────────────────────────────────
pub struct InferenceEngine {
    model:     Arc<dyn Predictor>,
    cache:     Arc<dyn ResultCache>,
    validator: Validator,
    ttl:       Duration,
}

impl InferenceEngine {
    pub fn new(model: Arc<dyn Predictor>, cache: Arc<dyn ResultCache>, ttl: Duration) -> Self {
        Self { model, cache, validator: Validator::default(), ttl }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Load the artifact and connect the cache. A missing or corrupt
    /// artifact is fatal here.
    pub fn from_config(cfg: &ServeConfig) -> anyhow::Result<Self> {
        let store = ArtifactStore::new(&cfg.model_path);
        let model = store
            .load_required()
            .with_context(|| "Cannot start the inference engine. Have you trained the model first?")?;
        tracing::info!(
            "Loaded model from '{}' with params {}",
            cfg.model_path.display(),
            model.params()
        );

        Ok(Self::new(Arc::new(model), cfg.cache.connect(), cfg.cache.ttl()))
    }

    /// Serve one request body on `route`.
    pub fn infer(&self, route: Route, body: &[u8]) -> Result<PredictResponse> {
        // ── Step 1-3: parse, validate, vectorize ──
        let value = self.validator.parse_body(body)?;
        let rows = match route {
            Route::SinglePredict => vec![vectorize(&self.validator.validate_record(&value)?)],
            Route::MultiplePredict => {
                let records = self.validator.validate_batch(&value)?;
                if records.is_empty() {
                    return Ok(PredictResponse::Batch { predictions: Vec::new() });
                }
                vectorize_batch(&records)
            }
        };

        // ── Step 4-5: cache lookup ──
        let key = fingerprint(METHOD, route.path(), body);
        match self.cache.lookup(&key) {
            Ok(Some(cached)) => match serde_json::from_str::<PredictResponse>(&cached) {
                Ok(response) => {
                    tracing::debug!("Cache hit for {} ({})", route, &key[..12]);
                    return Ok(response);
                }
                Err(e) => tracing::warn!("Ignoring unreadable cache entry {}: {}", &key[..12], e),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache lookup failed, predicting directly: {}", e),
        }

        // ── Step 6: predict and store ──
        let predictions = self.model.predict(&rows);
        let response = match route {
            Route::SinglePredict => PredictResponse::Single {
                prediction: predictions.first().copied().ok_or_else(|| {
                    PredictorError::Serialization("model returned no prediction".to_string())
                })?,
            },
            Route::MultiplePredict => PredictResponse::Batch { predictions },
        };

        match serde_json::to_string(&response) {
            Ok(serialized) => {
                if let Err(e) = self.cache.store(&key, &serialized, self.ttl) {
                    tracing::warn!("Cache store failed, response not cached: {}", e);
                }
            }
            Err(e) => tracing::warn!("Cannot serialize response for caching: {}", e),
        }

        Ok(response)
    }
}
