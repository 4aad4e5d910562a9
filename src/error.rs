// ============================================================
// Error taxonomy
// ============================================================
// Typed errors for the core. The CLI and the training
// orchestration wrap these in anyhow with extra context.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::validation::{ErrorKind, ValidationFailure};

pub type Result<T> = std::result::Result<T, PredictorError>;

#[derive(Error, Debug)]
pub enum PredictorError {
    /// A field is missing or not numeric
    #[error("schema error: {0}")]
    Schema(ValidationFailure),

    /// A field is numeric but outside its allowed range
    #[error("domain error: {0}")]
    Domain(ValidationFailure),

    #[error("no model artifact at '{}'", path.display())]
    ArtifactAbsent { path: PathBuf },

    #[error("model artifact at '{}' is corrupt: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("dataset fetch failed: {0}")]
    Dataset(String),

    /// Fatal to a training run; there is no partial result
    #[error("hyperparameter search failed: {0}")]
    SearchFailure(String),

    /// Reported by a ResultCache backend; serving degrades to the model
    #[error("result cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PredictorError {
    pub fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Schema(f) | Self::Domain(f) => Some(f),
            _ => None,
        }
    }
}

/// Classified by the first reported violation: range problems are
/// domain errors, everything else is a schema error.
impl From<ValidationFailure> for PredictorError {
    fn from(failure: ValidationFailure) -> Self {
        match failure.first().kind {
            ErrorKind::ValueError => Self::Domain(failure),
            ErrorKind::Missing | ErrorKind::TypeError | ErrorKind::JsonInvalid => Self::Schema(failure),
        }
    }
}
