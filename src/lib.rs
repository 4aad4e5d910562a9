// ============================================================
// housing-predictor — crate root
// ============================================================
// Layer map (outermost first):
//
//   cli          — clap commands: `train` and `predict`
//   application  — use cases: training run, inference engine,
//                  request handlers for the transport boundary
//   domain       — feature schema, validation, core traits
//   data         — dataset loading, splitting, preprocessing stages
//   ml           — SVR solver, pipeline, cross-validation, grid search
//   infra        — artifact store, result cache, CV results log
//
// Inner layers never depend on outer ones.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod infra;
pub mod ml;

pub use error::{PredictorError, Result};
