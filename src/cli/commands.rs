// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and all
// their flags. Every `train` flag has a default, so a bare
// `housing-predictor train` reproduces the reference run.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::predict_use_case::Route;
use crate::application::train_use_case::TrainConfig;
use crate::ml::model::SvrSettings;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the grid search and save the best pipeline
    Train(TrainArgs),

    /// Run one prediction request against a saved pipeline
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Where the fitted pipeline is written; training is skipped if a
    /// valid one is already there
    #[arg(long, default_value = "model.pkl")]
    pub model_path: PathBuf,

    /// Local California housing CSV (raw StatLib layout or a headed
    /// frame); when omitted the StatLib archive is downloaded once
    /// into --data-home
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Directory holding the downloaded dataset
    #[arg(long, default_value = "data")]
    pub data_home: PathBuf,

    /// Cross-validation folds per combination
    #[arg(long, default_value_t = 5)]
    pub folds: usize,

    /// Fraction of rows held out for the final test score
    #[arg(long, default_value_t = 0.33)]
    pub test_size: f64,

    /// Seed for the train/test shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Worker threads for the search (default: one per core)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// SMO iteration cap per fit
    #[arg(long, default_value_t = 1_000_000)]
    pub max_iter: usize,

    /// Kernel row cache per fit, in MB
    #[arg(long, default_value_t = 100)]
    pub kernel_cache_mb: usize,
}

/// The application layer never sees clap types
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            model_path: a.model_path,
            data_path:  a.data_path,
            data_home:  a.data_home,
            folds:      a.folds,
            test_size:  a.test_size,
            seed:       a.seed,
            jobs:       a.jobs,
            svr: SvrSettings {
                max_iter:        a.max_iter,
                kernel_cache_mb: a.kernel_cache_mb,
                ..SvrSettings::default()
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// single-predict or multiple-predict
    #[arg(long)]
    pub route: Route,

    /// Request body as a JSON string
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    pub body: Option<String>,

    /// File holding the request body
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Fitted pipeline to serve
    #[arg(long, default_value = "model.pkl")]
    pub model_path: PathBuf,
}
