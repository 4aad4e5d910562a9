// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
//   1. `train`   — grid-search the pipeline and save the winner
//   2. `predict` — load the saved pipeline and answer one request

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};
use std::fs;

use crate::application::handlers::Handlers;
use crate::application::predict_use_case::{InferenceEngine, ServeConfig, METHOD};
use crate::application::train_use_case::{TrainOutcome, TrainUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "housing-predictor",
    version,
    about = "Train an SVR pipeline on California housing data, then serve predictions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    match &args.data_path {
        Some(path) => tracing::info!("Starting training on '{}'", path.display()),
        None => tracing::info!("Starting training on the StatLib dataset in '{}'", args.data_home.display()),
    }

    match TrainUseCase::new(args.into()).execute()? {
        TrainOutcome::Skipped { model_path } => {
            println!("Model already present at {}, nothing to do.", model_path.display());
        }
        TrainOutcome::Trained(report) => {
            println!("Best Model Parameters: {}", report.best_params);
            println!("Best CV R2 Score:      {:.3}", report.best_cv_score);
            println!("Train R2 Score:        {:.3}", report.train_r2);
            println!("Test R2 Score:         {:.3}", report.test_r2);
            println!(
                "Model saved to {} ({} train / {} test rows), CV table in {}",
                report.model_path.display(),
                report.n_train,
                report.n_test,
                report.cv_results.display()
            );
        }
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let body = match (&args.body, &args.input) {
        (Some(body), _) => body.clone().into_bytes(),
        (None, Some(path)) => fs::read(path)
            .with_context(|| format!("Cannot read request body from '{}'", path.display()))?,
        (None, None) => anyhow::bail!("Either --body or --input is required"),
    };

    let config = ServeConfig { model_path: args.model_path, ..ServeConfig::default() };
    let handlers = Handlers::new(InferenceEngine::from_config(&config)?);
    let response = handlers.handle(METHOD, args.route.path(), &body);

    println!("{}", response.status);
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if !response.is_success() {
        anyhow::bail!("Request failed with status {}", response.status);
    }
    Ok(())
}
