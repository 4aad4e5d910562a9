// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Check for an existing artifact  (Layer 6 - infra)
//   Step 2: Fetch the labelled dataset      (Layer 4 - data)
//   Step 3: Split train/test (seeded)       (Layer 4 - data)
//   Step 4: Grid search with k-fold CV      (Layer 5 - ml)
//   Step 5: Score the refit model           (Layer 5 - ml)
//   Step 6: Save artifact + CV table        (Layer 6 - infra)
//
// Training is skipped when a valid artifact already exists. A
// corrupt artifact is logged, moved aside to `<path>.corrupt`,
// and replaced by a fresh run.
//
// The run is deterministic: the same dataset, seed and settings
// produce a byte-identical artifact.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::fetcher::StatLibFetcher;
use crate::data::loader::CsvDatasetLoader;
use crate::data::splitter::train_test_split;
use crate::domain::traits::DatasetSource;
use crate::infra::artifact::{ArtifactStore, LoadOutcome};
use crate::infra::metrics::CvResultsLogger;
use crate::ml::grid::PipelineConfiguration;
use crate::ml::model::SvrSettings;
use crate::ml::pipeline::{PipelineBuilder, PipelineParams};
use crate::ml::search::{GridSearch, SearchOutcome};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model_path: PathBuf,
    /// Local CSV to train on; None = download into `data_home`
    pub data_path:  Option<PathBuf>,
    pub data_home:  PathBuf,
    pub folds:      usize,
    pub test_size:  f64,
    pub seed:       u64,
    /// Worker threads for the search; None = one per core
    pub jobs:       Option<usize>,
    pub svr:        SvrSettings,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.pkl"),
            data_path:  None,
            data_home:  PathBuf::from("data"),
            folds:      5,
            test_size:  0.33,
            seed:       42,
            jobs:       None,
            svr:        SvrSettings::default(),
        }
    }
}

impl TrainConfig {
    fn check(&self) -> Result<()> {
        if self.folds < 2 {
            bail!("--folds must be at least 2, got {}", self.folds);
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            bail!("--test-size must be in (0, 1), got {}", self.test_size);
        }
        if self.jobs == Some(0) {
            bail!("--jobs must be at least 1");
        }
        Ok(())
    }
}

// ─── Outcome ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub best_params:   PipelineParams,
    pub best_cv_score: f64,
    pub train_r2:      f64,
    pub test_r2:       f64,
    pub n_train:       usize,
    pub n_test:        usize,
    pub model_path:    PathBuf,
    pub cv_results:    PathBuf,
}

#[derive(Debug, Clone)]
pub enum TrainOutcome {
    /// A valid artifact was already present
    Skipped { model_path: PathBuf },
    Trained(Box<TrainReport>),
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
    source: Box<dyn DatasetSource>,
}

impl TrainUseCase {
    /// Train from `config.data_path` if set, else from the cached
    /// (or freshly downloaded) StatLib archive in `config.data_home`
    pub fn new(config: TrainConfig) -> Self {
        let source: Box<dyn DatasetSource> = match &config.data_path {
            Some(path) => Box::new(CsvDatasetLoader::new(path.clone())),
            None => Box::new(StatLibFetcher::new(config.data_home.clone())),
        };
        Self { config, source }
    }

    /// Train from any dataset source
    pub fn with_source(config: TrainConfig, source: Box<dyn DatasetSource>) -> Self {
        Self { config, source }
    }

    pub fn execute(&self) -> Result<TrainOutcome> {
        let cfg = &self.config;
        cfg.check()?;
        let store = ArtifactStore::new(&cfg.model_path);

        // ── Step 1: Skip if a valid model exists ─────────────────────────────
        match store.load()? {
            LoadOutcome::Loaded(_) => {
                tracing::info!(
                    "Model already exists at '{}', skipping training",
                    cfg.model_path.display()
                );
                return Ok(TrainOutcome::Skipped { model_path: cfg.model_path.clone() });
            }
            LoadOutcome::Corrupt(reason) => {
                tracing::error!(
                    "Model artifact at '{}' is corrupt ({}), retraining",
                    cfg.model_path.display(),
                    reason
                );
                let moved = store.quarantine()?;
                tracing::warn!("Moved corrupt artifact to '{}'", moved.display());
            }
            LoadOutcome::Absent => {}
        }

        // ── Step 2: Load the dataset ─────────────────────────────────────────
        let dataset = self.source.fetch().context("Cannot load the training dataset")?;

        // ── Step 3: Train / test split ───────────────────────────────────────
        let (train, test) = train_test_split(&dataset, cfg.test_size, cfg.seed)?;
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        // ── Step 4: Grid search (Layer 5) ────────────────────────────────────
        let search = GridSearch::new(
            PipelineConfiguration::housing(),
            PipelineBuilder::new(cfg.svr),
            cfg.folds,
        );
        let outcome = self.run_search(&search, &train.features, &train.targets)?;
        tracing::info!("Best Model Parameters: {}", outcome.best_params);
        tracing::info!("Best CV R2 Score: {:.3}", outcome.best_score);

        // ── Step 5: Score the refit model ────────────────────────────────────
        let train_r2 = outcome.model.score(&train.features, &train.targets);
        let test_r2  = outcome.model.score(&test.features, &test.targets);
        tracing::info!("Train R2 Score: {:.3}", train_r2);
        tracing::info!("Test R2 Score: {:.3}", test_r2);

        // ── Step 6: Persist ──────────────────────────────────────────────────
        store
            .save(&outcome.model)
            .with_context(|| format!("Cannot save model to '{}'", cfg.model_path.display()))?;
        tracing::info!("Model saved to '{}'", cfg.model_path.display());

        let logger = CvResultsLogger::beside(&cfg.model_path);
        logger.write(&outcome.candidates)?;

        Ok(TrainOutcome::Trained(Box::new(TrainReport {
            best_params:   outcome.best_params,
            best_cv_score: outcome.best_score,
            train_r2,
            test_r2,
            n_train:       train.len(),
            n_test:        test.len(),
            model_path:    cfg.model_path.clone(),
            cv_results:    logger.csv_path().to_path_buf(),
        })))
    }

    /// Run on a dedicated pool when `jobs` is set, else on rayon's global pool
    fn run_search(
        &self,
        search:  &GridSearch,
        x:       &[crate::domain::features::FeatureVector],
        y:       &[f64],
    ) -> Result<SearchOutcome> {
        let outcome = match self.config.jobs {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .context("Cannot build the search thread pool")?;
                pool.install(|| search.run(x, y))?
            }
            None => search.run(x, y)?,
        };
        Ok(outcome)
    }
}
