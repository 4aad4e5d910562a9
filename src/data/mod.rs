// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the dataset file on disk and the rows the
// model consumes:
//
//   StatLib archive (downloaded once into the data directory)
//       │
//       ▼
//   cal_housing.data / any local cal_housing.csv
//       │
//       ▼
//   CsvDatasetLoader  → parses rows, derives features, NaN = missing
//       │
//       ▼
//   train_test_split  → seeded shuffle into train / test
//       │
//       ▼
//   SimpleImputer     → fills missing values
//       │
//       ▼
//   RobustScaler      → median-centred, quantile-range scaled
//       │
//       ▼
//   Svr (ml layer)
//
// The imputer and scaler are fitted inside ml::pipeline, once per
// cross-validation fold and once more for the final refit.

/// Downloads and caches the StatLib archive
pub mod fetcher;

/// Reads the labelled dataset from a local CSV file
pub mod loader;

/// Imputation and robust scaling stages
pub mod preprocessor;

/// Seeded train/test split
pub mod splitter;
