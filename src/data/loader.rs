// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads the California housing data from a local file.
//
// Two layouts are accepted and told apart by the first row:
//
//   1. Frame CSV — a header row naming the eight features and
//      the target column `MedHouseVal` (any column order, extra
//      columns ignored):
//        MedInc,HouseAge,AveRooms,...,Longitude,MedHouseVal
//
//   2. Raw StatLib `cal_housing.data` — no header, nine numeric
//      columns per row:
//        longitude, latitude, housingMedianAge, totalRooms,
//        totalBedrooms, population, households, medianIncome,
//        medianHouseValue
//      Per-household averages are derived from the totals and
//      the target is rescaled to units of $100,000.
//
// Empty cells become NaN and are left for the imputer.
// Anything else that is not a number aborts the fetch.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};

use crate::domain::dataset::Dataset;
use crate::domain::features::{FeatureVector, FEATURE_NAMES, N_FEATURES};
use crate::domain::traits::DatasetSource;
use crate::error::{PredictorError, Result};

/// Target column name in the frame layout
pub const TARGET_COLUMN: &str = "MedHouseVal";

const RAW_COLUMNS: usize = 9;
const RAW_TARGET_SCALE: f64 = 100_000.0;

/// Loads the labelled dataset from a CSV file on disk.
pub struct CsvDatasetLoader {
    path: PathBuf,
}

impl CsvDatasetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for CsvDatasetLoader {
    fn fetch(&self) -> Result<Dataset> {
        if !self.path.is_file() {
            return Err(PredictorError::Dataset(format!(
                "dataset file '{}' does not exist",
                self.path.display()
            )));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| dataset_error(&self.path, e))?;

        let mut records = reader.records();
        let first = match records.next() {
            Some(row) => row.map_err(|e| dataset_error(&self.path, e))?,
            None => {
                return Err(PredictorError::Dataset(format!(
                    "dataset file '{}' is empty",
                    self.path.display()
                )));
            }
        };

        let mut dataset = Dataset::default();

        if is_raw_row(&first) {
            tracing::debug!("Reading raw StatLib layout from '{}'", self.path.display());
            let (row, target) = parse_raw_row(&first, 1)?;
            dataset.push(row, target);
            for (offset, record) in records.enumerate() {
                let record = record.map_err(|e| dataset_error(&self.path, e))?;
                let (row, target) = parse_raw_row(&record, offset + 2)?;
                dataset.push(row, target);
            }
        } else {
            let columns = FrameColumns::from_header(&first)?;
            tracing::debug!("Reading frame CSV layout from '{}'", self.path.display());
            for (offset, record) in records.enumerate() {
                let record = record.map_err(|e| dataset_error(&self.path, e))?;
                let (row, target) = columns.parse_row(&record, offset + 2)?;
                dataset.push(row, target);
            }
        }

        if dataset.is_empty() {
            return Err(PredictorError::Dataset(format!(
                "dataset file '{}' has no data rows",
                self.path.display()
            )));
        }

        tracing::info!("Features: {:?}", FEATURE_NAMES);
        tracing::info!(
            "Sample Data: {:?}, Target: {}",
            dataset.features[0],
            dataset.targets[0]
        );
        tracing::info!("Loaded {} labelled rows", dataset.len());
        Ok(dataset)
    }
}

// ─── Frame layout ─────────────────────────────────────────────────────────────
/// Column positions of the features and target in a frame CSV header
struct FrameColumns {
    features: [usize; N_FEATURES],
    target:   usize,
}

impl FrameColumns {
    fn from_header(header: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            header.iter().position(|h| h == name).ok_or_else(|| {
                PredictorError::Dataset(format!("header is missing column '{name}'"))
            })
        };

        let mut features = [0usize; N_FEATURES];
        for (slot, name) in features.iter_mut().zip(FEATURE_NAMES) {
            *slot = find(name)?;
        }
        Ok(Self { features, target: find(TARGET_COLUMN)? })
    }

    fn parse_row(&self, record: &StringRecord, line: usize) -> Result<(FeatureVector, f64)> {
        let mut row: FeatureVector = [f64::NAN; N_FEATURES];
        for (value, (&column, name)) in row.iter_mut().zip(self.features.iter().zip(FEATURE_NAMES)) {
            *value = parse_cell(record.get(column), line, name)?;
        }
        let target = parse_target(record.get(self.target), line)?;
        Ok((row, target))
    }
}

// ─── Raw StatLib layout ───────────────────────────────────────────────────────
fn is_raw_row(record: &StringRecord) -> bool {
    record.len() == RAW_COLUMNS && record.iter().all(|cell| cell.parse::<f64>().is_ok())
}

fn parse_raw_row(record: &StringRecord, line: usize) -> Result<(FeatureVector, f64)> {
    if record.len() != RAW_COLUMNS {
        return Err(PredictorError::Dataset(format!(
            "line {line}: expected {RAW_COLUMNS} columns, found {}",
            record.len()
        )));
    }
    let cell = |i: usize, name: &str| parse_cell(record.get(i), line, name);

    let longitude      = cell(0, "longitude")?;
    let latitude       = cell(1, "latitude")?;
    let house_age      = cell(2, "housingMedianAge")?;
    let total_rooms    = cell(3, "totalRooms")?;
    let total_bedrooms = cell(4, "totalBedrooms")?;
    let population     = cell(5, "population")?;
    let households     = cell(6, "households")?;
    let median_income  = cell(7, "medianIncome")?;
    let target         = parse_target(record.get(8), line)? / RAW_TARGET_SCALE;

    let row = [
        median_income,
        house_age,
        total_rooms / households,
        total_bedrooms / households,
        population,
        population / households,
        latitude,
        longitude,
    ];
    Ok((row, target))
}

// ─── Cell parsing ─────────────────────────────────────────────────────────────
/// Empty or absent cells are missing values (NaN)
fn parse_cell(cell: Option<&str>, line: usize, column: &str) -> Result<f64> {
    match cell {
        None | Some("") => Ok(f64::NAN),
        Some(text) => text.parse::<f64>().map_err(|_| {
            PredictorError::Dataset(format!(
                "line {line}, column '{column}': '{text}' is not a number"
            ))
        }),
    }
}

/// Targets cannot be imputed, so they must be present and finite
fn parse_target(cell: Option<&str>, line: usize) -> Result<f64> {
    let value = parse_cell(cell, line, TARGET_COLUMN)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PredictorError::Dataset(format!("line {line}: target value is missing")))
    }
}

fn dataset_error(path: &Path, err: csv::Error) -> PredictorError {
    PredictorError::Dataset(format!("cannot read '{}': {err}", path.display()))
}
