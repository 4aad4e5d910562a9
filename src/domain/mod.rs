// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing the problem:
// the eight-feature schema, validation of untyped input,
// the labelled dataset, and the seams other layers implement.
//
// No file I/O, no model math, no caching here.

// Feature schema, FeatureRecord and the vectorizer
pub mod features;

// JSON body → FeatureRecord validation
pub mod validation;

// Labelled rows for training
pub mod dataset;

// DatasetSource and Predictor
pub mod traits;
