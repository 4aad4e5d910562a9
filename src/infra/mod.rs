// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by both training and serving:
//
//   artifact.rs — Model artifact persistence
//                 Header + checksum + bincode payload, written
//                 atomically. Loading reports Loaded, Absent or
//                 Corrupt so each entry point can decide what a
//                 missing or damaged file means for it.
//
//   cache.rs    — Result cache
//                 Request fingerprints, the ResultCache seam and
//                 the in-process TTL backend.
//
//   metrics.rs  — Grid-search results logging
//                 Writes the per-combination CV table to CSV.

/// Model artifact save / load / quarantine
pub mod artifact;

/// Fingerprint-keyed TTL cache for prediction responses
pub mod cache;

/// Cross-validation results CSV logger
pub mod metrics;
