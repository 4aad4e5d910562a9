// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// Model selection and the regressor itself. Nothing in here
// touches files, the cache, or request bodies.
//
//   model.rs     — epsilon-SVR hyperparameters and fitted model
//   solver.rs    — SMO optimiser with an LRU kernel-row cache
//   pipeline.rs  — imputer → scaler → SVR composition
//   grid.rs      — hyperparameter grid and its iteration order
//   cross_val.rs — contiguous k-fold splitting and fold scoring
//   scoring.rs   — R² and summary statistics
//   search.rs    — parallel grid search and refit of the winner

/// Epsilon-SVR with an RBF kernel
pub mod model;

/// SMO decomposition for the SVR dual
mod solver;

/// Preprocessing + model pipeline builder
pub mod pipeline;

/// Hyperparameter grid expansion
pub mod grid;

/// K-fold cross-validation
pub mod cross_val;

/// Regression metrics
pub mod scoring;

/// Exhaustive grid search with cross-validation
pub mod search;
