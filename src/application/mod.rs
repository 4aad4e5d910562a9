// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
// training a model, or serving predictions from one.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - No direct file access (that's Layer 4 and 6)
//   - Only workflow coordination

// Offline training: grid search, refit, persist
pub mod train_use_case;

// Online inference: validate, cache, predict
pub mod predict_use_case;

// Status-code mapping for the HTTP boundary
pub mod handlers;
