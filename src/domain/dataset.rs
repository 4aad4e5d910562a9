// ============================================================
// Layer 3 — Labelled Dataset
// ============================================================
// Feature rows paired with their target (median house value in
// units of $100,000). Rows may contain NaN for missing values;
// imputation fills them during fitting.

use crate::domain::features::FeatureVector;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<FeatureVector>,
    pub targets:  Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn push(&mut self, row: FeatureVector, target: f64) {
        self.features.push(row);
        self.targets.push(target);
    }

    /// Copy out the rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            targets:  indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}
