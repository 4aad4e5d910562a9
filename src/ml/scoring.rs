// ============================================================
// Layer 5 — Regression Scoring
// ============================================================
// Coefficient of determination:
//
//   R² = 1 − Σ(yᵢ − ŷᵢ)² / Σ(yᵢ − ȳ)²
//
// 1.0 is a perfect fit, 0.0 matches always predicting the mean,
// and there is no lower bound. A constant y_true gives 1.0 for a
// perfect prediction and 0.0 otherwise.

/// R² of `y_pred` against `y_true`. NaN for empty input.
///
/// # Panics
/// Panics if the slices have different lengths
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len(), "y_true and y_pred must have the same length");
    if y_true.is_empty() {
        return f64::NAN;
    }

    let mean = mean(y_true);
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p) * (t - p)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean) * (t - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        assert_eq!(r2_score(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
    }

    #[test]
    fn test_mean_prediction_scores_zero() {
        assert_eq!(r2_score(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_can_be_negative() {
        assert!(r2_score(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) < 0.0);
    }

    #[test]
    fn test_constant_truth() {
        assert_eq!(r2_score(&[4.0, 4.0], &[4.0, 4.0]), 1.0);
        assert_eq!(r2_score(&[4.0, 4.0], &[4.0, 5.0]), 0.0);
    }

    #[test]
    fn test_empty_is_nan() {
        assert!(r2_score(&[], &[]).is_nan());
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
    }
}
