use super::error::ClassifierError;

/// Tolerance used when checking that a probability row sums to one
pub(crate) const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Standard logistic function. Maps `0.0` to exactly `0.5` and saturates at the infinities.
pub(crate) fn logistic(score: f64) -> f64 {
    1.0 / (1.0 + (-score).exp())
}

/// Checks that a `[ham, spam]` row is a usable distribution without changing it.
pub(crate) fn check_probability_row(row: [f64; 2]) -> Result<[f64; 2], ClassifierError> {
    if row.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
        return Err(ClassifierError::PredictionError(format!(
            "Probabilities out of range: {:?}",
            row
        )));
    }
    let sum = row[0] + row[1];
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(ClassifierError::PredictionError(format!(
            "Probabilities do not sum to 1 ({:?}, sum {})",
            row, sum
        )));
    }
    Ok(row)
}
