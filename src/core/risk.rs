//! Risk normalization: unbounded anomaly scores to risk in (0, 1).

/// Smallest risk ever reported.
pub const MIN_RISK: f64 = f64::MIN_POSITIVE;

/// Largest risk ever reported.
pub const MAX_RISK: f64 = 1.0 - f64::EPSILON;

/// Logistic squash of a raw anomaly score.
///
/// Evaluated so that `exp` only ever sees a non-positive argument, then
/// clamped so the result stays strictly inside (0, 1) even where the
/// logistic saturates. NaN passes through unchanged.
pub fn normalize(raw_score: f64) -> f64 {
    let risk = if raw_score >= 0.0 {
        1.0 / (1.0 + (-raw_score).exp())
    } else {
        let e = raw_score.exp();
        e / (1.0 + e)
    };
    risk.clamp(MIN_RISK, MAX_RISK)
}

/// [`normalize`] applied to every score.
pub fn normalize_all(raw_scores: &[f64]) -> Vec<f64> {
    raw_scores.iter().map(|&s| normalize(s)).collect()
}
