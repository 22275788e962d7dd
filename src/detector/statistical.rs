//! Z-score baseline detector.
//!
//! An interpretable reference scorer: each feature is summarised by its
//! training mean and population standard deviation, and a row's score is its
//! largest absolute z-score. For single-feature data this is exactly the
//! per-value `|x - mean| / std`.

use super::{check_finite_input, check_scoring_input, AnomalyScorer};
use crate::core::matrix::FeatureMatrix;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Default z-score above which a value is anomalous.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

const MODEL_NAME: &str = "statistical_baseline";

/// Fitted per-feature location and scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMoments {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
}

/// Absolute z-score anomaly detector.
#[derive(Debug, Clone)]
pub struct StatisticalBaseline {
    threshold: f64,
    moments: Option<Vec<FeatureMoments>>,
}

impl StatisticalBaseline {
    /// Create an unfitted baseline flagging scores strictly above `threshold`.
    pub fn new(threshold: f64) -> Result<Self> {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "z-score threshold must be positive, got {threshold}"
            )));
        }
        Ok(Self {
            threshold,
            moments: None,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Fitted moments, one per feature.
    pub fn moments(&self) -> Option<&[FeatureMoments]> {
        self.moments.as_deref()
    }

    /// Fit on a plain array of values.
    pub fn fit_values(&mut self, values: &[f64]) -> Result<()> {
        self.fit(&FeatureMatrix::from_column(values))
    }

    /// Absolute z-score of each value.
    pub fn score_values(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.score(&FeatureMatrix::from_column(values))
    }

    /// Whether each value's z-score exceeds the threshold.
    pub fn predict_values(&self, values: &[f64]) -> Result<Vec<bool>> {
        self.predict(&FeatureMatrix::from_column(values))
    }
}

impl Default for StatisticalBaseline {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_Z_THRESHOLD,
            moments: None,
        }
    }
}

impl AnomalyScorer for StatisticalBaseline {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn fit(&mut self, data: &FeatureMatrix) -> Result<()> {
        if data.is_empty() || data.n_features() == 0 {
            return Err(PipelineError::InsufficientData(format!(
                "statistical baseline needs at least one sample with 1+ features, got {}x{}",
                data.n_samples(),
                data.n_features()
            )));
        }
        check_finite_input(MODEL_NAME, data)?;

        let moments = (0..data.n_features())
            .map(|j| {
                let column = data.column(j);
                FeatureMoments {
                    mean: column.iter().mean(),
                    std: column.iter().population_std_dev(),
                }
            })
            .collect();
        self.moments = Some(moments);
        Ok(())
    }

    fn score(&self, data: &FeatureMatrix) -> Result<Vec<f64>> {
        check_scoring_input(MODEL_NAME, self.n_features(), data)?;
        let moments = self
            .moments
            .as_deref()
            .ok_or(PipelineError::UnfittedModel { model: MODEL_NAME })?;

        if let Some(feature) = moments.iter().position(|m| m.std == 0.0) {
            return Err(PipelineError::DegenerateDistribution { feature });
        }

        Ok(data
            .rows()
            .map(|row| {
                row.iter()
                    .zip(moments)
                    .map(|(&x, m)| ((x - m.mean) / m.std).abs())
                    .fold(0.0, f64::max)
            })
            .collect())
    }

    fn predict(&self, data: &FeatureMatrix) -> Result<Vec<bool>> {
        Ok(self
            .score(data)?
            .into_iter()
            .map(|z| z > self.threshold)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.moments.is_some()
    }

    fn n_features(&self) -> Option<usize> {
        self.moments.as_ref().map(Vec::len)
    }
}
