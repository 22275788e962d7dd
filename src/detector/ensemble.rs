//! Learned ensemble scorer backed by an isolation forest.
//!
//! The wrapped model reports higher values for more normal points. This
//! scorer negates its decision function so that, like every other
//! [`AnomalyScorer`], larger scores mean more anomalous.

use super::isolation::{IsolationForest, IsolationForestParams};
use super::{check_scoring_input, AnomalyScorer};
use crate::core::matrix::FeatureMatrix;
use crate::error::{PipelineError, Result};

const MODEL_NAME: &str = "isolation_forest_ensemble";

/// Anomaly scorer wrapping [`IsolationForest`].
#[derive(Debug, Clone)]
pub struct EnsembleScorer {
    params: IsolationForestParams,
    model: Option<IsolationForest>,
}

impl EnsembleScorer {
    pub fn new(params: IsolationForestParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            model: None,
        })
    }

    pub fn params(&self) -> &IsolationForestParams {
        &self.params
    }

    /// The fitted forest, if any.
    pub fn model(&self) -> Option<&IsolationForest> {
        self.model.as_ref()
    }

    fn fitted(&self, data: &FeatureMatrix) -> Result<&IsolationForest> {
        check_scoring_input(MODEL_NAME, self.n_features(), data)?;
        self.model
            .as_ref()
            .ok_or(PipelineError::UnfittedModel { model: MODEL_NAME })
    }
}

impl Default for EnsembleScorer {
    fn default() -> Self {
        Self {
            params: IsolationForestParams::default(),
            model: None,
        }
    }
}

impl AnomalyScorer for EnsembleScorer {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn fit(&mut self, data: &FeatureMatrix) -> Result<()> {
        self.model = Some(IsolationForest::fit(self.params.clone(), data)?);
        Ok(())
    }

    fn score(&self, data: &FeatureMatrix) -> Result<Vec<f64>> {
        Ok(self
            .fitted(data)?
            .decision_function(data)?
            .into_iter()
            .map(|d| -d)
            .collect())
    }

    fn predict(&self, data: &FeatureMatrix) -> Result<Vec<bool>> {
        self.fitted(data)?.predict(data)
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(IsolationForest::n_features)
    }
}
