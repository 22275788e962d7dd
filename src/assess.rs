//! Single-reading spot checks.
//!
//! Scores one reading of the four standard sensors against an ensemble
//! fitted on seeded synthetic normal data. Readings are brought into `[0, 1]`
//! by dividing by each sensor's expected operating range before scoring.
//! Successive checks share one decision engine, so repeated elevated readings
//! eventually raise an alert exactly as in the streaming pipeline.

use crate::config::DecisionConfig;
use crate::core::decision::DecisionEngine;
use crate::core::matrix::FeatureMatrix;
use crate::core::risk;
use crate::detector::{AnomalyScorer, EnsembleScorer, IsolationForestParams};
use crate::error::{PipelineError, Result};
use crate::simulation::gaussian_matrix;
use serde::{Deserialize, Serialize};

/// Upper end of each sensor's operating range, in feature order.
pub const OPERATING_RANGES: [(&str, f64); 4] = [
    ("temperature", 120.0),
    ("vibration", 5.0),
    ("pressure", 10.0),
    ("rotational_speed", 3000.0),
];

/// Synthetic normal samples the spot-check ensemble is fitted on.
pub const TRAINING_SAMPLES: usize = 300;

/// One raw reading of the standard sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Degrees Celsius
    pub temperature: f64,
    /// mm/s
    pub vibration: f64,
    /// bar
    pub pressure: f64,
    /// RPM
    pub rotational_speed: f64,
}

impl Default for SensorReading {
    fn default() -> Self {
        Self {
            temperature: 60.0,
            vibration: 0.5,
            pressure: 3.0,
            rotational_speed: 1500.0,
        }
    }
}

impl SensorReading {
    /// Each value divided by its operating range.
    pub fn normalized(&self) -> [f64; 4] {
        let raw = [
            self.temperature,
            self.vibration,
            self.pressure,
            self.rotational_speed,
        ];
        let mut out = [0.0; 4];
        for ((slot, value), (_, range)) in out.iter_mut().zip(raw).zip(OPERATING_RANGES) {
            *slot = value / range;
        }
        out
    }
}

/// Result of one spot check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotCheck {
    pub features: [f64; 4],
    pub anomaly_score: f64,
    pub risk: f64,
    /// Whether this reading's risk alone reaches the threshold
    pub above_threshold: bool,
    /// Whether the persistence rule has fired
    pub alert: bool,
}

/// Ensemble plus decision engine for scoring individual readings.
pub struct SpotAssessor {
    scorer: EnsembleScorer,
    engine: DecisionEngine,
}

impl SpotAssessor {
    /// Fit on `TRAINING_SAMPLES` standard-normal rows drawn with
    /// `params.seed`.
    pub fn new(params: IsolationForestParams, decision: &DecisionConfig) -> Result<Self> {
        decision.validate()?;
        let training = gaussian_matrix(
            TRAINING_SAMPLES,
            OPERATING_RANGES.len(),
            0.0,
            1.0,
            params.seed,
        )?;

        let mut scorer = EnsembleScorer::new(params)?;
        scorer.fit(&training)?;
        Ok(Self {
            scorer,
            engine: DecisionEngine::new(decision.score_threshold, decision.persistence_windows)?,
        })
    }

    pub fn assess(&mut self, reading: &SensorReading) -> Result<SpotCheck> {
        let features = reading.normalized();
        if features.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidSeries(
                "reading contains non-finite values".to_string(),
            ));
        }

        let scores = self.scorer.score(&FeatureMatrix::from_rows(&[features])?)?;
        let &[anomaly_score] = scores.as_slice() else {
            return Err(PipelineError::ShapeMismatch {
                expected: 1,
                actual: scores.len(),
            });
        };
        let risk = risk::normalize(anomaly_score);

        Ok(SpotCheck {
            features,
            anomaly_score,
            risk,
            above_threshold: risk >= self.engine.score_threshold(),
            alert: self.engine.step(risk),
        })
    }

    /// Forget previous checks.
    pub fn reset(&mut self) {
        self.engine.reset();
    }
}
