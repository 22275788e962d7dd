//! Persistence-based alert decisioning.
//!
//! A single risk sample above threshold never triggers action on its own.
//! The engine only raises an alert once `persistence_windows` consecutive
//! risk scores have reached `score_threshold`, and any score below the
//! threshold resets the run. This suppresses sensor noise and transient
//! measurement error.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Default risk threshold.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.7;

/// Default number of consecutive elevated windows before alerting.
pub const DEFAULT_PERSISTENCE_WINDOWS: u32 = 3;

/// The engine's entire mutable state plus the configuration it is judged by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    /// Length of the current run of elevated scores
    pub consecutive_count: u32,
    pub score_threshold: f64,
    pub persistence_windows: u32,
}

impl AlertState {
    /// Whether the current run is long enough to alert.
    pub fn is_alerting(&self) -> bool {
        self.consecutive_count >= self.persistence_windows
    }
}

/// Converts a sequence of risk scores into alert flags.
///
/// State carries across calls, so a stream can be fed in chunks. One engine
/// serves one stream; independent streams need independent engines.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    state: AlertState,
}

impl DecisionEngine {
    /// Create an engine; the threshold must lie in (0, 1) and at least one
    /// window must be required.
    pub fn new(score_threshold: f64, persistence_windows: u32) -> Result<Self> {
        if !(score_threshold > 0.0 && score_threshold < 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "score_threshold must be in (0, 1), got {score_threshold}"
            )));
        }
        if persistence_windows == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "persistence_windows must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            state: AlertState {
                consecutive_count: 0,
                score_threshold,
                persistence_windows,
            },
        })
    }

    /// Feed one risk score and return the resulting alert flag.
    pub fn step(&mut self, score: f64) -> bool {
        if score >= self.state.score_threshold {
            self.state.consecutive_count = self.state.consecutive_count.saturating_add(1);
        } else {
            self.state.consecutive_count = 0;
        }
        self.state.is_alerting()
    }

    /// Feed scores in order, one flag per score.
    pub fn evaluate(&mut self, scores: &[f64]) -> Vec<bool> {
        scores.iter().map(|&s| self.step(s)).collect()
    }

    /// Forget the current run.
    pub fn reset(&mut self) {
        self.state.consecutive_count = 0;
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn score_threshold(&self) -> f64 {
        self.state.score_threshold
    }

    pub fn persistence_windows(&self) -> u32 {
        self.state.persistence_windows
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self {
            state: AlertState {
                consecutive_count: 0,
                score_threshold: DEFAULT_SCORE_THRESHOLD,
                persistence_windows: DEFAULT_PERSISTENCE_WINDOWS,
            },
        }
    }
}
