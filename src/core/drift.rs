//! Reference/current distribution drift detection.
//!
//! Drift here is the relative shift of the mean between a fixed reference
//! sample and a current sample. A positive result means the scorer's
//! training data is likely stale; retraining itself happens elsewhere.
//!
//! Known limitation: when the reference mean is exactly zero the relative
//! shift is undefined and no drift is ever reported, whatever the current
//! sample looks like.

use crate::core::windowing::SlidingWindow;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Default relative-shift threshold.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.2;

/// Outcome of one reference/current comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub reference_mean: f64,
    pub current_mean: f64,
    /// `|current - reference| / |reference|`, or `None` for a zero reference mean
    pub relative_shift: Option<f64>,
    pub threshold: f64,
    pub exceeded: bool,
}

/// Stateless mean-shift comparator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftMonitor {
    threshold: f64,
}

impl DriftMonitor {
    /// Create a monitor with a relative-shift threshold in (0, 1).
    pub fn new(threshold: f64) -> Result<Self> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "drift threshold must be in (0, 1), got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether the mean of `current` moved more than the threshold relative
    /// to the mean of `reference`.
    pub fn detect_mean_shift(&self, reference: &[f64], current: &[f64]) -> Result<bool> {
        Ok(self.compare(reference, current)?.exceeded)
    }

    /// Full comparison report.
    pub fn compare(&self, reference: &[f64], current: &[f64]) -> Result<DriftReport> {
        if reference.is_empty() || current.is_empty() {
            return Err(PipelineError::InsufficientData(
                "drift comparison needs non-empty reference and current samples".to_string(),
            ));
        }

        let reference_mean = reference.iter().mean();
        let current_mean = current.iter().mean();

        let relative_shift = if reference_mean == 0.0 {
            None
        } else {
            Some((current_mean - reference_mean).abs() / reference_mean.abs())
        };

        Ok(DriftReport {
            reference_mean,
            current_mean,
            relative_shift,
            threshold: self.threshold,
            exceeded: relative_shift.is_some_and(|shift| shift > self.threshold),
        })
    }
}

impl Default for DriftMonitor {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DRIFT_THRESHOLD,
        }
    }
}

/// A fixed reference sample compared against a sliding current window.
#[derive(Debug, Clone)]
pub struct SlidingDriftMonitor {
    monitor: DriftMonitor,
    reference: Vec<f64>,
    current: SlidingWindow,
}

impl SlidingDriftMonitor {
    pub fn new(monitor: DriftMonitor, reference: Vec<f64>, window: usize) -> Result<Self> {
        if reference.is_empty() {
            return Err(PipelineError::InsufficientData(
                "drift reference sample is empty".to_string(),
            ));
        }
        Ok(Self {
            monitor,
            reference,
            current: SlidingWindow::new(window)?,
        })
    }

    /// Append the newest observation to the current window.
    pub fn push(&mut self, value: f64) {
        self.current.push_next(value);
    }

    /// Compare once the current window is full.
    pub fn check(&self) -> Result<Option<DriftReport>> {
        if !self.current.is_full() {
            return Ok(None);
        }
        self.monitor
            .compare(&self.reference, &self.current.values())
            .map(Some)
    }

    /// Swap in a new reference sample and start the current window over.
    pub fn replace_reference(&mut self, reference: Vec<f64>) -> Result<()> {
        if reference.is_empty() {
            return Err(PipelineError::InsufficientData(
                "drift reference sample is empty".to_string(),
            ));
        }
        self.reference = reference;
        self.current.clear();
        Ok(())
    }

    pub fn reference(&self) -> &[f64] {
        &self.reference
    }

    /// Empty the current window; the reference is kept.
    pub fn clear(&mut self) {
        self.current.clear();
    }
}
