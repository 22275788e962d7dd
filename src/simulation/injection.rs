//! Failure pattern injection.
//!
//! Each pattern returns a modified copy of the input series; the original is
//! never touched. Positions are row positions (0-based), not index values.

use crate::core::series::TabularSeries;
use crate::error::{PipelineError, Result};
use std::fmt;
use std::str::FromStr;

/// Default per-step temperature increase after overheating starts.
pub const DEFAULT_GROWTH_RATE: f64 = 0.02;

/// Default size of a single vibration spike.
pub const DEFAULT_SPIKE_MAGNITUDE: f64 = 3.0;

/// Default calibration offset reached at the end of a drifting series.
pub const DEFAULT_TOTAL_DRIFT: f64 = 1.0;

/// Industrial failure patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Gradual linear rise from a start position onwards
    Overheating,
    /// One sudden jump at a single position (e.g. bearing defect)
    VibrationSpike,
    /// Slow calibration ramp across the whole series
    SensorDrift,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Overheating => write!(f, "overheating"),
            FailureKind::VibrationSpike => write!(f, "spike"),
            FailureKind::SensorDrift => write!(f, "drift"),
        }
    }
}

impl FromStr for FailureKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "overheating" | "overheat" => Ok(FailureKind::Overheating),
            "spike" | "vibration_spike" => Ok(FailureKind::VibrationSpike),
            "drift" | "sensor_drift" => Ok(FailureKind::SensorDrift),
            other => Err(PipelineError::InvalidConfiguration(format!(
                "unknown failure '{other}' (expected overheating, spike or drift)"
            ))),
        }
    }
}

/// Injects synthetic failure patterns into a [`TabularSeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct FailureInjector {
    pub growth_rate: f64,
    pub spike_magnitude: f64,
    pub total_drift: f64,
}

impl Default for FailureInjector {
    fn default() -> Self {
        Self {
            growth_rate: DEFAULT_GROWTH_RATE,
            spike_magnitude: DEFAULT_SPIKE_MAGNITUDE,
            total_drift: DEFAULT_TOTAL_DRIFT,
        }
    }
}

impl FailureInjector {
    /// Add `(i - start) * growth_rate` at every position `i >= start`.
    pub fn inject_overheating(
        &self,
        series: &TabularSeries,
        channel: &str,
        start: usize,
    ) -> Result<TabularSeries> {
        check_position(series, start)?;
        let mut out = series.clone();
        let values = out.channel_mut(channel)?;
        for (step, value) in values[start..].iter_mut().enumerate() {
            *value += step as f64 * self.growth_rate;
        }
        Ok(out)
    }

    /// Add `spike_magnitude` at one position.
    pub fn inject_vibration_spike(
        &self,
        series: &TabularSeries,
        channel: &str,
        at: usize,
    ) -> Result<TabularSeries> {
        check_position(series, at)?;
        let mut out = series.clone();
        out.channel_mut(channel)?[at] += self.spike_magnitude;
        Ok(out)
    }

    /// Add a linear ramp from 0 at the first position to `total_drift` at the
    /// last.
    pub fn inject_sensor_drift(&self, series: &TabularSeries, channel: &str) -> Result<TabularSeries> {
        let mut out = series.clone();
        let values = out.channel_mut(channel)?;
        let steps = values.len().saturating_sub(1).max(1) as f64;
        for (i, value) in values.iter_mut().enumerate() {
            *value += self.total_drift * i as f64 / steps;
        }
        Ok(out)
    }

    /// Apply `kind` at `position`; sensor drift ignores the position.
    pub fn inject(
        &self,
        kind: FailureKind,
        series: &TabularSeries,
        channel: &str,
        position: usize,
    ) -> Result<TabularSeries> {
        match kind {
            FailureKind::Overheating => self.inject_overheating(series, channel, position),
            FailureKind::VibrationSpike => self.inject_vibration_spike(series, channel, position),
            FailureKind::SensorDrift => self.inject_sensor_drift(series, channel),
        }
    }
}

fn check_position(series: &TabularSeries, position: usize) -> Result<()> {
    if position >= series.len() {
        return Err(PipelineError::InsufficientData(format!(
            "position {position} is outside a series of length {}",
            series.len()
        )));
    }
    Ok(())
}
