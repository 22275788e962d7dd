//! Rolling feature extraction from sensor series.
//!
//! Each output row summarises the trailing `window_size` observations of a
//! channel. Positions before the window fills are omitted rather than
//! emitted as nulls, so a series of length `n` yields
//! `max(0, n - window_size + 1)` rows.
//!
//! The standard deviation is the sample (n-1) estimate, the conventional
//! rolling-window statistic. A one-observation window has a std of `0.0`.

use crate::core::matrix::FeatureMatrix;
use crate::core::series::{SensorSeries, TabularSeries};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Suffixes of the per-channel feature columns, in column order.
pub const FEATURE_SUFFIXES: [&str; 4] = ["mean", "std", "min", "max"];

/// Summary statistics of one trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWindow {
    /// Index of the newest observation in the window
    pub index: u64,
    pub mean: f64,
    /// Sample standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl FeatureWindow {
    /// Summarise a non-empty slice of values ending at `index`.
    pub(crate) fn compute(index: u64, values: &[f64]) -> Self {
        let std = if values.len() < 2 {
            0.0
        } else {
            values.iter().std_dev()
        };

        Self {
            index,
            mean: values.iter().mean(),
            std,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Values in [`FEATURE_SUFFIXES`] order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.mean, self.std, self.min, self.max]
    }
}

/// Column-labelled rolling features for one or more channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    /// Column labels, `{channel}_{mean|std|min|max}` per channel
    pub columns: Vec<String>,
    /// Position of the newest observation behind each row
    pub index: Vec<u64>,
    /// Row-major feature values
    pub matrix: FeatureMatrix,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Values of a single labelled column.
    pub fn column(&self, label: &str) -> Option<Vec<f64>> {
        let col = self.columns.iter().position(|c| c == label)?;
        Some(self.matrix.rows().map(|row| row[col]).collect())
    }

    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }
}

/// Column labels for one channel.
pub fn column_labels(channel: &str) -> Vec<String> {
    FEATURE_SUFFIXES
        .iter()
        .map(|suffix| format!("{channel}_{suffix}"))
        .collect()
}

/// Rolling windows over a single series.
pub fn rolling_windows(series: &SensorSeries, window_size: usize) -> Result<Vec<FeatureWindow>> {
    check_window_size(window_size)?;

    let values = series.values();
    let indices = series.indices();
    if values.len() < window_size {
        return Ok(Vec::new());
    }

    Ok(values
        .windows(window_size)
        .zip(indices.iter().skip(window_size - 1))
        .map(|(window, &index)| FeatureWindow::compute(index, window))
        .collect())
}

/// Rolling features for one named channel of a table.
pub fn build_rolling_features(
    series: &TabularSeries,
    channel: &str,
    window_size: usize,
) -> Result<FeatureFrame> {
    build_feature_frame(series, &[channel], window_size)
}

/// Rolling features for several channels, stacked in the given order.
pub fn build_feature_frame<S: AsRef<str>>(
    series: &TabularSeries,
    channels: &[S],
    window_size: usize,
) -> Result<FeatureFrame> {
    check_window_size(window_size)?;
    if channels.is_empty() {
        return Err(PipelineError::InvalidConfiguration(
            "at least one channel is required".to_string(),
        ));
    }

    let mut columns = Vec::with_capacity(channels.len() * FEATURE_SUFFIXES.len());
    let mut per_channel = Vec::with_capacity(channels.len());
    for channel in channels {
        let channel = channel.as_ref();
        per_channel.push(rolling_windows(&series.sensor_series(channel)?, window_size)?);
        columns.extend(column_labels(channel));
    }

    let n_rows = series.len().saturating_sub(window_size - 1);
    let index: Vec<u64> = series.index().iter().skip(window_size - 1).copied().collect();

    let mut data = Vec::with_capacity(n_rows * columns.len());
    for row in 0..n_rows {
        for windows in &per_channel {
            data.extend_from_slice(&windows[row].as_array());
        }
    }

    let matrix = FeatureMatrix::new(n_rows, columns.len(), data)?;
    Ok(FeatureFrame {
        columns,
        index,
        matrix,
    })
}

fn check_window_size(window_size: usize) -> Result<()> {
    if window_size == 0 {
        return Err(PipelineError::InvalidConfiguration(
            "window_size must be at least 1".to_string(),
        ));
    }
    Ok(())
}
