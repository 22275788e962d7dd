//! Core functionality for the Sentinel Sensor Agent.
//!
//! This module contains:
//! - Sensor series types and sliding windows over them
//! - Rolling feature extraction into feature matrices
//! - Risk normalization, alert decisioning and drift detection
//! - Run report building for export

pub mod decision;
pub mod drift;
pub mod features;
pub mod matrix;
pub mod report;
pub mod risk;
pub mod series;
pub mod windowing;

// Re-export commonly used types
pub use decision::{AlertState, DecisionEngine};
pub use drift::{DriftMonitor, DriftReport, SlidingDriftMonitor};
pub use features::{
    build_feature_frame, build_rolling_features, rolling_windows, FeatureFrame, FeatureWindow,
};
pub use matrix::FeatureMatrix;
pub use report::{Assessment, ChannelDrift, ReportBuilder, RunReport, RunSettings, PRODUCER_NAME};
pub use series::{Observation, SensorSeries, TabularSeries};
pub use windowing::SlidingWindow;
