//! Error types for the anomaly-to-decision pipeline.
//!
//! Every error is raised synchronously at the call that triggers it. Nothing
//! in the library recovers from these or maps them onto a "no alert" result;
//! callers are expected to present a degraded state instead.

/// Errors raised by the pipeline components.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Scoring, prediction or a drift comparison was attempted before `fit`.
    #[error("Model not fitted: {model} must be fitted before use")]
    UnfittedModel { model: &'static str },

    /// A fitted feature has zero standard deviation, so z-scores are undefined.
    #[error("Degenerate distribution: feature {feature} has zero standard deviation")]
    DegenerateDistribution { feature: usize },

    /// A window size, persistence count or threshold is outside its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Matrix or reading width differs from what the component expects.
    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// An input was empty or a position fell outside the series.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A series violated its ordering or alignment invariants.
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// The requested channel is not part of the series.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
