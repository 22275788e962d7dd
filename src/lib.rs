//! Sentinel Sensor Agent - anomaly-to-decision pipeline for industrial sensors.
//!
//! This library turns a stream of industrial sensor readings into a binary
//! "inspect equipment" decision while suppressing transient noise.
//!
//! # Decision Guarantees
//!
//! - **No single-sample alerts**: an alert needs `persistence_windows`
//!   consecutive risk scores at or above the threshold
//! - **One reset rule**: any sub-threshold score clears the run
//! - **Seeded models**: the same seed and data always give the same scores
//! - **Errors are never "no alert"**: unfitted models, bad shapes and bad data
//!   surface as [`PipelineError`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Sentinel Sensor Agent                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌─────────┐  │
//! │  │  Features  │──▶│  Detector  │──▶│    Risk    │──▶│Decision │  │
//! │  │ (rolling)  │   │(pluggable) │   │ (logistic) │   │ Engine  │  │
//! │  └────────────┘   └────────────┘   └────────────┘   └─────────┘  │
//! │        ▲                                                 │       │
//! │        │          ┌────────────┐                         ▼       │
//! │   raw readings───▶│   Drift    │──────────────────▶ Run Report   │
//! │                   │  Monitor   │                                 │
//! │                   └────────────┘        Audit Log (counters)     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sentinel_sensor_agent::{simulation, Config, InspectionPipeline};
//!
//! let config = Config::default();
//! let channels = config.features.channels.clone();
//! let mut pipeline = InspectionPipeline::new(config)?;
//!
//! pipeline.fit(&simulation::normal_operation(500, &channels, 42)?)?;
//! let report = pipeline.run(&simulation::normal_operation(200, &channels, 7)?)?;
//! println!("{} alert windows", report.alert_count);
//! # Ok::<(), sentinel_sensor_agent::PipelineError>(())
//! ```

pub mod assess;
pub mod audit;
pub mod config;
pub mod core;
pub mod detector;
pub mod error;
pub mod pipeline;
pub mod simulation;

// Re-export key types at crate root for convenience
pub use assess::{SensorReading, SpotAssessor, SpotCheck};
pub use audit::{AuditLog, AuditStats, SharedAuditLog};
pub use config::{Config, ConfigError};
pub use core::{
    Assessment, DecisionEngine, DriftMonitor, DriftReport, FeatureMatrix, RunReport,
    SensorSeries, TabularSeries,
};
pub use detector::{build_scorer, AnomalyScorer, EnsembleScorer, ScorerKind, StatisticalBaseline};
pub use error::{PipelineError, Result};
pub use pipeline::InspectionPipeline;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
