//! Run report builder.
//!
//! A report captures one pipeline run: the per-window assessments, the
//! per-channel drift checks and the settings that produced them, stamped with
//! producer metadata so exported files can be traced back to an agent
//! instance.

use crate::config::Config;
use crate::core::drift::DriftReport;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "sentinel-sensor-agent";

/// Outcome for one scored feature window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Position of the newest observation in the window
    pub index: u64,
    /// Raw scorer output (higher = more anomalous)
    pub anomaly_score: f64,
    /// Logistic-normalised score in (0, 1)
    pub risk: f64,
    /// Whether the decision engine says to inspect the equipment
    pub alert: bool,
}

/// Drift check for one named channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDrift {
    pub channel: String,
    #[serde(flatten)]
    pub report: DriftReport,
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// Settings a run was made with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub scorer: String,
    pub channels: Vec<String>,
    pub window_size: usize,
    pub score_threshold: f64,
    pub persistence_windows: u32,
    pub drift_threshold: f64,
}

impl RunSettings {
    pub fn from_config(config: &Config, scorer: &str) -> Self {
        Self {
            scorer: scorer.to_string(),
            channels: config.features.channels.clone(),
            window_size: config.features.window_size,
            score_threshold: config.decision.score_threshold,
            persistence_windows: config.decision.persistence_windows,
            drift_threshold: config.drift.threshold,
        }
    }
}

/// Serializable result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Report format version
    pub report_version: String,
    /// When this report was computed (RFC3339)
    pub computed_at_utc: String,
    pub producer: ReportProducer,
    pub settings: RunSettings,
    pub assessments: Vec<Assessment>,
    /// Number of windows with an active alert
    pub alert_count: usize,
    pub drift: Vec<ChannelDrift>,
    /// True when any channel's drift check exceeded its threshold
    pub retrain_recommended: bool,
}

impl RunReport {
    /// Indices of the windows where an alert first switched on.
    pub fn alert_onsets(&self) -> Vec<u64> {
        let mut previous = false;
        let mut onsets = Vec::new();
        for a in &self.assessments {
            if a.alert && !previous {
                onsets.push(a.index);
            }
            previous = a.alert;
        }
        onsets
    }

    /// Channels whose drift check exceeded the threshold.
    pub fn drifted_channels(&self) -> Vec<&str> {
        self.drift
            .iter()
            .filter(|d| d.report.exceeded)
            .map(|d| d.channel.as_str())
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self
            .to_json_pretty()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Write the report into `dir` under a timestamped name.
    pub fn export(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(format!(
            "report_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        self.write_to(&path)?;
        Ok(path)
    }
}

/// Builder for run reports.
pub struct ReportBuilder {
    instance_id: Uuid,
}

impl ReportBuilder {
    /// Create a new builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
        }
    }

    /// Get the instance ID.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn build(
        &self,
        settings: RunSettings,
        assessments: Vec<Assessment>,
        drift: Vec<ChannelDrift>,
    ) -> RunReport {
        let alert_count = assessments.iter().filter(|a| a.alert).count();
        let retrain_recommended = drift.iter().any(|d| d.report.exceeded);

        RunReport {
            report_version: REPORT_VERSION.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                instance_id: self.instance_id.to_string(),
            },
            settings,
            assessments,
            alert_count,
            drift,
            retrain_recommended,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
