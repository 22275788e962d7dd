//! Configuration for the Sentinel Sensor Agent.

use crate::core::decision::{DEFAULT_PERSISTENCE_WINDOWS, DEFAULT_SCORE_THRESHOLD};
use crate::core::drift::DEFAULT_DRIFT_THRESHOLD;
use crate::detector::statistical::DEFAULT_Z_THRESHOLD;
use crate::detector::{IsolationForestParams, ScorerKind};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default sensor channels, in feature order.
pub const DEFAULT_CHANNELS: [&str; 4] = ["temperature", "vibration", "pressure", "rotational_speed"];

/// Main configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rolling feature extraction
    pub features: FeatureConfig,

    /// Anomaly scorer selection and hyperparameters
    pub detector: DetectorConfig,

    /// Alert hysteresis
    pub decision: DecisionConfig,

    /// Reference/current drift checks
    pub drift: DriftConfig,

    /// Directory for run reports
    pub export_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sentinel-sensor-agent");

        Self {
            features: FeatureConfig::default(),
            detector: DetectorConfig::default(),
            decision: DecisionConfig::default(),
            drift: DriftConfig::default(),
            export_path: data_dir.join("reports"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does
    /// not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sentinel-sensor-agent")
            .join("config.json")
    }

    /// Ensure the report directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Check every section's ranges.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.features.validate()?;
        self.detector.validate()?;
        self.decision.validate()?;
        self.drift.validate()
    }
}

/// Rolling feature settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Trailing observations per feature window
    pub window_size: usize,
    /// Channels to extract, in feature column order
    pub channels: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl FeatureConfig {
    /// Parse a channel list from a comma-separated string.
    pub fn channels_from_csv(s: &str) -> Vec<String> {
        s.split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_size == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "window_size must be at least 1".to_string(),
            ));
        }
        if self.channels.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "at least one channel is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Anomaly scorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub kind: ScorerKind,
    /// Statistical baseline: z-score above which a value is anomalous
    pub z_threshold: f64,
    /// Ensemble: expected anomaly proportion
    pub contamination: f64,
    /// Ensemble: number of trees
    pub n_estimators: usize,
    /// Ensemble: subsample size per tree
    pub max_samples: usize,
    /// Ensemble: random seed
    pub seed: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let forest = IsolationForestParams::default();
        Self {
            kind: ScorerKind::default(),
            z_threshold: DEFAULT_Z_THRESHOLD,
            contamination: forest.contamination,
            n_estimators: forest.n_estimators,
            max_samples: forest.max_samples,
            seed: forest.seed,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.z_threshold.is_finite() && self.z_threshold > 0.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "z_threshold must be positive, got {}",
                self.z_threshold
            )));
        }
        self.forest_params().validate()
    }

    /// Ensemble hyperparameters as forest parameters.
    pub fn forest_params(&self) -> IsolationForestParams {
        IsolationForestParams {
            n_estimators: self.n_estimators,
            max_samples: self.max_samples,
            contamination: self.contamination,
            seed: self.seed,
        }
    }
}

/// Alert hysteresis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub score_threshold: f64,
    pub persistence_windows: u32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            persistence_windows: DEFAULT_PERSISTENCE_WINDOWS,
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.score_threshold > 0.0 && self.score_threshold < 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "score_threshold must be in (0, 1), got {}",
                self.score_threshold
            )));
        }
        if self.persistence_windows == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "persistence_windows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Drift check settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Relative mean shift above which drift is reported
    pub threshold: f64,
    /// Size of the sliding current window in streaming mode
    pub current_window: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DRIFT_THRESHOLD,
            current_window: 50,
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "drift threshold must be in (0, 1), got {}",
                self.threshold
            )));
        }
        if self.current_window == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "drift current_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parsing() {
        assert_eq!(
            FeatureConfig::channels_from_csv("temperature, vibration,,pressure"),
            vec!["temperature", "vibration", "pressure"]
        );
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.features.window_size, 20);
        assert_eq!(config.features.channels.len(), 4);
        assert_eq!(config.detector.kind, ScorerKind::Ensemble);
        assert_eq!(config.detector.contamination, 0.05);
        assert_eq!(config.detector.seed, 42);
        assert_eq!(config.decision.score_threshold, 0.7);
        assert_eq!(config.decision.persistence_windows, 3);
        assert_eq!(config.drift.threshold, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.features.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.decision.persistence_windows = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.decision.score_threshold = 1.2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.drift.threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detector.contamination = 0.75;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.features.window_size = 8;
        config.detector.kind = ScorerKind::Statistical;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"decision": {"persistence_windows": 5}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.decision.persistence_windows, 5);
        assert_eq!(config.decision.score_threshold, 0.7);
        assert_eq!(config.features.window_size, 20);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
