//! Anomaly-to-decision pipeline.
//!
//! Glues the components together for one time-ordered stream:
//!
//! ```text
//! readings ─▶ rolling features ─▶ scorer ─▶ risk ─▶ decision engine ─▶ alerts
//!    └──────────────▶ drift monitor (reference vs. current, per channel)
//! ```
//!
//! A pipeline owns exactly one [`DecisionEngine`], so alert state carries
//! across calls. Monitoring several independent streams means several
//! pipelines.

use crate::audit::{create_shared_log, SharedAuditLog};
use crate::config::Config;
use crate::core::decision::{AlertState, DecisionEngine};
use crate::core::drift::{DriftMonitor, SlidingDriftMonitor};
use crate::core::features::{build_feature_frame, FEATURE_SUFFIXES};
use crate::core::matrix::FeatureMatrix;
use crate::core::report::{Assessment, ChannelDrift, ReportBuilder, RunReport, RunSettings};
use crate::core::risk;
use crate::core::series::TabularSeries;
use crate::core::windowing::SlidingWindow;
use crate::detector::{build_scorer, AnomalyScorer};
use crate::error::{PipelineError, Result};
use tracing::{debug, info, warn};

const DRIFT_REFERENCE: &str = "drift_reference";

/// Batch and streaming inspection over one sensor stream.
pub struct InspectionPipeline {
    config: Config,
    scorer: Box<dyn AnomalyScorer>,
    engine: DecisionEngine,
    drift: DriftMonitor,
    /// One feature window per configured channel
    windows: Vec<SlidingWindow>,
    /// Raw training values per configured channel, set by `fit`
    reference: Option<Vec<Vec<f64>>>,
    /// Streaming drift monitors per configured channel, set by `fit`
    drift_streams: Vec<SlidingDriftMonitor>,
    audit: SharedAuditLog,
    reports: ReportBuilder,
}

impl InspectionPipeline {
    /// Validate `config` and build an unfitted pipeline.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let scorer = build_scorer(&config.detector)?;
        let engine = DecisionEngine::new(
            config.decision.score_threshold,
            config.decision.persistence_windows,
        )?;
        let drift = DriftMonitor::new(config.drift.threshold)?;
        let windows = config
            .features
            .channels
            .iter()
            .map(|_| SlidingWindow::new(config.features.window_size))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            scorer,
            engine,
            drift,
            windows,
            reference: None,
            drift_streams: Vec::new(),
            audit: create_shared_log(),
            reports: ReportBuilder::new(),
        })
    }

    /// Record into an existing shared audit log instead of a private one.
    pub fn with_audit_log(mut self, audit: SharedAuditLog) -> Self {
        self.audit = audit;
        self
    }

    /// Fit the scorer on normal-operation data and keep each channel's raw
    /// values as the drift reference.
    ///
    /// Refitting also resets the alert state and the streaming windows.
    pub fn fit(&mut self, training: &TabularSeries) -> Result<()> {
        check_finite(training)?;
        let channels = &self.config.features.channels;
        let window_size = self.config.features.window_size;

        let frame = build_feature_frame(training, channels, window_size)?;
        if frame.is_empty() {
            return Err(PipelineError::InsufficientData(format!(
                "training series has {} rows, window_size is {window_size}",
                training.len()
            )));
        }
        self.scorer.fit(frame.matrix())?;

        let reference = channels
            .iter()
            .map(|c| training.channel(c).map(<[f64]>::to_vec))
            .collect::<Result<Vec<_>>>()?;
        self.drift_streams = reference
            .iter()
            .map(|values| {
                SlidingDriftMonitor::new(self.drift, values.clone(), self.config.drift.current_window)
            })
            .collect::<Result<Vec<_>>>()?;
        self.reference = Some(reference);
        self.reset();

        info!(
            scorer = self.scorer.name(),
            rows = training.len(),
            windows = frame.len(),
            features = frame.columns.len(),
            "Fitted anomaly scorer"
        );
        Ok(())
    }

    /// Score every full window of `series` and run the decisions in order.
    ///
    /// Series shorter than `window_size` produce no assessments.
    pub fn evaluate_series(&mut self, series: &TabularSeries) -> Result<Vec<Assessment>> {
        self.ensure_fitted()?;
        check_finite(series)?;

        let frame = build_feature_frame(
            series,
            &self.config.features.channels,
            self.config.features.window_size,
        )?;
        self.audit.record_observations(series.len() as u64);
        if frame.is_empty() {
            debug!(rows = series.len(), "Series shorter than one window");
            return Ok(Vec::new());
        }

        let scores = self.scorer.score(frame.matrix())?;
        let assessments: Vec<Assessment> = frame
            .index
            .iter()
            .zip(scores)
            .map(|(&index, score)| self.decide(index, score))
            .collect();

        self.audit.record_windows_scored(assessments.len() as u64);
        Ok(assessments)
    }

    /// Streaming form: push one reading (one value per configured channel,
    /// in channel order) and assess once every channel's window is full.
    pub fn process_reading(&mut self, index: u64, reading: &[f64]) -> Result<Option<Assessment>> {
        if reading.len() != self.windows.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.windows.len(),
                actual: reading.len(),
            });
        }
        if reading.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidSeries(format!(
                "reading at index {index} contains non-finite values"
            )));
        }
        self.ensure_fitted()?;

        // every window shares the same index history, so the first push is
        // the only one that can fail
        for (window, &value) in self.windows.iter_mut().zip(reading) {
            window.push(index, value)?;
        }
        for (stream, &value) in self.drift_streams.iter_mut().zip(reading) {
            stream.push(value);
        }
        self.audit.record_observations(1);

        let Some(row) = self.current_features() else {
            return Ok(None);
        };
        let scores = self.scorer.score(&FeatureMatrix::from_rows(&[row])?)?;
        let &[score] = scores.as_slice() else {
            return Err(PipelineError::ShapeMismatch {
                expected: 1,
                actual: scores.len(),
            });
        };

        self.audit.record_windows_scored(1);
        Ok(Some(self.decide(index, score)))
    }

    /// Compare each configured channel of `current` against the training
    /// reference.
    pub fn check_drift(&self, current: &TabularSeries) -> Result<Vec<ChannelDrift>> {
        let reference = self.reference.as_ref().ok_or(PipelineError::UnfittedModel {
            model: DRIFT_REFERENCE,
        })?;

        let mut reports = Vec::with_capacity(reference.len());
        for (channel, reference) in self.config.features.channels.iter().zip(reference) {
            let report = self.drift.compare(reference, current.channel(channel)?)?;
            self.record_drift(channel, report.exceeded, report.relative_shift);
            reports.push(ChannelDrift {
                channel: channel.clone(),
                report,
            });
        }

        info!(
            channels = reports.len(),
            drifted = reports.iter().filter(|d| d.report.exceeded).count(),
            "Checked drift"
        );
        Ok(reports)
    }

    /// Drift of the streaming current windows, for channels whose window is
    /// already full.
    pub fn streaming_drift(&self) -> Result<Vec<ChannelDrift>> {
        if self.reference.is_none() {
            return Err(PipelineError::UnfittedModel {
                model: DRIFT_REFERENCE,
            });
        }

        let mut reports = Vec::new();
        for (channel, stream) in self.config.features.channels.iter().zip(&self.drift_streams) {
            if let Some(report) = stream.check()? {
                self.record_drift(channel, report.exceeded, report.relative_shift);
                reports.push(ChannelDrift {
                    channel: channel.clone(),
                    report,
                });
            }
        }
        Ok(reports)
    }

    /// Evaluate `series`, check it for drift and wrap both in a report.
    pub fn run(&mut self, series: &TabularSeries) -> Result<RunReport> {
        let assessments = self.evaluate_series(series)?;
        let drift = self.check_drift(series)?;
        let settings = RunSettings::from_config(&self.config, self.scorer.name());
        Ok(self.reports.build(settings, assessments, drift))
    }

    /// Forget the alert run and streaming windows; the fit is kept.
    pub fn reset(&mut self) {
        self.engine.reset();
        for window in &mut self.windows {
            window.clear();
        }
        for stream in &mut self.drift_streams {
            stream.clear();
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn is_fitted(&self) -> bool {
        self.scorer.is_fitted()
    }

    pub fn alert_state(&self) -> &AlertState {
        self.engine.state()
    }

    pub fn audit(&self) -> &SharedAuditLog {
        &self.audit
    }

    pub fn report_builder(&self) -> &ReportBuilder {
        &self.reports
    }

    fn ensure_fitted(&self) -> Result<()> {
        if !self.scorer.is_fitted() {
            return Err(PipelineError::UnfittedModel {
                model: self.scorer.name(),
            });
        }
        Ok(())
    }

    fn current_features(&self) -> Option<Vec<f64>> {
        let mut row = Vec::with_capacity(self.windows.len() * FEATURE_SUFFIXES.len());
        for window in &self.windows {
            row.extend_from_slice(&window.features()?.as_array());
        }
        Some(row)
    }

    fn decide(&mut self, index: u64, anomaly_score: f64) -> Assessment {
        let risk = risk::normalize(anomaly_score);
        let was_alerting = self.engine.state().is_alerting();
        let alert = self.engine.step(risk);

        debug!(index, anomaly_score, risk, alert, "Scored window");
        if alert {
            self.audit.record_alerts(1);
            if !was_alerting {
                warn!(
                    index,
                    risk,
                    persistence = self.engine.persistence_windows(),
                    "Persistent anomaly, inspect equipment"
                );
            }
        }

        Assessment {
            index,
            anomaly_score,
            risk,
            alert,
        }
    }

    fn record_drift(&self, channel: &str, exceeded: bool, relative_shift: Option<f64>) {
        self.audit.record_drift_check(exceeded);
        if exceeded {
            warn!(channel, ?relative_shift, "Drift detected, retraining recommended");
        }
    }
}

fn check_finite(series: &TabularSeries) -> Result<()> {
    if !series.is_finite() {
        return Err(PipelineError::InvalidSeries(
            "series contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ScorerKind;
    use crate::simulation::{normal_operation, FailureInjector};

    fn config(kind: ScorerKind) -> Config {
        let mut config = Config::default();
        config.features.window_size = 5;
        config.features.channels = vec!["temperature".to_string(), "vibration".to_string()];
        config.detector.kind = kind;
        config.detector.n_estimators = 50;
        config
    }

    fn fitted(kind: ScorerKind) -> InspectionPipeline {
        let cfg = config(kind);
        let training = normal_operation(200, &cfg.features.channels, 42).unwrap();
        let mut pipeline = InspectionPipeline::new(cfg).unwrap();
        pipeline.fit(&training).unwrap();
        pipeline
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = Config::default();
        cfg.decision.persistence_windows = 0;
        assert!(matches!(
            InspectionPipeline::new(cfg),
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unfitted_pipeline_fails() {
        let cfg = config(ScorerKind::Statistical);
        let series = normal_operation(20, &cfg.features.channels, 1).unwrap();
        let mut pipeline = InspectionPipeline::new(cfg).unwrap();

        assert!(matches!(
            pipeline.evaluate_series(&series),
            Err(PipelineError::UnfittedModel { .. })
        ));
        assert!(matches!(
            pipeline.check_drift(&series),
            Err(PipelineError::UnfittedModel { .. })
        ));
        assert!(matches!(
            pipeline.process_reading(0, &[0.5, 0.5]),
            Err(PipelineError::UnfittedModel { .. })
        ));
    }

    #[test]
    fn test_short_training_rejected() {
        let cfg = config(ScorerKind::Statistical);
        let training = normal_operation(4, &cfg.features.channels, 1).unwrap();
        let mut pipeline = InspectionPipeline::new(cfg).unwrap();
        assert!(matches!(
            pipeline.fit(&training),
            Err(PipelineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_missing_channel_surfaces() {
        let mut pipeline = fitted(ScorerKind::Statistical);
        let series = TabularSeries::with_len(10)
            .with_channel("temperature", vec![0.5; 10])
            .unwrap();
        assert!(matches!(
            pipeline.evaluate_series(&series),
            Err(PipelineError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_evaluate_series_one_assessment_per_window() {
        let mut pipeline = fitted(ScorerKind::Statistical);
        let series = normal_operation(30, &["temperature", "vibration"], 9).unwrap();
        let assessments = pipeline.evaluate_series(&series).unwrap();

        assert_eq!(assessments.len(), 26);
        assert_eq!(assessments[0].index, 4);
        assert!(assessments.iter().all(|a| a.risk > 0.0 && a.risk < 1.0));
        assert_eq!(pipeline.audit().stats().windows_scored, 26);
    }

    #[test]
    fn test_sustained_overheating_alerts() {
        let mut pipeline = fitted(ScorerKind::Statistical);
        let normal = normal_operation(60, &["temperature", "vibration"], 3).unwrap();
        let hot = FailureInjector {
            growth_rate: 0.05,
            ..FailureInjector::default()
        }
        .inject_overheating(&normal, "temperature", 30)
        .unwrap();

        let assessments = pipeline.evaluate_series(&hot).unwrap();
        let last = assessments.last().unwrap();
        assert!(last.alert, "{last:?}");
        assert!(pipeline.alert_state().is_alerting());
    }

    #[test]
    fn test_streaming_matches_batch() {
        let mut batch = fitted(ScorerKind::Ensemble);
        let mut stream = fitted(ScorerKind::Ensemble);
        let series = normal_operation(15, &["temperature", "vibration"], 11).unwrap();

        let expected = batch.evaluate_series(&series).unwrap();
        let temperature = series.channel("temperature").unwrap();
        let vibration = series.channel("vibration").unwrap();

        let mut streamed = Vec::new();
        for (i, &index) in series.index().iter().enumerate() {
            let out = stream
                .process_reading(index, &[temperature[i], vibration[i]])
                .unwrap();
            assert_eq!(out.is_some(), i >= 4);
            streamed.extend(out);
        }

        assert_eq!(streamed.len(), expected.len());
        for (s, b) in streamed.iter().zip(&expected) {
            assert_eq!(s.index, b.index);
            assert_eq!(s.alert, b.alert);
            assert!((s.anomaly_score - b.anomaly_score).abs() < 1e-9);
        }
    }

    #[test]
    fn test_process_reading_validation() {
        let mut pipeline = fitted(ScorerKind::Statistical);
        assert!(matches!(
            pipeline.process_reading(0, &[0.5]),
            Err(PipelineError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            pipeline.process_reading(0, &[0.5, f64::NAN]),
            Err(PipelineError::InvalidSeries(_))
        ));

        pipeline.process_reading(5, &[0.5, 0.5]).unwrap();
        assert!(matches!(
            pipeline.process_reading(5, &[0.5, 0.5]),
            Err(PipelineError::InvalidSeries(_))
        ));
    }

    #[test]
    fn test_check_drift_flags_shifted_channel() {
        let pipeline = fitted(ScorerKind::Statistical);
        let current = normal_operation(100, &["temperature", "vibration"], 5).unwrap();
        let drifted = FailureInjector::default()
            .inject_sensor_drift(&current, "vibration")
            .unwrap();

        let reports = pipeline.check_drift(&drifted).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].channel, "temperature");
        assert!(!reports[0].report.exceeded);
        assert!(reports[1].report.exceeded);

        let stats = pipeline.audit().stats();
        assert_eq!(stats.drift_checks, 2);
        assert_eq!(stats.drift_detections, 1);
    }

    #[test]
    fn test_streaming_drift_waits_for_full_window() {
        let mut cfg = config(ScorerKind::Statistical);
        cfg.drift.current_window = 3;
        let training = normal_operation(100, &cfg.features.channels, 42).unwrap();
        let mut pipeline = InspectionPipeline::new(cfg).unwrap();
        pipeline.fit(&training).unwrap();

        pipeline.process_reading(0, &[0.5, 0.5]).unwrap();
        assert!(pipeline.streaming_drift().unwrap().is_empty());

        pipeline.process_reading(1, &[0.9, 0.5]).unwrap();
        pipeline.process_reading(2, &[0.9, 0.5]).unwrap();
        let reports = pipeline.streaming_drift().unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].report.exceeded);
        assert!(!reports[1].report.exceeded);
    }

    #[test]
    fn test_run_builds_report() {
        let mut pipeline = fitted(ScorerKind::Statistical);
        let series = normal_operation(25, &["temperature", "vibration"], 2).unwrap();
        let report = pipeline.run(&series).unwrap();

        assert_eq!(report.assessments.len(), 21);
        assert_eq!(report.drift.len(), 2);
        assert_eq!(report.settings.scorer, "statistical_baseline");
        assert_eq!(report.settings.window_size, 5);
        assert_eq!(
            report.alert_count,
            report.assessments.iter().filter(|a| a.alert).count()
        );
    }

    #[test]
    fn test_refit_resets_alert_state() {
        let mut pipeline = fitted(ScorerKind::Statistical);
        let hot = FailureInjector {
            growth_rate: 0.1,
            ..FailureInjector::default()
        }
        .inject_overheating(
            &normal_operation(40, &["temperature", "vibration"], 3).unwrap(),
            "temperature",
            10,
        )
        .unwrap();
        pipeline.evaluate_series(&hot).unwrap();
        assert!(pipeline.alert_state().consecutive_count > 0);

        let training = normal_operation(200, &["temperature", "vibration"], 42).unwrap();
        pipeline.fit(&training).unwrap();
        assert_eq!(pipeline.alert_state().consecutive_count, 0);
    }
}
