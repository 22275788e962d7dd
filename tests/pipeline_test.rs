//! Integration tests for the inspection pipeline

use sentinel_sensor_agent::core::{build_rolling_features, DecisionEngine, DriftMonitor};
use sentinel_sensor_agent::detector::IsolationForestParams;
use sentinel_sensor_agent::simulation::{normal_operation, FailureInjector, FailureKind};
use sentinel_sensor_agent::{
    AnomalyScorer, Config, EnsembleScorer, FeatureMatrix, InspectionPipeline, PipelineError,
    RunReport, ScorerKind, StatisticalBaseline, TabularSeries,
};

const CHANNELS: [&str; 4] = ["temperature", "vibration", "pressure", "rotational_speed"];

fn small_config(kind: ScorerKind) -> Config {
    let mut config = Config::default();
    config.features.window_size = 10;
    config.detector.kind = kind;
    config.detector.n_estimators = 60;
    config
}

#[test]
fn test_persistence_scenario() {
    let mut engine = DecisionEngine::new(0.7, 3).unwrap();
    assert_eq!(
        engine.evaluate(&[0.8, 0.9, 0.75, 0.6]),
        vec![false, false, true, false]
    );
}

#[test]
fn test_z_score_threshold_scenario() {
    let mut baseline = StatisticalBaseline::new(3.0).unwrap();
    baseline.fit_values(&[8.0, 12.0]).unwrap();

    let z = baseline.score_values(&[16.0]).unwrap()[0];
    assert!((z - 3.0).abs() < 1e-9, "z = {z}");
    assert_eq!(baseline.predict_values(&[16.0]).unwrap(), vec![false]);
    assert_eq!(baseline.predict_values(&[16.01]).unwrap(), vec![true]);
}

#[test]
fn test_drift_scenario() {
    let monitor = DriftMonitor::new(0.2).unwrap();
    assert!(monitor
        .detect_mean_shift(&[100.0, 100.0, 100.0], &[125.0, 125.0, 125.0])
        .unwrap());
    assert!(!monitor
        .detect_mean_shift(&[0.0, 0.0, 0.0], &[125.0, 125.0, 125.0])
        .unwrap());
}

#[test]
fn test_rolling_features_scenario() {
    let values: Vec<f64> = (0..25).map(|i| (i as f64 * 0.3).sin()).collect();
    let series = TabularSeries::with_len(25)
        .with_channel("temperature", values)
        .unwrap();
    let frame = build_rolling_features(&series, "temperature", 20).unwrap();

    assert_eq!(frame.len(), 6);
    assert_eq!(
        frame.columns,
        vec![
            "temperature_mean",
            "temperature_std",
            "temperature_min",
            "temperature_max"
        ]
    );
    assert!(frame.matrix().as_slice().iter().all(|v| v.is_finite()));
}

#[test]
fn test_ensemble_is_reproducible_and_separates_outliers() {
    let train = normal_operation(400, &CHANNELS, 42)
        .unwrap()
        .raw_matrix(&CHANNELS)
        .unwrap();

    let mut a = EnsembleScorer::new(IsolationForestParams::default()).unwrap();
    let mut b = EnsembleScorer::new(IsolationForestParams::default()).unwrap();
    a.fit(&train).unwrap();
    b.fit(&train).unwrap();
    assert_eq!(a.score(&train).unwrap(), b.score(&train).unwrap());

    let query = FeatureMatrix::from_rows(&[[0.5, 0.5, 0.5, 0.5], [1.5, 1.5, -0.5, 1.5]]).unwrap();
    let scores = a.score(&query).unwrap();
    assert!(scores[1] > scores[0], "{scores:?}");

    let flagged = a.predict(&train).unwrap().iter().filter(|&&f| f).count();
    let rate = flagged as f64 / 400.0;
    assert!((0.02..=0.08).contains(&rate), "flag rate {rate}");
}

#[test]
fn test_error_kinds_surface() {
    let unfitted = StatisticalBaseline::default();
    assert!(matches!(
        unfitted.score_values(&[1.0]),
        Err(PipelineError::UnfittedModel { .. })
    ));

    let mut flat = StatisticalBaseline::default();
    flat.fit_values(&[2.0, 2.0]).unwrap();
    assert!(matches!(
        flat.score_values(&[2.0]),
        Err(PipelineError::DegenerateDistribution { .. })
    ));

    let mut config = Config::default();
    config.features.window_size = 0;
    assert!(matches!(
        InspectionPipeline::new(config),
        Err(PipelineError::InvalidConfiguration(_))
    ));

    let mut pipeline = InspectionPipeline::new(small_config(ScorerKind::Statistical)).unwrap();
    pipeline
        .fit(&normal_operation(100, &CHANNELS, 1).unwrap())
        .unwrap();
    assert!(matches!(
        pipeline.process_reading(0, &[0.5, 0.5]),
        Err(PipelineError::ShapeMismatch {
            expected: 4,
            actual: 2
        })
    ));
}

#[test]
fn test_injected_failures_raise_alerts() {
    // the ensemble's negated decision function stays well inside (-1, 1),
    // so its risk never gets near the statistical baseline's
    for (kind, threshold) in [(ScorerKind::Statistical, 0.7), (ScorerKind::Ensemble, 0.51)] {
        let mut config = small_config(kind);
        config.decision.score_threshold = threshold;
        let mut pipeline = InspectionPipeline::new(config).unwrap();
        pipeline
            .fit(&normal_operation(400, &CHANNELS, 42).unwrap())
            .unwrap();

        let test = FailureInjector::default()
            .inject(
                FailureKind::Overheating,
                &normal_operation(200, &CHANNELS, 43).unwrap(),
                "temperature",
                100,
            )
            .unwrap();
        let report = pipeline.run(&test).unwrap();

        let tail = &report.assessments[report.assessments.len() - 20..];
        assert!(tail.iter().all(|a| a.alert), "{kind}: no sustained alert");

        let head_score: f64 = report.assessments[..20].iter().map(|a| a.anomaly_score).sum();
        let tail_score: f64 = tail.iter().map(|a| a.anomaly_score).sum();
        assert!(tail_score > head_score, "{kind}");
    }
}

#[test]
fn test_overheating_drift_recommends_retrain() {
    let mut pipeline = InspectionPipeline::new(small_config(ScorerKind::Ensemble)).unwrap();
    pipeline
        .fit(&normal_operation(300, &CHANNELS, 42).unwrap())
        .unwrap();

    let drifted = FailureInjector::default()
        .inject_sensor_drift(&normal_operation(300, &CHANNELS, 7).unwrap(), "pressure")
        .unwrap();
    let report = pipeline.run(&drifted).unwrap();

    assert!(report.retrain_recommended);
    assert_eq!(report.drifted_channels(), vec!["pressure"]);
}

#[test]
fn test_series_file_to_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let series_path = dir.path().join("series.json");
    let report_path = dir.path().join("out").join("report.json");

    let json = serde_json::json!({
        "channels": {
            "temperature": (0..60).map(|i| 0.5 + 0.05 * (i as f64 * 0.7).sin()).collect::<Vec<_>>(),
            "vibration": (0..60).map(|i| 0.5 + 0.05 * (i as f64 * 1.3).cos()).collect::<Vec<_>>(),
        }
    });
    std::fs::write(&series_path, json.to_string()).unwrap();

    let content = std::fs::read_to_string(&series_path).unwrap();
    let series: TabularSeries = serde_json::from_str(&content).unwrap();
    assert_eq!(series.len(), 60);

    let mut config = small_config(ScorerKind::Statistical);
    config.features.channels = vec!["temperature".to_string(), "vibration".to_string()];
    let mut pipeline = InspectionPipeline::new(config).unwrap();
    pipeline.fit(&series.head(40)).unwrap();
    let report = pipeline.run(&series.tail_from(40)).unwrap();
    report.write_to(&report_path).unwrap();

    let written: RunReport =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written.producer, report.producer);
    assert_eq!(written.alert_count, report.alert_count);
    assert_eq!(written.assessments.len(), 11);
    assert_eq!(written.assessments[0].index, 49);
}

#[test]
fn test_shared_audit_log_counts_everything() {
    let audit = sentinel_sensor_agent::audit::create_shared_log();
    let mut pipeline = InspectionPipeline::new(small_config(ScorerKind::Statistical))
        .unwrap()
        .with_audit_log(audit.clone());
    pipeline
        .fit(&normal_operation(100, &CHANNELS, 1).unwrap())
        .unwrap();
    pipeline
        .run(&normal_operation(50, &CHANNELS, 2).unwrap())
        .unwrap();

    let stats = audit.stats();
    assert_eq!(stats.observations, 50);
    assert_eq!(stats.windows_scored, 41);
    assert_eq!(stats.drift_checks, 4);
}
