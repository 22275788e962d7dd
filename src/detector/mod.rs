//! Anomaly scorers.
//!
//! Every scorer implements [`AnomalyScorer`]; the pipeline never needs to know
//! which one is active. Two variants exist:
//!
//! - **Statistical**: absolute z-score against the training mean/std
//! - **Ensemble**: an isolation forest, with the sign of its decision
//!   function flipped so larger means more anomalous
//!
//! The variant is chosen once, when the scorer is built from a
//! [`DetectorConfig`].

pub mod ensemble;
pub mod isolation;
pub mod statistical;

pub use ensemble::EnsembleScorer;
pub use isolation::{IsolationForest, IsolationForestParams};
pub use statistical::StatisticalBaseline;

use crate::config::DetectorConfig;
use crate::core::matrix::FeatureMatrix;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Common interface of the anomaly scorers.
///
/// `fit` takes `&mut self` while `score`/`predict` take `&self`, so a scorer
/// cannot be refitted while anything else is reading from it.
pub trait AnomalyScorer: Send + Sync {
    /// Stable identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Train on normal-operation data, replacing any previous fit.
    fn fit(&mut self, data: &FeatureMatrix) -> Result<()>;

    /// One anomaly score per row (higher = more anomalous).
    fn score(&self, data: &FeatureMatrix) -> Result<Vec<f64>>;

    /// One anomaly flag per row.
    fn predict(&self, data: &FeatureMatrix) -> Result<Vec<bool>>;

    /// Whether `fit` has completed.
    fn is_fitted(&self) -> bool;

    /// Feature count seen at fit time.
    fn n_features(&self) -> Option<usize>;
}

/// Which scorer variant to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Statistical,
    #[default]
    Ensemble,
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScorerKind::Statistical => write!(f, "statistical"),
            ScorerKind::Ensemble => write!(f, "ensemble"),
        }
    }
}

impl FromStr for ScorerKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "statistical" | "zscore" => Ok(ScorerKind::Statistical),
            "ensemble" | "isolation_forest" => Ok(ScorerKind::Ensemble),
            other => Err(PipelineError::InvalidConfiguration(format!(
                "unknown scorer '{other}' (expected statistical or ensemble)"
            ))),
        }
    }
}

/// Build the configured scorer.
pub fn build_scorer(config: &DetectorConfig) -> Result<Box<dyn AnomalyScorer>> {
    config.validate()?;
    Ok(match config.kind {
        ScorerKind::Statistical => Box::new(StatisticalBaseline::new(config.z_threshold)?),
        ScorerKind::Ensemble => Box::new(EnsembleScorer::new(config.forest_params())?),
    })
}

/// Reject an unfitted model or a matrix of the wrong width.
pub(crate) fn check_scoring_input(
    model: &'static str,
    fitted_features: Option<usize>,
    data: &FeatureMatrix,
) -> Result<()> {
    let expected = fitted_features.ok_or(PipelineError::UnfittedModel { model })?;
    data.expect_features(expected)?;
    check_finite_input(model, data)
}

/// Reject NaN or infinite values, which would otherwise score as normal.
pub(crate) fn check_finite_input(model: &'static str, data: &FeatureMatrix) -> Result<()> {
    if !data.is_finite() {
        return Err(PipelineError::InvalidSeries(format!(
            "{model} input contains non-finite values"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorer_kind_parsing() {
        assert_eq!("statistical".parse::<ScorerKind>().unwrap(), ScorerKind::Statistical);
        assert_eq!(" Ensemble ".parse::<ScorerKind>().unwrap(), ScorerKind::Ensemble);
        assert!("svm".parse::<ScorerKind>().is_err());
    }

    #[test]
    fn test_build_scorer_selects_variant() {
        let mut config = DetectorConfig::default();
        config.kind = ScorerKind::Statistical;
        assert_eq!(build_scorer(&config).unwrap().name(), "statistical_baseline");

        config.kind = ScorerKind::Ensemble;
        let scorer = build_scorer(&config).unwrap();
        assert_eq!(scorer.name(), "isolation_forest_ensemble");
        assert!(!scorer.is_fitted());
    }

    #[test]
    fn test_build_scorer_validates() {
        let config = DetectorConfig {
            contamination: 0.9,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            build_scorer(&config),
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_scorers_are_interchangeable() {
        let train: Vec<Vec<f64>> = (0..64)
            .map(|i| vec![(i % 8) as f64 * 0.1, ((i * 3) % 5) as f64 * 0.2])
            .collect();
        let train = FeatureMatrix::from_rows(&train).unwrap();
        let query = FeatureMatrix::from_rows(&[[0.35, 0.4], [9.0, 9.0]]).unwrap();

        for kind in [ScorerKind::Statistical, ScorerKind::Ensemble] {
            let config = DetectorConfig {
                kind,
                ..DetectorConfig::default()
            };
            let mut scorer = build_scorer(&config).unwrap();
            scorer.fit(&train).unwrap();

            let scores = scorer.score(&query).unwrap();
            assert!(scores[1] > scores[0], "{kind}: {scores:?}");
            assert_eq!(scorer.predict(&query).unwrap().len(), 2);
        }

        let mut baseline = build_scorer(&DetectorConfig {
            kind: ScorerKind::Statistical,
            ..DetectorConfig::default()
        })
        .unwrap();
        baseline.fit(&train).unwrap();
        assert_eq!(baseline.predict(&query).unwrap(), vec![false, true]);
    }

    #[test]
    fn test_non_finite_input_rejected_by_every_scorer() {
        let mut rows: Vec<[f64; 2]> = (0..32)
            .map(|i| [(i % 8) as f64 * 0.1, ((i * 3) % 5) as f64 * 0.2])
            .collect();
        let train = FeatureMatrix::from_rows(&rows).unwrap();
        rows[5][0] = f64::NAN;
        let poisoned = FeatureMatrix::from_rows(&rows).unwrap();

        for kind in [ScorerKind::Statistical, ScorerKind::Ensemble] {
            let config = DetectorConfig {
                kind,
                ..DetectorConfig::default()
            };

            let mut scorer = build_scorer(&config).unwrap();
            assert!(
                matches!(scorer.fit(&poisoned), Err(PipelineError::InvalidSeries(_))),
                "{kind}: fit"
            );
            assert!(!scorer.is_fitted(), "{kind}");

            scorer.fit(&train).unwrap();
            for bad in [f64::NAN, f64::INFINITY] {
                let query = FeatureMatrix::from_rows(&[[0.3, bad]]).unwrap();
                assert!(
                    matches!(scorer.score(&query), Err(PipelineError::InvalidSeries(_))),
                    "{kind}: score {bad}"
                );
                assert!(
                    matches!(scorer.predict(&query), Err(PipelineError::InvalidSeries(_))),
                    "{kind}: predict {bad}"
                );
            }
        }
    }

    #[test]
    fn test_unfitted_scorers_fail() {
        let query = FeatureMatrix::from_column(&[1.0]);
        for kind in [ScorerKind::Statistical, ScorerKind::Ensemble] {
            let scorer = build_scorer(&DetectorConfig {
                kind,
                ..DetectorConfig::default()
            })
            .unwrap();
            assert!(matches!(
                scorer.score(&query),
                Err(PipelineError::UnfittedModel { .. })
            ));
            assert!(matches!(
                scorer.predict(&query),
                Err(PipelineError::UnfittedModel { .. })
            ));
        }
    }
}
