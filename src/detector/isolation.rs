//! Isolation forest anomaly model.
//!
//! Anomalies are few and different, so random axis-aligned splits isolate
//! them in fewer steps than normal points. Each tree is grown on a random
//! subsample; a point's anomaly measure is its average isolation depth
//! across trees, normalised by the expected depth of an unsuccessful search
//! in a binary search tree of the subsample size.
//!
//! Scores follow the usual convention of the model: `score_samples` is
//! higher for more normal points, and `decision_function` is shifted so that
//! the `contamination` fraction of the training data falls below zero.
//!
//! All randomness is drawn from a [`ChaCha20Rng`] seeded from
//! [`IsolationForestParams::seed`] inside [`IsolationForest::fit`].

use super::check_finite_input;
use crate::core::matrix::FeatureMatrix;
use crate::error::{PipelineError, Result};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

const MODEL_NAME: &str = "isolation_forest";

/// Euler–Mascheroni constant, used to approximate harmonic numbers.
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Hyperparameters of the forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Subsample size per tree (capped at the training size)
    pub max_samples: usize,
    /// Expected proportion of anomalies in the training data
    pub contamination: f64,
    /// Seed for subsampling and split selection
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

impl IsolationForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_samples < 2 {
            return Err(PipelineError::InvalidConfiguration(
                "max_samples must be at least 2".to_string(),
            ));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A fitted isolation forest.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    params: IsolationForestParams,
    trees: Vec<Node>,
    sample_size: usize,
    n_features: usize,
    offset: f64,
}

impl IsolationForest {
    /// Grow the forest on `data` and place the decision offset.
    pub fn fit(params: IsolationForestParams, data: &FeatureMatrix) -> Result<Self> {
        params.validate()?;
        if data.n_samples() < 2 || data.n_features() == 0 {
            return Err(PipelineError::InsufficientData(format!(
                "isolation forest needs at least 2 samples with 1+ features, got {}x{}",
                data.n_samples(),
                data.n_features()
            )));
        }
        check_finite_input(MODEL_NAME, data)?;

        let mut rng = ChaCha20Rng::seed_from_u64(params.seed);
        let sample_size = params.max_samples.min(data.n_samples());
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..params.n_estimators)
            .map(|_| {
                let rows = index::sample(&mut rng, data.n_samples(), sample_size).into_vec();
                grow(data, rows, 0, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            params,
            trees,
            sample_size,
            n_features: data.n_features(),
            offset: 0.0,
        };

        let training_scores = forest.score_samples(data)?;
        forest.offset = percentile(training_scores, forest.params.contamination * 100.0);
        Ok(forest)
    }

    /// Normality score per row in `[-1, 0)`; lower means more anomalous.
    pub fn score_samples(&self, data: &FeatureMatrix) -> Result<Vec<f64>> {
        data.expect_features(self.n_features)?;
        check_finite_input(MODEL_NAME, data)?;

        let normaliser = average_path_length(self.sample_size);
        let n_trees = self.trees.len() as f64;
        Ok(data
            .rows()
            .map(|row| {
                let depth: f64 = self.trees.iter().map(|t| path_length(t, row)).sum();
                -(2f64.powf(-(depth / n_trees) / normaliser))
            })
            .collect())
    }

    /// `score_samples - offset`; negative values are outliers.
    pub fn decision_function(&self, data: &FeatureMatrix) -> Result<Vec<f64>> {
        Ok(self
            .score_samples(data)?
            .into_iter()
            .map(|s| s - self.offset)
            .collect())
    }

    /// Outlier flag per row.
    pub fn predict(&self, data: &FeatureMatrix) -> Result<Vec<bool>> {
        Ok(self
            .decision_function(data)?
            .into_iter()
            .map(|d| d < 0.0)
            .collect())
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn params(&self) -> &IsolationForestParams {
        &self.params
    }
}

fn grow(
    data: &FeatureMatrix,
    rows: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut ChaCha20Rng,
) -> Node {
    if depth >= height_limit || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    // Start at a random feature and take the first one with any spread.
    let n_features = data.n_features();
    let start = rng.gen_range(0..n_features);
    let split = (0..n_features).find_map(|step| {
        let feature = (start + step) % n_features;
        let (min, max) = rows
            .iter()
            .map(|&r| data.row(r)[feature])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        (min < max).then_some((feature, min, max))
    });

    let Some((feature, min, max)) = split else {
        return Node::Leaf { size: rows.len() };
    };

    // threshold in [min, max) keeps both sides non-empty; the convex form
    // cannot overflow for far-apart finite bounds
    let u: f64 = rng.gen();
    let threshold = (min * (1.0 - u) + max * u).max(min);
    let threshold = if threshold < max { threshold } else { min };
    let (left, right): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&r| data.row(r)[feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(data, left, depth + 1, height_limit, rng)),
        right: Box::new(grow(data, right, depth + 1, height_limit, rng)),
    }
}

fn path_length(tree: &Node, row: &[f64]) -> f64 {
    let mut node = tree;
    let mut depth = 0.0;
    loop {
        match node {
            Node::Leaf { size } => return depth + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                node = if row[*feature] <= *threshold {
                    left
                } else {
                    right
                };
                depth += 1.0;
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linearly interpolated percentile, `q` in `[0, 100]`.
fn percentile(mut values: Vec<f64>, q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);

    let rank = (q / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    values[lo] + (values[hi] - values[lo]) * frac
}
