//! Synthetic sensor data for demos and tests.
//!
//! Normal operation is modelled as independent Gaussian noise per channel on
//! pre-normalised readings. Every generator takes an explicit seed and draws
//! from its own [`ChaCha20Rng`], so the same seed always yields the same data.
//! Failure patterns are layered on top by [`FailureInjector`].

pub mod injection;

pub use injection::{FailureInjector, FailureKind};

use crate::core::matrix::FeatureMatrix;
use crate::core::series::TabularSeries;
use crate::error::{PipelineError, Result};
use rand::distributions::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use statrs::distribution::Normal;

/// Mean of a normalised reading under normal operation.
pub const NORMAL_MEAN: f64 = 0.5;

/// Standard deviation of a normalised reading under normal operation.
pub const NORMAL_STD: f64 = 0.05;

fn gaussian(mean: f64, std: f64) -> Result<Normal> {
    Normal::new(mean, std).map_err(|e| {
        PipelineError::InvalidConfiguration(format!("invalid normal({mean}, {std}): {e}"))
    })
}

/// `n_samples` rows of normal operation for each channel, indexed `0..n`.
pub fn normal_operation<S: AsRef<str>>(
    n_samples: usize,
    channels: &[S],
    seed: u64,
) -> Result<TabularSeries> {
    let normal = gaussian(NORMAL_MEAN, NORMAL_STD)?;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let mut series = TabularSeries::with_len(n_samples);
    for channel in channels {
        let values = (&normal).sample_iter(&mut rng).take(n_samples).collect();
        series.push_channel(channel.as_ref(), values)?;
    }
    Ok(series)
}

/// A matrix of i.i.d. `Normal(mean, std)` draws, filled row by row.
pub fn gaussian_matrix(
    n_samples: usize,
    n_features: usize,
    mean: f64,
    std: f64,
    seed: u64,
) -> Result<FeatureMatrix> {
    let normal = gaussian(mean, std)?;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let data = normal
        .sample_iter(&mut rng)
        .take(n_samples * n_features)
        .collect();
    FeatureMatrix::new(n_samples, n_features, data)
}
