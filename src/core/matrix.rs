//! Dense row-major feature matrix consumed by the anomaly scorers.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// A `(n_samples, n_features)` matrix stored row-major.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeatureMatrix")]
pub struct FeatureMatrix {
    n_samples: usize,
    n_features: usize,
    data: Vec<f64>,
}

/// Unchecked wire form; shape is validated on the way in.
#[derive(Deserialize)]
struct RawFeatureMatrix {
    n_samples: usize,
    n_features: usize,
    data: Vec<f64>,
}

impl TryFrom<RawFeatureMatrix> for FeatureMatrix {
    type Error = PipelineError;

    fn try_from(raw: RawFeatureMatrix) -> Result<Self> {
        Self::new(raw.n_samples, raw.n_features, raw.data)
    }
}

impl FeatureMatrix {
    /// Wrap row-major `data` of the given shape.
    pub fn new(n_samples: usize, n_features: usize, data: Vec<f64>) -> Result<Self> {
        let expected = n_samples.checked_mul(n_features);
        if expected != Some(data.len()) {
            return Err(PipelineError::ShapeMismatch {
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            });
        }
        Ok(Self {
            n_samples,
            n_features,
            data,
        })
    }

    /// Build from rows, which must all have the same width.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let n_features = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * n_features);
        for row in rows {
            let row = row.as_ref();
            if row.len() != n_features {
                return Err(PipelineError::ShapeMismatch {
                    expected: n_features,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            n_samples: rows.len(),
            n_features,
            data,
        })
    }

    /// A single-feature matrix, one row per value.
    pub fn from_column(values: &[f64]) -> Self {
        Self {
            n_samples: values.len(),
            n_features: 1,
            data: values.to_vec(),
        }
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_features..(i + 1) * self.n_features]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        let width = self.n_features.max(1);
        self.data.chunks_exact(width).take(self.n_samples)
    }

    /// Values of column `j`, top to bottom.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows().map(|row| row[j]).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Whether every value is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Check that this matrix has `expected` columns.
    pub(crate) fn expect_features(&self, expected: usize) -> Result<()> {
        if self.n_features != expected {
            return Err(PipelineError::ShapeMismatch {
                expected,
                actual: self.n_features,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_checked() {
        assert!(FeatureMatrix::new(2, 2, vec![1.0, 2.0, 3.0]).is_err());
        let m = FeatureMatrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.column(0), vec![1.0, 3.0]);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            FeatureMatrix::from_rows(&rows),
            Err(PipelineError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_json_shape_checked() {
        let m = FeatureMatrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(serde_json::from_str::<FeatureMatrix>(&json).unwrap(), m);

        for bad in [
            r#"{"n_samples":3,"n_features":1,"data":[1.0]}"#,
            r#"{"n_samples":1,"n_features":2,"data":[1.0,2.0,3.0]}"#,
            r#"{"n_samples":18446744073709551615,"n_features":2,"data":[]}"#,
        ] {
            assert!(serde_json::from_str::<FeatureMatrix>(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_from_column() {
        let m = FeatureMatrix::from_column(&[1.0, 2.0, 3.0]);
        assert_eq!(m.n_samples(), 3);
        assert_eq!(m.n_features(), 1);
        assert_eq!(m.rows().count(), 3);
    }
}
