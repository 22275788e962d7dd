//! Sliding window management for streaming readings.
//!
//! Readings are collected into a fixed-capacity trailing window. Once the
//! window is full every new reading evicts the oldest one, so the window
//! always holds the most recent `capacity` observations of a channel.

use crate::core::features::FeatureWindow;
use crate::error::{PipelineError, Result};
use std::collections::VecDeque;

/// A bounded trailing window over one channel.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    /// Maximum number of observations retained
    capacity: usize,
    /// Retained observations, oldest first
    values: VecDeque<f64>,
    /// Index of the newest observation
    last_index: Option<u64>,
}

impl SlidingWindow {
    /// Create a new window holding at most `capacity` observations.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "window size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
            last_index: None,
        })
    }

    /// Push an observation at `index`.
    ///
    /// Indices must strictly increase across calls.
    pub fn push(&mut self, index: u64, value: f64) -> Result<()> {
        if let Some(last) = self.last_index {
            if index <= last {
                return Err(PipelineError::InvalidSeries(format!(
                    "index {index} does not follow {last}"
                )));
            }
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.last_index = Some(index);
        Ok(())
    }

    /// Push a value at the next index after the newest one (or 0).
    pub fn push_next(&mut self, value: f64) {
        let index = self.last_index.map_or(0, |i| i.saturating_add(1));
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.last_index = Some(index);
    }

    /// Whether `capacity` observations have been seen.
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last_index(&self) -> Option<u64> {
        self.last_index
    }

    /// Snapshot of the retained values, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Summary statistics of the current contents, or `None` until full.
    pub fn features(&self) -> Option<FeatureWindow> {
        let index = self.last_index?;
        if !self.is_full() {
            return None;
        }
        let (front, back) = self.values.as_slices();
        if back.is_empty() {
            Some(FeatureWindow::compute(index, front))
        } else {
            Some(FeatureWindow::compute(index, &self.values()))
        }
    }

    /// Drop all retained values and forget the last index.
    pub fn clear(&mut self) {
        self.values.clear();
        self.last_index = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_creation() {
        let window = SlidingWindow::new(3).unwrap();
        assert!(window.is_empty());
        assert!(!window.is_full());
        assert_eq!(window.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            SlidingWindow::new(0),
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = SlidingWindow::new(3).unwrap();
        for (i, v) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            window.push(i as u64, v).unwrap();
        }

        assert!(window.is_full());
        assert_eq!(window.values(), vec![2.0, 3.0, 4.0]);
        assert_eq!(window.last_index(), Some(3));
    }

    #[test]
    fn test_window_rejects_stale_index() {
        let mut window = SlidingWindow::new(2).unwrap();
        window.push(5, 1.0).unwrap();
        assert!(window.push(5, 2.0).is_err());
        assert!(window.push(4, 2.0).is_err());
    }

    #[test]
    fn test_features_absent_until_full() {
        let mut window = SlidingWindow::new(2).unwrap();
        window.push(0, 1.0).unwrap();
        assert!(window.features().is_none());

        window.push(1, 3.0).unwrap();
        let features = window.features().unwrap();
        assert_eq!(features.index, 1);
        assert_eq!(features.mean, 2.0);
        assert_eq!(features.min, 1.0);
        assert_eq!(features.max, 3.0);
    }

    #[test]
    fn test_clear_resets_index() {
        let mut window = SlidingWindow::new(2).unwrap();
        window.push(10, 1.0).unwrap();
        window.clear();
        assert!(window.push(0, 1.0).is_ok());
    }
}
