//! In-memory audit counters.
//!
//! Counters are relaxed atomics so a shared log can be read from another
//! thread while a pipeline is writing to it. Nothing is persisted across
//! restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Processing statistics for the current session.
#[derive(Debug)]
pub struct AuditLog {
    /// Number of raw readings processed
    observations: AtomicU64,
    /// Number of feature windows scored
    windows_scored: AtomicU64,
    /// Number of windows with an active alert
    alerts_raised: AtomicU64,
    /// Number of per-channel drift comparisons
    drift_checks: AtomicU64,
    /// Number of drift comparisons over threshold
    drift_detections: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            observations: AtomicU64::new(0),
            windows_scored: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            drift_checks: AtomicU64::new(0),
            drift_detections: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_observations(&self, count: u64) {
        self.observations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_windows_scored(&self, count: u64) {
        self.windows_scored.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_alerts(&self, count: u64) {
        self.alerts_raised.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one drift comparison and whether it exceeded the threshold.
    pub fn record_drift_check(&self, exceeded: bool) {
        self.drift_checks.fetch_add(1, Ordering::Relaxed);
        if exceeded {
            self.drift_detections.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get the current statistics.
    pub fn stats(&self) -> AuditStats {
        AuditStats {
            observations: self.observations.load(Ordering::Relaxed),
            windows_scored: self.windows_scored.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            drift_checks: self.drift_checks.load(Ordering::Relaxed),
            drift_detections: self.drift_detections.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Observations processed: {}\n\
             - Windows scored: {}\n\
             - Alert windows: {}\n\
             - Drift checks: {} ({} over threshold)\n\
             - Session duration: {} seconds",
            stats.observations,
            stats.windows_scored,
            stats.alerts_raised,
            stats.drift_checks,
            stats.drift_detections,
            stats.session_duration_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.observations.store(0, Ordering::Relaxed);
        self.windows_scored.store(0, Ordering::Relaxed);
        self.alerts_raised.store(0, Ordering::Relaxed);
        self.drift_checks.store(0, Ordering::Relaxed);
        self.drift_detections.store(0, Ordering::Relaxed);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of audit statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub observations: u64,
    pub windows_scored: u64,
    pub alerts_raised: u64,
    pub drift_checks: u64,
    pub drift_detections: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared audit log.
pub type SharedAuditLog = Arc<AuditLog>;

/// Create a new shared audit log.
pub fn create_shared_log() -> SharedAuditLog {
    Arc::new(AuditLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_log_counting() {
        let log = AuditLog::new();

        log.record_observations(25);
        log.record_windows_scored(6);
        log.record_alerts(2);
        log.record_drift_check(false);
        log.record_drift_check(true);

        let stats = log.stats();
        assert_eq!(stats.observations, 25);
        assert_eq!(stats.windows_scored, 6);
        assert_eq!(stats.alerts_raised, 2);
        assert_eq!(stats.drift_checks, 2);
        assert_eq!(stats.drift_detections, 1);
    }

    #[test]
    fn test_audit_log_reset() {
        let log = AuditLog::new();

        log.record_observations(100);
        log.record_drift_check(true);
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.observations, 0);
        assert_eq!(stats.drift_checks, 0);
        assert_eq!(stats.drift_detections, 0);
    }

    #[test]
    fn test_shared_log_across_threads() {
        let log = create_shared_log();
        let writer = Arc::clone(&log);
        std::thread::spawn(move || writer.record_windows_scored(3))
            .join()
            .unwrap();
        assert_eq!(log.stats().windows_scored, 3);
    }

    #[test]
    fn test_summary_format() {
        let log = AuditLog::new();
        let summary = log.summary();

        assert!(summary.contains("Observations processed"));
        assert!(summary.contains("Windows scored"));
        assert!(summary.contains("Drift checks"));
    }
}
