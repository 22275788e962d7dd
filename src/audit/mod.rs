//! Audit module for the Sentinel Sensor Agent.
//!
//! Tracks what the pipeline has processed and decided, so an operator can
//! see at a glance how much data went through and how often it alerted.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, AuditLog, AuditStats, SharedAuditLog};
