//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in seconds between job queue polls when idle.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Lease duration in seconds granted to a claimed job.
    #[serde(default = "default_lease")]
    pub lease_seconds: u64,
    /// Default maximum execution attempts per job.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Retry backoff schedule in seconds; attempts past the end of the
    /// schedule use the last entry.
    #[serde(default = "default_backoff")]
    pub backoff_seconds: Vec<u64>,
    /// Days to retain completed/failed jobs before cleanup.
    #[serde(default = "default_retention")]
    pub completed_retention_days: i64,
}

impl WorkerConfig {
    /// Backoff delay in seconds before the given retry (0-based).
    pub fn backoff_for_attempt(&self, attempt: i32) -> u64 {
        if self.backoff_seconds.is_empty() {
            return default_backoff()[0];
        }
        let idx = (attempt.max(0) as usize).min(self.backoff_seconds.len() - 1);
        self.backoff_seconds[idx]
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: default_poll_interval(),
            lease_seconds: default_lease(),
            max_attempts: default_max_attempts(),
            backoff_seconds: default_backoff(),
            completed_retention_days: default_retention(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5
}

fn default_lease() -> u64 {
    300
}

fn default_max_attempts() -> i32 {
    3
}

fn default_backoff() -> Vec<u64> {
    vec![30, 120, 600]
}

fn default_retention() -> i64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule_is_clamped() {
        let config = WorkerConfig::default();
        assert_eq!(config.backoff_for_attempt(0), 30);
        assert_eq!(config.backoff_for_attempt(1), 120);
        assert_eq!(config.backoff_for_attempt(2), 600);
        assert_eq!(config.backoff_for_attempt(9), 600);
    }
}
