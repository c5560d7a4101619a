//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max identifiers in flight at once, shared by all batches
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Minimum spacing between dispatch cycles, start to start, in milliseconds
    #[serde(rename = "interval-ms", default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_capacity() -> usize {
    3
}

fn default_interval_ms() -> u64 {
    5_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Get the dispatch interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Reject settings the dispatcher cannot run with
    pub fn validate(&self) -> eyre::Result<()> {
        if self.capacity == 0 {
            return Err(eyre::eyre!("scheduler.capacity must be at least 1"));
        }
        if self.interval_ms == 0 {
            return Err(eyre::eyre!("scheduler.interval-ms must be at least 1"));
        }
        Ok(())
    }
}
