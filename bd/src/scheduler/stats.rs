//! Counters and health snapshot for the scheduler

use serde::Serialize;

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub jobs_submitted: u64,
    pub jobs_rejected: u64,
    pub batches_formed: u64,
    pub batches_completed: u64,
    pub identifiers_dispatched: u64,
    pub identifiers_succeeded: u64,
    pub identifiers_failed: u64,
    /// Cycles that found nothing eligible
    pub empty_cycles: u64,
    pub peak_in_flight: usize,
    pub peak_queue_depth: usize,
}

/// Read-only health snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    /// Jobs that still have undispatched identifiers
    pub queued_jobs: usize,
    pub pending_identifiers: usize,
    pub in_flight: usize,
    pub open_batches: usize,
    pub tracked_jobs: usize,
    pub capacity: usize,
    pub stats: SchedulerStats,
}

impl QueueState {
    /// Slots free for the next batch
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.in_flight)
    }

    /// Nothing queued and nothing in flight
    pub fn is_idle(&self) -> bool {
        self.queued_jobs == 0 && self.in_flight == 0
    }
}
