//! Scheduler implementation: submission, status queries and shared state

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{Identifier, Job, JobId, JobRequest, JobStatusReport, Priority, ValidationError};
use crate::processor::IdentifierProcessor;

use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::queue::JobQueue;
use super::stats::{QueueState, SchedulerStats};
use super::tracker::StatusTracker;

/// Internal state protected by mutex
///
/// The lock is only ever held for in-memory bookkeeping, never across a
/// processor call, so submissions and status reads do not wait on
/// downstream work.
pub(super) struct SchedulerInner {
    /// Jobs with undispatched identifiers
    pub(super) queue: JobQueue,

    /// Batches and per-job records
    pub(super) tracker: StatusTracker,

    /// Identifiers submitted to the processor and not yet completed
    pub(super) in_flight: HashSet<Identifier>,

    pub(super) next_job_seq: u64,
    pub(super) next_batch_seq: u64,

    pub(super) stats: SchedulerStats,
}

/// The Scheduler accepts jobs, forms capacity-bounded batches at a fixed
/// pace and tracks per-job status.
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    pub(super) inner: Mutex<SchedulerInner>,
    pub(super) processor: Arc<dyn IdentifierProcessor>,
}

impl Scheduler {
    /// Create a new scheduler with the given configuration and processor
    pub fn new(config: SchedulerConfig, processor: Arc<dyn IdentifierProcessor>) -> Self {
        debug!(?config, processor = processor.name(), "Scheduler::new: called");
        Self {
            config,
            inner: Mutex::new(SchedulerInner {
                queue: JobQueue::new(),
                tracker: StatusTracker::new(),
                in_flight: HashSet::new(),
                next_job_seq: 0,
                next_batch_seq: 0,
                stats: SchedulerStats::default(),
            }),
            processor,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Submit a typed job
    pub async fn submit(&self, identifiers: Vec<Identifier>, priority: Priority) -> Result<JobId, SchedulerError> {
        debug!(count = identifiers.len(), %priority, "Scheduler::submit: called");
        let mut inner = self.inner.lock().await;

        let job = match Job::new(identifiers, priority, inner.next_job_seq) {
            Ok(job) => job,
            Err(err) => {
                debug!(%err, "Scheduler::submit: rejected");
                inner.stats.jobs_rejected += 1;
                return Err(err.into());
            }
        };
        inner.next_job_seq += 1;

        inner.queue.enqueue(&job)?;
        inner.tracker.register(&job);
        inner.stats.jobs_submitted += 1;
        inner.stats.peak_queue_depth = inner.stats.peak_queue_depth.max(inner.queue.len());

        info!(job_id = %job.id, %priority, identifiers = job.identifiers.len(), "Job submitted");
        Ok(job.id)
    }

    /// Submit an untyped request, validating it first
    pub async fn submit_request(&self, request: &JobRequest) -> Result<JobId, SchedulerError> {
        debug!("Scheduler::submit_request: called");
        match request.validate() {
            Ok((identifiers, priority)) => self.submit(identifiers, priority).await,
            Err(err) => Err(self.reject(err).await),
        }
    }

    async fn reject(&self, err: ValidationError) -> SchedulerError {
        debug!(%err, "Scheduler::reject: called");
        self.inner.lock().await.stats.jobs_rejected += 1;
        err.into()
    }

    /// Current status of a job with its batches in formation order
    pub async fn query_status(&self, job_id: &str) -> Result<JobStatusReport, SchedulerError> {
        debug!(%job_id, "Scheduler::query_status: called");
        let inner = self.inner.lock().await;
        inner.tracker.get(job_id)
    }

    /// Health snapshot: queue depth, in-flight count and counters
    pub async fn queue_state(&self) -> QueueState {
        debug!("Scheduler::queue_state: called");
        let inner = self.inner.lock().await;

        QueueState {
            queued_jobs: inner.queue.len(),
            pending_identifiers: inner.queue.pending_identifiers(),
            in_flight: inner.in_flight.len(),
            open_batches: inner.tracker.open_batches(),
            tracked_jobs: inner.tracker.len(),
            capacity: self.config.capacity,
            stats: inner.stats.clone(),
        }
    }

    /// Get the scheduler statistics
    pub async fn stats(&self) -> SchedulerStats {
        debug!("Scheduler::stats: called");
        let inner = self.inner.lock().await;
        inner.stats.clone()
    }
}
