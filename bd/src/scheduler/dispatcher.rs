//! Batch dispatcher: paced batch formation and completion handling
//!
//! Each cycle forms at most one batch from the head of the queue, bounded
//! by the free capacity, and hands its identifiers to the processor on a
//! separate task. Cycles start no closer together than the configured
//! interval, measured start to start, however long processing takes.

use std::sync::Arc;
use std::time::Duration;

use eyre::eyre;
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{Batch, BatchId, BatchMember, Identifier, JobId};
use crate::processor::IdentifierProcessor;

use super::core::Scheduler;

/// Start-to-start pacing between dispatch cycles
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last_start: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: None,
        }
    }

    /// How long to wait before the next cycle may start:
    /// `max(0, interval - elapsed since last start)`
    pub fn delay(&self, now: Instant) -> Duration {
        match self.last_start {
            Some(start) => self.interval.saturating_sub(now.saturating_duration_since(start)),
            None => Duration::ZERO,
        }
    }

    /// Record that a cycle started at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_start = Some(now);
    }

    pub fn last_start(&self) -> Option<Instant> {
        self.last_start
    }
}

/// A batch just formed by [`Scheduler::form_batch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormedBatch {
    pub batch_id: BatchId,
    pub identifiers: Vec<Identifier>,
    pub job_ids: Vec<JobId>,
}

/// A formed batch plus the task processing it
#[derive(Debug)]
pub struct Dispatched {
    pub batch: FormedBatch,
    pub completion: JoinHandle<()>,
}

/// Handle to a running dispatch loop
///
/// Dropping the handle also ends the loop.
#[derive(Debug)]
pub struct DispatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Stop forming batches and wait for the loop to exit
    ///
    /// Batches already in flight keep running on their own tasks.
    pub async fn shutdown(self) -> eyre::Result<()> {
        debug!("DispatcherHandle::shutdown: called");
        // a closed channel means the loop is already gone
        let _ = self.shutdown_tx.send(()).await;
        self.join.await.map_err(|e| eyre!("Dispatcher task failed: {}", e))
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Scheduler {
    /// Spawn the dispatch loop
    pub fn start(self: &Arc<Self>) -> DispatcherHandle {
        debug!("Scheduler::start: called");
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let scheduler = Arc::clone(self);
        let join = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        DispatcherHandle { shutdown_tx, join }
    }

    /// Run dispatch cycles until shutdown is requested
    pub async fn run(self: Arc<Self>, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            capacity = self.config.capacity,
            interval_ms = self.config.interval_ms,
            processor = self.processor.name(),
            "Dispatcher started"
        );
        let mut pacer = Pacer::new(self.config.interval());

        loop {
            let wait = pacer.delay(Instant::now());
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            pacer.mark(Instant::now());
            self.tick().await;
        }

        info!("Dispatcher stopped");
    }

    /// One dispatch cycle: form a batch and start processing it
    ///
    /// Returns as soon as the batch is formed; completion is handled on
    /// the spawned task.
    pub async fn tick(self: &Arc<Self>) -> Option<Dispatched> {
        let batch = self.form_batch().await?;

        let scheduler = Arc::clone(self);
        let processor = Arc::clone(&self.processor);
        let batch_id = batch.batch_id.clone();
        let identifiers = batch.identifiers.clone();
        let completion = tokio::spawn(async move {
            let failures = process_batch(processor, &batch_id, &identifiers).await;
            scheduler.complete_batch(&batch_id, failures).await;
        });

        Some(Dispatched { batch, completion })
    }

    /// Carve the next batch out of the queue and mark it in flight
    ///
    /// Takes up to `capacity - in_flight` identifiers in queue order.
    /// Returns `None` when nothing is eligible.
    pub async fn form_batch(&self) -> Option<FormedBatch> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let slots = self.config.capacity.saturating_sub(inner.in_flight.len());
        let selection = inner.queue.next_eligible(slots, &inner.in_flight);
        if selection.is_empty() {
            inner.stats.empty_cycles += 1;
            debug!(slots, queued = inner.queue.len(), "Scheduler::form_batch: nothing eligible");
            return None;
        }

        inner.queue.mark_dispatched(&selection);
        inner.next_batch_seq += 1;

        let members = selection
            .iter()
            .map(|s| BatchMember {
                job_id: s.job_id.clone(),
                identifier: s.identifier,
            })
            .collect();
        let batch = Batch::new(inner.next_batch_seq, members);
        let batch_id = batch.id.clone();
        let identifiers = batch.identifiers();

        inner.in_flight.extend(identifiers.iter().copied());
        let job_ids = inner.tracker.record_batch(batch);
        inner.tracker.mark_in_flight(&batch_id);

        for job_id in inner.queue.reap() {
            debug!(%job_id, "Scheduler::form_batch: job fully dispatched, reaped");
        }

        inner.stats.batches_formed += 1;
        inner.stats.identifiers_dispatched += identifiers.len() as u64;
        inner.stats.peak_in_flight = inner.stats.peak_in_flight.max(inner.in_flight.len());

        info!(
            %batch_id,
            ?identifiers,
            jobs = job_ids.len(),
            in_flight = inner.in_flight.len(),
            "Batch formed"
        );

        Some(FormedBatch {
            batch_id,
            identifiers,
            job_ids,
        })
    }

    /// Mark a batch COMPLETED, free its identifiers and update its jobs
    pub async fn complete_batch(&self, batch_id: &BatchId, failures: usize) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let Some(identifiers) = inner.tracker.complete_batch(batch_id, failures) else {
            warn!(%batch_id, "Completion for a batch that is not in flight");
            return;
        };

        for identifier in &identifiers {
            inner.in_flight.remove(identifier);
        }

        let failed = failures.min(identifiers.len());
        inner.stats.batches_completed += 1;
        inner.stats.identifiers_failed += failed as u64;
        inner.stats.identifiers_succeeded += (identifiers.len() - failed) as u64;

        info!(%batch_id, size = identifiers.len(), failures = failed, in_flight = inner.in_flight.len(), "Batch completed");
    }
}

/// Run every identifier through the processor concurrently
///
/// Each call runs on its own task, so a processor that panics counts as
/// a failure instead of taking the batch down with it. Failures are
/// logged and counted, never retried.
async fn process_batch(processor: Arc<dyn IdentifierProcessor>, batch_id: &BatchId, identifiers: &[Identifier]) -> usize {
    debug!(%batch_id, count = identifiers.len(), "process_batch: called");
    let calls: Vec<_> = identifiers
        .iter()
        .map(|identifier| {
            let processor = Arc::clone(&processor);
            let identifier = *identifier;
            tokio::spawn(async move { processor.process(identifier).await })
        })
        .collect();

    let mut failures = 0;
    for (identifier, result) in identifiers.iter().zip(join_all(calls).await) {
        match result {
            Ok(Ok(output)) => debug!(%batch_id, identifier = output.identifier, "process_batch: identifier done"),
            Ok(Err(err)) => {
                warn!(%batch_id, error = %err, "Identifier processing failed");
                failures += 1;
            }
            Err(err) => {
                warn!(%batch_id, identifier = *identifier, error = %err, "Identifier processing task died");
                failures += 1;
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchStatus, JobStatus, Priority};
    use crate::processor::{EchoProcessor, ProcessOutput, ProcessorError};
    use crate::scheduler::SchedulerConfig;
    use async_trait::async_trait;

    fn scheduler(capacity: usize) -> Arc<Scheduler> {
        Arc::new(Scheduler::new(
            SchedulerConfig {
                capacity,
                interval_ms: 20,
            },
            Arc::new(EchoProcessor),
        ))
    }

    struct FailOdd;

    #[async_trait]
    impl IdentifierProcessor for FailOdd {
        async fn process(&self, identifier: Identifier) -> Result<ProcessOutput, ProcessorError> {
            if identifier % 2 == 1 {
                return Err(ProcessorError::Failed {
                    identifier,
                    reason: "odd".to_string(),
                });
            }
            Ok(ProcessOutput {
                identifier,
                payload: serde_json::Value::Null,
            })
        }

        fn name(&self) -> &str {
            "fail-odd"
        }
    }

    /// Panics on one identifier instead of returning an error
    struct PanicOn(Identifier);

    #[async_trait]
    impl IdentifierProcessor for PanicOn {
        async fn process(&self, identifier: Identifier) -> Result<ProcessOutput, ProcessorError> {
            if identifier == self.0 {
                panic!("processor blew up on {}", identifier);
            }
            Ok(ProcessOutput {
                identifier,
                payload: serde_json::Value::Null,
            })
        }

        fn name(&self) -> &str {
            "panic-on"
        }
    }

    #[test]
    fn test_pacer_first_cycle_is_immediate() {
        let pacer = Pacer::new(Duration::from_secs(5));
        assert_eq!(pacer.delay(Instant::now()), Duration::ZERO);
        assert!(pacer.last_start().is_none());
    }

    #[test]
    fn test_pacer_waits_remainder_of_interval() {
        let mut pacer = Pacer::new(Duration::from_secs(5));
        let start = Instant::now();
        pacer.mark(start);

        assert_eq!(pacer.delay(start), Duration::from_secs(5));
        assert_eq!(pacer.delay(start + Duration::from_secs(2)), Duration::from_secs(3));
        assert_eq!(pacer.delay(start + Duration::from_secs(5)), Duration::ZERO);
        // a slow cycle shrinks the wait to zero, never below
        assert_eq!(pacer.delay(start + Duration::from_secs(9)), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_form_batch_respects_capacity() {
        let scheduler = scheduler(3);
        let id = scheduler.submit(vec![1, 2, 3, 4, 5], Priority::Medium).await.unwrap();

        let first = scheduler.form_batch().await.unwrap();
        assert_eq!(first.identifiers, vec![1, 2, 3]);
        assert_eq!(first.job_ids, vec![id.clone()]);

        // capacity is full until the first batch completes
        assert!(scheduler.form_batch().await.is_none());
        assert_eq!(scheduler.stats().await.empty_cycles, 1);

        let report = scheduler.query_status(id.as_str()).await.unwrap();
        assert_eq!(report.status, JobStatus::InProgress);
        assert_eq!(report.batches[0].status, BatchStatus::InFlight);
    }

    #[tokio::test]
    async fn test_partial_capacity_release() {
        let scheduler = scheduler(3);
        scheduler.submit(vec![1, 2], Priority::High).await.unwrap();
        let first = scheduler.form_batch().await.unwrap();
        assert_eq!(first.identifiers.len(), 2);

        scheduler.submit(vec![10, 11, 12], Priority::High).await.unwrap();
        let second = scheduler.form_batch().await.unwrap();
        assert_eq!(second.identifiers, vec![10]);

        let state = scheduler.queue_state().await;
        assert_eq!(state.in_flight, 3);
        assert_eq!(state.free_slots(), 0);
    }

    #[tokio::test]
    async fn test_complete_batch_releases_capacity() {
        let scheduler = scheduler(3);
        let id = scheduler.submit(vec![1, 2, 3, 4, 5], Priority::Medium).await.unwrap();

        let first = scheduler.form_batch().await.unwrap();
        scheduler.complete_batch(&first.batch_id, 0).await;
        assert_eq!(
            scheduler.query_status(id.as_str()).await.unwrap().status,
            JobStatus::InProgress
        );

        let second = scheduler.form_batch().await.unwrap();
        assert_eq!(second.identifiers, vec![4, 5]);
        scheduler.complete_batch(&second.batch_id, 0).await;

        let report = scheduler.query_status(id.as_str()).await.unwrap();
        assert_eq!(report.status, JobStatus::Done);
        assert_eq!(report.batches.len(), 2);
        assert!(report.batches.iter().all(|b| b.status == BatchStatus::Completed));

        let state = scheduler.queue_state().await;
        assert!(state.is_idle());
        assert_eq!(state.stats.batches_completed, 2);
        assert_eq!(state.stats.identifiers_succeeded, 5);
    }

    #[tokio::test]
    async fn test_duplicate_completion_is_ignored() {
        let scheduler = scheduler(3);
        scheduler.submit(vec![1], Priority::Medium).await.unwrap();
        let batch = scheduler.form_batch().await.unwrap();

        scheduler.complete_batch(&batch.batch_id, 0).await;
        scheduler.complete_batch(&batch.batch_id, 0).await;
        assert_eq!(scheduler.stats().await.batches_completed, 1);
    }

    #[tokio::test]
    async fn test_tick_processes_and_completes() {
        let scheduler = scheduler(3);
        let id = scheduler.submit(vec![7, 8], Priority::Low).await.unwrap();

        let dispatched = scheduler.tick().await.unwrap();
        dispatched.completion.await.unwrap();

        let report = scheduler.query_status(id.as_str()).await.unwrap();
        assert_eq!(report.status, JobStatus::Done);
        assert!(scheduler.tick().await.is_none());
    }

    #[tokio::test]
    async fn test_failures_still_complete_the_batch() {
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig {
                capacity: 4,
                interval_ms: 20,
            },
            Arc::new(FailOdd),
        ));
        let id = scheduler.submit(vec![1, 2, 3, 4], Priority::High).await.unwrap();

        scheduler.tick().await.unwrap().completion.await.unwrap();

        let report = scheduler.query_status(id.as_str()).await.unwrap();
        assert_eq!(report.status, JobStatus::Done);
        let stats = scheduler.stats().await;
        assert_eq!(stats.identifiers_failed, 2);
        assert_eq!(stats.identifiers_succeeded, 2);
    }

    #[tokio::test]
    async fn test_job_leaves_queue_when_last_batch_forms() {
        let scheduler = scheduler(3);
        scheduler.submit(vec![1, 2], Priority::Medium).await.unwrap();

        let batch = scheduler.form_batch().await.unwrap();
        let state = scheduler.queue_state().await;
        assert_eq!(state.queued_jobs, 0);
        assert_eq!(state.in_flight, 2);

        scheduler.complete_batch(&batch.batch_id, 0).await;
        let state = scheduler.queue_state().await;
        assert!(state.is_idle());
        assert_eq!(state.tracked_jobs, 1);
    }

    #[tokio::test]
    async fn test_panicking_processor_still_frees_capacity() {
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig {
                capacity: 3,
                interval_ms: 20,
            },
            Arc::new(PanicOn(7)),
        ));
        let first = scheduler.submit(vec![7, 8, 9], Priority::High).await.unwrap();
        let second = scheduler.submit(vec![1, 2], Priority::Low).await.unwrap();

        scheduler.tick().await.unwrap().completion.await.unwrap();

        let state = scheduler.queue_state().await;
        assert_eq!(state.in_flight, 0);
        assert_eq!(state.open_batches, 0);
        assert_eq!(state.stats.identifiers_failed, 1);
        assert_eq!(state.stats.identifiers_succeeded, 2);
        assert_eq!(
            scheduler.query_status(first.as_str()).await.unwrap().status,
            JobStatus::Done
        );

        let next = scheduler.tick().await.unwrap();
        assert_eq!(next.batch.identifiers, vec![1, 2]);
        next.completion.await.unwrap();
        assert_eq!(
            scheduler.query_status(second.as_str()).await.unwrap().status,
            JobStatus::Done
        );
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let scheduler = scheduler(3);
        let id = scheduler.submit(vec![1, 2, 3, 4], Priority::Medium).await.unwrap();
        let handle = scheduler.start();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let report = scheduler.query_status(id.as_str()).await.unwrap();
            if report.status == JobStatus::Done {
                break;
            }
            assert!(Instant::now() < deadline, "job did not finish");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        handle.shutdown().await.unwrap();
    }
}
