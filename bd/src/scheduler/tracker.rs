//! Status tracking: batches, per-job records and status reconciliation

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::{
    Batch, BatchId, BatchReport, BatchStatus, Identifier, Job, JobBatch, JobId, JobRecord, JobStatus, JobStatusReport,
};

use super::error::SchedulerError;

/// Owns every formed batch and one tracking record per accepted job
#[derive(Debug, Default)]
pub struct StatusTracker {
    records: HashMap<JobId, JobRecord>,
    batches: HashMap<BatchId, Batch>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a job as NOT_STARTED with no batches
    pub fn register(&mut self, job: &Job) {
        debug!(job_id = %job.id, "StatusTracker::register: called");
        self.records.insert(job.id.clone(), JobRecord::new(job));
    }

    /// Take ownership of a newly formed batch and attribute it to every
    /// job that contributed an identifier
    ///
    /// Returns the contributing job IDs.
    pub fn record_batch(&mut self, batch: Batch) -> Vec<JobId> {
        debug!(batch_id = %batch.id, size = batch.len(), "StatusTracker::record_batch: called");
        let job_ids = batch.job_ids();

        for job_id in &job_ids {
            let Some(record) = self.records.get_mut(job_id) else {
                warn!(%job_id, batch_id = %batch.id, "Batch references an untracked job");
                continue;
            };
            if record.has_batch(&batch.id) {
                debug!(%job_id, batch_id = %batch.id, "StatusTracker::record_batch: already attributed");
                continue;
            }
            let identifiers = batch.identifiers_for(job_id);
            record.dispatched += identifiers.len();
            record.batches.push(JobBatch {
                batch_id: batch.id.clone(),
                sequence: batch.sequence,
                identifiers,
            });
        }

        self.batches.insert(batch.id.clone(), batch);
        for job_id in &job_ids {
            self.recompute(job_id);
        }
        job_ids
    }

    /// Mark a batch as submitted to the processor
    pub fn mark_in_flight(&mut self, batch_id: &BatchId) -> bool {
        self.advance(batch_id, BatchStatus::InFlight).is_some()
    }

    /// Mark a batch COMPLETED and return the identifiers it held
    ///
    /// `failures` counts identifiers whose processing failed; they still
    /// count toward completion.
    pub fn complete_batch(&mut self, batch_id: &BatchId, failures: usize) -> Option<Vec<Identifier>> {
        debug!(%batch_id, failures, "StatusTracker::complete_batch: called");
        let identifiers = self.advance(batch_id, BatchStatus::Completed)?;
        if let Some(batch) = self.batches.get_mut(batch_id) {
            batch.failures = failures;
        }
        Some(identifiers)
    }

    fn advance(&mut self, batch_id: &BatchId, next: BatchStatus) -> Option<Vec<Identifier>> {
        let Some(batch) = self.batches.get_mut(batch_id) else {
            warn!(%batch_id, %next, "Status change for unknown batch");
            return None;
        };
        if !batch.advance(next) {
            return None;
        }
        let identifiers = batch.identifiers();
        let job_ids = batch.job_ids();
        for job_id in &job_ids {
            self.recompute(job_id);
        }
        Some(identifiers)
    }

    /// Re-derive a job's status from its batches and store it
    ///
    /// Pure with respect to batch state: calling it again without a batch
    /// change yields the same status.
    pub fn recompute(&mut self, job_id: &JobId) -> Option<JobStatus> {
        let record = self.records.get(job_id)?;
        let statuses = record
            .batches
            .iter()
            .filter_map(|b| self.batches.get(&b.batch_id).map(|batch| batch.status));
        let status = JobStatus::derive(statuses, record.fully_dispatched());

        let record = self.records.get_mut(job_id)?;
        if status < record.status {
            warn!(%job_id, from = %record.status, to = %status, "Job status moved backwards");
        }
        if status != record.status {
            debug!(%job_id, from = %record.status, to = %status, "StatusTracker::recompute: status changed");
        }
        record.status = status;
        Some(status)
    }

    /// Build the status report for a job, batches in formation order
    pub fn get(&self, job_id: &str) -> Result<JobStatusReport, SchedulerError> {
        let record = self
            .records
            .get(&JobId::from(job_id))
            .ok_or_else(|| SchedulerError::NotFound {
                job_id: job_id.to_string(),
            })?;

        let mut shares: Vec<&JobBatch> = record.batches.iter().collect();
        shares.sort_by_key(|share| share.sequence);

        let batches = shares
            .into_iter()
            .filter_map(|share| {
                let batch = self.batches.get(&share.batch_id)?;
                Some(BatchReport {
                    batch_id: share.batch_id.clone(),
                    identifiers: share.identifiers.clone(),
                    status: batch.status,
                    formed_at: batch.formed_at,
                    completed_at: batch.completed_at,
                })
            })
            .collect();

        Ok(JobStatusReport {
            job_id: record.job_id.clone(),
            status: record.status,
            priority: record.priority,
            submitted_at: record.submitted_at,
            batches,
        })
    }

    /// Current stored status of a job
    pub fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        self.records.get(job_id).map(|record| record.status)
    }

    pub fn batch(&self, batch_id: &BatchId) -> Option<&Batch> {
        self.batches.get(batch_id)
    }

    /// Number of batches not yet COMPLETED
    pub fn open_batches(&self) -> usize {
        self.batches.values().filter(|batch| !batch.status.is_terminal()).count()
    }

    /// Number of tracked jobs
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
