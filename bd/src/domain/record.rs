//! Per-job tracking records and the reports built from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::batch::BatchStatus;
use super::id::{BatchId, JobId};
use super::job::{Identifier, Job};
use super::priority::Priority;

/// Aggregate status of a job, derived from its batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl JobStatus {
    /// Derive a job status from the statuses of its batches
    ///
    /// DONE needs at least one batch, every batch COMPLETED and nothing
    /// left undispatched. Any batch in flight or already completed short
    /// of that means IN_PROGRESS. Otherwise NOT_STARTED.
    pub fn derive<I>(statuses: I, fully_dispatched: bool) -> JobStatus
    where
        I: IntoIterator<Item = BatchStatus>,
    {
        let mut seen = false;
        let mut all_completed = true;
        let mut started = false;

        for status in statuses {
            seen = true;
            match status {
                BatchStatus::Completed => started = true,
                BatchStatus::InFlight => {
                    started = true;
                    all_completed = false;
                }
                BatchStatus::Pending => all_completed = false,
            }
        }

        if !seen {
            JobStatus::NotStarted
        } else if all_completed && fully_dispatched {
            JobStatus::Done
        } else if started {
            JobStatus::InProgress
        } else {
            JobStatus::NotStarted
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT_STARTED"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Done => write!(f, "DONE"),
        }
    }
}

/// A job's share of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBatch {
    pub batch_id: BatchId,
    pub sequence: u64,
    pub identifiers: Vec<Identifier>,
}

/// Tracking record kept for every accepted job, never deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub priority: Priority,
    pub submitted_at: DateTime<Utc>,
    pub total_identifiers: usize,
    pub dispatched: usize,
    pub status: JobStatus,
    pub batches: Vec<JobBatch>,
}

impl JobRecord {
    /// Fresh record for a just-submitted job
    pub fn new(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            priority: job.priority,
            submitted_at: job.submitted_at,
            total_identifiers: job.identifiers.len(),
            dispatched: 0,
            status: JobStatus::NotStarted,
            batches: Vec::new(),
        }
    }

    pub fn fully_dispatched(&self) -> bool {
        self.dispatched >= self.total_identifiers
    }

    pub fn has_batch(&self, batch_id: &BatchId) -> bool {
        self.batches.iter().any(|b| &b.batch_id == batch_id)
    }
}

/// One batch as shown in a status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub identifiers: Vec<Identifier>,
    pub status: BatchStatus,
    pub formed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Answer to a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub priority: Priority,
    pub submitted_at: DateTime<Utc>,
    pub batches: Vec<BatchReport>,
}
