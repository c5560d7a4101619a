//! Scheduler error types

use thiserror::Error;

use crate::domain::{Priority, ValidationError};

/// Errors surfaced to callers of the submission and status interfaces
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job not found: {job_id}")]
    NotFound { job_id: String },

    #[error("Queue already holds job {job_id} at {priority}/{sequence}")]
    QueueConflict {
        job_id: String,
        priority: Priority,
        sequence: u64,
    },
}

impl SchedulerError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SchedulerError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchedulerError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SchedulerError::QueueConflict { .. })
    }
}
