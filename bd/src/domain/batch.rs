//! Batches formed by the dispatcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::id::{BatchId, JobId};
use super::job::Identifier;

/// Lifecycle of a batch: Pending -> InFlight -> Completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    InFlight,
    Completed,
}

impl BatchStatus {
    /// Whether `next` is the single legal step forward from `self`
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Pending, BatchStatus::InFlight) | (BatchStatus::InFlight, BatchStatus::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::InFlight => write!(f, "IN_FLIGHT"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// One identifier in a batch together with the job it was drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMember {
    pub job_id: JobId,
    pub identifier: Identifier,
}

/// A capacity-bounded group of identifiers dispatched together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    /// Formation order, starting at 1
    pub sequence: u64,
    pub members: Vec<BatchMember>,
    pub status: BatchStatus,
    pub formed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Identifiers whose processing failed
    pub failures: usize,
}

impl Batch {
    /// Create a pending batch
    pub fn new(sequence: u64, members: Vec<BatchMember>) -> Self {
        Self {
            id: BatchId::from_sequence(sequence),
            sequence,
            members,
            status: BatchStatus::Pending,
            formed_at: Utc::now(),
            completed_at: None,
            failures: 0,
        }
    }

    /// All identifiers in this batch, in selection order
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.members.iter().map(|m| m.identifier).collect()
    }

    /// Identifiers this batch took from `job_id`
    pub fn identifiers_for(&self, job_id: &JobId) -> Vec<Identifier> {
        self.members
            .iter()
            .filter(|m| &m.job_id == job_id)
            .map(|m| m.identifier)
            .collect()
    }

    /// Every job that contributed at least one identifier, first-seen order
    pub fn job_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = Vec::new();
        for member in &self.members {
            if !ids.contains(&member.job_id) {
                ids.push(member.job_id.clone());
            }
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Move the batch one step forward; refuses and logs anything else
    pub fn advance(&mut self, next: BatchStatus) -> bool {
        if !self.status.can_transition_to(next) {
            warn!(batch_id = %self.id, from = %self.status, to = %next, "Refusing batch status transition");
            return false;
        }
        self.status = next;
        if next == BatchStatus::Completed {
            self.completed_at = Some(Utc::now());
        }
        true
    }
}
