//! Priority-ordered queue of jobs with undispatched identifiers

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::domain::{Identifier, Job, JobId, Priority, validate_identifiers};

use super::error::SchedulerError;

/// Position of a job in scan order: priority first, then submission sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct QueueKey {
    pub priority: Priority,
    pub sequence: u64,
}

impl QueueKey {
    pub fn of(job: &Job) -> Self {
        Self {
            priority: job.priority,
            sequence: job.sequence,
        }
    }
}

/// An identifier still waiting, with its index in the original submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingIdentifier {
    index: usize,
    identifier: Identifier,
}

#[derive(Debug, Clone)]
struct QueuedJob {
    job_id: JobId,
    /// Kept in original index order
    pending: Vec<PendingIdentifier>,
}

/// One identifier picked by [`JobQueue::next_eligible`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub job_id: JobId,
    pub key: QueueKey,
    pub index: usize,
    pub identifier: Identifier,
}

/// Jobs waiting for dispatch, scanned in `(priority, sequence, index)` order
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: BTreeMap<QueueKey, QueuedJob>,
    keys: HashMap<JobId, QueueKey>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job behind every job that sorts before it
    ///
    /// A job whose id or `(priority, sequence)` position is already queued
    /// is refused; the queue is left unchanged.
    pub fn enqueue(&mut self, job: &Job) -> Result<(), SchedulerError> {
        validate_identifiers(&job.identifiers)?;

        let key = QueueKey::of(job);
        let conflict = || SchedulerError::QueueConflict {
            job_id: job.id.to_string(),
            priority: key.priority,
            sequence: key.sequence,
        };
        if self.keys.contains_key(&job.id) {
            warn!(job_id = %job.id, "Job is already queued");
            return Err(conflict());
        }

        let Entry::Vacant(slot) = self.jobs.entry(key) else {
            warn!(job_id = %job.id, priority = %key.priority, sequence = key.sequence, "Queue position already taken");
            return Err(conflict());
        };

        let pending = job
            .identifiers
            .iter()
            .enumerate()
            .map(|(index, identifier)| PendingIdentifier {
                index,
                identifier: *identifier,
            })
            .collect();

        slot.insert(QueuedJob {
            job_id: job.id.clone(),
            pending,
        });
        self.keys.insert(job.id.clone(), key);
        Ok(())
    }

    /// Pick up to `slots` identifiers in scan order
    ///
    /// Identifiers in `in_flight`, or already picked in this call, are
    /// skipped and keep their place for a later cycle. Nothing is removed
    /// until [`JobQueue::mark_dispatched`].
    pub fn next_eligible(&self, slots: usize, in_flight: &HashSet<Identifier>) -> Vec<Selection> {
        let mut selection = Vec::new();
        if slots == 0 {
            return selection;
        }

        let mut picked: HashSet<Identifier> = HashSet::new();
        'scan: for (key, job) in &self.jobs {
            for pending in &job.pending {
                if in_flight.contains(&pending.identifier) || picked.contains(&pending.identifier) {
                    continue;
                }
                picked.insert(pending.identifier);
                selection.push(Selection {
                    job_id: job.job_id.clone(),
                    key: *key,
                    index: pending.index,
                    identifier: pending.identifier,
                });
                if selection.len() == slots {
                    break 'scan;
                }
            }
        }

        selection
    }

    /// Remove selected identifiers from their jobs' pending lists
    pub fn mark_dispatched(&mut self, selection: &[Selection]) {
        for selected in selection {
            if let Some(job) = self.jobs.get_mut(&selected.key) {
                job.pending.retain(|p| p.index != selected.index);
            }
        }
    }

    /// Drop every job with nothing left to dispatch
    pub fn reap(&mut self) -> Vec<JobId> {
        let drained: Vec<QueueKey> = self
            .jobs
            .iter()
            .filter(|(_, job)| job.pending.is_empty())
            .map(|(key, _)| *key)
            .collect();

        let mut reaped = Vec::with_capacity(drained.len());
        for key in drained {
            if let Some(job) = self.jobs.remove(&key) {
                self.keys.remove(&job.job_id);
                reaped.push(job.job_id);
            }
        }
        reaped
    }

    /// Number of queued jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.keys.contains_key(job_id)
    }

    /// Undispatched identifiers left for one job
    pub fn remaining(&self, job_id: &JobId) -> Option<usize> {
        let key = self.keys.get(job_id)?;
        self.jobs.get(key).map(|job| job.pending.len())
    }

    /// Undispatched identifiers across the whole queue
    pub fn pending_identifiers(&self) -> usize {
        self.jobs.values().map(|job| job.pending.len()).sum()
    }
}
