//! Domain types for the batch scheduler
//!
//! - [`Job`] / [`JobRequest`]: submissions, typed and raw
//! - [`Batch`]: identifiers dispatched together
//! - [`JobRecord`] / [`JobStatus`]: per-job tracking and its derived status

mod batch;
mod error;
mod id;
mod job;
mod priority;
mod record;

pub use batch::{Batch, BatchMember, BatchStatus};
pub use error::ValidationError;
pub use id::{BatchId, JobId};
pub use job::{Identifier, Job, JobRequest, MAX_IDENTIFIER, validate_identifiers};
pub use priority::Priority;
pub use record::{BatchReport, JobBatch, JobRecord, JobStatus, JobStatusReport};
