//! batchd - priority batch scheduler
//!
//! Clients submit jobs (a list of numeric identifiers plus a priority) and
//! poll for their status. A dispatcher forms batches from the head of a
//! priority-ordered queue, never holding more than a fixed number of
//! identifiers in flight and never starting cycles closer together than a
//! fixed interval.
//!
//! # Modules
//!
//! - [`domain`] - Jobs, batches, tracking records and reports
//! - [`scheduler`] - Job queue, dispatcher and status tracker
//! - [`processor`] - Downstream identifier processor boundary
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod processor;
pub mod scheduler;

// Re-export commonly used types
pub use config::{Config, ProcessorConfig};
pub use domain::{
    Batch, BatchId, BatchReport, BatchStatus, Identifier, Job, JobId, JobRequest, JobStatus, JobStatusReport,
    MAX_IDENTIFIER, Priority, ValidationError,
};
pub use processor::{
    EchoProcessor, IdentifierProcessor, ProcessOutput, ProcessorError, SimulatedProcessor, create_processor,
};
pub use scheduler::{DispatcherHandle, QueueState, Scheduler, SchedulerConfig, SchedulerError, SchedulerStats};
