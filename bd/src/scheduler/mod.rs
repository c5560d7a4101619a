//! Batch scheduler
//!
//! Priority-ordered job queue, paced and capacity-bounded batch dispatch,
//! and per-job status tracking in a single component.

mod config;
mod core;
mod dispatcher;
mod error;
mod queue;
mod stats;
mod tracker;

pub use config::SchedulerConfig;
pub use self::core::Scheduler;
pub use dispatcher::{Dispatched, DispatcherHandle, FormedBatch, Pacer};
pub use error::SchedulerError;
pub use queue::{JobQueue, QueueKey, Selection};
pub use stats::{QueueState, SchedulerStats};
pub use tracker::StatusTracker;
