//! Processor error types

use thiserror::Error;

use crate::domain::Identifier;

/// Errors from the downstream identifier processor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    #[error("Processing identifier {identifier} failed: {reason}")]
    Failed { identifier: Identifier, reason: String },

    #[error("Unknown processor kind: '{0}'. Supported: simulated, echo")]
    UnknownKind(String),
}

impl ProcessorError {
    /// The identifier this error is about, if any
    pub fn identifier(&self) -> Option<Identifier> {
        match self {
            ProcessorError::Failed { identifier, .. } => Some(*identifier),
            ProcessorError::UnknownKind(_) => None,
        }
    }
}
