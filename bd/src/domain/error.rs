//! Submission validation errors

use thiserror::Error;

/// Reasons a submission is rejected before it reaches the queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Identifier list is empty")]
    EmptyIdentifiers,

    #[error("Identifier at index {index} is not an integer: {value}")]
    NonNumeric { index: usize, value: String },

    #[error("Identifier at index {index} is out of range (1..={max}): {value}")]
    OutOfRange { index: usize, value: String, max: u64 },

    #[error("Unrecognized priority: {0} (expected HIGH, MEDIUM or LOW)")]
    UnknownPriority(String),
}

impl ValidationError {
    /// Index of the offending identifier, if the error is about one
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::NonNumeric { index, .. } | ValidationError::OutOfRange { index, .. } => Some(*index),
            ValidationError::EmptyIdentifiers | ValidationError::UnknownPriority(_) => None,
        }
    }
}
