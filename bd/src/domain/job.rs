//! Jobs and the raw submission shape

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::id::JobId;
use super::priority::Priority;

/// Opaque numeric identifier handed to the processor
pub type Identifier = u64;

/// Largest accepted identifier (10^9 + 7)
pub const MAX_IDENTIFIER: Identifier = 1_000_000_007;

/// Untyped submission as it arrives from a request layer
///
/// Elements stay as raw JSON values so that strings, floats and other
/// non-integers can be reported with their position instead of failing
/// deserialization as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub ids: Vec<serde_json::Value>,
    pub priority: serde_json::Value,
}

impl JobRequest {
    /// Build a request from already-typed parts
    pub fn new(ids: &[Identifier], priority: Priority) -> Self {
        Self {
            ids: ids.iter().map(|id| serde_json::Value::from(*id)).collect(),
            priority: serde_json::Value::String(priority.to_string()),
        }
    }

    /// Check shape and ranges, producing typed identifiers and priority
    pub fn validate(&self) -> Result<(Vec<Identifier>, Priority), ValidationError> {
        let priority = match &self.priority {
            serde_json::Value::String(s) => s
                .parse::<Priority>()
                .map_err(|_| ValidationError::UnknownPriority(s.clone()))?,
            other => return Err(ValidationError::UnknownPriority(other.to_string())),
        };

        let mut identifiers = Vec::with_capacity(self.ids.len());
        for (index, value) in self.ids.iter().enumerate() {
            identifiers.push(parse_identifier(index, value)?);
        }
        validate_identifiers(&identifiers)?;

        Ok((identifiers, priority))
    }
}

fn parse_identifier(index: usize, value: &serde_json::Value) -> Result<Identifier, ValidationError> {
    let serde_json::Value::Number(number) = value else {
        return Err(ValidationError::NonNumeric {
            index,
            value: value.to_string(),
        });
    };

    if let Some(id) = number.as_u64() {
        return Ok(id);
    }
    let out_of_range = || ValidationError::OutOfRange {
        index,
        value: number.to_string(),
        max: MAX_IDENTIFIER,
    };
    if number.is_i64() {
        // negative integers
        return Err(out_of_range());
    }

    // floats: whole numbers such as 3.0 are accepted, integers too large
    // for u64 arrive here as floats as well
    match number.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => {
            if (1.0..=MAX_IDENTIFIER as f64).contains(&f) {
                Ok(f as Identifier)
            } else {
                Err(out_of_range())
            }
        }
        _ => Err(ValidationError::NonNumeric {
            index,
            value: number.to_string(),
        }),
    }
}

/// Check that a typed identifier list is non-empty and in range
pub fn validate_identifiers(identifiers: &[Identifier]) -> Result<(), ValidationError> {
    if identifiers.is_empty() {
        return Err(ValidationError::EmptyIdentifiers);
    }
    if let Some((index, id)) = identifiers
        .iter()
        .enumerate()
        .find(|(_, id)| !(1..=MAX_IDENTIFIER).contains(*id))
    {
        return Err(ValidationError::OutOfRange {
            index,
            value: id.to_string(),
            max: MAX_IDENTIFIER,
        });
    }
    Ok(())
}

/// An accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub identifiers: Vec<Identifier>,
    pub priority: Priority,
    pub submitted_at: DateTime<Utc>,
    /// Monotonic submission counter, the tie-breaker within a priority
    pub sequence: u64,
}

impl Job {
    /// Create a job, validating its identifiers
    pub fn new(identifiers: Vec<Identifier>, priority: Priority, sequence: u64) -> Result<Self, ValidationError> {
        validate_identifiers(&identifiers)?;
        Ok(Self {
            id: JobId::generate(),
            identifiers,
            priority,
            submitted_at: Utc::now(),
            sequence,
        })
    }
}
