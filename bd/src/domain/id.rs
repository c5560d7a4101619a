//! Job and batch identifiers
//!
//! Job IDs are UUID v7 strings. Batch IDs embed the formation sequence,
//! zero-padded, so lexical order of batch IDs is formation order:
//! `batch-000000000007`.

use serde::{Deserialize, Serialize};

/// Width of the zero-padded sequence inside a batch ID
const BATCH_SEQ_WIDTH: usize = 12;

/// Unique ID of a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh job ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Get the full ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique ID of a formed batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    /// Build the ID for the batch formed at `sequence`
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("batch-{:0width$}", sequence, width = BATCH_SEQ_WIDTH))
    }

    /// Get the full ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BatchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for BatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        let ids: std::collections::HashSet<_> = (0..1000).map(|_| JobId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_batch_id_format() {
        assert_eq!(BatchId::from_sequence(7).as_str(), "batch-000000000007");
    }

    #[test]
    fn test_batch_id_lexical_order_follows_sequence() {
        let mut ids: Vec<_> = [10, 2, 100, 9, 1].iter().map(|s| BatchId::from_sequence(*s)).collect();
        ids.sort();
        let strs: Vec<_> = ids.iter().map(|id| id.as_str().to_string()).collect();
        assert_eq!(
            strs,
            vec![
                "batch-000000000001",
                "batch-000000000002",
                "batch-000000000009",
                "batch-000000000010",
                "batch-000000000100",
            ]
        );
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&JobId::from("abc")).unwrap();
        assert_eq!(json, "\"abc\"");

        let id: BatchId = serde_json::from_str("\"batch-000000000003\"").unwrap();
        assert_eq!(id, BatchId::from_sequence(3));
    }
}
