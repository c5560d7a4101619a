//! Identifier processor boundary
//!
//! The scheduler hands each dispatched identifier to an
//! [`IdentifierProcessor`]. Latency and failure behavior are the
//! processor's business; the dispatcher only waits for every call in a
//! batch to return.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod error;
mod simulated;

pub use error::ProcessorError;
pub use simulated::{EchoProcessor, SimulatedProcessor};

use crate::config::ProcessorConfig;
use crate::domain::Identifier;

/// Result of processing one identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub identifier: Identifier,
    pub payload: serde_json::Value,
}

/// Downstream handler for single identifiers
#[async_trait]
pub trait IdentifierProcessor: Send + Sync {
    /// Process one identifier
    async fn process(&self, identifier: Identifier) -> Result<ProcessOutput, ProcessorError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Create a processor based on the kind specified in config
pub fn create_processor(config: &ProcessorConfig) -> Result<Arc<dyn IdentifierProcessor>, ProcessorError> {
    debug!(kind = %config.kind, "create_processor: called");
    match config.kind.as_str() {
        "simulated" => {
            debug!("create_processor: creating simulated processor");
            Ok(Arc::new(SimulatedProcessor::from_config(config)))
        }
        "echo" => {
            debug!("create_processor: creating echo processor");
            Ok(Arc::new(EchoProcessor))
        }
        other => {
            debug!(kind = %other, "create_processor: unknown kind");
            Err(ProcessorError::UnknownKind(other.to_string()))
        }
    }
}
