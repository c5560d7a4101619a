//! Built-in processors: a simulated remote call and an immediate echo

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use tracing::debug;

use super::{IdentifierProcessor, ProcessOutput, ProcessorError};
use crate::config::ProcessorConfig;
use crate::domain::Identifier;

/// Stands in for a remote service: random latency, occasional failure
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    min_latency_ms: u64,
    max_latency_ms: u64,
    failure_rate: f64,
}

impl SimulatedProcessor {
    pub fn new(min_latency_ms: u64, max_latency_ms: u64, failure_rate: f64) -> Self {
        Self {
            min_latency_ms: min_latency_ms.min(max_latency_ms),
            max_latency_ms: max_latency_ms.max(min_latency_ms),
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::new(config.min_latency_ms, config.max_latency_ms, config.failure_rate)
    }

    /// Draw latency and outcome for one call
    fn roll(&self) -> (Duration, bool) {
        let mut rng = rand::rng();
        let latency = rng.random_range(self.min_latency_ms..=self.max_latency_ms);
        let fails = rng.random_bool(self.failure_rate);
        (Duration::from_millis(latency), fails)
    }
}

#[async_trait]
impl IdentifierProcessor for SimulatedProcessor {
    async fn process(&self, identifier: Identifier) -> Result<ProcessOutput, ProcessorError> {
        let (latency, fails) = self.roll();
        debug!(identifier, ?latency, fails, "SimulatedProcessor::process: called");
        tokio::time::sleep(latency).await;

        if fails {
            return Err(ProcessorError::Failed {
                identifier,
                reason: "simulated failure".to_string(),
            });
        }

        Ok(ProcessOutput {
            identifier,
            payload: json!({
                "identifier": identifier,
                "latencyMs": latency.as_millis() as u64,
                "processedAt": Utc::now().to_rfc3339(),
            }),
        })
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Resolves immediately, echoing the identifier back
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoProcessor;

#[async_trait]
impl IdentifierProcessor for EchoProcessor {
    async fn process(&self, identifier: Identifier) -> Result<ProcessOutput, ProcessorError> {
        Ok(ProcessOutput {
            identifier,
            payload: json!({ "identifier": identifier }),
        })
    }

    fn name(&self) -> &str {
        "echo"
    }
}
