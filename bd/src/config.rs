//! batchd configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;

/// Main batchd configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Batch capacity and dispatch interval
    pub scheduler: SchedulerConfig,

    /// Downstream identifier processor
    pub processor: ProcessorConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.processor.validate()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .batchd.yml
        let local_config = PathBuf::from(".batchd.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/batchd/batchd.yml
        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".batchd.yml")];
                paths.extend(Self::user_config_path());
                paths
            }
        };

        candidates
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| Self::load_from_file(path).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("batchd").join("batchd.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Identifier processor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Processor kind ("simulated" or "echo")
    pub kind: String,

    /// Lower bound of simulated latency in milliseconds
    #[serde(rename = "min-latency-ms")]
    pub min_latency_ms: u64,

    /// Upper bound of simulated latency in milliseconds
    #[serde(rename = "max-latency-ms")]
    pub max_latency_ms: u64,

    /// Probability in [0, 1] that a simulated call fails
    #[serde(rename = "failure-rate")]
    pub failure_rate: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            kind: "simulated".to_string(),
            min_latency_ms: 200,
            max_latency_ms: 2_000,
            failure_rate: 0.0,
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_latency_ms > self.max_latency_ms {
            return Err(eyre::eyre!(
                "processor.min-latency-ms ({}) exceeds processor.max-latency-ms ({})",
                self.min_latency_ms,
                self.max_latency_ms
            ));
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(eyre::eyre!(
                "processor.failure-rate must be between 0 and 1, got {}",
                self.failure_rate
            ));
        }
        Ok(())
    }
}
