//! CLI command definitions and argument parsing helpers

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::JobRequest;

/// bd - priority batch scheduler
#[derive(Parser, Debug)]
#[command(
    name = "bd",
    about = "Priority batch scheduler with capacity and interval limits",
    version,
    after_help = "Logs are written to: ~/.local/share/batchd/logs/batchd.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit jobs and run the dispatcher until every accepted job is DONE
    Run {
        /// Job as IDS:PRIORITY, e.g. "1,2,3:high" (repeatable)
        #[arg(short, long = "job", value_name = "IDS:PRIORITY")]
        jobs: Vec<String>,

        /// YAML file with a `jobs` list of {ids, priority}
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Status polling interval in milliseconds
        #[arg(long, default_value = "100")]
        poll_ms: u64,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

/// Output format for reports
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Parse `IDS:PRIORITY` into a raw request
///
/// Tokens that are not integers are kept as strings so that validation
/// reports them with their position.
pub fn parse_job_arg(arg: &str) -> Result<JobRequest, String> {
    let (ids, priority) = arg
        .rsplit_once(':')
        .ok_or_else(|| format!("Invalid job '{}': expected IDS:PRIORITY, e.g. 1,2,3:high", arg))?;

    let ids = ids
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<i64>() {
            Ok(n) => serde_json::Value::from(n),
            Err(_) => serde_json::Value::String(token.to_string()),
        })
        .collect();

    Ok(JobRequest {
        ids,
        priority: serde_json::Value::String(priority.trim().to_string()),
    })
}

/// Jobs file layout
#[derive(Debug, Deserialize)]
struct JobsFile {
    #[serde(default)]
    jobs: Vec<JobRequest>,
}

/// Read job requests from a YAML file
pub fn load_jobs_file(path: &Path) -> Result<Vec<JobRequest>> {
    let content = std::fs::read_to_string(path).context(format!("Failed to read jobs file {}", path.display()))?;
    let file: JobsFile = serde_yaml::from_str(&content).context("Failed to parse jobs file")?;
    Ok(file.jobs)
}

/// Where the log file lives
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("batchd")
        .join("logs")
        .join("batchd.log")
}
