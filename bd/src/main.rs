//! bd - priority batch scheduler
//!
//! CLI entry point for submitting jobs and running the dispatcher.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use batchd::cli::{Cli, Command, OutputFormat, get_log_path, load_jobs_file, parse_job_arg};
use batchd::config::Config;
use batchd::domain::{BatchStatus, JobId, JobStatus, JobStatusReport};
use batchd::processor::create_processor;
use batchd::scheduler::{QueueState, Scheduler};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            jobs,
            file,
            poll_ms,
            timeout_secs,
            format,
        } => {
            debug!(jobs = jobs.len(), ?file, poll_ms, ?timeout_secs, %format, "main: matched Run command");
            cmd_run(&config, &jobs, file.as_deref(), poll_ms, timeout_secs, format).await
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Submit jobs, dispatch them and wait until every accepted job is DONE
async fn cmd_run(
    config: &Config,
    jobs: &[String],
    file: Option<&Path>,
    poll_ms: u64,
    timeout_secs: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    debug!(jobs = jobs.len(), ?file, "cmd_run: called");
    let mut requests = Vec::new();
    for arg in jobs {
        requests.push(parse_job_arg(arg).map_err(|e| eyre!(e))?);
    }
    if let Some(path) = file {
        requests.extend(load_jobs_file(path)?);
    }
    if requests.is_empty() {
        return Err(eyre!("No jobs given. Use --job IDS:PRIORITY or --file jobs.yml"));
    }

    let processor = create_processor(&config.processor)?;
    let scheduler = Arc::new(Scheduler::new(config.scheduler.clone(), processor));

    let mut accepted: Vec<JobId> = Vec::new();
    for (index, request) in requests.iter().enumerate() {
        match scheduler.submit_request(request).await {
            Ok(job_id) => {
                if format == OutputFormat::Text {
                    println!("Accepted job #{} as {}", index + 1, job_id);
                }
                accepted.push(job_id);
            }
            Err(err) => eprintln!("{} job #{}: {}", "Rejected".red(), index + 1, err),
        }
    }
    if accepted.is_empty() {
        return Err(eyre!("No jobs were accepted"));
    }

    let handle = scheduler.start();
    let deadline = timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut last_seen: HashMap<JobId, JobStatus> = HashMap::new();

    loop {
        let mut all_done = true;
        for job_id in &accepted {
            let report = scheduler.query_status(job_id.as_str()).await?;
            if last_seen.get(job_id) != Some(&report.status) {
                if format == OutputFormat::Text {
                    println!("{} {}", job_id, paint_job_status(report.status));
                }
                last_seen.insert(job_id.clone(), report.status);
            }
            all_done &= report.status == JobStatus::Done;
        }
        if all_done {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            handle.shutdown().await?;
            return Err(eyre!("Timed out waiting for {} job(s) to finish", accepted.len()));
        }
        tokio::time::sleep(Duration::from_millis(poll_ms)).await;
    }

    handle.shutdown().await?;

    let mut reports = Vec::with_capacity(accepted.len());
    for job_id in &accepted {
        reports.push(scheduler.query_status(job_id.as_str()).await?);
    }
    let state = scheduler.queue_state().await;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "jobs": reports, "health": state });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => print_reports(&reports, &state),
    }
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn print_reports(reports: &[JobStatusReport], state: &QueueState) {
    println!();
    for report in reports {
        println!(
            "Job {} [{}] {}",
            report.job_id.as_str().bold(),
            report.priority,
            paint_job_status(report.status)
        );
        for batch in &report.batches {
            println!(
                "  {}  {:?}  {}",
                batch.batch_id,
                batch.identifiers,
                paint_batch_status(batch.status)
            );
        }
    }

    let stats = &state.stats;
    println!();
    println!(
        "{} batches, {} identifiers ({} ok, {} failed), peak in flight {}/{}",
        stats.batches_formed,
        stats.identifiers_dispatched,
        stats.identifiers_succeeded,
        stats.identifiers_failed,
        stats.peak_in_flight,
        state.capacity
    );
}

fn paint_job_status(status: JobStatus) -> colored::ColoredString {
    match status {
        JobStatus::NotStarted => status.to_string().dimmed(),
        JobStatus::InProgress => status.to_string().yellow(),
        JobStatus::Done => status.to_string().green(),
    }
}

fn paint_batch_status(status: BatchStatus) -> colored::ColoredString {
    match status {
        BatchStatus::Pending => status.to_string().dimmed(),
        BatchStatus::InFlight => status.to_string().yellow(),
        BatchStatus::Completed => status.to_string().green(),
    }
}
