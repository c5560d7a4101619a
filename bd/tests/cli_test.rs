//! End-to-end tests for the bd binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `bd` command isolated from the user's config and log directories
fn bd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bd").expect("bd binary should build");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env_remove("RUST_LOG");
    cmd
}

fn fast_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("fast.yml");
    fs::write(
        &path,
        "scheduler:\n  capacity: 3\n  interval-ms: 20\nprocessor:\n  kind: echo\n",
    )
    .expect("Failed to write config");
    path
}

#[test]
fn test_rejects_non_numeric_identifiers() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    bd(temp_dir.path())
        .args(["run", "--job", "a,b:high"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Rejected"))
        .stderr(predicate::str::contains("No jobs were accepted"));
}

#[test]
fn test_run_splits_job_into_batches() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = fast_config(temp_dir.path());

    bd(temp_dir.path())
        .arg("--config")
        .arg(&config)
        .args(["run", "--job", "1,2,3,4,5:medium", "--poll-ms", "5", "--timeout-secs", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accepted job #1"))
        .stdout(predicate::str::contains("DONE"))
        .stdout(predicate::str::contains("batch-000000000001"))
        .stdout(predicate::str::contains("batch-000000000002"));
}

#[test]
fn test_run_keeps_going_after_a_rejected_job() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = fast_config(temp_dir.path());

    bd(temp_dir.path())
        .arg("--config")
        .arg(&config)
        .args(["run", "--job", "0:low", "--job", "7:high", "--poll-ms", "5", "--timeout-secs", "10"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Rejected job #1"))
        .stdout(predicate::str::contains("Accepted job #2"));
}

#[test]
fn test_run_json_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = fast_config(temp_dir.path());
    let jobs = temp_dir.path().join("jobs.yml");
    fs::write(
        &jobs,
        "jobs:\n  - ids: [1, 2]\n    priority: LOW\n  - ids: [3, 4]\n    priority: HIGH\n",
    )
    .expect("Failed to write jobs file");

    let output = bd(temp_dir.path())
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--file")
        .arg(&jobs)
        .args(["--format", "json", "--poll-ms", "5", "--timeout-secs", "10"])
        .output()
        .expect("Failed to run bd");
    assert!(output.status.success(), "bd failed: {}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let jobs = value["jobs"].as_array().expect("jobs array");
    assert_eq!(jobs.len(), 2);
    for job in jobs {
        assert_eq!(job["status"], "DONE");
    }
    // the HIGH job leads the first batch even though it was submitted second
    assert_eq!(jobs[1]["batches"][0]["batchId"], "batch-000000000001");
    assert_eq!(jobs[1]["batches"][0]["identifiers"], serde_json::json!([3, 4]));
    assert_eq!(value["health"]["inFlight"], 0);
}

#[test]
fn test_config_prints_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    bd(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity: 3"))
        .stdout(predicate::str::contains("interval-ms: 5000"));
}

#[test]
fn test_config_reads_local_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join(".batchd.yml"), "scheduler:\n  capacity: 7\n").expect("Failed to write config");

    bd(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity: 7"));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join(".batchd.yml"), "scheduler:\n  capacity: 0\n").expect("Failed to write config");

    bd(temp_dir.path())
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
