//! CLI contract tests for `robustsim`.
//!
//! Contract guarantees tested:
//! - `run` writes a well-formed report to stdout or `--output`
//! - `--timestamp` makes reports byte-reproducible
//! - Overrides and config files shape the evaluated grid
//! - Invalid configuration fails with a non-zero exit and a fix hint
//! - Logs never mix into stdout

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

const PINNED: &str = "2024-01-01T00:00:00Z";

/// Command isolated from any user or working-directory config.
#[allow(deprecated)]
fn robustsim_cmd(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("robustsim").expect("robustsim binary should be built");
    cmd.current_dir(cwd.path());
    cmd.env_remove("ROBUSTSIM_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd.env("XDG_CONFIG_HOME", cwd.path().join("xdg"));
    cmd
}

fn small_run_args() -> Vec<&'static str> {
    vec![
        "run",
        "--dimensions",
        "8,16",
        "--base-vectors",
        "6",
        "--candidates",
        "3",
        "--timestamp",
        PINNED,
    ]
}

fn run_json(cwd: &TempDir, extra: &[&str]) -> serde_json::Value {
    let output = robustsim_cmd(cwd)
        .args(small_run_args())
        .args(extra)
        .output()
        .expect("run robustsim");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is a JSON report")
}

// =============================================================================
// run
// =============================================================================

#[test]
fn run_writes_report_to_stdout() {
    let dir = TempDir::new().unwrap();
    let report = run_json(&dir, &[]);

    assert_eq!(report["meta"]["seed"], 1337);
    assert_eq!(report["meta"]["dimensions"], serde_json::json!([8, 16]));
    assert_eq!(report["meta"]["baseVectorCount"], 6);
    assert_eq!(report["meta"]["generatedAt"], "2024-01-01T00:00:00.000Z");

    let functions = report["functions"].as_array().unwrap();
    assert_eq!(functions.len(), 2);
    assert_eq!(functions[0]["name"], "exact_match");
    assert_eq!(functions[1]["name"], "sign_agreement");
    // 2 dimensions x 15 default noise cells.
    assert_eq!(functions[0]["results"].as_array().unwrap().len(), 30);
    assert!(functions[0]["errors"].as_array().unwrap().is_empty());
}

#[test]
fn pinned_runs_are_byte_identical() {
    let dir = TempDir::new().unwrap();
    let first = robustsim_cmd(&dir).args(small_run_args()).output().unwrap();
    let second = robustsim_cmd(&dir).args(small_run_args()).output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn seed_override_changes_results() {
    let dir = TempDir::new().unwrap();
    let a = run_json(&dir, &[]);
    let b = run_json(&dir, &["--seed", "7"]);
    assert_eq!(b["meta"]["seed"], 7);
    assert_ne!(a["functions"], b["functions"]);
}

#[test]
fn run_writes_report_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports").join("out.json");
    robustsim_cmd(&dir)
        .args(small_run_args())
        .args(["--compact", "--output"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.trim_end().lines().count(), 1, "compact output is one line");
    let report: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(report["functions"].as_array().unwrap().len(), 2);
}

#[test]
fn json_logs_stay_on_stderr() {
    let dir = TempDir::new().unwrap();
    let output = robustsim_cmd(&dir)
        .args(["--log-format", "json", "--log-level", "info"])
        .args(small_run_args())
        .output()
        .unwrap();
    assert!(output.status.success());
    let _: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Evaluation complete"), "stderr: {stderr}");
}

#[test]
fn unknown_extra_model_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("robustsim.toml"),
        r#"
[harness]
dimensions = [8]
base_vector_count = 4

[harness.noise]
gaussian_sigmas = [0.1]
uniform_amplitudes = []
sparse_fractions = []
signflip_fractions = []
extra = [{ model = "pink", level = 0.3 }]
"#,
    )
    .unwrap();

    let output = robustsim_cmd(&dir)
        .args(["run", "--timestamp", PINNED])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let errors = report["functions"][0]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["noiseModel"], "pink");
    assert_eq!(errors[0]["message"], "Unknown noise model: pink");
    assert_eq!(report["meta"]["noiseModels"]["extra"][0]["model"], "pink");
}

#[test]
fn log_file_receives_a_copy_of_the_logs() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("logs").join("robustsim.log");
    let output = robustsim_cmd(&dir)
        .args(["--log-level", "debug", "--log-file"])
        .arg(&log_path)
        .args(["grid", "--dimensions", "8"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let logged = std::fs::read_to_string(&log_path).unwrap();
    assert!(logged.contains("Grid listed"), "log file: {logged}");
    assert!(!logged.contains("\u{1b}["), "file copy must be uncolored");
}

#[test]
fn log_file_from_config_is_used() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("robustsim.toml"),
        "[general]\nlog_level = \"info\"\nlog_format = \"json\"\nlog_file = \"run.log\"\n",
    )
    .unwrap();
    let output = robustsim_cmd(&dir)
        .args(small_run_args())
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let logged = std::fs::read_to_string(dir.path().join("run.log")).unwrap();
    let last = logged.lines().last().unwrap();
    let event: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(event["message"], "Report written to stdout");
}

// =============================================================================
// grid / config
// =============================================================================

#[test]
fn grid_lists_cells_in_order() {
    let dir = TempDir::new().unwrap();
    let assert = robustsim_cmd(&dir)
        .args(["grid", "--dimensions", "8"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2 * 15);
    assert!(lines[0].starts_with("exact_match\t"));
    assert!(lines[0].ends_with("\t8\tgaussian\t0.01"));
    assert!(lines[14].ends_with("\tsignflip\t0.05"));
}

#[test]
fn grid_json_is_an_array() {
    let dir = TempDir::new().unwrap();
    let output = robustsim_cmd(&dir)
        .args(["grid", "--json", "--dimensions", "8,16"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let cells: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cells.as_array().unwrap().len(), 2 * 2 * 15);
    assert_eq!(cells[0]["noiseModel"], "gaussian");
}

#[test]
fn config_prints_effective_toml() {
    let dir = TempDir::new().unwrap();
    robustsim_cmd(&dir)
        .args(["config", "--seed", "99"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seed = 99"))
        .stdout(predicate::str::contains("[harness.noise]"));
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn missing_config_file_fails_with_hint() {
    let dir = TempDir::new().unwrap();
    robustsim_cmd(&dir)
        .args(["--config", "does-not-exist.toml", "run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"))
        .stderr(predicate::str::contains("To fix:"));
}

#[test]
fn invalid_override_fails_validation() {
    let dir = TempDir::new().unwrap();
    robustsim_cmd(&dir)
        .args(["run", "--base-vectors", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_vector_count"));
}

#[test]
fn malformed_config_fails_to_parse() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[harness\nseed = 1\n").unwrap();
    robustsim_cmd(&dir)
        .arg("--config")
        .arg(&path)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn bad_timestamp_is_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    robustsim_cmd(&dir)
        .args(["run", "--timestamp", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid RFC 3339 timestamp"));
}
