//! Exit code and output integration tests
//!
//! These tests drive the compiled `workplan` binary against scenario files
//! written to a temporary directory.
//!
//! ## Exit Code Contract
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Feasible verdict, or a successful `check`/`horizon` |
//! | 1 | Any other verdict |
//! | 2 | Unreadable or invalid input |

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const FEASIBLE: &str = r#"{
    "activities": [
        {"activity_id": "A1", "name": "Boundary patrol", "frequency": 2, "duration": 1.0,
         "resource_requirements": {"Ranger": 1}}
    ],
    "resources": {"Ranger": 1},
    "horizon": {"working_days": 2}
}"#;

const INFEASIBLE: &str = r#"{
    "activities": [
        {"activity_id": "A1", "name": "Aerial survey", "frequency": 1, "duration": 0.5,
         "resource_requirements": {"Pilot": 2}}
    ],
    "resources": {"Pilot": 1},
    "horizon": {"working_days": 1}
}"#;

fn workplan_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_workplan"))
}

fn scenario(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, json).unwrap();
    path
}

fn run(args: &[&str], file: Option<&Path>) -> Output {
    let mut cmd = Command::new(workplan_binary());
    cmd.args(args);
    if let Some(file) = file {
        cmd.arg(file);
    }
    cmd.env_remove("RUST_LOG")
        .env_remove("WORKPLAN_POLICY")
        .output()
        .expect("failed to execute workplan")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// analyze
// =============================================================================

#[test]
fn exit_0_feasible() {
    let dir = TempDir::new().unwrap();
    let file = scenario(&dir, "feasible.json", FEASIBLE);

    let output = run(&["analyze"], Some(&file));
    assert_eq!(output.status.code(), Some(0));

    let text = stdout(&output);
    assert!(text.starts_with("Verdict: FEASIBLE"), "unexpected report:\n{}", text);
    assert!(text.contains("Ranger"));
    assert!(text.contains("Placed 2 occurrences"));
}

#[test]
fn exit_1_infeasible_with_diagnostics() {
    let dir = TempDir::new().unwrap();
    let file = scenario(&dir, "infeasible.json", INFEASIBLE);

    let output = run(&["analyze"], Some(&file));
    assert_eq!(output.status.code(), Some(1));

    let text = stdout(&output);
    assert!(text.contains("Verdict: INFEASIBLE"));
    assert!(text.contains("Primary reason: Impossible Activity Requirements"));
    assert!(text.contains("Recommendations:"));
}

#[test]
fn json_format_has_identical_exit_code() {
    let dir = TempDir::new().unwrap();
    let file = scenario(&dir, "infeasible.json", INFEASIBLE);

    let output = run(&["analyze", "--format", "json"], Some(&file));
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["feasible"], false);
    assert_eq!(value["solver_stats"]["status"], "INFEASIBLE");
    assert_eq!(
        value["infeasibility_diagnostics"]["primary_reason"],
        "ImpossibleActivityRequirements"
    );
}

#[test]
fn output_file_receives_the_report() {
    let dir = TempDir::new().unwrap();
    let file = scenario(&dir, "feasible.json", FEASIBLE);
    let report = dir.path().join("report.json");

    let output = run(
        &["analyze", "--format", "json", "-o", report.to_str().unwrap()],
        Some(&file),
    );
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(value["solver_stats"]["status"], "OPTIMAL");
    assert_eq!(value["schedule"].as_array().unwrap().len(), 2);
    assert_eq!(value["utilization"]["Ranger"], 100.0);
}

#[test]
fn policy_file_is_applied() {
    let dir = TempDir::new().unwrap();
    let file = scenario(&dir, "feasible.json", FEASIBLE);
    let policy = dir.path().join("policy.toml");
    std::fs::write(&policy, "max_recommendations = 3\n").unwrap();

    let output = run(&["analyze", "--policy", policy.to_str().unwrap()], Some(&file));
    assert_eq!(output.status.code(), Some(0));
}

// =============================================================================
// Input Errors
// =============================================================================

#[test]
fn exit_2_missing_file() {
    let dir = TempDir::new().unwrap();
    let output = run(&["analyze"], Some(&dir.path().join("absent.json")));

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read scenario"));
}

#[test]
fn exit_2_malformed_scenario() {
    let dir = TempDir::new().unwrap();
    let file = scenario(&dir, "broken.json", r#"{"activities": []}"#);

    assert_eq!(run(&["analyze"], Some(&file)).status.code(), Some(2));
    assert_eq!(run(&["check"], Some(&file)).status.code(), Some(2));
}

#[test]
fn exit_2_invalid_duration() {
    let dir = TempDir::new().unwrap();
    let file = scenario(
        &dir,
        "duration.json",
        r#"{
            "activities": [{"activity_id": "A1", "name": "x", "frequency": 1, "duration": 0.3}],
            "resources": {},
            "horizon": {"working_days": 1}
        }"#,
    );

    let output = run(&["check"], Some(&file));
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid duration"));
}

#[test]
fn exit_2_invalid_policy() {
    let dir = TempDir::new().unwrap();
    let file = scenario(&dir, "feasible.json", FEASIBLE);
    let policy = dir.path().join("policy.toml");
    std::fs::write(&policy, "high_utilization = 90.0\n").unwrap();

    let output = run(&["analyze", "--policy", policy.to_str().unwrap()], Some(&file));
    assert_eq!(output.status.code(), Some(2));
}

// =============================================================================
// check / horizon
// =============================================================================

#[test]
fn check_prints_summary_without_solving() {
    let dir = TempDir::new().unwrap();
    let file = scenario(&dir, "feasible.json", FEASIBLE);

    let output = run(&["check"], Some(&file));
    assert_eq!(output.status.code(), Some(0));

    let text = stdout(&output);
    assert!(text.contains("Activities:  1"));
    assert!(text.contains("Occurrences: 2"));
    assert!(!text.contains("Verdict"));
}

#[test]
fn horizon_counts_quarter_slots() {
    let output = run(&["horizon", "2025-Q3"], None);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("Working days: 64"));
    assert!(text.contains("Slots:        256"));

    let output = run(&["horizon", "2025-Q3", "--holiday", "2025-01-01"], None);
    assert!(stdout(&output).contains("Working days: 63"));
}

#[test]
fn horizon_rejects_bad_quarter() {
    let output = run(&["horizon", "2025-Q9"], None);
    assert_eq!(output.status.code(), Some(2));
}
