//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory
//! with "now" pinned, so results do not depend on the wall clock.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, now: &str, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_dayboard"))
        .args(args)
        .env("DAYBOARD_DATA_DIR", data_dir)
        .env("DAYBOARD_NOW", now)
        .env("DAYBOARD_DISABLE_NOTIFICATIONS", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

fn run_ok(data_dir: &Path, now: &str, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, now, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

/// JSON printed after an optional leading status line.
fn json_body(stdout: &str) -> serde_json::Value {
    let start = stdout.find(|c: char| c == '{' || c == '[').expect("no JSON in output");
    serde_json::from_str(&stdout[start..]).expect("Failed to parse JSON output")
}

const MORNING: &str = "2024-03-01T09:00:00";
const AFTERNOON: &str = "2024-03-01T14:45:00";
const NIGHT: &str = "2024-03-01T23:00:00";

fn add_task(dir: &Path, args: &[&str]) -> String {
    let mut full = vec!["task", "add"];
    full.extend_from_slice(args);
    let stdout = run_ok(dir, MORNING, &full);
    assert!(stdout.starts_with("Task created: "));
    json_body(&stdout)["id"].as_str().unwrap().to_string()
}

#[test]
fn test_task_add_and_list() {
    let dir = TempDir::new().unwrap();
    add_task(dir.path(), &["Write report", "--due", "14:30", "--priority", "high"]);
    add_task(dir.path(), &["Tomorrow", "--date", "2024-03-02"]);

    let today = json_body(&run_ok(dir.path(), MORNING, &["task", "list"]));
    let today = today.as_array().unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0]["name"], "Write report");
    assert_eq!(today[0]["due_time"], "14:30");
    assert_eq!(today[0]["priority"], "High");
    assert_eq!(today[0]["completed"], false);

    let all = json_body(&run_ok(dir.path(), MORNING, &["task", "list", "--all"]));
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[test]
fn test_toggle_updates_score() {
    let dir = TempDir::new().unwrap();
    let id = add_task(dir.path(), &["Write report", "--due", "14:30"]);

    let task = json_body(&run_ok(dir.path(), AFTERNOON, &["task", "toggle", &id]));
    assert_eq!(task["completed"], true);
    assert_eq!(task["missed"], false);
    assert_eq!(task["completed_at"], "2024-03-01T14:45:00");

    let score = json_body(&run_ok(dir.path(), AFTERNOON, &["score", "show"]));
    assert_eq!(score["total_score"], 760);
    assert_eq!(score["label"], "Good");

    let history = json_body(&run_ok(dir.path(), AFTERNOON, &["score", "history"]));
    assert_eq!(history[0]["reason"], "Task completed");
    assert_eq!(history[0]["task_id"], id.as_str());
}

#[test]
fn test_sweep_marks_pending_tasks_missed() {
    let dir = TempDir::new().unwrap();
    let a = add_task(dir.path(), &["a"]);
    add_task(dir.path(), &["b"]);
    run_ok(dir.path(), AFTERNOON, &["task", "toggle", &a]);

    let outcome = json_body(&run_ok(dir.path(), NIGHT, &["sweep"]));
    assert_eq!(outcome["outcome"], "swept");
    assert_eq!(outcome["missed"].as_array().unwrap().len(), 1);

    let score = json_body(&run_ok(dir.path(), NIGHT, &["score", "show"]));
    assert_eq!(score["total_score"], 755);

    // Nothing left to sweep.
    let again = json_body(&run_ok(dir.path(), NIGHT, &["sweep"]));
    assert!(again["missed"].as_array().unwrap().is_empty());
}

#[test]
fn test_sweep_before_threshold_is_too_early() {
    let dir = TempDir::new().unwrap();
    add_task(dir.path(), &["a"]);
    let outcome = json_body(&run_ok(dir.path(), AFTERNOON, &["sweep"]));
    assert_eq!(outcome["outcome"], "too_early");
}

#[test]
fn test_watch_once_runs_end_of_day() {
    let dir = TempDir::new().unwrap();
    let id = add_task(dir.path(), &["a"]);
    let stdout = run_ok(dir.path(), NIGHT, &["watch", "--once"]);
    assert!(stdout.contains("1 task(s) marked as missed"));

    let all = json_body(&run_ok(dir.path(), NIGHT, &["task", "list"]));
    assert_eq!(all[0]["id"], id.as_str());
    assert_eq!(all[0]["missed"], true);
}

#[test]
fn test_complete_all() {
    let dir = TempDir::new().unwrap();
    add_task(dir.path(), &["a"]);
    add_task(dir.path(), &["b"]);
    let stdout = run_ok(dir.path(), AFTERNOON, &["task", "complete-all"]);
    assert_eq!(stdout.trim(), "Completed all 2 tasks for the day");
    let stdout = run_ok(dir.path(), AFTERNOON, &["task", "complete-all"]);
    assert!(stdout.starts_with("No unfinished tasks"));

    let stats = json_body(&run_ok(dir.path(), AFTERNOON, &["stats"]));
    assert_eq!(stats["today"]["completed_today"], 2);
    assert_eq!(stats["today"]["streak"], 1);
    assert_eq!(stats["motivation"], "Perfect day! All tasks completed!");
}

#[test]
fn test_goals_plan_creates_tasks() {
    let dir = TempDir::new().unwrap();
    let stdout = run_ok(
        dir.path(),
        MORNING,
        &[
            "goals", "plan", "--week-of", "2024-03-04",
            "--goal", "2024-03-04=Draft slides",
            "--goal", "2024-03-06=Ship release",
        ],
    );
    let saved = json_body(&stdout);
    assert_eq!(saved["goals"]["week_start"], "2024-03-04");
    assert_eq!(saved["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(saved["tasks"][0]["priority"], "Medium");

    let listed = json_body(&run_ok(dir.path(), MORNING, &["goals", "list"]));
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    assert_eq!(
        run_ok(dir.path(), MORNING, &["config", "get", "end_of_day.threshold_hour"]).trim(),
        "22"
    );
    run_ok(dir.path(), MORNING, &["config", "set", "end_of_day.threshold_hour", "20"]);
    assert_eq!(
        run_ok(dir.path(), MORNING, &["config", "get", "end_of_day.threshold_hour"]).trim(),
        "20"
    );
    let path = run_ok(dir.path(), MORNING, &["config", "path"]);
    assert!(path.trim().ends_with("config.toml"));

    let (_, stderr, code) = run_cli(dir.path(), MORNING, &["config", "set", "nope.key", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error: "));
}

#[test]
fn test_initial_score_from_config() {
    let dir = TempDir::new().unwrap();
    let score = json_body(&run_ok(dir.path(), MORNING, &["score", "show"]));
    assert_eq!(score["total_score"], 750);

    let fresh = TempDir::new().unwrap();
    run_ok(fresh.path(), MORNING, &["config", "set", "score.initial", "0"]);
    let score = json_body(&run_ok(fresh.path(), MORNING, &["score", "show"]));
    assert_eq!(score["total_score"], 0);
}

#[test]
fn test_unknown_task_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), MORNING, &["task", "toggle", "missing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("task not found: missing"));
}

#[test]
fn test_invalid_due_time_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(dir.path(), MORNING, &["task", "add", "x", "--due", "25:00"]);
    assert_ne!(code, 0);
    let (_, stderr, code) = run_cli(dir.path(), MORNING, &["task", "add", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Task name must not be empty"));
}
