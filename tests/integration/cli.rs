//! Smoke tests for the `algoviz` host binary

use super::common::backend::FakeBackend;
use super::common::fixtures::{json_trace_file, two_step_trace};
use algoviz::ChatAction;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn algoviz(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("algoviz").expect("binary exists");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

/// Test that building a recorded trace prints its steps
#[test]
fn test_build_prints_chunks() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let trace = json_trace_file("trace.json", &two_step_trace());
    let path = dir.path().join(&trace.name);
    fs::write(&path, &trace.content).unwrap();

    algoviz(&dir)
        .arg("build")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 chunk(s)"))
        .stdout(predicate::str::contains("line 10"));
}

/// Test that an unsupported extension fails with the user-facing message
#[test]
fn test_build_unsupported_language_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("main.xyz");
    fs::write(&path, "???").unwrap();

    algoviz(&dir)
        .arg("build")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Language Not Supported"));
}

/// Test that the first run writes the example config and the log file
#[test]
fn test_first_run_creates_config_and_log() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("notes.md");
    fs::write(&path, "# Notes").unwrap();

    algoviz(&dir)
        .arg("build")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 chunk(s)"));

    let config = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(config.contains("[tracer]"));
    assert!(dir.path().join("logs").join("algoviz.log").exists());
}

/// Test that play walks every step at the fastest speed
#[test]
fn test_play_reaches_last_step() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let trace = json_trace_file("trace.json", &two_step_trace());
    let path = dir.path().join(&trace.name);
    fs::write(&path, &trace.content).unwrap();

    algoviz(&dir)
        .args(["play", "--speed", "4"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("step 1/2"))
        .stdout(predicate::str::contains("step 2/2"));
}

/// Test that a missing source file is a clean error
#[test]
fn test_missing_file_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    algoviz(&dir)
        .arg("build")
        .arg(dir.path().join("nope.js"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

/// Test that chat output never lands outside `--out`, whatever names the server sends
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_out_rejects_escaping_file_names() {
    let backend = FakeBackend::start().await.with_sync(vec![
        ChatAction::FileCreate {
            file_name: "../escaped.md".into(),
            select: false,
        },
        ChatAction::FileAppend {
            file_name: "../escaped.md".into(),
            appends: "pwned".into(),
        },
        ChatAction::FileCreate {
            file_name: "kept.md".into(),
            select: false,
        },
        ChatAction::FileAppend {
            file_name: "kept.md".into(),
            appends: "fine".into(),
        },
        ChatAction::ChatGenEnd,
    ]);

    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        dir.path().join("config.toml"),
        format!(
            "[chat]\nbase_url = \"{}\"\ninitial_delay_ms = 10\npoll_interval_ms = 10\n",
            backend.base_url
        ),
    )
    .unwrap();
    let source = dir.path().join("notes.md");
    fs::write(&source, "# Notes").unwrap();
    let out = dir.path().join("out");

    algoviz(&dir)
        .arg("chat")
        .arg(&source)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("skipped ../escaped.md"))
        .stdout(predicate::str::contains("kept.md"))
        .stdout(predicate::str::contains("escaped.md").not());

    assert!(!dir.path().join("escaped.md").exists());
    assert_eq!(fs::read_to_string(out.join("kept.md")).unwrap(), "fine");
    assert_eq!(fs::read_to_string(out.join("notes.md")).unwrap(), "# Notes");
}
