//! Tests for the `countdown` binary.
//!
//! None of these need a running daemon: they cover argument parsing,
//! input rejected before connecting, and the connection error itself.

use assert_cmd::Command;
use predicates::prelude::*;

fn countdown() -> Command {
    Command::cargo_bin("countdown").unwrap()
}

#[test]
fn test_help_lists_commands() {
    countdown()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn test_completions_bash() {
    countdown()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("countdown"));
}

#[test]
fn test_start_rejects_text_minutes() {
    countdown()
        .args(["start", "-m", "abc", "-s", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("分には整数を入力してください"));
}

#[test]
fn test_start_rejects_zero_duration() {
    countdown()
        .args(["start", "-m", "0", "-s", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1秒以上"));
}

#[test]
fn test_set_rejects_minutes_over_sixty() {
    countdown()
        .args(["set", "61", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("0-60"));
}

#[test]
fn test_set_rejects_sixty_minutes_with_seconds() {
    countdown()
        .args(["set", "60", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("60分"));
}

#[test]
fn test_status_without_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("none.sock");

    countdown()
        .arg("--socket")
        .arg(&socket)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Daemonに接続できません"));
}
