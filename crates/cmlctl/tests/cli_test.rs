//! Integration tests for the `cmlctl` binary.
//!
//! Argument parsing, help output, shell completions and configuration
//! errors, all without a live controller.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// `cmlctl` with `CML_*` cleared and config dirs pointed at `home`.
fn cmlctl(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("cmlctl");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    for var in [
        "CML_PROFILE",
        "CML_HOST",
        "CML_USERNAME",
        "CML_PASSWORD",
        "CML_TOKEN",
        "CML_OUTPUT",
        "CML_INSECURE",
        "CML_TIMEOUT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = cmlctl(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    cmlctl(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("Cisco Modeling Labs")
            .and(predicate::str::contains("labs"))
            .and(predicate::str::contains("nodes"))
            .and(predicate::str::contains("defs")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    cmlctl(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cmlctl"));
}

#[test]
fn test_labs_help_lists_lifecycle() {
    let home = tempfile::tempdir().unwrap();
    cmlctl(home.path())
        .args(["labs", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("import")
                .and(predicate::str::contains("start"))
                .and(predicate::str::contains("wipe")),
        );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    cmlctl(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    cmlctl(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = cmlctl(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error naming the subcommand:\n{text}");
}

#[test]
fn test_missing_config_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = cmlctl(home.path()).args(["labs", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("No controller configured"),
        "Expected missing-config error:\n{text}"
    );
}

#[test]
fn test_unknown_profile_is_reported() {
    let home = tempfile::tempdir().unwrap();
    let output = cmlctl(home.path())
        .args(["--profile", "nowhere", "system", "info"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("nowhere"), "Expected profile name in error:\n{text}");
}

#[test]
fn test_invalid_host_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let output = cmlctl(home.path())
        .args(["--host", "not a url", "--token", "T", "system", "info"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("host"), "Expected host validation error:\n{text}");
}
