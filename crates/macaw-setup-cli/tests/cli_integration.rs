//! CLI subprocess integration tests.
//!
//! These tests invoke the `macaw-setup` binary as a subprocess and verify
//! exit codes, stdout content, and JSON output stability. They stick to
//! read-only commands; `install` is exercised through the mock-backed
//! orchestrator tests in macaw-setup-core.

use std::process::Command;

fn setup_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_macaw-setup"))
}

#[test]
fn cli_version_exits_zero() {
    let output = setup_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "macaw-setup --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("macaw-setup"),
        "version output must contain 'macaw-setup': {stdout}"
    );
}

#[test]
fn cli_help_lists_commands() {
    let output = setup_bin().arg("--help").output().unwrap();
    assert!(output.status.success(), "macaw-setup --help must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("install"), "help must list 'install'");
    assert!(stdout.contains("doctor"), "help must list 'doctor'");
    assert!(stdout.contains("completions"), "help must list 'completions'");
}

#[test]
fn install_help_documents_overrides() {
    let output = setup_bin().args(["install", "--help"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--install-dir"));
    assert!(stdout.contains("--extras"));
    assert!(stdout.contains("--version-pin"));
    assert!(stdout.contains("--no-service"));
}

#[test]
fn doctor_json_output_is_stable() {
    let output = setup_bin().args(["doctor", "--json"]).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("doctor --json must emit valid JSON");
    assert!(parsed.get("healthy").is_some());
    let checks = parsed["checks"].as_array().expect("checks array");
    let names: Vec<_> = checks
        .iter()
        .map(|c| c["name"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert!(names.contains(&"architecture".to_owned()));
    assert!(names.contains(&"service_manager".to_owned()));
    assert!(names.contains(&"accelerator".to_owned()));
}

#[test]
fn unknown_subcommand_fails() {
    let output = setup_bin().arg("frobnicate").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn completions_generate_for_bash() {
    let output = setup_bin().args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("macaw-setup"));
}
