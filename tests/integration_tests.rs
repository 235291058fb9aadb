// Integration tests for archsetup
//
// These exercise the real process plumbing: the system command runner, the
// child process group setup, and the compiled binary's non-destructive
// subcommands.

use std::io::Write;
use std::process::Command;

use archsetup::command_runner::{CommandLine, CommandRunner, DryRunRunner, SystemRunner};
use archsetup::error::InstallError;
use archsetup::process_guard::{ChildRegistry, CommandProcessGroup};
use tempfile::NamedTempFile;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_archsetup"))
}

// =============================================================================
// System Runner
// =============================================================================

#[test]
fn test_system_runner_reports_exit_status() {
    let mut runner = SystemRunner::new();
    let ok = runner.run(&CommandLine::new("true")).unwrap();
    assert!(ok.is_success());
    assert_eq!(ok.captured_output, None);

    let failed = runner.run(&CommandLine::shell("exit 3")).unwrap();
    assert_eq!(failed.exit_status, 3);
}

#[test]
fn test_system_runner_captures_stdout_verbatim() {
    let mut runner = SystemRunner::new();
    let result = runner
        .capture(&CommandLine::new("printf").arg("a b\n'c'\n"))
        .unwrap();
    assert_eq!(result.captured_output.as_deref(), Some(b"a b\n'c'\n".as_slice()));
}

#[test]
fn test_system_runner_spawn_failure() {
    let mut runner = SystemRunner::new();
    let err = runner
        .run(&CommandLine::new("definitely-not-a-real-binary-archsetup"))
        .unwrap_err();
    assert!(matches!(err, InstallError::Spawn { .. }));
}

#[test]
fn test_system_runner_stdin_is_closed() {
    // `cat` would block forever on an inherited terminal
    let mut runner = SystemRunner::new();
    let result = runner.capture(&CommandLine::new("cat")).unwrap();
    assert_eq!(result.captured_output.as_deref(), Some(b"".as_slice()));
}

#[test]
fn test_system_runner_unregisters_children() {
    let mut runner = SystemRunner::new();
    runner.run(&CommandLine::new("true")).unwrap();
    let registry = ChildRegistry::global();
    let guard = registry.lock().unwrap();
    assert_eq!(guard.count(), 0);
}

#[test]
fn test_dry_run_runner_executes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker");
    let mut runner = DryRunRunner::new();
    let cmd = CommandLine::new("touch").arg(marker.to_string_lossy());

    assert!(runner.run(&cmd).unwrap().is_success());
    assert!(!marker.exists());
    assert_eq!(runner.history().len(), 1);
}

// =============================================================================
// Process Groups
// =============================================================================

#[test]
fn test_child_gets_own_process_group() {
    let mut child = Command::new("sleep")
        .arg("5")
        .in_new_process_group()
        .spawn()
        .unwrap();
    let pid = nix::unistd::Pid::from_raw(child.id() as i32);
    let pgid = nix::unistd::getpgid(Some(pid)).unwrap();
    child.kill().unwrap();
    child.wait().unwrap();

    assert_eq!(pgid, pid);
    assert_ne!(pgid, nix::unistd::getpgrp());
}

// =============================================================================
// Binary
// =============================================================================

#[test]
fn test_binary_help() {
    let output = binary().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("validate"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_binary_validate_accepts_good_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"country": "Germany", "host_name": "archbox", "gpu": 1, "disk": "nvme0n1"}}"#
    )
    .unwrap();

    let output = binary().arg("validate").arg(file.path()).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("4 of 8 prompts answered"));
}

#[test]
fn test_binary_validate_rejects_bad_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"username": "bad user"}}"#).unwrap();

    let output = binary().arg("validate").arg(file.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("username"));
}

#[test]
fn test_binary_validate_rejects_malformed_json() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{not json").unwrap();

    let output = binary().arg("validate").arg(file.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}
