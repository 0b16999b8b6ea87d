//! End-to-end tests for the belld binary.
//!
//! These tests run the built binary the way a user would:
//! - One-shot commands (`play`, `render`, `completions`)
//! - A daemon rung over its socket and with SIGUSR1
//! - Error reporting when no daemon is running

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, ExitStatus};
use std::thread::sleep;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;

use belld::sound::{synth, wave};

// ============================================================================
// Test Helpers
// ============================================================================

fn belld() -> Command {
    let mut cmd = Command::cargo_bin("belld").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Polls `condition` for up to five seconds.
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(20));
    }
    condition()
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

fn send_signal(child: &Child, name: &str) {
    let status = StdCommand::new("kill")
        .arg(format!("-{}", name))
        .arg(child.id().to_string())
        .status()
        .unwrap();
    assert!(status.success());
}

fn wait_for_exit(child: &mut Child) -> Option<ExitStatus> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        sleep(Duration::from_millis(20));
    }
    None
}

/// A daemon process that is killed if a test fails before stopping it.
struct DaemonProcess {
    child: Child,
    socket: PathBuf,
}

impl DaemonProcess {
    fn start(dir: &Path, beep_args: &[&str]) -> Self {
        let socket = dir.join("belld.sock");
        let child = StdCommand::new(assert_cmd::cargo::cargo_bin("belld"))
            .arg("daemon")
            .args(beep_args)
            .arg("--socket")
            .arg(&socket)
            .env_remove("RUST_LOG")
            .spawn()
            .unwrap();
        let daemon = Self { child, socket };
        assert!(wait_until(|| daemon.socket.exists()), "socket never appeared");
        daemon
    }

    fn socket_arg(&self) -> &str {
        self.socket.to_str().unwrap()
    }
}

impl Drop for DaemonProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ============================================================================
// One-shot commands
// ============================================================================

#[test]
fn test_help_lists_commands() {
    belld()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("daemon"))
        .stdout(predicate::str::contains("ring"))
        .stdout(predicate::str::contains("render"));
}

#[test]
fn test_render_writes_playable_wave() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("beep.wav");

    belld()
        .args(["render", "--square", "-F", "1000", "-d", "30", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let buffer = wave::load_into_buffer(&output).unwrap();
    assert_eq!(buffer.frames(), synth::sample_count(30));
    assert_eq!(buffer.format().bits_per_sample, 8);
}

#[test]
fn test_render_rejects_out_of_range_frequency() {
    let dir = tempfile::tempdir().unwrap();
    belld()
        .args(["render", "-F", "0", "-o"])
        .arg(dir.path().join("beep.wav"))
        .assert()
        .failure();
}

#[test]
fn test_play_command_beep() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("played.log");

    belld()
        .args(["play", "-e"])
        .arg(format!("echo beep >> '{}'", log.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Played"));

    assert_eq!(line_count(&log), 1);
}

#[test]
fn test_play_missing_wave_file_reports_error() {
    belld()
        .args(["play", "-f", "/nonexistent/bell.wav"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("belld:"))
        .stderr(predicate::str::contains("/nonexistent/bell.wav"));
}

#[test]
fn test_wave_file_conflicts_with_waveform() {
    belld()
        .args(["play", "-f", "bell.wav", "--sine"])
        .assert()
        .failure();
}

#[test]
fn test_completions_bash() {
    belld()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("belld"));
}

#[test]
fn test_ring_without_daemon_fails() {
    let dir = tempfile::tempdir().unwrap();
    belld()
        .args(["ring", "--socket"])
        .arg(dir.path().join("missing.sock"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("belld:"));
}

// ============================================================================
// Daemon
// ============================================================================

#[test]
fn test_daemon_rings_on_request_and_signal() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("rings.log");
    let command = format!("echo ring >> '{}'", log.display());
    let mut daemon = DaemonProcess::start(dir.path(), &["-e", &command]);

    belld()
        .args(["ring", "--socket", daemon.socket_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bell rung"));
    assert!(wait_until(|| line_count(&log) == 1));

    send_signal(&daemon.child, "USR1");
    assert!(wait_until(|| line_count(&log) == 2));

    belld()
        .args(["status", "--socket", daemon.socket_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rings:     2"))
        .stdout(predicate::str::contains("Beeps:     2"));

    send_signal(&daemon.child, "TERM");
    let status = wait_for_exit(&mut daemon.child).expect("daemon did not exit");
    assert!(status.success());
    assert!(!daemon.socket.exists());
}

#[test]
fn test_daemon_test_bell_and_throttle() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("rings.log");
    let command = format!("date +%s%N >> '{}'", log.display());
    let daemon = DaemonProcess::start(dir.path(), &["-T", "-t", "300", "-e", &command]);

    assert!(wait_until(|| line_count(&log) == 1));
    belld()
        .args(["ring", "--socket", daemon.socket_arg()])
        .assert()
        .success();
    assert!(wait_until(|| line_count(&log) == 2));

    let stamps: Vec<u128> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|l| l.trim().parse().unwrap())
        .collect();
    let gap_ms = (stamps[1] - stamps[0]) / 1_000_000;
    assert!(gap_ms >= 300, "beeps only {} ms apart", gap_ms);
}

#[test]
fn test_daemon_with_missing_wave_file_exits() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("belld.sock");

    belld()
        .args(["daemon", "-f", "/nonexistent/bell.wav", "--socket"])
        .arg(&socket)
        .timeout(Duration::from_secs(5))
        .assert()
        .failure()
        .stderr(predicate::str::contains("belld:"));

    assert!(!socket.exists());
}
