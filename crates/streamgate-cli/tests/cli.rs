//! Drives the built `streamgate-echo` binary.

use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use pretty_assertions::assert_eq;

fn echo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_streamgate-echo"))
}

#[test]
fn test_json_prints_capabilities() {
    let out = echo_bin().arg("--json").output().unwrap();
    assert!(out.status.success());

    let caps: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(caps["name"], "Echo");
    assert_eq!(caps["optional"]["port"]["default"], 4242);
    assert_eq!(caps["optional"]["interface"]["option"], "--interface");
}

#[test]
fn test_version_banner_exits_one() {
    let out = echo_bin().arg("-v").output().unwrap();
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let mut lines = stdout.lines();
    assert!(lines.next().unwrap().starts_with("Library version: "));
    assert!(lines.next().unwrap().starts_with("Application version: "));
}

#[test]
fn test_help_lists_connector_flags() {
    let out = echo_bin().arg("--help").output().unwrap();
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("Usage: streamgate-echo [options]"));
    for flag in ["--port, -p", "--interface, -i", "--nodaemon, -n", "--fork, -f"] {
        assert!(stdout.contains(flag), "help is missing {flag}");
    }
}

#[test]
fn test_unknown_flag_reports_and_prints_usage() {
    let out = echo_bin().arg("--bogus").output().unwrap();
    assert_eq!(out.status.code(), Some(1));

    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("--bogus"));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("Usage: streamgate-echo"));
}

#[test]
fn test_non_utf8_argument_reports_instead_of_panicking() {
    let out = echo_bin()
        .arg("--interface")
        .arg(OsString::from_vec(b"f\xffo".to_vec()))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("not valid UTF-8"), "stderr: {stderr}");
    assert!(!stderr.contains("panicked"));
}

#[test]
fn test_idle_server_stops_on_sigterm() {
    let mut child = echo_bin()
        .args(["-p", "0", "-i", "127.0.0.1", "-n"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    thread::sleep(Duration::from_millis(500));

    let pid = Pid::from_raw(i32::try_from(child.id()).unwrap());
    kill(pid, Signal::SIGTERM).unwrap();

    let deadline = Instant::now() + Duration::from_secs(3);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() >= deadline {
            child.kill().unwrap();
            panic!("idle server still running 3s after SIGTERM");
        }
        thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(status.code(), Some(0));
}
