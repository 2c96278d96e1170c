//! End-to-end runs of the `supervisor` and `generator` binaries.

mod common;

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tricolor_core::config::IpcNames;

use common::*;

const DEADLINE: Duration = Duration::from_secs(20);

fn command(bin: &str, namespace: &str) -> Command {
    let mut cmd = Command::new(bin);
    cmd.env("TRICOLOR_IPC_NAMESPACE", namespace)
        .env("TRICOLOR_LOG_FILTER", "warn")
        .env_remove("TRICOLOR_CONFIG")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

struct Supervisor {
    child: Child,
    stdout: BufReader<ChildStdout>,
}

/// Spawns a supervisor and waits until its resources exist.
fn start_supervisor(namespace: &str) -> Supervisor {
    let mut child = command(env!("CARGO_BIN_EXE_supervisor"), namespace)
        .arg("--no-color")
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    let mut first = String::new();
    stdout.read_line(&mut first).unwrap();
    assert!(first.starts_with("Started supervisor with pid "), "got {first:?}");
    assert_eq!(
        first.trim_end().rsplit(' ').next(),
        Some(child.id().to_string().as_str())
    );

    Supervisor { child, stdout }
}

fn start_generator(namespace: &str, edges: &[&str]) -> Child {
    command(env!("CARGO_BIN_EXE_generator"), namespace)
        .args(edges)
        .stdout(Stdio::null())
        .spawn()
        .unwrap()
}

fn send(child: &Child, signal: libc::c_int) {
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, signal) };
    assert_eq!(rc, 0, "kill failed");
}

fn wait_with_deadline(child: &mut Child) -> ExitStatus {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if start.elapsed() > DEADLINE {
            let _ = child.kill();
            panic!("process {} did not exit in time", child.id());
        }
        thread::sleep(Duration::from_millis(20));
    }
}

fn rest_of(stdout: &mut BufReader<ChildStdout>) -> String {
    let mut out = String::new();
    stdout.read_to_string(&mut out).unwrap();
    out
}

// ── argument handling ───────────────────────────────────────────────

#[test]
fn generator_requires_edges() {
    let status = command(env!("CARGO_BIN_EXE_generator"), &unique_namespace())
        .stdout(Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn generator_rejects_malformed_edges() {
    for bad in ["a-b", "1-2-3", "12", "1-"] {
        let status = command(env!("CARGO_BIN_EXE_generator"), &unique_namespace())
            .args(["0-1", bad])
            .stdout(Stdio::null())
            .status()
            .unwrap();
        assert!(!status.success(), "{bad} was accepted");
    }
}

#[test]
fn generator_fails_without_a_supervisor() {
    let namespace = unique_namespace();
    let status = command(env!("CARGO_BIN_EXE_generator"), &namespace)
        .arg("0-1")
        .stdout(Stdio::null())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));

    // it must not have created anything on its way out
    assert_unlinked(&IpcNames::for_namespace(&namespace));
}

#[test]
fn supervisor_takes_no_positional_arguments() {
    let status = command(env!("CARGO_BIN_EXE_supervisor"), &unique_namespace())
        .arg("0-1")
        .stdout(Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn second_supervisor_refuses_a_live_namespace() {
    let namespace = unique_namespace();
    let mut first = start_supervisor(&namespace);

    let status = command(env!("CARGO_BIN_EXE_supervisor"), &namespace)
        .stdout(Stdio::null())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));

    send(&first.child, libc::SIGTERM);
    assert!(wait_with_deadline(&mut first.child).success());
    assert_unlinked(&IpcNames::for_namespace(&namespace));
}

// ── full runs ───────────────────────────────────────────────────────

#[test]
fn triangle_ends_with_colorable_report() {
    let namespace = unique_namespace();
    let mut supervisor = start_supervisor(&namespace);
    let mut generator = start_generator(&namespace, TRIANGLE);

    assert!(wait_with_deadline(&mut supervisor.child).success());
    let out = rest_of(&mut supervisor.stdout);
    assert_eq!(out.lines().last(), Some("The graph is 3-colorable"), "{out}");

    assert!(wait_with_deadline(&mut generator).success());
    assert_unlinked(&IpcNames::for_namespace(&namespace));

    // a generator arriving after teardown finds nothing to attach to
    let mut late = start_generator(&namespace, TRIANGLE);
    assert_eq!(wait_with_deadline(&mut late).code(), Some(1));
    assert_unlinked(&IpcNames::for_namespace(&namespace));
}

#[test]
fn sigterm_stops_supervisor_and_generators() {
    let namespace = unique_namespace();
    let mut supervisor = start_supervisor(&namespace);
    let mut generators: Vec<Child> = (0..2)
        .map(|_| start_generator(&namespace, K4))
        .collect();

    thread::sleep(Duration::from_millis(500));
    send(&supervisor.child, libc::SIGTERM);

    assert!(wait_with_deadline(&mut supervisor.child).success());
    let out = rest_of(&mut supervisor.stdout);
    assert!(out.contains("Solution with "), "{out}");
    assert!(!out.contains("3-colorable"));

    for generator in &mut generators {
        assert!(wait_with_deadline(generator).success());
    }
    assert_unlinked(&IpcNames::for_namespace(&namespace));
}

#[test]
fn sigint_stops_one_generator_only() {
    let namespace = unique_namespace();
    let mut supervisor = start_supervisor(&namespace);
    let mut interrupted = start_generator(&namespace, K4);
    let mut other = start_generator(&namespace, K4);

    thread::sleep(Duration::from_millis(300));
    send(&interrupted, libc::SIGINT);
    assert!(wait_with_deadline(&mut interrupted).success());

    // the rest of the system keeps going
    assert!(supervisor.child.try_wait().unwrap().is_none());
    assert!(other.try_wait().unwrap().is_none());

    send(&supervisor.child, libc::SIGINT);
    assert!(wait_with_deadline(&mut supervisor.child).success());
    assert!(wait_with_deadline(&mut other).success());
    assert_unlinked(&IpcNames::for_namespace(&namespace));
}
