use assert_cmd::Command;
use predicates::prelude::*;
use rendezvous::{LockName, LockNamespace, NamedLock};
use std::process::{Child, Command as StdCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn rendezvous(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rendezvous").unwrap();
    cmd.arg("--lock-dir").arg(dir.path());
    cmd
}

fn wait_with_deadline(child: &mut Child, deadline: Duration) -> Option<i32> {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return status.code();
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = child.kill();
    None
}

#[test]
fn test_probe_reports_absent_name() {
    let dir = TempDir::new().unwrap();

    rendezvous(&dir)
        .args(["probe", "nobody"])
        .assert()
        .success()
        .stdout(predicate::str::diff("absent\n"));
}

#[test]
fn test_probe_sees_lock_held_by_another_process() {
    let dir = TempDir::new().unwrap();
    let ns = LockNamespace::new(dir.path()).unwrap();
    let name = LockName::new("held-by-test").unwrap();

    let lock = NamedLock::open(&ns, &name).unwrap();

    rendezvous(&dir)
        .args(["probe", "held-by-test"])
        .assert()
        .success()
        .stdout(predicate::str::diff("present\n"));

    rendezvous(&dir)
        .args(["probe", "--claim", "held-by-test"])
        .assert()
        .success()
        .stdout(predicate::str::diff("free\n"));

    let guard = lock.acquire().unwrap();
    rendezvous(&dir)
        .args(["probe", "--claim", "held-by-test"])
        .assert()
        .success()
        .stdout(predicate::str::diff("claimed\n"));
    guard.release().unwrap();
}

#[test]
fn test_wait_without_peers_passes() {
    let dir = TempDir::new().unwrap();

    rendezvous(&dir)
        .args(["wait", "--name", "solo", "--linger", "0ms"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Barrier passed: solo"));
}

#[test]
fn test_invalid_name_fails() {
    let dir = TempDir::new().unwrap();

    rendezvous(&dir)
        .args(["wait", "--name", "bad name", "--normalize", "verbatim"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid lock name"));
}

#[test]
fn test_invalid_poll_interval_fails() {
    let dir = TempDir::new().unwrap();

    rendezvous(&dir)
        .args(["wait", "--name", "a", "--poll-interval", "10x"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid duration"));
}

#[test]
fn test_oversized_poll_interval_fails_without_panicking() {
    let dir = TempDir::new().unwrap();

    // Parses on its own; the default linger of twice the interval does not fit
    rendezvous(&dir)
        .args(["wait", "--name", "a", "--poll-interval", "10000000000000000000s"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("too large"));

    rendezvous(&dir)
        .args(["wait", "--name", "a", "--poll-interval", "99999999999999999d"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("too large"));
}

#[test]
fn test_two_processes_rendezvous() {
    let dir = TempDir::new().unwrap();
    let ids = ["deployment(9).Worker.0", "deployment(9).Worker.1"];

    let spawn = |current: &str| {
        let mut cmd = StdCommand::new(env!("CARGO_BIN_EXE_rendezvous"));
        cmd.arg("--lock-dir")
            .arg(dir.path())
            .args(["wait", "--name", current, "--poll-interval", "50ms", "--linger", "1s"]);
        for id in ids {
            cmd.args(["--peer", id]);
        }
        cmd.stdout(Stdio::null()).stderr(Stdio::null()).spawn().unwrap()
    };

    let mut first = spawn(ids[0]);
    thread::sleep(Duration::from_millis(200));
    let mut second = spawn(ids[1]);

    assert_eq!(wait_with_deadline(&mut first, Duration::from_secs(20)), Some(0));
    assert_eq!(wait_with_deadline(&mut second, Duration::from_secs(20)), Some(0));
}

#[test]
fn test_wait_blocks_while_peer_missing() {
    let dir = TempDir::new().unwrap();

    let mut child = StdCommand::new(env!("CARGO_BIN_EXE_rendezvous"))
        .arg("--lock-dir")
        .arg(dir.path())
        .args(["wait", "--name", "p0", "--peer", "p1", "--poll-interval", "50ms"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    assert_eq!(wait_with_deadline(&mut child, Duration::from_millis(800)), None);
    let _ = child.wait();
}

#[cfg(unix)]
#[test]
fn test_run_forwards_exit_code() {
    let dir = TempDir::new().unwrap();

    rendezvous(&dir)
        .args(["run", "--name", "solo", "--linger", "0ms", "--", "sh", "-c", "exit 7"])
        .assert()
        .code(7);
}

#[cfg(unix)]
#[test]
fn test_run_standalone() {
    let dir = TempDir::new().unwrap();

    rendezvous(&dir)
        .args(["run", "--name", "solo", "--standalone", "--", "sh", "-c", "echo hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));
}

#[test]
fn test_run_missing_program_fails() {
    let dir = TempDir::new().unwrap();

    rendezvous(&dir)
        .args([
            "run",
            "--name",
            "solo",
            "--linger",
            "0ms",
            "--",
            "definitely-not-a-real-program-4242",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to run command"));
}
