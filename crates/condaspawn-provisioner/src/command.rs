//! Run an external command with a wall-clock timeout.
//!
//! stdout/stderr are drained on background threads while the child runs;
//! a child writing more than the pipe buffer would otherwise block forever.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval for `try_wait`.
pub const POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug)]
pub struct CommandOutput {
    /// `None` when the child was killed on timeout.
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }

    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }
}

/// How long to wait for the output readers once the child is gone. A
/// grandchild that inherited the pipes can keep them open indefinitely.
pub const READER_GRACE_MS: u64 = 500;

/// Read `pipe` to EOF on a background thread. Bytes are decoded lossily at
/// the end so non-UTF-8 output still produces a usable excerpt.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => bytes.extend_from_slice(&buf[..n]),
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&bytes).into_owned());
    });
    rx
}

/// Whatever the reader produced within the grace period. A reader still
/// blocked after that is abandoned rather than joined.
fn collect(reader: Option<mpsc::Receiver<String>>) -> String {
    reader
        .and_then(|rx| rx.recv_timeout(Duration::from_millis(READER_GRACE_MS)).ok())
        .unwrap_or_default()
}

/// Spawn `cmd` with piped output and wait at most `timeout` for it.
/// On timeout the child is killed and reaped.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> std::io::Result<CommandOutput> {
    let start = Instant::now();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    };

    let elapsed = start.elapsed();

    Ok(CommandOutput {
        status,
        stdout: collect(stdout_reader),
        stderr: collect(stderr_reader),
        elapsed,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_output_and_status() {
        let out = run_with_timeout(
            Command::new("/bin/sh").args(["-c", "echo out; echo err >&2; exit 3"]),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(!out.success());
        assert!(!out.timed_out());
        assert_eq!(out.status.and_then(|s| s.code()), Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[test]
    fn test_kills_on_timeout() {
        let out = run_with_timeout(
            Command::new("/bin/sh").args(["-c", "exec sleep 5"]),
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(out.timed_out());
        assert!(out.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_non_utf8_stderr_is_kept() {
        let out = run_with_timeout(
            Command::new("/bin/sh").args(["-c", "printf 'bad \\377 byte' >&2; exit 1"]),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(out.stderr.starts_with("bad "), "stderr was {:?}", out.stderr);
        assert!(out.stderr.contains('\u{FFFD}'));
        assert!(out.stderr.ends_with(" byte"));
    }

    #[test]
    fn test_timeout_not_held_by_grandchild() {
        let began = Instant::now();
        let out = run_with_timeout(
            Command::new("/bin/sh").args(["-c", "sleep 5 & exec sleep 5"]),
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(out.timed_out());
        assert!(began.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_spawn_error() {
        let err = run_with_timeout(
            &mut Command::new("/nonexistent/condaspawn-tool"),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
