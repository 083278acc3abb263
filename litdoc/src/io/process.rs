//! Child process runner with a wall-clock timeout and bounded output capture.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.status.success()
    }
}

/// Run `cmd` to completion or until `timeout` elapses, whichever is first.
///
/// Stdin is closed. Stdout and stderr are drained on reader threads while the
/// child runs so a chatty child cannot block on a full pipe; bytes beyond
/// `output_limit_bytes` per stream are counted and dropped. On timeout the
/// child is killed and reaped before returning.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<ProcessOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a timeout also reaches grandchildren holding the pipes.
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            error!(err = %err, "failed to spawn command");
            return Err(err).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_reader = thread::spawn(move || read_bounded(stdout, output_limit_bytes));
    let stderr_reader = thread::spawn(move || read_bounded(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            kill_process_group(child.id());
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_reader(stdout_reader).context("join stdout")?;
    let (stderr, stderr_truncated) = join_reader(stderr_reader).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let result = Command::new("kill")
        .args(["-s", "KILL", "--"])
        .arg(format!("-{pid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(err) = result {
        warn!(err = %err, pid, "failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_bounded<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(buf.len());
        let keep = n.min(room);
        buf.extend_from_slice(&chunk[..keep]);
        dropped += n - keep;
    }

    Ok((buf, dropped))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let output = run_with_timeout(
            sh("echo out; echo err >&2"),
            Duration::from_secs(10),
            1024,
        )
        .expect("run");
        assert!(output.succeeded());
        assert_eq!(output.stdout_text(), "out\n");
        assert_eq!(output.stderr_text(), "err\n");
    }

    #[test]
    fn reports_non_zero_exit() {
        let output = run_with_timeout(sh("exit 3"), Duration::from_secs(10), 1024).expect("run");
        assert!(!output.succeeded());
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn kills_on_timeout() {
        let started = std::time::Instant::now();
        let output =
            run_with_timeout(sh("sleep 30; echo late"), Duration::from_millis(200), 1024)
                .expect("run");
        assert!(started.elapsed() < Duration::from_secs(20));
        assert!(output.timed_out);
        assert!(!output.succeeded());
    }

    #[test]
    fn bounds_captured_output() {
        let output =
            run_with_timeout(sh("printf 'abcdefghij'"), Duration::from_secs(10), 4).expect("run");
        assert_eq!(output.stdout, b"abcd");
        assert_eq!(output.stdout_truncated, 6);
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let cmd = Command::new("definitely-not-a-real-binary-litdoc");
        let err = run_with_timeout(cmd, Duration::from_secs(1), 16).unwrap_err();
        assert!(err.to_string().contains("spawn command"));
    }
}
