//! Child processes with a hard timeout and bounded output capture.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How long to wait for pipe readers after the child has been killed.
///
/// A grandchild that left the child's process group can keep a pipe open
/// after the kill; we stop waiting for it rather than inherit its lifetime.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Captured child process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

type Captured = (Vec<u8>, usize);

/// Run `cmd`, killing it once `timeout` elapses.
///
/// On unix the child leads its own process group and the whole group is
/// killed on timeout, so subshells and background jobs die with it.
/// Stdout and stderr are drained concurrently so a chatty child cannot
/// deadlock on a full pipe; each stream keeps at most `output_limit_bytes`
/// and counts the rest as truncated.
#[instrument(skip_all, fields(timeout_ms = timeout.as_millis() as u64, output_limit_bytes))]
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
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
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
    let stdout_rx = spawn_reader(stdout, output_limit_bytes);
    let stderr_rx = spawn_reader(stderr, output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "command timed out, killing"
            );
            timed_out = true;
            kill_tree(&mut child)?;
            child.wait().context("wait command after kill")?
        }
    };

    let grace = if timed_out { Some(DRAIN_GRACE) } else { None };
    let (stdout, stdout_truncated) = collect(&stdout_rx, grace).context("collect stdout")?;
    let (stderr, stderr_truncated) = collect(&stderr_rx, grace).context("collect stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(ProcessOutput {
        exit_code: status.code(),
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// Kill the child and, on unix, every process still in its group.
///
/// Runs before the child is reaped, so the group id cannot have been reused.
fn kill_tree(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let pgid = i32::try_from(child.id()).context("child pid out of range")?;
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => return Err(e).context("kill process group"),
        }
    }
    match child.kill() {
        Ok(()) => Ok(()),
        // Already gone: the group kill got it first.
        Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e).context("kill command"),
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    limit: usize,
) -> mpsc::Receiver<Result<Captured>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_stream_limited(reader, limit));
    });
    rx
}

fn collect(rx: &mpsc::Receiver<Result<Captured>>, grace: Option<Duration>) -> Result<Captured> {
    match grace {
        None => rx
            .recv()
            .map_err(|_| anyhow!("output reader thread panicked"))?,
        Some(grace) => match rx.recv_timeout(grace) {
            Ok(captured) => captured,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("output pipe still open after kill, dropping capture");
                Ok((Vec::new(), 0))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(anyhow!("output reader thread panicked"))
            }
        },
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<Captured> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
