//! Running child processes with a wall-clock timeout and bounded output.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
    /// A pipe was still held open (e.g. by a backgrounded grandchild) after the
    /// drain grace period; output collected so far is returned.
    pub detached: bool,
}

impl CommandOutput {
    pub fn truncated_notice(&self) -> String {
        let mut notice = String::new();
        if self.stdout_truncated > 0 {
            notice.push_str(&format!(
                "\n[stdout truncated {} bytes]",
                self.stdout_truncated
            ));
        }
        if self.stderr_truncated > 0 {
            notice.push_str(&format!(
                "\n[stderr truncated {} bytes]",
                self.stderr_truncated
            ));
        }
        notice
    }
}

/// How long to keep draining pipes after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

enum Chunk {
    Data(Vec<u8>),
    Dropped(usize),
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is drained on reader threads while the child runs. Bytes beyond
/// `output_limit_bytes` per stream are discarded but still read. On timeout the
/// child is killed and reaped, and `timed_out` is set.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

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
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let deadline = Instant::now() + DRAIN_GRACE;
    let (stdout, stdout_truncated, stdout_closed) =
        collect_output(&stdout_rx, deadline).context("collect stdout")?;
    let (stderr, stderr_truncated, stderr_closed) =
        collect_output(&stderr_rx, deadline).context("collect stderr")?;
    let detached = !(stdout_closed && stderr_closed);

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }
    if detached {
        warn!("output pipe still open after exit, detaching reader");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
        detached,
    })
}

/// Read `reader` to EOF on a helper thread, forwarding at most `limit` bytes.
fn spawn_reader<R: Read + Send + 'static>(mut reader: R, limit: usize) -> Receiver<Result<Chunk>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut kept = 0usize;
        let mut chunk = [0u8; 8192];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    let _ = tx.send(Err(anyhow!(err).context("read output")));
                    break;
                }
            };
            let keep = n.min(limit.saturating_sub(kept));
            kept += keep;
            let sent = (keep == 0 || tx.send(Ok(Chunk::Data(chunk[..keep].to_vec()))).is_ok())
                && (keep == n || tx.send(Ok(Chunk::Dropped(n - keep))).is_ok());
            if !sent {
                break;
            }
        }
    });
    rx
}

/// Drain a reader channel until EOF or `deadline`. The flag reports EOF.
fn collect_output(
    rx: &Receiver<Result<Chunk>>,
    deadline: Instant,
) -> Result<(Vec<u8>, usize, bool)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(Ok(Chunk::Data(data))) => buf.extend_from_slice(&data),
            Ok(Ok(Chunk::Dropped(n))) => truncated += n,
            Ok(Err(err)) => return Err(err),
            Err(RecvTimeoutError::Timeout) => return Ok((buf, truncated, false)),
            Err(RecvTimeoutError::Disconnected) => return Ok((buf, truncated, true)),
        }
    }
}
