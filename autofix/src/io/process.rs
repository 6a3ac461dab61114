//! Run child processes with a timeout and bounded output capture.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
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
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    /// Stdout followed by stderr as lossy UTF-8, with truncation notices.
    pub fn combined_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        if self.stdout_truncated > 0 {
            text.push_str(&format!(
                "\n[stdout truncated {} bytes]\n",
                self.stdout_truncated
            ));
        }
        if !self.stderr.is_empty() && !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        if self.stderr_truncated > 0 {
            text.push_str(&format!(
                "\n[stderr truncated {} bytes]\n",
                self.stderr_truncated
            ));
        }
        text
    }
}

/// How long to keep reading a stream after the child has exited.
///
/// Background processes that inherited the pipes can hold them open forever;
/// once this elapses whatever was read so far is returned.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Run `cmd` to completion (or until `timeout`), draining stdout and stderr
/// concurrently so a chatty child cannot deadlock on a full pipe.
///
/// At most `output_limit_bytes` of each stream is kept; the rest is read and
/// discarded. On unix the child leads its own process group, and a timed-out
/// run kills the whole group so grandchildren (`npm -> sh -> node`) die too.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_captured(
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

    let stdout_capture = StreamCapture::spawn(stdout, output_limit_bytes);
    let stderr_capture = StreamCapture::spawn(stderr, output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing process group"
            );
            timed_out = true;
            kill_process_group(&mut child)?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = stdout_capture.finish(DRAIN_GRACE).context("drain stdout")?;
    let (stderr, stderr_truncated) = stderr_capture.finish(DRAIN_GRACE).context("drain stderr")?;

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
fn kill_process_group(child: &mut Child) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).context("child pid out of range")?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => Err(err).context("kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> Result<()> {
    child.kill().context("kill command")
}

#[derive(Default)]
struct Captured {
    buf: Vec<u8>,
    truncated: usize,
}

/// One output stream read on a background thread into a shared buffer.
struct StreamCapture {
    captured: Arc<Mutex<Captured>>,
    done: mpsc::Receiver<Result<()>>,
}

impl StreamCapture {
    fn spawn<R: Read + Send + 'static>(reader: R, limit: usize) -> Self {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&captured);
        thread::spawn(move || {
            let _ = tx.send(read_stream_limited(reader, limit, &sink));
        });
        Self { captured, done }
    }

    /// Wait up to `grace` for end of stream, then take what was read.
    fn finish(self, grace: Duration) -> Result<(Vec<u8>, usize)> {
        match self.done.recv_timeout(grace) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    grace_ms = grace.as_millis(),
                    "output pipe still open after exit, keeping partial output"
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("output reader thread panicked"));
            }
        }
        let mut captured = self
            .captured
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        Ok((std::mem::take(&mut captured.buf), captured.truncated))
    }
}

fn read_stream_limited<R: Read>(
    mut reader: R,
    limit: usize,
    sink: &Mutex<Captured>,
) -> Result<()> {
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(());
        }
        let mut captured = sink
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        let keep = n.min(limit.saturating_sub(captured.buf.len()));
        captured.buf.extend_from_slice(&chunk[..keep]);
        captured.truncated += n - keep;
    }
}
