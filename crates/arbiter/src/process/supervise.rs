//! Running a child process under a deadline

use std::io::ErrorKind;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::process::ProcessGroup;
use crate::process::command::ProcessCommand;
use crate::types::{ExecutionResult, ExecutionStatus};

/// How long to wait for output pipes to close once the group is gone
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 8192;

#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Reader task plus the buffer it fills, readable even if the task is aborted
struct OutputReader {
    task: JoinHandle<()>,
    sink: Arc<Mutex<Capture>>,
}

impl OutputReader {
    fn spawn<R: AsyncRead + Unpin + Send + 'static>(reader: R, cap: usize) -> Self {
        let sink = Arc::new(Mutex::new(Capture::default()));
        let task = tokio::spawn(capture(reader, cap, Arc::clone(&sink)));
        Self { task, sink }
    }
}

/// Run a command with batch I/O
///
/// Writes `stdin_data` to the child's stdin and closes it, accumulates stdout
/// and stderr while the child runs, and kills the process group if the
/// deadline expires first. Never fails: problems starting the program are
/// reported as [`ExecutionStatus::SpawnFailed`].
#[instrument(skip(command, stdin_data), fields(program = command.argv().first().map(String::as_str)))]
pub async fn run_batch(command: ProcessCommand, stdin_data: &[u8]) -> ExecutionResult {
    let mut cmd = match command.build() {
        Ok(cmd) => cmd,
        Err(message) => return ExecutionResult::spawn_failed(message),
    };

    let start = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!(error = %e, "failed to spawn");
            return ExecutionResult::spawn_failed(e.to_string());
        }
    };
    let mut group = ProcessGroup::new(child.id());

    debug!(pid = child.id(), timeout = ?command.timeout(), "spawned child");

    let stdin_task = child.stdin.take().map(|mut stdin| {
        let data = stdin_data.to_vec();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&data).await
                && e.kind() != ErrorKind::BrokenPipe
            {
                debug!(error = %e, "failed to write stdin");
            }
            // stdin is dropped here, closing the pipe
        })
    });
    let cap = command.output_cap();
    let stdout_task = child.stdout.take().map(|out| OutputReader::spawn(out, cap));
    let stderr_task = child.stderr.take().map(|err| OutputReader::spawn(err, cap));

    // Dropping the sleep when the child wins the race cancels the timer, so a
    // late kill can never hit a finished request.
    let natural = tokio::select! {
        status = child.wait() => Some(status),
        () = tokio::time::sleep(command.timeout()) => None,
    };

    let (wait_result, timed_out) = match natural {
        Some(status) => (status, false),
        None => {
            debug!("deadline expired, terminating process group");
            (terminate(&mut child, &group, command.grace()).await, true)
        }
    };
    let wall_time = start.elapsed();

    // Background children may still hold the output pipes open
    group.finish();

    if let Some(task) = stdin_task {
        task.abort();
    }
    let (stdout, stderr) = tokio::join!(collect(stdout_task), collect(stderr_task));

    let mut result = ExecutionResult {
        wall_time,
        output_truncated: stdout.truncated || stderr.truncated,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
        ..Default::default()
    };

    match wait_result {
        Ok(status) => classify(&mut result, status, timed_out),
        Err(e) => {
            warn!(error = %e, "failed to wait for child");
            result.status = if timed_out {
                ExecutionStatus::TimeLimitExceeded
            } else {
                ExecutionStatus::RuntimeError
            };
            result.message = Some(format!("failed to wait for process: {e}"));
        }
    }

    debug!(
        status = ?result.status,
        exit_code = ?result.exit_code,
        signal = ?result.signal,
        wall_time = ?result.wall_time,
        "child finished"
    );

    result
}

/// SIGTERM the group, then SIGKILL it if the leader outlives the grace period
async fn terminate(
    child: &mut Child,
    group: &ProcessGroup,
    grace: Duration,
) -> std::io::Result<ExitStatus> {
    group.signal(Signal::SIGTERM);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!(?grace, "process ignored SIGTERM, sending SIGKILL");
            if !group.signal(Signal::SIGKILL) {
                child.start_kill()?;
            }
            child.wait().await
        }
    }
}

fn classify(result: &mut ExecutionResult, status: ExitStatus, timed_out: bool) {
    result.exit_code = status.code();
    result.signal = status.signal();

    result.status = if timed_out {
        ExecutionStatus::TimeLimitExceeded
    } else {
        match (status.code(), status.signal()) {
            (Some(0), _) => ExecutionStatus::Ok,
            (Some(_), _) => ExecutionStatus::RuntimeError,
            (None, Some(_)) => ExecutionStatus::Signaled,
            (None, None) => ExecutionStatus::RuntimeError,
        }
    };
}

fn lock(sink: &Mutex<Capture>) -> std::sync::MutexGuard<'_, Capture> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn capture<R: AsyncRead + Unpin>(mut reader: R, cap: usize, sink: Arc<Mutex<Capture>>) {
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let mut out = lock(&sink);
                let room = cap.saturating_sub(out.bytes.len());
                if n > room {
                    out.truncated = true;
                }
                out.bytes.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "output pipe read failed");
                break;
            }
        }
    }
}

/// Wait for a reader to hit EOF and take what it captured
///
/// A process that left the group can hold the pipe open indefinitely; after
/// [`DRAIN_TIMEOUT`] the reader is stopped and the bytes read so far are kept.
async fn collect(reader: Option<OutputReader>) -> Capture {
    let Some(OutputReader { mut task, sink }) = reader else {
        return Capture::default();
    };

    match tokio::time::timeout(DRAIN_TIMEOUT, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "output reader task failed"),
        Err(_) => {
            warn!("output pipe still open after the process group exited, keeping partial output");
            task.abort();
        }
    }

    std::mem::take(&mut *lock(&sink))
}
