//! Supervised child processes
//!
//! Spawns programs in their own process group, feeds stdin, captures output
//! and races the child against a wall clock deadline. On expiry the whole
//! group receives SIGTERM, then SIGKILL after a short grace period.

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tracing::{debug, warn};

pub use crate::process::command::{
    DEFAULT_KILL_GRACE, DEFAULT_MAX_OUTPUT, ProcessCommand, resolve_program,
};
pub use crate::process::supervise::run_batch;

mod command;
mod supervise;

/// Handle on a child's process group
///
/// Dropping an unfinished group sends SIGKILL to every member, so a cancelled
/// judging future never leaves processes behind.
#[derive(Debug)]
pub struct ProcessGroup {
    pgid: Option<Pid>,
    finished: bool,
}

impl ProcessGroup {
    /// Track the group led by `pid`
    pub fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()).map(Pid::from_raw),
            finished: false,
        }
    }

    /// Send a signal to every member of the group
    ///
    /// Returns `false` if the group no longer exists.
    pub fn signal(&self, signal: Signal) -> bool {
        let Some(pgid) = self.pgid else {
            return false;
        };

        match killpg(pgid, signal) {
            Ok(()) => {
                debug!(pgid = pgid.as_raw(), ?signal, "signalled process group");
                true
            }
            Err(Errno::ESRCH) => false,
            Err(e) => {
                warn!(pgid = pgid.as_raw(), ?signal, error = %e, "failed to signal process group");
                false
            }
        }
    }

    /// Kill whatever is left of the group and stop tracking it
    pub fn finish(&mut self) {
        if !self.finished {
            if self.signal(Signal::SIGKILL) {
                debug!("killed leftover processes in group");
            }
            self.finished = true;
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if !self.finished && self.signal(Signal::SIGKILL) {
            warn!(
                pgid = self.pgid.map(Pid::as_raw),
                "process group dropped while running, killed"
            );
        }
    }
}
