//! Command builder for supervised child processes

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::CommandLine;

/// Default capture cap per output stream
pub const DEFAULT_MAX_OUTPUT: usize = 64 * 1024 * 1024;

/// Default delay between SIGTERM and SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(200);

/// Builder for a child process run under a deadline
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    /// Program followed by its arguments
    argv: Vec<String>,
    /// Extra environment variables (the parent environment is inherited)
    env: HashMap<String, String>,
    working_dir: Option<PathBuf>,
    /// Wall clock budget
    timeout: Duration,
    /// Delay before escalating SIGTERM to SIGKILL
    kill_grace: Duration,
    /// Maximum captured bytes per stream
    max_output: usize,
}

impl ProcessCommand {
    /// Create a new command with the given argument vector
    pub fn new(argv: impl IntoIterator<Item = impl Into<String>>, timeout: Duration) -> Self {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
            working_dir: None,
            timeout,
            kill_grace: DEFAULT_KILL_GRACE,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    /// Create a command from a resolved profile command line
    pub fn from_line(line: &CommandLine, timeout: Duration) -> Self {
        Self::new(line.argv.iter().cloned(), timeout).envs(line.env.clone())
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables
    pub fn envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the delay before SIGKILL follows SIGTERM
    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Set the capture cap per output stream
    pub fn max_output(mut self, bytes: usize) -> Self {
        self.max_output = bytes;
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn grace(&self) -> Duration {
        self.kill_grace
    }

    pub fn output_cap(&self) -> usize {
        self.max_output
    }

    /// Build the tokio command
    ///
    /// The child becomes the leader of a new process group so the whole family
    /// can be signalled at once.
    pub fn build(&self) -> Result<Command, String> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| "empty command".to_owned())?;
        let program = resolve_program(program, self.working_dir.as_deref());

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        Ok(command)
    }
}

/// Anchor relative program paths (like `./main`) to the working directory.
///
/// Bare names (like `g++`) are left for PATH lookup, absolute paths are left
/// unchanged.
pub fn resolve_program(program: &str, working_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(program);
    match working_dir {
        Some(dir) if program.contains('/') && path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
