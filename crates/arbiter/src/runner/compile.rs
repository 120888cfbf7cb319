//! Compilation step for code execution
//!
//! Handles compiling source code using language-specific compilers.

use tracing::{debug, instrument};

use crate::config::JudgeLimits;
use crate::process::{ProcessCommand, run_batch};
use crate::runner::CompileError;
use crate::types::{ExecutionResult, ExecutionStatus};
use crate::workspace::Workspace;

/// Result of a compilation
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Whether compilation succeeded
    pub success: bool,

    /// Execution result from the compilation process
    pub execution: ExecutionResult,

    /// Compiler output (stdout followed by stderr)
    pub output: String,
}

impl CompileResult {
    /// Check if compilation was successful
    pub fn is_success(&self) -> bool {
        self.success && self.execution.exit_code == Some(0)
    }

    /// Check if the compiler ran out of time
    pub fn timed_out(&self) -> bool {
        self.execution.status == ExecutionStatus::TimeLimitExceeded
    }
}

/// Compile the workspace source with the workspace's profile
///
/// Compiler failures and timeouts are reported through [`CompileResult`];
/// an `Err` means the compiler itself could not be run.
#[instrument(skip(workspace, limits), fields(token = %workspace.token()))]
pub async fn compile(
    workspace: &mut Workspace,
    limits: &JudgeLimits,
) -> Result<CompileResult, CompileError> {
    let profile = workspace.profile();
    let compile_line = profile
        .compile
        .clone()
        .ok_or_else(|| CompileError::NotCompiled(profile.name.clone()))?;
    let binary = profile.binary.clone();

    let command = ProcessCommand::from_line(&compile_line, limits.compile_timeout())
        .working_dir(workspace.dir())
        .kill_grace(limits.kill_grace())
        .max_output(output_cap(limits));

    debug!(
        argv = ?compile_line.argv,
        source = %workspace.source_path().display(),
        "running compiler"
    );

    let result = run_batch(command, b"").await;

    if result.status == ExecutionStatus::SpawnFailed {
        return Err(CompileError::Spawn(
            result
                .message
                .unwrap_or_else(|| "compiler could not be started".to_owned()),
        ));
    }

    // The artifact is tracked even on failure so a partial output is removed too
    if let Some(ref binary) = binary {
        workspace.track(binary);
    }

    let mut output = combine_output(&result);
    let mut success = result.is_success();

    if result.status == ExecutionStatus::TimeLimitExceeded {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&format!(
            "Compilation timed out after {} seconds.",
            limits.compile_time_limit
        ));
    }

    if success
        && let Some(ref binary) = binary
        && !workspace.file_exists(binary).await?
    {
        success = false;
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&format!("compiler produced no output file '{binary}'"));
    }

    debug!(
        success,
        exit_code = ?result.exit_code,
        status = ?result.status,
        "compilation complete"
    );

    Ok(CompileResult {
        success,
        execution: result,
        output,
    })
}

pub(crate) fn output_cap(limits: &JudgeLimits) -> usize {
    usize::try_from(limits.max_output).unwrap_or(usize::MAX)
}

/// Combine stdout and stderr for compiler output
fn combine_output(result: &ExecutionResult) -> String {
    let mut compiler_output = result.stdout_lossy();
    let stderr = result.stderr_lossy();
    if !compiler_output.is_empty() && !stderr.is_empty() {
        compiler_output.push('\n');
    }
    compiler_output.push_str(&stderr);
    compiler_output
}
