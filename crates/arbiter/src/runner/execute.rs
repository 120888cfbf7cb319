//! Execution step for code running
//!
//! Runs the compiled or interpreted program once against one input.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::JudgeLimits;
use crate::process::{ProcessCommand, run_batch};
use crate::runner::compile::output_cap;
use crate::types::ExecutionResult;
use crate::workspace::Workspace;

/// Execute the workspace program with batch I/O
///
/// Never fails; spawn problems come back as
/// [`ExecutionStatus::SpawnFailed`](crate::types::ExecutionStatus::SpawnFailed).
#[instrument(skip(workspace, input, limits), fields(token = %workspace.token()))]
pub async fn execute(
    workspace: &Workspace,
    input: &[u8],
    timeout: Duration,
    limits: &JudgeLimits,
) -> ExecutionResult {
    let run = &workspace.profile().run;

    let command = ProcessCommand::from_line(run, timeout)
        .working_dir(workspace.dir())
        .kill_grace(limits.kill_grace())
        .max_output(output_cap(limits));

    debug!(argv = ?run.argv, "executing program");

    run_batch(command, input).await
}
