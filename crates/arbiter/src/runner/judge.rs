//! Verdict aggregation
//!
//! Drives one request through compile and execution and folds the stage
//! results into a single [`JudgeResult`].

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::runner::{JudgeError, Runner};
use crate::types::{
    ExecutionResult, ExecutionStatus, JudgeMode, JudgeRequest, JudgeResult, TestCase,
    TestCaseOutcome, TestCaseStatus, Verdict,
};
use crate::workspace::Workspace;

/// Why a single run did not produce gradeable output
#[derive(Debug)]
struct RunFailure {
    status: TestCaseStatus,
    diagnostic: String,
    error: Option<String>,
}

#[instrument(skip_all, fields(language = %request.language, submission = request.is_submission()))]
pub(super) async fn judge(
    runner: &Runner,
    request: &JudgeRequest,
) -> Result<JudgeResult, JudgeError> {
    request.validate().map_err(JudgeError::InvalidRequest)?;

    let profile = runner
        .config()
        .profile(request.language)
        .map_err(|_| JudgeError::UnsupportedLanguage(request.language.to_string()))?;

    let start = Instant::now();

    let mut result = match runner
        .workspaces()
        .acquire(profile, request.source_code.as_bytes())
        .await
    {
        Ok(mut workspace) => {
            let result = run_pipeline(runner, &mut workspace, request).await;
            workspace.release().await;
            result
        }
        Err(e) => {
            warn!(error = %e, "failed to allocate workspace");
            system_error(&e)
        }
    };

    result.execution_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    info!(
        verdict = %result.verdict,
        failed = result.verdict.is_failure(),
        elapsed_ms = result.execution_time_ms,
        cases = result.per_test_case_results.len(),
        "request judged"
    );

    Ok(result)
}

async fn run_pipeline(
    runner: &Runner,
    workspace: &mut Workspace,
    request: &JudgeRequest,
) -> JudgeResult {
    if workspace.profile().compile.is_some() {
        match runner.compile(workspace).await {
            Ok(compiled) if compiled.is_success() => {}
            Ok(compiled) => {
                debug!(timed_out = compiled.timed_out(), "compilation failed");
                return verdict(
                    Verdict::CompilationError,
                    format!("Compilation Error:\n{}", compiled.output),
                    None,
                );
            }
            Err(e) => {
                warn!(error = %e, "compiler could not run");
                return system_error(&e);
            }
        }
    }

    match &request.mode {
        JudgeMode::Submission {
            time_limit_seconds,
            test_cases,
        } => run_submission(runner, workspace, *time_limit_seconds, test_cases).await,
        JudgeMode::Adhoc { custom_input } => {
            run_adhoc(runner, workspace, custom_input.as_deref().unwrap_or("")).await
        }
    }
}

/// Run every test case in order, stopping at the first failure
async fn run_submission(
    runner: &Runner,
    workspace: &Workspace,
    time_limit_seconds: f64,
    test_cases: &[TestCase],
) -> JudgeResult {
    let timeout = Duration::try_from_secs_f64(time_limit_seconds).unwrap_or(Duration::MAX);
    let mut outcomes = Vec::with_capacity(test_cases.len());

    for (i, case) in test_cases.iter().enumerate() {
        let index = i + 1;
        let execution = runner.run(workspace, case.input.as_bytes(), timeout).await;
        let actual_output = execution.stdout_lossy();

        if execution.output_truncated {
            debug!(index, "program output was truncated");
        }

        if let Some(failure) = run_failure(&execution, time_limit_seconds) {
            debug!(index, status = ?failure.status, "test case failed");
            let output = format!("Test Case {index}: {}", failure.diagnostic);
            let error = match failure.status {
                TestCaseStatus::TimeLimitExceeded => None,
                _ => failure.error,
            };
            outcomes.push(TestCaseOutcome {
                index,
                status: failure.status,
                actual_output,
                diagnostic: Some(failure.diagnostic),
            });
            return JudgeResult {
                per_test_case_results: outcomes,
                ..verdict(failure.status.into(), output, error)
            };
        }

        if !outputs_match(&actual_output, &case.expected_output) {
            debug!(index, "wrong answer");
            let diagnostic = wrong_answer_diagnostic(index, case, &actual_output);
            outcomes.push(TestCaseOutcome {
                index,
                status: TestCaseStatus::WrongAnswer,
                actual_output,
                diagnostic: Some(diagnostic.clone()),
            });
            return JudgeResult {
                per_test_case_results: outcomes,
                ..verdict(Verdict::WrongAnswer, diagnostic, None)
            };
        }

        debug!(index, wall_time = ?execution.wall_time, "test case passed");
        outcomes.push(TestCaseOutcome {
            index,
            status: TestCaseStatus::Accepted,
            actual_output,
            diagnostic: None,
        });
    }

    JudgeResult {
        per_test_case_results: outcomes,
        ..verdict(
            Verdict::Accepted,
            format!("All {} test cases passed.", test_cases.len()),
            None,
        )
    }
}

/// Run once against the custom input without grading
async fn run_adhoc(runner: &Runner, workspace: &Workspace, input: &str) -> JudgeResult {
    let limits = &runner.config().limits;
    let execution = runner
        .run(workspace, input.as_bytes(), limits.adhoc_timeout())
        .await;

    if let Some(failure) = run_failure(&execution, limits.adhoc_time_limit) {
        return verdict(
            failure.status.into(),
            failure.diagnostic.clone(),
            Some(failure.diagnostic),
        );
    }

    let stderr = execution.stderr_lossy();
    verdict(
        Verdict::RunComplete,
        execution.stdout_lossy(),
        (!stderr.is_empty()).then_some(stderr),
    )
}

/// Classify a run that did not exit cleanly
fn run_failure(execution: &ExecutionResult, limit_seconds: f64) -> Option<RunFailure> {
    let stderr = execution.stderr_lossy();
    let stderr_text = if stderr.is_empty() {
        "No stderr"
    } else {
        stderr.as_str()
    };

    let (status, diagnostic) = match execution.status {
        ExecutionStatus::Ok => return None,
        ExecutionStatus::TimeLimitExceeded => (
            TestCaseStatus::TimeLimitExceeded,
            format!("Execution timed out after {limit_seconds} seconds."),
        ),
        ExecutionStatus::SpawnFailed => (
            TestCaseStatus::RuntimeError,
            format!(
                "Failed to execute: {}",
                execution.message.as_deref().unwrap_or("unknown error")
            ),
        ),
        ExecutionStatus::Signaled => (
            TestCaseStatus::RuntimeError,
            format!(
                "Process terminated by signal {}. Stderr: {stderr_text}",
                execution.signal.unwrap_or_default()
            ),
        ),
        ExecutionStatus::RuntimeError => {
            let diagnostic = match (execution.exit_code, &execution.message) {
                (Some(code), _) => format!("Process exited with code {code}. Stderr: {stderr_text}"),
                (None, Some(message)) => format!("Failed to execute: {message}"),
                (None, None) => format!("Process exited abnormally. Stderr: {stderr_text}"),
            };
            (TestCaseStatus::RuntimeError, diagnostic)
        }
    };

    let error = if stderr.is_empty() {
        execution.message.clone()
    } else {
        Some(stderr)
    };

    Some(RunFailure {
        status,
        diagnostic,
        error,
    })
}

/// Compare outputs ignoring leading and trailing whitespace
fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

fn wrong_answer_diagnostic(index: usize, case: &TestCase, actual: &str) -> String {
    format!(
        "Test Case {index} Failed.\nInput:\n{}\n\nExpected Output:\n{}\n\nYour Output:\n{}",
        case.input, case.expected_output, actual
    )
}

fn system_error(error: &dyn std::error::Error) -> JudgeResult {
    let message = error.to_string();
    verdict(
        Verdict::Error,
        format!("An unexpected system error occurred: {message}"),
        Some(message),
    )
}

fn verdict(verdict: Verdict, output: String, error: Option<String>) -> JudgeResult {
    JudgeResult {
        verdict,
        output,
        error,
        execution_time_ms: 0,
        per_test_case_results: Vec::new(),
    }
}
