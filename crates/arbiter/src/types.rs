use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Language;

/// A single (input, expected output) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// What the judge should do with the submitted program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum JudgeMode {
    /// Grade against stored test cases
    Submission {
        time_limit_seconds: f64,
        test_cases: Vec<TestCase>,
    },

    /// Run once against arbitrary input, no grading
    Adhoc {
        #[serde(default)]
        custom_input: Option<String>,
    },
}

/// Everything the engine needs to judge one program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeRequest {
    pub source_code: String,
    pub language: Language,
    #[serde(flatten)]
    pub mode: JudgeMode,
}

impl JudgeRequest {
    /// Build a submission request
    pub fn submission(
        source_code: impl Into<String>,
        language: Language,
        time_limit_seconds: f64,
        test_cases: Vec<TestCase>,
    ) -> Self {
        Self {
            source_code: source_code.into(),
            language,
            mode: JudgeMode::Submission {
                time_limit_seconds,
                test_cases,
            },
        }
    }

    /// Build an ad-hoc run request
    pub fn adhoc(
        source_code: impl Into<String>,
        language: Language,
        custom_input: Option<String>,
    ) -> Self {
        Self {
            source_code: source_code.into(),
            language,
            mode: JudgeMode::Adhoc { custom_input },
        }
    }

    pub fn is_submission(&self) -> bool {
        matches!(self.mode, JudgeMode::Submission { .. })
    }

    /// Pre-flight checks; failures here are caller errors, not verdicts
    pub fn validate(&self) -> Result<(), String> {
        if self.source_code.trim().is_empty() {
            return Err("source code is empty".to_owned());
        }
        if let JudgeMode::Submission {
            time_limit_seconds,
            test_cases,
        } = &self.mode
        {
            if !time_limit_seconds.is_finite() || *time_limit_seconds <= 0.0 {
                return Err(format!(
                    "time limit must be a positive number of seconds, got {time_limit_seconds}"
                ));
            }
            if test_cases.is_empty() {
                return Err("submission has no test cases".to_owned());
            }
        }
        Ok(())
    }
}

/// Final classification of a judging request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    RuntimeError,
    CompilationError,
    /// Infrastructure fault inside the judge
    Error,
    /// Ad-hoc run finished; nothing was graded
    RunComplete,
}

impl Verdict {
    /// Check if the verdict blames the submitted program
    pub fn is_failure(&self) -> bool {
        !matches!(self, Verdict::Accepted | Verdict::RunComplete)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::CompilationError => "Compilation Error",
            Verdict::Error => "Error",
            Verdict::RunComplete => "Run Complete",
        };
        f.write_str(text)
    }
}

/// Status of one executed test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestCaseStatus {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    RuntimeError,
}

impl From<TestCaseStatus> for Verdict {
    fn from(status: TestCaseStatus) -> Self {
        match status {
            TestCaseStatus::Accepted => Verdict::Accepted,
            TestCaseStatus::WrongAnswer => Verdict::WrongAnswer,
            TestCaseStatus::TimeLimitExceeded => Verdict::TimeLimitExceeded,
            TestCaseStatus::RuntimeError => Verdict::RuntimeError,
        }
    }
}

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseOutcome {
    /// 1-based position in the submitted order
    pub index: usize,
    pub status: TestCaseStatus,
    pub actual_output: String,
    pub diagnostic: Option<String>,
}

/// Result of one judging request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeResult {
    pub verdict: Verdict,
    pub output: String,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_test_case_results: Vec<TestCaseOutcome>,
}

/// Status of a single child process run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Program exited with code 0
    Ok,

    /// Program exited with a non-zero code
    RuntimeError,

    /// Deadline expired and the process group was killed
    TimeLimitExceeded,

    /// Program was killed by a signal it did not receive from the judge
    Signaled,

    /// The command could not be started
    SpawnFailed,
}

/// Result of running one child process
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,

    /// Wall clock time from spawn to exit
    pub wall_time: Duration,

    /// Exit code if the program exited normally
    pub exit_code: Option<i32>,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,

    /// Spawn or I/O failure description
    pub message: Option<String>,

    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,

    /// Whether either stream hit the capture cap
    pub output_truncated: bool,
}

impl ExecutionResult {
    /// Check if the execution was successful (exited with code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Ok) && self.exit_code == Some(0)
    }

    /// Result for a command that never started
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::SpawnFailed,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self {
            status: ExecutionStatus::Ok,
            wall_time: Duration::ZERO,
            exit_code: None,
            signal: None,
            message: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
            output_truncated: false,
        }
    }
}
