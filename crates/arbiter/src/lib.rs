//! A library for judging submitted programs.
//!
//! Arbiter compiles source code in Python, C, C++ or Java, runs it against
//! test cases with a wall clock limit and returns a single verdict. Each
//! request gets its own workspace directory that is removed on every exit
//! path, so any number of requests can be judged concurrently.
//!
//! # Features
//!
//! - **Multi-language**: compiled and interpreted languages described as TOML profiles.
//! - **Deadlines**: each run races a timer; expiry kills the whole process group.
//! - **Fail-fast grading**: test cases run in order and judging stops at the first failure.
//! - **Ad-hoc runs**: execute once against custom input without grading.
//!
//! # Example
//!
//! ```no_run
//! use arbiter::{JudgeRequest, Language, Runner, TestCase};
//!
//! # async fn example() -> Result<(), arbiter::JudgeError> {
//! let runner = Runner::with_defaults();
//! let request = JudgeRequest::submission(
//!     "a = int(input())\nb = int(input())\nprint(a + b)\n",
//!     Language::Python,
//!     2.0,
//!     vec![TestCase::new("3\n4\n", "7")],
//! );
//!
//! let result = runner.judge(&request).await?;
//! println!("{}: {}", result.verdict, result.output);
//! # Ok(())
//! # }
//! ```
//!
//! There is no sandbox: submitted programs run with the privileges of the
//! judging process.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, JudgeLimits, Language, LanguageProfile};
pub use process::{ProcessCommand, run_batch};
pub use runner::{CompileError, CompileResult, JudgeError, Runner};
pub use types::{
    ExecutionResult, ExecutionStatus, JudgeMode, JudgeRequest, JudgeResult, TestCase,
    TestCaseOutcome, TestCaseStatus, Verdict,
};
pub use workspace::{Workspace, WorkspaceError, WorkspaceManager};

pub mod config;
pub mod process;
pub mod runner;
pub mod types;
pub mod workspace;
