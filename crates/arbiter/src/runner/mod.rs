//! Judging pipeline for Arbiter
//!
//! Provides the high-level API that turns a [`JudgeRequest`] into a
//! [`JudgeResult`]: workspace allocation, compilation, execution and verdict
//! aggregation.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{instrument, warn};

pub use crate::runner::compile::{CompileResult, compile};
pub use crate::runner::execute::execute;

mod compile;
mod execute;
mod judge;

use crate::{
    config::Config,
    types::{ExecutionResult, JudgeRequest, JudgeResult},
    workspace::{Workspace, WorkspaceError, WorkspaceManager},
};

/// Errors that occur during compilation
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("language '{0}' does not support compilation")]
    NotCompiled(String),

    #[error("failed to start compiler: {0}")]
    Spawn(String),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
}

/// Errors returned to the caller instead of a verdict
///
/// Only pre-flight problems and cancellation end up here; everything that goes
/// wrong with the submitted program is a [`JudgeResult`].
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("judging was cancelled")]
    Cancelled,
}

/// High-level runner for judging requests
///
/// Holds only immutable configuration, so one runner can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct Runner {
    config: Config,
    workspaces: WorkspaceManager,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        let workspaces = WorkspaceManager::new(config.artifact_root.clone());
        Self { config, workspaces }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the workspace manager
    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Compile the source in a workspace
    pub async fn compile(&self, workspace: &mut Workspace) -> Result<CompileResult, CompileError> {
        compile::compile(workspace, &self.config.limits).await
    }

    /// Run the workspace program once with the given input
    pub async fn run(
        &self,
        workspace: &Workspace,
        input: &[u8],
        timeout: Duration,
    ) -> ExecutionResult {
        execute::execute(workspace, input, timeout, &self.config.limits).await
    }

    /// Judge a request
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError::InvalidRequest`] or
    /// [`JudgeError::UnsupportedLanguage`] before any file is written. Every
    /// later failure, including infrastructure faults, is reported as a
    /// verdict.
    pub async fn judge(&self, request: &JudgeRequest) -> Result<JudgeResult, JudgeError> {
        judge::judge(self, request).await
    }

    /// Judge a request unless `shutdown` resolves first
    ///
    /// When `shutdown` wins, the judging future is dropped: the running child
    /// process group is killed and the workspace removed before this returns.
    #[instrument(skip_all, fields(language = %request.language))]
    pub async fn judge_until<F>(
        &self,
        request: &JudgeRequest,
        shutdown: F,
    ) -> Result<JudgeResult, JudgeError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.judge(request) => result,
            () = shutdown => {
                warn!("judging cancelled by caller");
                Err(JudgeError::Cancelled)
            }
        }
    }
}
