//! Per-request workspaces
//!
//! Every judging request owns a directory named after a request-unique token
//! under the configured artifact root. The directory holds the source file and
//! any compiled artifacts, and is removed when the request finishes, whatever
//! the outcome.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use uuid::Uuid;

pub use crate::workspace::manager::{Workspace, WorkspaceManager};

mod manager;

/// Errors that occur while preparing a workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace directory already exists: {0}")]
    Collision(PathBuf),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Generate a request-unique token: `<unix-millis>-<uuid-v4>`
///
/// The timestamp only aids debugging; uniqueness comes from the random part.
pub fn new_token() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{millis}-{}", Uuid::new_v4().simple())
}

/// Reject names that would escape the workspace directory
pub(crate) fn validate_name(name: &str) -> Result<(), WorkspaceError> {
    if name.is_empty() || name.contains("..") || name.starts_with('/') || name.contains('\0') {
        return Err(WorkspaceError::InvalidPath(format!(
            "path traversal not allowed: {name:?}"
        )));
    }
    Ok(())
}

/// Match a file name against a pattern with at most one `*` wildcard
pub(crate) fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
        None => pattern == name,
    }
}
