//! Workspace lifecycle management
//!
//! Allocates, populates and removes per-request workspace directories.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::config::{LanguageProfile, ResolvedProfile};
use crate::workspace::{WorkspaceError, matches_pattern, new_token, validate_name};

/// Files belonging to one judging request
///
/// # Cleanup
///
/// Call [`release()`](Self::release) once the request is finished. A
/// workspace dropped without release (for example because the judging future
/// was cancelled) removes its directory synchronously in `Drop` and logs a
/// warning.
#[derive(Debug)]
pub struct Workspace {
    /// Request-unique token
    token: String,

    /// Absolute path of the workspace directory
    dir: PathBuf,

    /// Language profile bound to this workspace
    profile: ResolvedProfile,

    /// Names of files created in the directory
    files: Vec<String>,

    /// Whether release() already ran
    released: bool,
}

impl Workspace {
    /// Get the request token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the workspace directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the resolved language profile
    pub fn profile(&self) -> &ResolvedProfile {
        &self.profile
    }

    /// Get the host path to a file inside the workspace
    pub fn file_path(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Host path of the source file
    pub fn source_path(&self) -> PathBuf {
        self.dir.join(&self.profile.source)
    }

    /// Write a file into the workspace and track it for removal
    #[instrument(skip(self, content), fields(token = %self.token))]
    pub async fn write_file(&mut self, name: &str, content: &[u8]) -> Result<(), WorkspaceError> {
        let path = self.file_path(name)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        self.track(name);
        debug!(?path, len = content.len(), "wrote file to workspace");
        Ok(())
    }

    /// Check if a file exists in the workspace
    pub async fn file_exists(&self, name: &str) -> Result<bool, WorkspaceError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    /// Record a file produced by a stage (e.g. the compiled binary)
    pub fn track(&mut self, name: &str) {
        if !self.files.iter().any(|f| f == name) {
            self.files.push(name.to_owned());
        }
    }

    /// Names of the files tracked so far
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Remove every artifact and the workspace directory
    ///
    /// Failures are logged and swallowed: by the time a workspace is released
    /// the verdict is already decided.
    #[instrument(skip(self), fields(token = %self.token))]
    pub async fn release(mut self) {
        self.released = true;
        debug!(files = ?self.files(), "releasing workspace");

        for name in self.files() {
            remove_file_logged(&self.dir.join(name)).await;
        }

        for pattern in &self.profile.artifacts {
            if pattern.contains('*') {
                self.remove_matching(pattern).await;
            } else if validate_name(pattern).is_ok() {
                remove_file_logged(&self.dir.join(pattern)).await;
            }
        }

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(dir = %self.dir.display(), "workspace released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "failed to remove workspace"),
        }
    }

    async fn remove_matching(&self, pattern: &str) {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(dir = %self.dir.display(), error = %e, "failed to list workspace");
                }
                return;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name();
                    if matches_pattern(pattern, &name.to_string_lossy()) {
                        remove_file_logged(&entry.path()).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "failed to list workspace");
                    break;
                }
            }
        }
    }
}

async fn remove_file_logged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(?path, "removed artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(?path, error = %e, "failed to remove artifact"),
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        warn!(
            token = %self.token,
            dir = %self.dir.display(),
            "workspace dropped without release, removing synchronously"
        );

        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(token = %self.token, "best-effort workspace removal succeeded"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(token = %self.token, error = %e, "best-effort workspace removal failed"),
        }
    }
}

/// Allocates workspaces under a shared artifact root
///
/// The root is only a namespace: every workspace gets its own directory, so
/// concurrent requests share no mutable state.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Create a manager for the given artifact root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the artifact root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a workspace and write the source file into it
    #[instrument(skip(self, profile, source), fields(language = %profile.name))]
    pub async fn acquire(
        &self,
        profile: &LanguageProfile,
        source: &[u8],
    ) -> Result<Workspace, WorkspaceError> {
        let root = std::path::absolute(&self.root)?;
        tokio::fs::create_dir_all(&root).await?;

        let token = new_token();
        let dir = root.join(&token);

        // create_dir fails on an existing directory, so a duplicate token can
        // never make two requests share files.
        if let Err(e) = tokio::fs::create_dir(&dir).await {
            return Err(if e.kind() == ErrorKind::AlreadyExists {
                WorkspaceError::Collision(dir)
            } else {
                WorkspaceError::Io(e)
            });
        }

        let resolved = profile.resolve(&token, &dir.to_string_lossy());
        let mut workspace = Workspace {
            token,
            dir,
            profile: resolved,
            files: Vec::new(),
            released: false,
        };

        debug!(dir = %workspace.dir.display(), "workspace created");

        let source_name = workspace.profile.source.clone();
        workspace.write_file(&source_name, source).await?;

        Ok(workspace)
    }
}
