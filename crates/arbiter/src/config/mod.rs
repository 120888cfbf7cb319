use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::language::{
    CommandLine, CompileConfig, FileExtension, Language, LanguageProfile, Placeholders,
    ResolvedProfile, RunConfig, UnsupportedLanguage,
};

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../arbiter.example.toml");

/// Prefix for environment variable overrides (e.g. `ARBITER__LIMITS__KILL_GRACE`)
pub const ENV_PREFIX: &str = "ARBITER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("no profile configured for language '{0}'")]
    MissingLanguage(Language),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Arbiter
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory under which every request gets its own workspace
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,

    /// Engine-wide limits
    #[serde(default)]
    pub limits: JudgeLimits,

    /// Language profiles keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, LanguageProfile>,
}

/// Limits that do not depend on the problem being judged
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeLimits {
    /// Compile step budget in seconds
    pub compile_time_limit: f64,

    /// Ad-hoc run budget in seconds
    pub adhoc_time_limit: f64,

    /// Seconds between SIGTERM and SIGKILL once a deadline expires
    pub kill_grace: f64,

    /// Maximum captured bytes per output stream
    pub max_output: u64,
}

impl JudgeLimits {
    pub fn compile_timeout(&self) -> Duration {
        seconds(self.compile_time_limit)
    }

    pub fn adhoc_timeout(&self) -> Duration {
        seconds(self.adhoc_time_limit)
    }

    pub fn kill_grace(&self) -> Duration {
        seconds(self.kill_grace)
    }
}

/// Convert a limit in seconds, saturating values that do not fit a `Duration`
fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

impl Default for JudgeLimits {
    fn default() -> Self {
        Self {
            compile_time_limit: 10.0,
            adhoc_time_limit: 5.0,
            kill_grace: 0.2,
            max_output: 64 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            artifact_root: default_artifact_root(),
            limits: JudgeLimits::default(),
            languages: HashMap::new(),
        }
    }

    /// Get the profile for a language
    pub fn profile(&self, language: Language) -> Result<&LanguageProfile, ConfigError> {
        self.languages
            .get(language.id())
            .ok_or(ConfigError::MissingLanguage(language))
    }

    /// Replace the artifact root
    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = root.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_artifact_root() -> PathBuf {
    std::env::temp_dir().join("arbiter")
}
