//! Configuration file loading for Arbiter
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};

use crate::config::{Config, ConfigError, ENV_PREFIX, Language};

impl Config {
    /// Load configuration from a file, then apply `ARBITER__*` environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        for id in self.languages.keys() {
            if id.parse::<Language>().is_err() {
                return Err(ConfigError::Invalid(format!(
                    "unknown language '{id}' (expected one of python, c, cpp, java)"
                )));
            }
        }

        for lang in Language::ALL {
            let profile = self.profile(lang)?;
            let id = lang.id();

            if profile.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if profile.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if profile.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref compile) = profile.compile {
                if compile.command.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty compile command"
                    )));
                }
                if compile.source_name.is_empty() || compile.output_name.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty source or output name"
                    )));
                }
            }
        }

        let limits = &self.limits;
        for (field, value) in [
            ("compile_time_limit", limits.compile_time_limit),
            ("adhoc_time_limit", limits.adhoc_time_limit),
            ("kill_grace", limits.kill_grace),
        ] {
            if !value.is_finite() || value <= 0.0 || Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "limits.{field} must be a positive number of seconds, got {value}"
                )));
            }
        }
        if limits.max_output == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_output must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}
