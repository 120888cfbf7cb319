use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Languages the judge accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    C,
    Cpp,
    Java,
}

impl Language {
    /// Every supported language, in display order
    pub const ALL: [Language; 4] = [Language::Python, Language::C, Language::Cpp, Language::Java];

    /// Identifier used on the wire and as the config table key
    pub fn id(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error returned when a language identifier is not one of [`Language::ALL`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}'")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.id() == s)
            .ok_or_else(|| UnsupportedLanguage(s.to_owned()))
    }
}

/// Compile and run conventions for one language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Human-readable name for the language (e.g., "C++ 17 (GCC)")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,

    /// Extra artifact names removed when the workspace is released.
    /// A single `*` wildcard is allowed (e.g. "*.class").
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl LanguageProfile {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Source file name template for this language
    pub fn source_name(&self) -> String {
        if let Some(ref compile) = self.compile {
            compile.source_name.clone()
        } else {
            format!("{{token}}.{}", self.extension)
        }
    }

    /// Resolve every template of the profile for one request
    pub fn resolve(&self, token: &str, dir: &str) -> ResolvedProfile {
        let source = expand_name(&self.source_name(), token);
        let binary = self
            .compile
            .as_ref()
            .map(|compile| expand_name(&compile.output_name, token));
        let placeholders = Placeholders {
            source: &source,
            binary: binary.as_deref().unwrap_or(&source),
            dir,
            token,
        };

        let compile = self.compile.as_ref().map(|compile| CommandLine {
            argv: Self::expand_command(&compile.command, &placeholders),
            env: compile.env.clone(),
        });
        let run = CommandLine {
            argv: Self::expand_command(&self.run.command, &placeholders),
            env: self.run.env.clone(),
        };
        let artifacts = self
            .artifacts
            .iter()
            .map(|pattern| expand_name(pattern, token))
            .collect();

        ResolvedProfile {
            name: self.name.clone(),
            source,
            binary,
            compile,
            run,
            artifacts,
        }
    }

    /// Expand placeholders in the given command
    pub fn expand_command(command: &[String], placeholders: &Placeholders<'_>) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", placeholders.source)
                    .replace("{output}", placeholders.binary)
                    .replace("{binary}", placeholders.binary)
                    .replace("{dir}", placeholders.dir)
                    .replace("{token}", placeholders.token)
            })
            .collect()
    }
}

fn expand_name(template: &str, token: &str) -> String {
    template.replace("{token}", token)
}

/// Values substituted into command templates
#[derive(Debug, Clone, Copy)]
pub struct Placeholders<'a> {
    pub source: &'a str,
    pub binary: &'a str,
    pub dir: &'a str,
    pub token: &'a str,
}

/// A command ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub argv: Vec<String>,
    pub env: HashMap<String, String>,
}

/// A language profile bound to one request's workspace
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    /// Human-readable language name
    pub name: String,
    /// Source file name inside the workspace
    pub source: String,
    /// Compiled artifact name inside the workspace (compiled languages only)
    pub binary: Option<String>,
    /// Compile command, if the language is compiled
    pub compile: Option<CommandLine>,
    /// Run command
    pub run: CommandLine,
    /// Extra artifact names or patterns to remove on release
    pub artifacts: Vec<String>,
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl fmt::Display for FileExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}, {dir}, {token}
    pub command: Vec<String>,

    /// Source file name in the workspace (e.g., "{token}.cpp")
    pub source_name: String,

    /// Output artifact name (e.g., "{token}")
    pub output_name: String,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}, {dir}, {token}
    pub command: Vec<String>,

    /// Environment Variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,
}
