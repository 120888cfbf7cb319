//! Arbiter CLI
//!
//! A command-line tool for judging submitted programs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arbiter::{Config, EXAMPLE_CONFIG, JudgeRequest, JudgeResult, Language, Runner, TestCase};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(about = "A tool for compiling, running and judging submitted programs")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: arbiter.toml)
        #[arg(short, long, default_value = "arbiter.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Judge a JSON request and print the JSON result
    Judge {
        /// Request file, or "-" to read from stdin
        #[arg(value_name = "REQUEST", default_value = "-")]
        request: String,
    },

    /// Run a program once against custom input (ad-hoc mode)
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (python, c, cpp, java)
        #[arg(short, long)]
        language: Language,

        /// Input file (default: empty input)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Grade a program against a JSON file of test cases
    Submit {
        /// Source file to grade
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (python, c, cpp, java)
        #[arg(short, long)]
        language: Language,

        /// JSON array of {"input", "expectedOutput"} objects
        #[arg(long, value_name = "FILE")]
        tests: PathBuf,

        /// Time limit per test case in seconds
        #[arg(short, long, default_value = "2.0")]
        time_limit: f64,
    },

    /// List available languages
    Languages,

    /// Show the active configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Judge { request } => {
            let raw = read_request(&request).await?;
            let request: JudgeRequest =
                serde_json::from_str(&raw).context("failed to parse judge request")?;
            judge(config, request).await
        }
        Commands::Run {
            source,
            language,
            input,
        } => {
            let source_code = read_source(&source).await?;
            let custom_input = match input {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("failed to read input file '{}'", path.display()))?,
                ),
                None => None,
            };
            judge(config, JudgeRequest::adhoc(source_code, language, custom_input)).await
        }
        Commands::Submit {
            source,
            language,
            tests,
            time_limit,
        } => {
            let source_code = read_source(&source).await?;
            let raw = tokio::fs::read_to_string(&tests)
                .await
                .with_context(|| format!("failed to read test file '{}'", tests.display()))?;
            let test_cases: Vec<TestCase> =
                serde_json::from_str(&raw).context("failed to parse test cases")?;
            let request = JudgeRequest::submission(source_code, language, time_limit, test_cases);
            judge(config, request).await
        }
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn judge(config: Config, request: JudgeRequest) -> Result<()> {
    info!(language = %request.language, submission = request.is_submission(), "judging");

    let runner = Runner::new(config);
    let result = runner
        .judge_until(&request, shutdown_signal())
        .await
        .context("judging failed")?;

    report(&result)
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn report(result: &JudgeResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("failed to serialize result")?;
    println!("{json}");

    info!(
        verdict = %result.verdict,
        time = format_args!("{}ms", result.execution_time_ms),
        "judging complete"
    );

    Ok(())
}

async fn read_request(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("failed to read request from stdin")?;
        Ok(raw)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read request file '{source}'"))
    }
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read source file '{}'", path.display()))
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    for language in Language::ALL {
        match config.profile(language) {
            Ok(profile) => {
                let kind = if profile.is_compiled() {
                    "compiled"
                } else {
                    "interpreted"
                };
                println!("  {:<10} {} ({})", language.id(), profile.name, kind);
            }
            Err(_) => println!("  {:<10} (not configured)", language.id()),
        }
    }
}

fn show_config(config: &Config) {
    let limits = &config.limits;
    println!("Artifact root: {}", config.artifact_root.display());
    println!();
    println!("Limits:");
    println!("  Compile time limit: {}s", limits.compile_time_limit);
    println!("  Ad-hoc time limit: {}s", limits.adhoc_time_limit);
    println!("  Kill grace: {}s", limits.kill_grace);
    println!("  Max output: {} bytes", limits.max_output);
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
