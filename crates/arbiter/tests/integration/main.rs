//! Integration tests for arbiter
//!
//! Most tests use `fixtures/configs/sh_languages.toml`, which backs every
//! language with POSIX sh, so they run anywhere. Tests against the real
//! compilers and interpreters need python3, gcc, g++ and a JDK:
//!    cargo test -p arbiter --features toolchain-tests

use std::fs;
use std::path::Path;

use arbiter::config::Config;
use arbiter::{Runner, TestCase};

mod cleanup;
mod config_loading;
mod judging;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Load a fixture config with its artifact root moved under `root`
pub(crate) fn fixture_config(name: &str, root: &Path) -> Config {
    let path = format!("{FIXTURES_PATH}/configs/{name}");
    Config::from_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load config {path}: {e}"))
        .with_artifact_root(root)
}

/// Runner whose languages are all backed by sh
pub(crate) fn sh_runner(root: &Path) -> Runner {
    Runner::new(fixture_config("sh_languages.toml", root))
}

/// Test cases for the two-line sum program
pub(crate) fn sum_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("3\n4\n", "7"),
        TestCase::new("10\n-2\n", "8\n"),
        TestCase::new("0\n0\n", "0"),
    ]
}

/// Number of entries left in the artifact root
pub(crate) fn leftover_entries(root: &Path) -> usize {
    match fs::read_dir(root) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// Whether a pid still names a live (non-zombie) process
pub(crate) fn process_alive(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        // The state letter follows the parenthesised command name
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .is_some_and(|state| state != 'Z' && state != 'X'),
        Err(_) => false,
    }
}
