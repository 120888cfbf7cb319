use arbiter::config::{Config, ConfigError, Language};

use super::FIXTURES_PATH;

fn config_path(name: &str) -> String {
    format!("{FIXTURES_PATH}/configs/{name}")
}

#[test]
fn test_load_sh_languages_config() {
    let config = Config::from_file(config_path("sh_languages.toml")).expect("Failed to load config");

    assert_eq!(config.languages.len(), 4);
    assert_eq!(config.limits.adhoc_time_limit, 1.0);
    // Unset limits keep their defaults
    assert_eq!(config.limits.max_output, 64 * 1024 * 1024);

    let java = config.profile(Language::Java).unwrap();
    assert_eq!(java.source_name(), "Main.sh");
    assert_eq!(java.artifacts, vec!["*.part".to_owned()]);
}

#[test]
fn test_load_unknown_language() {
    let result = Config::from_file(config_path("invalid_unknown_language.toml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_missing_language() {
    let result = Config::from_file(config_path("invalid_missing_language.toml"));
    assert!(matches!(result, Err(ConfigError::MissingLanguage(Language::C))));
}

#[test]
fn test_load_zero_kill_grace() {
    let result = Config::from_file(config_path("invalid_zero_grace.toml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_empty_run_command() {
    let result = Config::from_file(config_path("invalid_empty_run_command.toml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_empty_output_name() {
    let result = Config::from_file(config_path("invalid_empty_output_name.toml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_missing_file() {
    let result = Config::from_file(config_path("does_not_exist.toml"));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_default_config_covers_all_languages() {
    let config = Config::default();
    for language in Language::ALL {
        let profile = config.profile(language).unwrap();
        assert!(!profile.run.command.is_empty(), "{language} has no run command");
    }
    assert!(!config.profile(Language::Python).unwrap().is_compiled());
    assert!(config.profile(Language::Cpp).unwrap().is_compiled());
}
