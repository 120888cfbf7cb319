use arbiter::{JudgeRequest, Language, Runner, TestCase, Verdict};

use super::{fixture_config, fixture_source, leftover_entries, sh_runner, sum_cases};

/// One request per reachable verdict
fn requests_by_verdict() -> Vec<(Verdict, JudgeRequest)> {
    vec![
        (
            Verdict::Accepted,
            JudgeRequest::submission(fixture_source("sum.sh"), Language::C, 2.0, sum_cases()),
        ),
        (
            Verdict::WrongAnswer,
            JudgeRequest::submission(fixture_source("product.sh"), Language::C, 2.0, sum_cases()),
        ),
        (
            Verdict::TimeLimitExceeded,
            JudgeRequest::submission(fixture_source("spin.sh"), Language::C, 0.2, sum_cases()),
        ),
        (
            Verdict::RuntimeError,
            JudgeRequest::submission(fixture_source("crash.sh"), Language::C, 2.0, sum_cases()),
        ),
        (
            Verdict::CompilationError,
            JudgeRequest::submission(
                fixture_source("syntax_error.sh"),
                Language::C,
                2.0,
                sum_cases(),
            ),
        ),
        (
            Verdict::RunComplete,
            JudgeRequest::adhoc(fixture_source("echo.sh"), Language::C, Some("x".to_owned())),
        ),
    ]
}

#[tokio::test]
async fn test_artifact_root_empty_after_every_verdict() {
    let root = tempfile::tempdir().unwrap();
    let runner = sh_runner(root.path());

    for (expected, request) in requests_by_verdict() {
        let result = runner.judge(&request).await.unwrap();
        assert_eq!(result.verdict, expected, "{}", result.output);
        assert_eq!(
            leftover_entries(root.path()),
            0,
            "artifacts left behind after {expected}"
        );
    }
}

#[tokio::test]
async fn test_extra_artifacts_are_removed() {
    let root = tempfile::tempdir().unwrap();
    let request = JudgeRequest::submission(
        fixture_source("sum.sh"),
        Language::Java,
        2.0,
        vec![TestCase::new("1\n2\n", "3")],
    );

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::Accepted, "{}", result.output);
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn test_system_error_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let mut config = fixture_config("sh_languages.toml", root.path());
    let compile = config
        .languages
        .get_mut("c")
        .and_then(|profile| profile.compile.as_mut())
        .unwrap();
    compile.command = vec!["/nonexistent/arbiter-cc".to_owned(), "{source}".to_owned()];

    let request =
        JudgeRequest::submission(fixture_source("sum.sh"), Language::C, 2.0, sum_cases());
    let result = Runner::new(config).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::Error);
    assert!(
        result
            .output
            .starts_with("An unexpected system error occurred: ")
    );
    assert!(result.per_test_case_results.is_empty());
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn test_unwritable_root_is_system_error() {
    let root = tempfile::tempdir().unwrap();
    // A regular file where the artifact root should be
    let blocker = root.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    let request = JudgeRequest::adhoc("echo hi\n", Language::Python, None);
    let result = sh_runner(&blocker).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::Error);
    assert!(result.error.is_some());
}
