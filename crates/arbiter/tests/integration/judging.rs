use std::time::{Duration, Instant};

use arbiter::{JudgeError, JudgeRequest, Language, TestCase, TestCaseStatus, Verdict};

use super::{fixture_source, process_alive, sh_runner, sum_cases};

#[tokio::test]
async fn test_interpreted_submission_accepted() {
    let root = tempfile::tempdir().unwrap();
    let request =
        JudgeRequest::submission(fixture_source("sum.sh"), Language::Python, 2.0, sum_cases());

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::Accepted);
    assert_eq!(result.output, "All 3 test cases passed.");
    assert_eq!(result.error, None);
    let indices: Vec<_> = result.per_test_case_results.iter().map(|o| o.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(result.per_test_case_results[1].actual_output, "8\n");
}

#[tokio::test]
async fn test_compiled_submission_accepted() {
    let root = tempfile::tempdir().unwrap();
    let request =
        JudgeRequest::submission(fixture_source("sum.sh"), Language::C, 2.0, sum_cases());

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::Accepted, "{}", result.output);
}

#[tokio::test]
async fn test_wrong_answer_is_fail_fast() {
    let root = tempfile::tempdir().unwrap();
    let counter = root.path().join("runs.log");
    // Every run appends a line, so the log counts executed test cases
    let source = format!(
        "echo run >> '{}'\n{}",
        counter.display(),
        fixture_source("product.sh")
    );
    let request = JudgeRequest::submission(
        source,
        Language::Python,
        2.0,
        vec![
            TestCase::new("2\n2\n", "4"),
            TestCase::new("3\n4\n", "7"),
            TestCase::new("5\n5\n", "10"),
        ],
    );

    let result = sh_runner(&root.path().join("work"))
        .judge(&request)
        .await
        .unwrap();

    assert_eq!(result.verdict, Verdict::WrongAnswer);
    assert_eq!(
        result.output,
        "Test Case 2 Failed.\nInput:\n3\n4\n\n\nExpected Output:\n7\n\nYour Output:\n12\n"
    );
    assert_eq!(result.error, None);

    let statuses: Vec<_> = result
        .per_test_case_results
        .iter()
        .map(|o| o.status)
        .collect();
    assert_eq!(
        statuses,
        vec![TestCaseStatus::Accepted, TestCaseStatus::WrongAnswer]
    );

    // The third case must never have started
    let runs = std::fs::read_to_string(&counter).unwrap();
    assert_eq!(runs.lines().count(), 2);
}

#[tokio::test]
async fn test_time_limit_exceeded_kills_whole_group() {
    let root = tempfile::tempdir().unwrap();
    // Background child prints its pid, then the leader spins forever
    let source = "sleep 60 &\necho $!\nwhile :; do :; done\n";
    let request = JudgeRequest::submission(
        source,
        Language::Python,
        0.5,
        vec![TestCase::new("", "")],
    );

    let start = Instant::now();
    let result = sh_runner(root.path()).judge(&request).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result.verdict, Verdict::TimeLimitExceeded);
    assert_eq!(
        result.output,
        "Test Case 1: Execution timed out after 0.5 seconds."
    );
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");

    let pid: u32 = result.per_test_case_results[0]
        .actual_output
        .trim()
        .parse()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!process_alive(pid), "background child {pid} survived");
}

#[tokio::test]
async fn test_output_kept_when_detached_process_holds_pipe() {
    let root = tempfile::tempdir().unwrap();
    // The detached sleeper outlives the program and keeps stdout open
    let request = JudgeRequest::submission(
        "setsid sleep 3 &\nsleep 0.3\necho 7\n",
        Language::Python,
        2.0,
        vec![TestCase::new("", "7")],
    );

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::Accepted, "{}", result.output);
    assert_eq!(result.per_test_case_results[0].actual_output, "7\n");
}

#[tokio::test]
async fn test_spinning_program_times_out() {
    let root = tempfile::tempdir().unwrap();
    let request = JudgeRequest::submission(
        fixture_source("spin.sh"),
        Language::C,
        0.3,
        sum_cases(),
    );

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::TimeLimitExceeded);
    assert_eq!(result.per_test_case_results.len(), 1);
}

#[tokio::test]
async fn test_runtime_error_captures_stderr() {
    let root = tempfile::tempdir().unwrap();
    let request = JudgeRequest::submission(
        fixture_source("crash.sh"),
        Language::Python,
        2.0,
        sum_cases(),
    );

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::RuntimeError);
    assert_eq!(
        result.output,
        "Test Case 1: Process exited with code 1. Stderr: division by zero\n"
    );
    assert_eq!(result.error.as_deref(), Some("division by zero\n"));
    assert_eq!(result.per_test_case_results.len(), 1);
}

#[tokio::test]
async fn test_compilation_error_skips_execution() {
    let root = tempfile::tempdir().unwrap();
    let request = JudgeRequest::submission(
        fixture_source("syntax_error.sh"),
        Language::C,
        2.0,
        sum_cases(),
    );

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::CompilationError);
    assert!(result.output.starts_with("Compilation Error:\n"));
    assert!(result.output.len() > "Compilation Error:\n".len());
    assert!(result.per_test_case_results.is_empty());
}

#[tokio::test]
async fn test_missing_artifact_is_compilation_error() {
    let root = tempfile::tempdir().unwrap();
    let request = JudgeRequest::adhoc(fixture_source("echo.sh"), Language::Cpp, None);

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::CompilationError);
    assert!(result.output.contains("produced no output file"));
}

#[tokio::test]
async fn test_fixed_source_name_language() {
    let root = tempfile::tempdir().unwrap();
    let request =
        JudgeRequest::submission(fixture_source("sum.sh"), Language::Java, 2.0, sum_cases());

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::Accepted, "{}", result.output);
}

#[tokio::test]
async fn test_adhoc_echo() {
    let root = tempfile::tempdir().unwrap();
    let request = JudgeRequest::adhoc(
        fixture_source("echo.sh"),
        Language::C,
        Some("hello\nworld\n".to_owned()),
    );

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::RunComplete);
    assert_eq!(result.output, "hello\nworld\n");
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn test_adhoc_runtime_error_sets_error() {
    let root = tempfile::tempdir().unwrap();
    let request = JudgeRequest::adhoc(fixture_source("crash.sh"), Language::Python, None);

    let result = sh_runner(root.path()).judge(&request).await.unwrap();

    assert_eq!(result.verdict, Verdict::RuntimeError);
    assert_eq!(
        result.output,
        "Process exited with code 1. Stderr: division by zero\n"
    );
    assert_eq!(result.error.as_deref(), Some(result.output.as_str()));
}

#[tokio::test]
async fn test_cancellation_kills_program_and_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let pid_file = root.path().join("pid");
    // Written then renamed, so the file never appears half-written
    let source = format!(
        "echo $$ > '{pid}.tmp'\nmv '{pid}.tmp' '{pid}'\nsleep 60\n",
        pid = pid_file.display()
    );
    let request = JudgeRequest::submission(
        source,
        Language::Python,
        30.0,
        vec![TestCase::new("", "")],
    );

    let work = root.path().join("work");
    let runner = sh_runner(&work);
    let shutdown = {
        let pid_file = pid_file.clone();
        async move {
            while !pid_file.exists() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
    };

    let err = runner.judge_until(&request, shutdown).await.unwrap_err();
    assert!(matches!(err, JudgeError::Cancelled));

    let pid: u32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!process_alive(pid), "program {pid} survived cancellation");
    assert_eq!(super::leftover_entries(&work), 0);
}
