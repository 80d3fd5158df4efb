//! Integration tests for the execution core: runner + invoker + reducer

use std::time::{Duration, Instant};

use evalbot_common::{EvalOptions, EvalStatus};
use evalbot_sandbox::{normalize, output};

use crate::common::{setup_test_logging, shell_runner};

#[tokio::test]
async fn test_simple_snippet_raw_output() {
    setup_test_logging();
    let runner = shell_runner();
    let outcome = runner.run("echo okay", &EvalOptions::default().raw()).await;
    assert_eq!(outcome.status, EvalStatus::Ok);
    assert_eq!(outcome.payload, "okay");
}

#[tokio::test]
async fn test_whitespace_only_is_rejected() {
    let runner = shell_runner();
    for input in ["   ", "\t", " \t "] {
        let outcome = runner.run(input, &EvalOptions::default()).await;
        assert_eq!(outcome.status, EvalStatus::RejectedInput, "input {:?}", input);
    }
}

#[tokio::test]
async fn test_blacklist_match_never_reaches_a_worker() {
    // The worker program does not exist, so any spawn attempt would surface
    // as a RuntimeError instead of the mapped rejection.
    let runner = evalbot_sandbox::SandboxRunner::new(evalbot_sandbox::WorkerCommand::new(
        "/nonexistent/worker",
    ))
    .with_blacklist(true);
    let outcome = runner
        .run("__import__('os')", &EvalOptions::default().raw())
        .await;
    assert_eq!(outcome.status, EvalStatus::RejectedInput);
    assert_eq!(outcome.payload, "no __import__ allowed.");
}

#[tokio::test]
async fn test_deadline_enforced_and_bounded() {
    setup_test_logging();
    let runner = shell_runner();
    let options = EvalOptions::default().with_timeout(Duration::from_secs(1));
    let started = Instant::now();
    let outcome = runner.run("sleep 30", &options).await;
    assert_eq!(outcome.status, EvalStatus::TimedOut);
    // Deadline plus the termination grace period, nowhere near 30s.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_long_output_reduction_end_to_end() {
    setup_test_logging();
    let runner = shell_runner();
    let outcome = runner.run("seq 55", &EvalOptions::default().raw()).await;
    assert_eq!(outcome.status, EvalStatus::Ok);
    assert_eq!(outcome.payload.lines().count(), 55);

    let reduced = output::reduce(&outcome.payload, false, 30, 0);
    assert!(reduced.contains("(...truncated at 30 lines.)"));
    // 30 original lines plus the marker, rendered as literal newlines.
    assert_eq!(reduced.split("\\n").count(), 31);
}

#[tokio::test]
async fn test_newline_convention_round_trip() {
    // Encode a real newline, then decode it under the stringmode
    // convention. Only the statement-terminating newline may be added.
    let original = "a\nb";
    let encoded = output::reduce(original, false, 0, 0);
    assert_eq!(encoded, "a\\nb");
    let decoded = normalize::prepare(&encoded, true);
    assert_eq!(decoded.trim_end_matches('\n'), original);
}

#[tokio::test]
async fn test_reduce_without_limits_is_encoding_only() {
    let text = "no newlines here";
    assert_eq!(output::reduce(text, false, 0, 0), text);
}
