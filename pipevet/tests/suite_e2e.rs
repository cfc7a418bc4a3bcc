//! Scenario driver tests: step sequencing, short-circuiting, and the
//! suite-level deadline.

use pipevet::scenarios::{Step, run_sequence};
use pipevet_core::test_guard;
use pipevet_core::testing::init_global_test_logging;
use pipevet_core::{Assertion, Evaluator, ProbeError, RetryPolicy, ScriptedProbe};
use std::time::Duration;
use tokio::time::Instant;

#[ctor::ctor]
fn setup() {
    init_global_test_logging();
}

fn step(name: &'static str, probe: ScriptedProbe) -> Step<ScriptedProbe> {
    Step::new(
        name,
        probe,
        Evaluator::new(Assertion::contains("ready")),
        RetryPolicy::count_bounded(3, Duration::from_secs(10)).unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn sequence_runs_all_steps_when_each_converges() {
    let _guard = test_guard!();
    let first = ScriptedProbe::new();
    first.push_output("ready");
    let second = ScriptedProbe::new();
    second.push_output("pending");
    second.push_output("ready");

    let report = run_sequence("demo", vec![step("first", first), step("second", second)], None).await;

    assert!(report.passed());
    assert_eq!(report.steps.len(), 2);
    assert!(report.skipped.is_empty());
    assert_eq!(report.steps[1].verdict.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn sequence_short_circuits_on_abort() {
    let _guard = test_guard!();
    let first = ScriptedProbe::new();
    first.push_error(ProbeError::NotFound("gcloud".into()));
    let second = ScriptedProbe::new();
    second.push_output("ready");
    let third = ScriptedProbe::new();
    third.push_output("ready");

    let report = run_sequence(
        "demo",
        vec![step("first", first), step("second", second), step("third", third)],
        None,
    )
    .await;

    assert!(!report.passed());
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.skipped, vec!["second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn sequence_stops_after_timed_out_step() {
    let _guard = test_guard!();
    let first = ScriptedProbe::new();
    for _ in 0..3 {
        first.push_output("pending");
    }
    let second = ScriptedProbe::new();
    second.push_output("ready");

    let report = run_sequence("demo", vec![step("first", first), step("second", second)], None).await;

    assert!(!report.passed());
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.skipped, vec!["second"]);
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_the_whole_sequence() {
    let _guard = test_guard!();
    // Each step alone would poll for up to 20s of sleeping; the shared
    // deadline cuts the second step off mid-sleep.
    let first = ScriptedProbe::new();
    first.push_output("pending");
    first.push_output("ready");
    let second = ScriptedProbe::new();
    for _ in 0..3 {
        second.push_output("pending");
    }

    let started = Instant::now();
    let report = run_sequence(
        "demo",
        vec![step("first", first), step("second", second)],
        Some(Duration::from_secs(15)),
    )
    .await;

    assert!(!report.passed());
    assert_eq!(report.steps.len(), 2);
    assert!(report.steps[0].passed());
    assert!(!report.steps[1].passed());
    // First step sleeps 10s; the deadline lands 5s into the second step's
    // first sleep.
    assert_eq!(started.elapsed(), Duration::from_secs(15));
}
