//! Scenario driver: composes probes, evaluators, and retry policies into
//! suite step sequences against the deployed pipeline.
//!
//! Steps run in order and the sequence stops at the first step that does not
//! converge; everything after it is reported as skipped. Steps carry no
//! shared mutable state, so independent polls (the log-filter suite) run
//! concurrently instead.

pub mod autoscale;
pub mod logs;
pub mod smoke;

use crate::report::{StepReport, SuiteReport};
use anyhow::Result;
use pipevet_core::{Controller, Evaluator, HarnessConfig, Probe, RetryPolicy};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// One scenario step: a probe polled under a policy until its evaluator
/// converges.
pub struct Step<P: Probe> {
    pub name: &'static str,
    pub probe: P,
    pub evaluator: Evaluator,
    pub policy: RetryPolicy,
}

impl<P: Probe> Step<P> {
    pub fn new(name: &'static str, probe: P, evaluator: Evaluator, policy: RetryPolicy) -> Self {
        Self {
            name,
            probe,
            evaluator,
            policy,
        }
    }
}

/// Build a time-bounded polling policy from suite defaults, honoring the
/// `PIPEVET_POLL_TIMEOUT` / `PIPEVET_POLL_INTERVAL` overrides.
pub fn poll_policy(
    config: &HarnessConfig,
    default_timeout: Duration,
    default_interval: Duration,
) -> Result<RetryPolicy> {
    let timeout = config.poll_timeout.unwrap_or(default_timeout);
    let interval = config.poll_interval.unwrap_or(default_interval);
    Ok(RetryPolicy::time_bounded(timeout, interval)?)
}

/// Run `steps` in order, stopping at the first non-converged verdict.
///
/// `deadline` bounds the whole sequence: it is anchored when the sequence
/// starts and passed to every controller, so a hung probe or an oversized
/// sleep in any step aborts promptly.
pub async fn run_sequence<P: Probe>(
    suite: &str,
    steps: Vec<Step<P>>,
    deadline: Option<Duration>,
) -> SuiteReport {
    let mut report = SuiteReport::new(suite);
    let deadline = deadline.map(|d| Instant::now() + d);
    let mut steps = steps.into_iter();

    for step in steps.by_ref() {
        info!(suite, step = step.name, probe = %step.probe.describe(), "step starting");
        let mut controller = Controller::new(step.policy);
        if let Some(at) = deadline {
            controller = controller.with_deadline(at);
        }

        let started = Instant::now();
        let verdict = controller.run(&step.probe, &step.evaluator).await;
        let elapsed = started.elapsed();
        info!(suite, step = step.name, verdict = %verdict, "step finished");

        let passed = verdict.is_converged();
        report.steps.push(StepReport::new(step.name, verdict, elapsed));
        if !passed {
            break;
        }
    }

    // Anything left in the iterator was never attempted.
    report.skipped.extend(steps.map(|s| s.name.to_string()));
    report
}
