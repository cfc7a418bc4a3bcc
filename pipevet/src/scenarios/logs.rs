//! Logs suite: every configured log filter must match at least one record
//! in the logging backend.
//!
//! Filters are independent observations of the same pipeline run, so they
//! poll concurrently; each task owns its probe, evaluator, and controller.

use super::poll_policy;
use crate::report::{StepReport, SuiteReport};
use anyhow::Result;
use pipevet_core::{
    Assertion, CommandProbe, Controller, Evaluator, HarnessConfig, Probe, ProbeSpec,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

fn read_probe(config: &HarnessConfig, filter: &str) -> CommandProbe {
    CommandProbe::new(
        ProbeSpec::new("gcloud")
            .args(["logging", "read"])
            .arg(filter)
            .arg(format!("--project={}", config.project_id))
            .args(["--format=json", "--freshness=1d", "--limit=1"]),
    )
}

/// Run the logs suite: one concurrent poll per configured filter.
///
/// Zero filters would make the suite pass without observing anything, so an
/// empty list is rejected up front.
pub async fn run(config: &HarnessConfig) -> Result<SuiteReport> {
    if config.log_filters.is_empty() {
        anyhow::bail!("logs suite requires at least one log filter (PIPEVET_LOG_FILTERS)");
    }
    let policy = poll_policy(config, Duration::from_secs(300), Duration::from_secs(30))?;
    let deadline = config.step_deadline.map(|d| Instant::now() + d);

    let mut tasks = Vec::with_capacity(config.log_filters.len());
    for (index, filter) in config.log_filters.iter().enumerate() {
        let probe = read_probe(config, filter);
        let evaluator = Evaluator::new(Assertion::json_record_exists());
        let policy = policy.clone();

        info!(filter = index, probe = %probe.describe(), "log filter poll starting");
        tasks.push(tokio::spawn(async move {
            let mut controller = Controller::new(policy);
            if let Some(at) = deadline {
                controller = controller.with_deadline(at);
            }
            let started = Instant::now();
            let verdict = controller.run(&probe, &evaluator).await;
            (verdict, started.elapsed())
        }));
    }

    let mut report = SuiteReport::new("logs");
    for (index, task) in tasks.into_iter().enumerate() {
        let name = format!("log_filter_{index}");
        match task.await {
            Ok((verdict, elapsed)) => {
                info!(filter = index, verdict = %verdict, "log filter poll finished");
                report.steps.push(StepReport::new(name, verdict, elapsed));
            }
            // A panicked poll task counts the same as an unattempted step.
            Err(join_err) => {
                tracing::error!(filter = index, error = %join_err, "log filter task failed");
                report.skipped.push(name);
            }
        }
    }
    Ok(report)
}
