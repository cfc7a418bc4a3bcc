//! Autoscale suite: the storage backend sits at its baseline processing-unit
//! count, the autoscaler config is raised, and the backend converges on the
//! new count.

use super::{Step, poll_policy, run_sequence};
use crate::report::SuiteReport;
use anyhow::Result;
use pipevet_core::{
    Assertion, AutoscaleConfig, CommandProbe, Evaluator, HarnessConfig, ProbeSpec, RetryPolicy,
};
use std::time::Duration;

fn describe_probe(config: &HarnessConfig, autoscale: &AutoscaleConfig) -> ProbeSpec {
    ProbeSpec::new("gcloud")
        .args(["spanner", "instances", "describe"])
        .arg(&autoscale.storage_instance)
        .arg(format!("--project={}", config.project_id))
}

/// Match the exact unit count in the instance description. Anchored so a
/// target of 100 never matches an instance sitting at 1000.
fn units_assertion(units: u32) -> Result<Assertion> {
    Ok(Assertion::matches(&format!(
        r"(?m)^processingUnits:\s*{units}\s*$"
    ))?)
}

fn steps(config: &HarnessConfig, autoscale: &AutoscaleConfig) -> Result<Vec<Step<CommandProbe>>> {
    let baseline_policy = poll_policy(config, Duration::from_secs(60), Duration::from_secs(10))?;
    let target_policy = poll_policy(config, Duration::from_secs(300), Duration::from_secs(10))?;
    // The config update is a one-shot action, not a poll.
    let update_policy = RetryPolicy::count_bounded(1, Duration::from_secs(10))?;

    let baseline_units = Step::new(
        "baseline_units",
        CommandProbe::new(describe_probe(config, autoscale)),
        Evaluator::new(units_assertion(autoscale.baseline_units)?),
        baseline_policy,
    );

    let message_body = format!(
        r#"{{"minProcessingUnits": {}}}"#,
        autoscale.target_units
    );
    let autoscaler_updated = Step::new(
        "autoscaler_updated",
        CommandProbe::new(
            ProbeSpec::new("gcloud")
                .args(["scheduler", "jobs", "update", "pubsub"])
                .arg(&autoscale.autoscaler_job)
                .arg(format!("--location={}", config.location))
                .arg(format!("--project={}", config.project_id))
                .arg(format!("--message-body={message_body}")),
        ),
        Evaluator::new(Assertion::contains(&autoscale.autoscaler_job)),
        update_policy,
    );

    let target_units = Step::new(
        "target_units",
        CommandProbe::new(describe_probe(config, autoscale)),
        Evaluator::new(units_assertion(autoscale.target_units)?),
        target_policy,
    );

    Ok(vec![baseline_units, autoscaler_updated, target_units])
}

/// Run the autoscale suite. Fails fast when the autoscale identifiers are
/// not configured.
pub async fn run(config: &HarnessConfig) -> Result<SuiteReport> {
    let autoscale = config.autoscale()?;
    let steps = steps(config, &autoscale)?;
    Ok(run_sequence("autoscale", steps, config.step_deadline).await)
}
