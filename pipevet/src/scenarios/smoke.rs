//! Smoke suite: the workflow engine knows the DAG, a triggered run is
//! accepted, and the run reaches `success`.

use super::{Step, poll_policy, run_sequence};
use crate::report::SuiteReport;
use anyhow::Result;
use pipevet_core::{Assertion, CommandProbe, Evaluator, HarnessConfig, ProbeSpec};
use std::time::Duration;

fn composer_run(config: &HarnessConfig) -> ProbeSpec {
    ProbeSpec::new("gcloud")
        .args(["composer", "environments", "run"])
        .arg(&config.composer_env)
        .arg(format!("--location={}", config.location))
        .arg(format!("--project={}", config.project_id))
}

/// Build the three smoke steps against the configured environment.
fn steps(config: &HarnessConfig) -> Result<Vec<Step<CommandProbe>>> {
    let registration_policy =
        poll_policy(config, Duration::from_secs(300), Duration::from_secs(30))?;
    let run_policy = poll_policy(config, Duration::from_secs(3600), Duration::from_secs(60))?;

    let dag_registered = Step::new(
        "dag_registered",
        CommandProbe::new(composer_run(config).args(["dags", "list"])),
        Evaluator::new(Assertion::contains(&config.dag_id)),
        registration_policy.clone(),
    );

    let workflow_triggered = Step::new(
        "workflow_triggered",
        CommandProbe::new(
            ProbeSpec::new(config.trigger_script.display().to_string()).arg(&config.dag_id),
        ),
        Evaluator::new(Assertion::contains(&config.dag_id)),
        registration_policy,
    );

    // A listing can show a past success next to a still-running run, so
    // success only counts once no `| running |` row remains. A `| failed |`
    // row means the run reached a terminal state and polling is pointless.
    let run_succeeded = Step::new(
        "run_succeeded",
        CommandProbe::new(
            composer_run(config)
                .args(["dags", "list-runs"])
                .args(["--", "-d"])
                .arg(&config.dag_id),
        ),
        Evaluator::new(Assertion::all_of(vec![
            Assertion::contains("| success |"),
            Assertion::absent("| running |"),
        ]))
        .abort_on(Assertion::contains("| failed |")),
        run_policy,
    );

    Ok(vec![dag_registered, workflow_triggered, run_succeeded])
}

/// Run the smoke suite.
pub async fn run(config: &HarnessConfig) -> Result<SuiteReport> {
    let steps = steps(config)?;
    Ok(run_sequence("smoke", steps, config.step_deadline).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipevet_core::{Classification, Probe};

    fn demo_config() -> HarnessConfig {
        HarnessConfig {
            project_id: "demo-project".into(),
            location: "us-central1".into(),
            composer_env: "dpu-composer".into(),
            dag_id: "run_docs_pipeline".into(),
            trigger_script: "scripts/trigger_workflow.sh".into(),
            log_filters: vec![],
            poll_interval: None,
            poll_timeout: None,
            step_deadline: None,
            storage_instance: None,
            autoscaler_job: None,
            baseline_units: 100,
            target_units: 200,
        }
    }

    #[test]
    fn test_smoke_steps_shape() {
        let steps = steps(&demo_config()).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].name, "dag_registered");
        assert_eq!(steps[2].name, "run_succeeded");

        let list = steps[0].probe.describe();
        assert!(list.starts_with("gcloud composer environments run dpu-composer"));
        assert!(list.contains("--project=demo-project"));
        assert!(list.ends_with("dags list"));

        let trigger = steps[1].probe.describe();
        assert_eq!(trigger, "scripts/trigger_workflow.sh run_docs_pipeline");

        let runs = steps[2].probe.describe();
        assert!(runs.contains("dags list-runs -- -d run_docs_pipeline"));
    }

    #[test]
    fn test_run_succeeded_waits_out_running_rows() {
        let steps = steps(&demo_config()).unwrap();
        let evaluator = &steps[2].evaluator;

        assert_eq!(
            evaluator.classify("run_0 | success |\nrun_1 | running |"),
            Classification::NoMatch
        );
        assert_eq!(
            evaluator.classify("run_0 | success |"),
            Classification::Match
        );
        assert_eq!(
            evaluator.classify("run_1 | failed |"),
            Classification::HardFail
        );
    }

    #[test]
    fn test_poll_overrides_apply_to_every_step() {
        let mut config = demo_config();
        config.poll_interval = Some(Duration::from_secs(5));
        config.poll_timeout = Some(Duration::from_secs(20));

        for step in steps(&config).unwrap() {
            assert_eq!(step.policy.interval(), Duration::from_secs(5));
            assert_eq!(step.policy.max_duration(), Some(Duration::from_secs(20)));
        }
    }
}
