//! Harness configuration resolved once at startup.

use super::env::{ConfigErrors, EnvError, EnvParser};
use std::path::PathBuf;
use std::time::Duration;

/// Default log filters observed against the deployed pipeline: the workflow
/// scheduler must have logged both initial-load task successes.
const DEFAULT_LOG_FILTERS: &[&str] = &[
    r#"resource.labels.container_name="airflow-scheduler" AND textPayload:("initial_load_from_input_bucket.list_all_input_files" AND "state=success")"#,
    r#"resource.labels.container_name="airflow-scheduler" AND textPayload:("initial_load_from_input_bucket.has_files_to_process" AND "state=success")"#,
];

/// Identifiers and bounds for the deployed system under test.
///
/// Required: `PIPEVET_PROJECT_ID`, `PIPEVET_LOCATION`,
/// `PIPEVET_COMPOSER_ENV`, `PIPEVET_DAG_ID`. The autoscale identifiers are
/// validated only when that suite runs (see [`HarnessConfig::autoscale`]).
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Target project of the deployed system.
    pub project_id: String,
    /// Region/location of the workflow engine environment.
    pub location: String,
    /// Workflow engine (Composer) environment name.
    pub composer_env: String,
    /// Workflow (DAG) identifier being observed.
    pub dag_id: String,
    /// Entry point that triggers a workflow run.
    pub trigger_script: PathBuf,
    /// Log filters the functional suite polls for.
    pub log_filters: Vec<String>,
    /// Override for per-step polling interval.
    pub poll_interval: Option<Duration>,
    /// Override for per-step polling budget.
    pub poll_timeout: Option<Duration>,
    /// Overall deadline applied to each suite.
    pub step_deadline: Option<Duration>,
    /// Storage backend instance for the autoscale suite.
    pub storage_instance: Option<String>,
    /// Autoscaler scheduler job updated by the autoscale suite.
    pub autoscaler_job: Option<String>,
    /// Processing units expected before the autoscaler config change.
    pub baseline_units: u32,
    /// Processing units expected after the autoscaler config change.
    pub target_units: u32,
}

/// Identifiers required by the autoscale suite, validated on demand.
#[derive(Debug, Clone)]
pub struct AutoscaleConfig {
    pub storage_instance: String,
    pub autoscaler_job: String,
    pub baseline_units: u32,
    pub target_units: u32,
}

impl HarnessConfig {
    /// Resolve configuration from the environment. Reports every missing or
    /// invalid variable at once; a partial configuration never escapes.
    pub fn from_env() -> Result<Self, ConfigErrors> {
        let mut parser = EnvParser::new();

        let project_id = parser.require_string("PROJECT_ID");
        let location = parser.require_string("LOCATION");
        let composer_env = parser.require_string("COMPOSER_ENV");
        let dag_id = parser.require_string("DAG_ID");

        let trigger_script =
            PathBuf::from(parser.get_string_or("TRIGGER_SCRIPT", "scripts/trigger_workflow.sh"));
        let log_filters = parser
            .get_string_list("LOG_FILTERS")
            .unwrap_or_else(|| DEFAULT_LOG_FILTERS.iter().map(|s| s.to_string()).collect());

        let poll_interval = parser.get_duration("POLL_INTERVAL");
        let poll_timeout = parser.get_duration("POLL_TIMEOUT");
        let step_deadline = parser.get_duration("STEP_DEADLINE");

        let storage_instance = parser.get_string("STORAGE_INSTANCE");
        let autoscaler_job = parser.get_string("AUTOSCALER_JOB");
        let baseline_units = parser.get_u32_or("BASELINE_UNITS", 100);
        let target_units = parser.get_u32_or("TARGET_UNITS", 200);

        parser.finish()?;

        // finish() returned Ok, so every require_string succeeded.
        Ok(Self {
            project_id: project_id.expect("validated above"),
            location: location.expect("validated above"),
            composer_env: composer_env.expect("validated above"),
            dag_id: dag_id.expect("validated above"),
            trigger_script,
            log_filters,
            poll_interval,
            poll_timeout,
            step_deadline,
            storage_instance,
            autoscaler_job,
            baseline_units,
            target_units,
        })
    }

    /// Validate the identifiers the autoscale suite needs.
    pub fn autoscale(&self) -> Result<AutoscaleConfig, ConfigErrors> {
        let mut missing = Vec::new();
        if self.storage_instance.is_none() {
            missing.push(EnvError::Missing {
                var: "PIPEVET_STORAGE_INSTANCE".to_string(),
            });
        }
        if self.autoscaler_job.is_none() {
            missing.push(EnvError::Missing {
                var: "PIPEVET_AUTOSCALER_JOB".to_string(),
            });
        }
        if !missing.is_empty() {
            return Err(ConfigErrors(missing));
        }
        Ok(AutoscaleConfig {
            storage_instance: self.storage_instance.clone().expect("checked above"),
            autoscaler_job: self.autoscaler_job.clone().expect("checked above"),
            baseline_units: self.baseline_units,
            target_units: self.target_units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env_test_lock;

    #[allow(unsafe_code)]
    fn set(name: &str, value: &str) {
        unsafe { std::env::set_var(name, value) };
    }

    #[allow(unsafe_code)]
    fn unset(name: &str) {
        unsafe { std::env::remove_var(name) };
    }

    fn set_required() {
        set("PIPEVET_PROJECT_ID", "demo-project");
        set("PIPEVET_LOCATION", "us-central1");
        set("PIPEVET_COMPOSER_ENV", "dpu-composer");
        set("PIPEVET_DAG_ID", "run_docs_pipeline");
    }

    fn clear_all() {
        for var in [
            "PIPEVET_PROJECT_ID",
            "PIPEVET_LOCATION",
            "PIPEVET_COMPOSER_ENV",
            "PIPEVET_DAG_ID",
            "PIPEVET_TRIGGER_SCRIPT",
            "PIPEVET_LOG_FILTERS",
            "PIPEVET_POLL_INTERVAL",
            "PIPEVET_POLL_TIMEOUT",
            "PIPEVET_STEP_DEADLINE",
            "PIPEVET_STORAGE_INSTANCE",
            "PIPEVET_AUTOSCALER_JOB",
            "PIPEVET_BASELINE_UNITS",
            "PIPEVET_TARGET_UNITS",
        ] {
            unset(var);
        }
    }

    #[test]
    fn test_missing_required_vars_all_reported() {
        let _lock = env_test_lock();
        clear_all();

        let errs = HarnessConfig::from_env().unwrap_err();
        assert_eq!(errs.0.len(), 4);
        let rendered = errs.to_string();
        assert!(rendered.contains("PIPEVET_PROJECT_ID"));
        assert!(rendered.contains("PIPEVET_DAG_ID"));
    }

    #[test]
    fn test_full_config_resolves_with_defaults() {
        let _lock = env_test_lock();
        clear_all();
        set_required();

        let config = HarnessConfig::from_env().unwrap();
        assert_eq!(config.project_id, "demo-project");
        assert_eq!(config.dag_id, "run_docs_pipeline");
        assert_eq!(config.log_filters.len(), 2);
        assert!(config.log_filters[0].contains("airflow-scheduler"));
        assert_eq!(
            config.trigger_script,
            PathBuf::from("scripts/trigger_workflow.sh")
        );
        assert_eq!(config.baseline_units, 100);
        assert_eq!(config.target_units, 200);
        assert!(config.poll_interval.is_none());
        clear_all();
    }

    #[test]
    fn test_overrides_win() {
        let _lock = env_test_lock();
        clear_all();
        set_required();
        set("PIPEVET_POLL_INTERVAL", "15s");
        set("PIPEVET_LOG_FILTERS", "filter-one ; filter-two");

        let config = HarnessConfig::from_env().unwrap();
        assert_eq!(config.poll_interval, Some(Duration::from_secs(15)));
        assert_eq!(config.log_filters, vec!["filter-one", "filter-two"]);
        clear_all();
    }

    #[test]
    fn test_autoscale_requires_instance_and_job() {
        let _lock = env_test_lock();
        clear_all();
        set_required();

        let config = HarnessConfig::from_env().unwrap();
        let errs = config.autoscale().unwrap_err();
        assert_eq!(errs.0.len(), 2);

        set("PIPEVET_STORAGE_INSTANCE", "dpu-store");
        set("PIPEVET_AUTOSCALER_JOB", "dpu-autoscaler-config");
        let config = HarnessConfig::from_env().unwrap();
        let autoscale = config.autoscale().unwrap();
        assert_eq!(autoscale.storage_instance, "dpu-store");
        assert_eq!(autoscale.autoscaler_job, "dpu-autoscaler-config");
        clear_all();
    }
}
