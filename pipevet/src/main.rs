//! pipevet - convergence test harness for a deployed data-processing
//! pipeline.
//!
//! Resolves configuration from the environment once, runs the selected
//! scenario suites, and exits non-zero when any step fails to converge.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pipevet::scenarios;
use pipevet::SuiteReport;
use pipevet_core::HarnessConfig;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "pipevet")]
#[command(author, version, about = "Pipeline convergence test harness")]
struct Cli {
    /// Emit suite reports as JSON instead of the text summary
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    suite: Suite,
}

#[derive(Subcommand)]
enum Suite {
    /// Stub tier: DAG registration, trigger, run success
    Smoke,
    /// Functional tier: poll the logging backend for each configured filter
    Logs,
    /// E2e tier: storage autoscaling responds to a config change
    Autoscale,
    /// Run every suite in tier order, stopping at the first failed suite
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // PIPEVET_LOG wins over --verbose; --verbose wins over the default.
    let filter = EnvFilter::try_from_env("PIPEVET_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(errors) => {
            error!("configuration is incomplete:\n{errors}");
            std::process::exit(2);
        }
    };
    info!(
        project = %config.project_id,
        location = %config.location,
        composer_env = %config.composer_env,
        dag_id = %config.dag_id,
        "harness configured"
    );

    let reports = run_suites(&cli.suite, &config).await?;

    let mut passed = true;
    for report in &reports {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            print!("{}", report.render());
        }
        passed &= report.passed();
    }

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_suites(suite: &Suite, config: &HarnessConfig) -> Result<Vec<SuiteReport>> {
    Ok(match suite {
        Suite::Smoke => vec![scenarios::smoke::run(config).await?],
        Suite::Logs => vec![scenarios::logs::run(config).await?],
        Suite::Autoscale => vec![scenarios::autoscale::run(config).await?],
        Suite::All => {
            let mut reports = Vec::new();
            reports.push(scenarios::smoke::run(config).await?);
            if reports.last().is_some_and(SuiteReport::passed) {
                reports.push(scenarios::logs::run(config).await?);
            }
            if reports.last().is_some_and(SuiteReport::passed) {
                reports.push(scenarios::autoscale::run(config).await?);
            }
            reports
        }
    })
}
