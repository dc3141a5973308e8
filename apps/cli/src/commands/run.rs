//! In-unit job execution.

use crate::config::{env_token, hub_client};
use anyhow::{Context, Result};
use colored::Colorize;
use spacerun_core::{JobRunner, PauseOutcome, Reclaimer, RunnerConfig, SpacerunConfig, TokioCommandRunner};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn execute(config: &SpacerunConfig) -> Result<()> {
    let lookup = |key: &str| std::env::var(key).ok();
    let runner_config = match RunnerConfig::from_lookup(lookup) {
        Ok(runner_config) => runner_config,
        Err(e) => {
            pause_unconfigured(config, lookup).await;
            return Err(e).context("Unit environment is incomplete");
        }
    };
    info!(project = %runner_config.project_name, task_id = runner_config.task_id, "Starting job");

    let hub = Arc::new(hub_client(config, &runner_config.token));
    let runner = JobRunner::new(hub, Arc::new(TokioCommandRunner));
    let outcome = runner.run(&runner_config).await?;

    println!("{} {}", "Job finished:".bold().green(), runner_config.project_name);
    print_outcome(&outcome);
    Ok(())
}

/// Pauses the unit even though its job cannot start.
async fn pause_unconfigured(config: &SpacerunConfig, lookup: impl Fn(&str) -> Option<String>) {
    let unit = match RunnerConfig::unit_from_lookup(lookup) {
        Ok(unit) => unit,
        Err(e) => {
            warn!(error = %e, "Cannot determine unit identity, skipping pause");
            return;
        }
    };
    let Some(token) = env_token() else {
        warn!("No token available, skipping pause");
        return;
    };

    let reclaimer = Reclaimer::new(Arc::new(hub_client(config, &token)));
    print_outcome(&reclaimer.pause_best_effort(unit.as_ref()).await);
}

fn print_outcome(outcome: &PauseOutcome) {
    match outcome {
        PauseOutcome::Paused(_) => println!("  {}", "unit paused".dimmed()),
        PauseOutcome::Failed(reason) => println!("  {} {reason}", "pause failed:".yellow()),
        PauseOutcome::Skipped => println!("  {}", "no unit to pause".dimmed()),
    }
}
