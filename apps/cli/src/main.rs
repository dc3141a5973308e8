//! Spacerun CLI - run training jobs on rented remote compute.
//!
//! This CLI provides a `spacerun` command that stages a job's data, provisions a hosted app or
//! managed endpoint for it, and (inside the unit) runs the job and pauses the unit afterwards.

mod commands;
mod config;

use clap::{CommandFactory, Parser, Subcommand};
use spacerun_core::UnitKind;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Spacerun - remote training job orchestration
#[derive(Parser, Debug)]
#[command(
    name = "spacerun",
    author,
    version,
    about = "Spacerun - remote training job orchestration",
    long_about = "Spacerun provisions remote compute for training jobs, injects their configuration,\nruns them inside the unit and pauses the unit when the job is done."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error); defaults to the config file's log_level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stage a job's data and provision a unit for it
    ///
    /// Validates the job file, stages training data when the task needs it, then creates a
    /// hosted app (`spaces-<tier>`) or managed endpoint (`ep-...`) and prints its identifier.
    Provision {
        /// Job description (TOML)
        #[arg(long)]
        job: PathBuf,

        /// Backend identifier, e.g. spaces-a10gl or ep-aws-useast1-m
        #[arg(short, long)]
        backend: String,

        /// Directory with script.py (and optionally requirements.txt) to publish for the unit
        #[arg(long)]
        workspace: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the job inside a provisioned unit, then pause the unit
    ///
    /// Reads its configuration from the environment the unit was provisioned with.
    Run,

    /// Pause a unit manually
    Pause {
        /// Unit identifier (account/name)
        #[arg(long)]
        unit: String,

        /// Unit kind (hosted-app or endpoint)
        #[arg(long, default_value = "hosted-app")]
        kind: UnitKind,
    },

    /// List backend identifiers and their hardware
    Backends {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::load_config()?;

    let level = match args.log_level.as_deref().or(config.log_level.as_deref()).unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Provision { job, backend, workspace, json } => {
            commands::provision::execute(&config, &job, &backend, workspace.as_deref(), json).await?;
        }
        Command::Run => {
            commands::run::execute(&config).await?;
        }
        Command::Pause { unit, kind } => {
            commands::pause::execute(&config, &unit, kind).await?;
        }
        Command::Backends { json } => {
            commands::backends::execute(json)?;
        }
    }

    Ok(())
}
