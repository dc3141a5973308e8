//! Stage and provision a job.

use crate::config::{env_token, hub_client};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde_json::json;
use spacerun_core::{Backend, DataStager, HardwareCatalog, Provisioner, SpacerunConfig};
use spacerun_training::{JobSpec, StagingLayout};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn execute(
    config: &SpacerunConfig,
    job_path: &Path,
    backend: &str,
    workspace: Option<&Path>,
    json_output: bool,
) -> Result<()> {
    let backend: Backend = backend.parse()?;
    let catalog = HardwareCatalog::builtin();
    let descriptor = catalog.resolve_backend(&backend)?;
    let images = config.images()?;

    let mut job = JobSpec::load_from_file(job_path)
        .with_context(|| format!("Failed to load job file {}", job_path.display()))?;
    if job.token().trim().is_empty() {
        let Some(token) = env_token() else {
            bail!("no token in the job file and HF_TOKEN is not set");
        };
        job = job.with_token(token);
    }
    job.validate()?;

    let hub = Arc::new(hub_client(config, job.token()));
    let stager = DataStager::new(hub.clone(), StagingLayout::new(config.staging_root()));
    let staged = match workspace {
        Some(dir) => stager.publish_workspace(job.account(), job.project_name(), dir).await?,
        None => stager.stage(&job).await?,
    };
    info!(reference = %staged.reference, "Dataset ready");
    let job = job.with_staged_dataset(staged);

    let provisioner = Provisioner::new(hub, catalog, images);
    let unit = provisioner.provision(&job, &backend).await?;

    if json_output {
        let out = json!({
            "unit": unit.id,
            "kind": unit.kind,
            "backend": backend.to_string(),
            "hardware": descriptor,
            "data_path": job.dataset_reference(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "Unit provisioned".bold().cyan());
    println!();
    println!("  {:<10} {}", "Unit:", unit.id.green());
    println!("  {:<10} {}", "Kind:", unit.kind);
    println!("  {:<10} {}", "Backend:", backend);
    if let Some(reference) = job.dataset_reference() {
        println!("  {:<10} {}", "Data:", reference);
    }
    println!();
    Ok(())
}
