use super::manifest::{render_bootstrap, render_manifest, BOOTSTRAP_PATH, MANIFEST_PATH};
use crate::config::ImageConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::secrets::SecretSet;
use crate::unit::{ProvisionedUnit, UnitKind};
use spacerun_hub::{HubApi, RepoRef, RepoSpec};
use spacerun_training::JobSpec;
use tracing::{error, info};

/// Repository id of a project's hosted app.
#[must_use]
pub fn hosted_app_id(account: &str, project_name: &str) -> String {
    format!("{account}/autotrain-{project_name}")
}

/// Creates the app repository, injects secrets and uploads the bootstrap artifacts.
///
/// Leaves the unit in `ArtifactsUploaded`; the platform boots it from there.
pub(super) async fn provision(
    hub: &dyn HubApi,
    job: &JobSpec,
    hardware: &str,
    secrets: &SecretSet,
    images: &ImageConfig,
) -> ProvisionResult<ProvisionedUnit> {
    let repo_id = hosted_app_id(job.account(), job.project_name());
    let mut unit = ProvisionedUnit::new(repo_id.as_str(), UnitKind::HostedApp);
    info!(unit = %repo_id, hardware, "Provisioning hosted app");

    hub.create_repository(&RepoSpec::private_docker_space(repo_id.as_str(), hardware)).await.map_err(|source| {
        error!(unit = %repo_id, error = %source, "Repository creation failed");
        ProvisionError::RepoCreateFailed { repo_id: repo_id.clone(), source }
    })?;
    unit.advance();

    secrets.inject(hub, &repo_id).await?;
    unit.advance();

    let repo = RepoRef::space(repo_id.as_str());
    let artifacts = [
        (MANIFEST_PATH, render_manifest(job.project_name(), images)),
        (BOOTSTRAP_PATH, render_bootstrap(images)),
    ];
    for (path, content) in artifacts {
        hub.upload_file(&repo, path, content.into_bytes()).await.map_err(|source| {
            error!(unit = %repo_id, path, error = %source, "Artifact upload failed");
            ProvisionError::ArtifactUploadFailed { path: path.to_string(), source }
        })?;
    }
    unit.advance();

    Ok(unit)
}
