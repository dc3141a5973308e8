//! Data staging.
//!
//! Turns local training data into a registry dataset the unit can pull by reference.

use crate::error::{StagingError, StagingResult};
use spacerun_hub::{HubApi, RepoRef, RepoSpec};
use spacerun_training::{normalize_job_data, write_normalized_dataset, JobSpec, StagedDataset, StagingLayout};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// File a workspace must contain for the runner to have anything to do.
pub const ENTRY_POINT: &str = "script.py";

pub struct DataStager {
    hub: Arc<dyn HubApi>,
    layout: StagingLayout,
}

impl DataStager {
    #[must_use]
    pub fn new(hub: Arc<dyn HubApi>, layout: StagingLayout) -> Self {
        Self { hub, layout }
    }

    /// Registry id the normalized dataset of a project lives under.
    #[must_use]
    pub fn dataset_repo_id(account: &str, project_name: &str) -> String {
        format!("{account}/autotrain-data-{project_name}")
    }

    /// Registry id for a published workspace.
    #[must_use]
    pub fn workspace_repo_id(account: &str, project_name: &str) -> String {
        format!("{account}/autotrain-{project_name}")
    }

    /// Stages the job's data.
    ///
    /// Returns the data path unchanged when the task needs no staging or when the train split
    /// is not present locally (the caller already holds a registry reference). Otherwise
    /// normalizes the splits, uploads them to `{account}/autotrain-data-{project}` and returns
    /// that reference. Both the local write and the upload overwrite, so staging twice is safe.
    pub async fn stage(&self, job: &JobSpec) -> StagingResult<StagedDataset> {
        let project = job.project_name();
        let account = job.account();
        let passthrough = || StagedDataset::new(job.data().path.clone(), account, project);

        if !job.task().requires_staging() {
            debug!(project, task = %job.task(), "Task needs no staging");
            return Ok(passthrough());
        }

        let train_path = job.data().train_path();
        if !train_path.exists() {
            info!(project, path = %train_path.display(), "No local train split, using data path as reference");
            return Ok(passthrough());
        }

        let dir = self.layout.dataset_dir(project);
        let writer_job = job.clone();
        let writer_dir = dir.clone();
        let dataset_info = tokio::task::spawn_blocking(move || {
            let dataset = normalize_job_data(&writer_job)?;
            write_normalized_dataset(&writer_dir, &writer_job, &dataset)
        })
        .await
        .map_err(|e| StagingError::failed(project, e))?
        .map_err(|e| StagingError::failed(project, e))?;

        let repo_id = Self::dataset_repo_id(account, project);
        self.hub
            .create_repository(&RepoSpec::private_dataset(repo_id.as_str()))
            .await
            .map_err(|e| StagingError::failed(project, e))?;
        let uploaded = self
            .hub
            .upload_folder(&RepoRef::dataset(repo_id.as_str()), &dir)
            .await
            .map_err(|e| StagingError::failed(project, e))?;

        info!(
            project,
            repo = %repo_id,
            files = uploaded,
            fingerprint = %dataset_info.fingerprint,
            "Dataset staged"
        );
        Ok(StagedDataset::new(repo_id, account, project))
    }

    /// Publishes a local workspace (entry point plus optional requirements) for a generic job.
    pub async fn publish_workspace(&self, account: &str, project: &str, dir: &Path) -> StagingResult<StagedDataset> {
        if !dir.join(ENTRY_POINT).is_file() {
            return Err(StagingError::failed(project, format!("{} has no {ENTRY_POINT}", dir.display())));
        }

        let repo_id = Self::workspace_repo_id(account, project);
        self.hub
            .create_repository(&RepoSpec::private_dataset(repo_id.as_str()))
            .await
            .map_err(|e| StagingError::failed(project, e))?;
        let uploaded = self
            .hub
            .upload_folder(&RepoRef::dataset(repo_id.as_str()), dir)
            .await
            .map_err(|e| StagingError::failed(project, e))?;

        info!(project, repo = %repo_id, files = uploaded, "Workspace published");
        Ok(StagedDataset::new(repo_id, account, project))
    }
}
