//! The configuration bundle every unit needs to run its job.
//!
//! Hosted apps receive it as discrete secrets, managed endpoints inline in their environment
//! block. The Job Runner reads the same keys back through `RunnerConfig`.

use crate::error::{ProvisionError, ProvisionResult};
use spacerun_hub::HubApi;
use spacerun_training::JobSpec;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const TOKEN: &str = "HF_TOKEN";
pub const ACCOUNT: &str = "SPACERUN_ACCOUNT";
pub const PROJECT_NAME: &str = "SPACERUN_PROJECT";
pub const PARAMS: &str = "SPACERUN_PARAMS";
pub const DATA_PATH: &str = "SPACERUN_DATA";
pub const TASK_ID: &str = "SPACERUN_TASK_ID";
pub const MODEL: &str = "SPACERUN_MODEL";
pub const OUTPUT_REPO: &str = "SPACERUN_OUTPUT_REPO";

/// A managed endpoint's own `{account}/{name}`, used for self-pause.
pub const ENDPOINT_ID: &str = "ENDPOINT_ID";
/// Set by the hosting platform inside every hosted app.
pub const SPACE_ID: &str = "SPACE_ID";

/// Keys the Job Runner cannot start without, in injection order.
pub const REQUIRED_KEYS: [&str; 8] = [TOKEN, ACCOUNT, PROJECT_NAME, PARAMS, DATA_PATH, TASK_ID, MODEL, OUTPUT_REPO];

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretSet {
    entries: BTreeMap<String, String>,
}

impl SecretSet {
    /// Builds the full set for a job.
    ///
    /// Fails with `DatasetNotStaged` when the job still owes staging, before anything
    /// touches the network.
    pub fn for_job(job: &JobSpec) -> ProvisionResult<Self> {
        let dataset = job
            .dataset_reference()
            .ok_or_else(|| ProvisionError::DatasetNotStaged(job.project_name().to_string()))?;
        let params = job.serialized_params().map_err(|e| ProvisionError::InvalidJob(e.to_string()))?;

        let entries = [
            (TOKEN, job.token().to_string()),
            (ACCOUNT, job.account().to_string()),
            (PROJECT_NAME, job.project_name().to_string()),
            (PARAMS, params),
            (DATA_PATH, dataset.to_string()),
            (TASK_ID, job.task().task_id().to_string()),
            (MODEL, job.model().to_string()),
            (OUTPUT_REPO, job.output_repo().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Ok(Self { entries })
    }

    /// Adds the unit's own identity for self-pause.
    #[must_use]
    pub fn with_unit_identity(mut self, unit_id: impl Into<String>) -> Self {
        self.entries.insert(ENDPOINT_ID.to_string(), unit_id.into());
        self
    }

    /// Drops one key.
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.entries.remove(key);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Required keys absent from this set.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<String> {
        REQUIRED_KEYS.iter().filter(|k| !self.entries.contains_key(**k)).map(|k| (*k).to_string()).collect()
    }

    /// The set as an environment block.
    #[must_use]
    pub fn env_map(&self) -> BTreeMap<String, String> {
        self.entries.clone()
    }

    /// Writes every required key as a secret on `repo_id`.
    ///
    /// Every key is attempted even after a failure. Keys missing from the set count as
    /// failed; all failed keys are reported together.
    pub async fn inject(&self, hub: &dyn HubApi, repo_id: &str) -> ProvisionResult<()> {
        let mut failed = Vec::new();
        for key in REQUIRED_KEYS {
            let Some(value) = self.entries.get(key) else {
                warn!(repo = repo_id, key, "Secret missing from set");
                failed.push(key.to_string());
                continue;
            };
            match hub.add_secret(repo_id, key, value).await {
                Ok(()) => debug!(repo = repo_id, key, "Secret injected"),
                Err(e) => {
                    warn!(repo = repo_id, key, error = %e, "Secret injection failed");
                    failed.push(key.to_string());
                }
            }
        }

        if failed.is_empty() {
            info!(repo = repo_id, count = REQUIRED_KEYS.len(), "Secrets injected");
            Ok(())
        } else {
            Err(ProvisionError::SecretInjectionFailed(failed))
        }
    }
}

impl std::fmt::Debug for SecretSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, if k == TOKEN { "<redacted>" } else { v.as_str() })))
            .finish()
    }
}
