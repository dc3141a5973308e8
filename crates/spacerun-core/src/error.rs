//! Error types for Spacerun Core.
//!
//! One enum per component. Catalog and provisioning errors are terminal for a provisioning
//! attempt; runner errors abort the run after the unit has been paused; reclaim errors are
//! only ever logged by callers.

use spacerun_hub::HubError;
use thiserror::Error;

/// Hardware catalog errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No entry for this identifier in the kind-specific table.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// An endpoint descriptor that is not `{vendor}_{region}_{accelerator}_{size}_{instanceType}`.
    #[error("malformed hardware descriptor '{0}': expected vendor_region_accelerator_size_instanceType")]
    MalformedDescriptor(String),
}

pub type StagingResult<T> = std::result::Result<T, StagingError>;

/// Data staging errors.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("staging failed for project '{project}': {reason}")]
    StagingFailed { project: String, reason: String },
}

impl StagingError {
    pub(crate) fn failed(project: &str, reason: impl std::fmt::Display) -> Self {
        Self::StagingFailed { project: project.to_string(), reason: reason.to_string() }
    }
}

pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;

/// Provisioning errors. None of these are retried automatically.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid job: {0}")]
    InvalidJob(String),

    /// The job needs staged data but no dataset reference has been attached yet.
    #[error("dataset for project '{0}' has not been staged")]
    DatasetNotStaged(String),

    /// Creating the repository failed; a name collision needs a new project name.
    #[error("failed to create repository '{repo_id}': {source}")]
    RepoCreateFailed {
        repo_id: String,
        #[source]
        source: HubError,
    },

    /// Every key was attempted; these are the ones that did not make it.
    #[error("failed to inject secrets: {}", .0.join(", "))]
    SecretInjectionFailed(Vec<String>),

    #[error("failed to upload artifact '{path}': {source}")]
    ArtifactUploadFailed {
        path: String,
        #[source]
        source: HubError,
    },

    /// `body` is the provider response, verbatim.
    #[error("failed to create endpoint '{name}' (status {status:?}): {body}")]
    EndpointCreateFailed { name: String, status: Option<u16>, body: String },
}

pub type RunnerResult<T> = std::result::Result<T, RunnerError>;

/// Job runner errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to pull dataset '{reference}': {source}")]
    DatasetPullFailed {
        reference: String,
        #[source]
        source: HubError,
    },

    #[error("dependency installation failed: {0}")]
    DependencyInstallFailed(String),

    #[error("job execution failed: {0}")]
    JobExecutionFailed(String),

    #[error("no entry point found in {0}")]
    NoEntryPoint(String),
}

/// Lifecycle reclaim errors.
#[derive(Debug, Error)]
pub enum ReclaimError {
    #[error("invalid unit identity '{0}': expected account/name")]
    InvalidIdentity(String),

    #[error("failed to pause '{unit}': {source}")]
    PauseFailed {
        unit: String,
        #[source]
        source: HubError,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(String),

    #[error("failed to read configuration file: {0}")]
    ReadError(String),

    #[error("failed to parse configuration file: {0}")]
    ParseError(String),

    /// Every missing variable, not just the first.
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_injection_failed_lists_keys() {
        let err = ProvisionError::SecretInjectionFailed(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(err.to_string(), "failed to inject secrets: A, B");
    }

    #[test]
    fn test_catalog_error_converts() {
        let err: ProvisionError = CatalogError::UnknownBackend("x".to_string()).into();
        assert!(matches!(err, ProvisionError::Catalog(CatalogError::UnknownBackend(_))));
    }
}
