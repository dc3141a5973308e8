//! The registry/API contract consumed by the orchestrator.

use crate::error::HubResult;
use crate::types::{RepoRef, RepoSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Registry and endpoint operations the orchestrator depends on.
///
/// Uploads have overwrite semantics: writing the same path twice replaces the content.
#[async_trait]
pub trait HubApi: Send + Sync {
    /// Creates a repository and returns its URL.
    ///
    /// # Errors
    /// Returns `HubError::Conflict` when the repository exists and `spec.exist_ok` is false.
    async fn create_repository(&self, spec: &RepoSpec) -> HubResult<String>;

    /// Adds (or replaces) one secret on a space.
    async fn add_secret(&self, repo_id: &str, key: &str, value: &str) -> HubResult<()>;

    /// Uploads one file.
    async fn upload_file(&self, repo: &RepoRef, path_in_repo: &str, content: Vec<u8>) -> HubResult<()>;

    /// Uploads every file below `folder`, returning the number of files uploaded.
    async fn upload_folder(&self, repo: &RepoRef, folder: &Path) -> HubResult<usize>;

    /// Downloads the repository's current files into `local_dir`.
    async fn download_snapshot(&self, repo: &RepoRef, local_dir: &Path) -> HubResult<PathBuf>;

    /// Creates a managed endpoint and returns its name.
    async fn create_endpoint(&self, account: &str, payload: &Value) -> HubResult<String>;

    /// Pauses a managed endpoint and returns the provider's acknowledgment.
    async fn pause_endpoint(&self, account: &str, name: &str) -> HubResult<Value>;

    /// Pauses a hosted space and returns the provider's acknowledgment.
    async fn pause_space(&self, repo_id: &str) -> HubResult<Value>;
}
