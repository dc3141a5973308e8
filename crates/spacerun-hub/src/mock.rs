//! In-memory [`HubApi`] for tests and dry runs.
//!
//! Records every call, stores uploaded content, and can be told to fail specific operations.

use crate::api::HubApi;
use crate::error::{HubError, HubResult};
use crate::types::{RepoRef, RepoSpec};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Operation names used by [`MockHub::call_count`].
pub mod ops {
    pub const CREATE_REPOSITORY: &str = "create_repository";
    pub const ADD_SECRET: &str = "add_secret";
    pub const UPLOAD_FILE: &str = "upload_file";
    pub const UPLOAD_FOLDER: &str = "upload_folder";
    pub const DOWNLOAD_SNAPSHOT: &str = "download_snapshot";
    pub const CREATE_ENDPOINT: &str = "create_endpoint";
    pub const PAUSE_ENDPOINT: &str = "pause_endpoint";
    pub const PAUSE_SPACE: &str = "pause_space";
}

#[derive(Debug, Default)]
struct MockState {
    calls: HashMap<&'static str, usize>,
    repos: BTreeMap<String, RepoSpec>,
    secrets: BTreeMap<String, BTreeMap<String, String>>,
    files: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    endpoints: Vec<Value>,
    paused: Vec<String>,
}

/// Recording hub with injectable failures.
#[derive(Debug, Default)]
pub struct MockHub {
    state: Mutex<MockState>,
    failing_secrets: HashSet<String>,
    fail_uploads: bool,
    fail_downloads: bool,
    fail_pause: bool,
    endpoint_failure: Option<(u16, String)>,
}

impl MockHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-creates a repository so that creating it again conflicts.
    #[must_use]
    pub fn with_existing_repo(self, repo: RepoRef) -> Self {
        let spec = RepoSpec { repo: repo.clone(), hardware: None, space_sdk: None, private: true, exist_ok: false };
        self.lock().repos.insert(repo.to_string(), spec);
        self
    }

    /// Seeds repository content returned by `download_snapshot`.
    #[must_use]
    pub fn with_file(self, repo: &RepoRef, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.lock().files.entry(repo.to_string()).or_default().insert(path.to_string(), content.into());
        self
    }

    /// Makes `add_secret` fail for this key.
    #[must_use]
    pub fn fail_secret(mut self, key: &str) -> Self {
        self.failing_secrets.insert(key.to_string());
        self
    }

    #[must_use]
    pub fn fail_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    #[must_use]
    pub fn fail_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    #[must_use]
    pub fn fail_pause(mut self) -> Self {
        self.fail_pause = true;
        self
    }

    /// Makes `create_endpoint` answer with this status and body.
    #[must_use]
    pub fn fail_endpoint(mut self, status: u16, body: &str) -> Self {
        self.endpoint_failure = Some((status, body.to_string()));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, op: &'static str) -> std::sync::MutexGuard<'_, MockState> {
        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        state
    }

    #[must_use]
    pub fn call_count(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    #[must_use]
    pub fn repo(&self, repo: &RepoRef) -> Option<RepoSpec> {
        self.lock().repos.get(&repo.to_string()).cloned()
    }

    #[must_use]
    pub fn secrets(&self, repo_id: &str) -> BTreeMap<String, String> {
        self.lock().secrets.get(repo_id).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn file(&self, repo: &RepoRef, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&repo.to_string()).and_then(|files| files.get(path).cloned())
    }

    #[must_use]
    pub fn file_paths(&self, repo: &RepoRef) -> Vec<String> {
        self.lock().files.get(&repo.to_string()).map(|files| files.keys().cloned().collect()).unwrap_or_default()
    }

    #[must_use]
    pub fn endpoint_payloads(&self) -> Vec<Value> {
        self.lock().endpoints.clone()
    }

    #[must_use]
    pub fn paused(&self) -> Vec<String> {
        self.lock().paused.clone()
    }
}

#[async_trait]
impl HubApi for MockHub {
    async fn create_repository(&self, spec: &RepoSpec) -> HubResult<String> {
        let mut state = self.record(ops::CREATE_REPOSITORY);
        let key = spec.repo.to_string();
        if state.repos.contains_key(&key) && !spec.exist_ok {
            return Err(HubError::Conflict(spec.repo.id.clone()));
        }
        state.repos.insert(key.clone(), spec.clone());
        Ok(format!("https://mock.hub/{key}"))
    }

    async fn add_secret(&self, repo_id: &str, key: &str, value: &str) -> HubResult<()> {
        let mut state = self.record(ops::ADD_SECRET);
        if self.failing_secrets.contains(key) {
            return Err(HubError::Status { status: 500, body: format!("cannot store secret {key}") });
        }
        state.secrets.entry(repo_id.to_string()).or_default().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn upload_file(&self, repo: &RepoRef, path_in_repo: &str, content: Vec<u8>) -> HubResult<()> {
        let mut state = self.record(ops::UPLOAD_FILE);
        if self.fail_uploads {
            return Err(HubError::Status { status: 503, body: "upload unavailable".to_string() });
        }
        state.files.entry(repo.to_string()).or_default().insert(path_in_repo.to_string(), content);
        Ok(())
    }

    async fn upload_folder(&self, repo: &RepoRef, folder: &Path) -> HubResult<usize> {
        let mut state = self.record(ops::UPLOAD_FOLDER);
        if self.fail_uploads {
            return Err(HubError::Status { status: 503, body: "upload unavailable".to_string() });
        }
        let mut count = 0;
        for entry in walkdir::WalkDir::new(folder).sort_by_file_name() {
            let entry = entry.map_err(|e| HubError::Io(std::io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(folder).unwrap_or(entry.path());
            let path_in_repo = rel.to_string_lossy().replace('\\', "/");
            let content = std::fs::read(entry.path())?;
            state.files.entry(repo.to_string()).or_default().insert(path_in_repo, content);
            count += 1;
        }
        Ok(count)
    }

    async fn download_snapshot(&self, repo: &RepoRef, local_dir: &Path) -> HubResult<PathBuf> {
        let files = {
            let state = self.record(ops::DOWNLOAD_SNAPSHOT);
            if self.fail_downloads {
                return Err(HubError::Status { status: 404, body: format!("{repo} not found") });
            }
            state.files.get(&repo.to_string()).cloned().unwrap_or_default()
        };
        std::fs::create_dir_all(local_dir)?;
        for (path, content) in files {
            let target = local_dir.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, content)?;
        }
        Ok(local_dir.to_path_buf())
    }

    async fn create_endpoint(&self, _account: &str, payload: &Value) -> HubResult<String> {
        let mut state = self.record(ops::CREATE_ENDPOINT);
        state.endpoints.push(payload.clone());
        if let Some((status, body)) = &self.endpoint_failure {
            return Err(HubError::Status { status: *status, body: body.clone() });
        }
        Ok(payload.get("name").and_then(Value::as_str).unwrap_or_default().to_string())
    }

    async fn pause_endpoint(&self, account: &str, name: &str) -> HubResult<Value> {
        let mut state = self.record(ops::PAUSE_ENDPOINT);
        if self.fail_pause {
            return Err(HubError::Status { status: 500, body: "pause failed".to_string() });
        }
        state.paused.push(format!("{account}/{name}"));
        Ok(json!({ "name": name, "status": { "state": "paused" } }))
    }

    async fn pause_space(&self, repo_id: &str) -> HubResult<Value> {
        let mut state = self.record(ops::PAUSE_SPACE);
        if self.fail_pause {
            return Err(HubError::Status { status: 500, body: "pause failed".to_string() });
        }
        state.paused.push(repo_id.to_string());
        Ok(json!({ "stage": "PAUSED" }))
    }
}
