//! HTTP implementation of [`HubApi`].
//!
//! Talks to the registry REST API for repositories, secrets, commits and snapshots, and
//! to the endpoints API for managed endpoints.

use crate::api::HubApi;
use crate::error::{HubError, HubResult};
use crate::types::{split_repo_id, RepoKind, RepoRef, RepoSpec};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error};

/// Default registry URL.
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";
/// Default managed endpoints API URL.
pub const DEFAULT_ENDPOINTS_URL: &str = "https://api.endpoints.huggingface.cloud";

/// Registry client bound to one access token.
#[derive(Clone)]
pub struct HubClient {
    token: String,
    hub_url: String,
    endpoints_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    organization: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sdk: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hardware: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateRepoResponse {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    #[serde(default)]
    siblings: Vec<Sibling>,
}

#[derive(Debug, Deserialize)]
struct Sibling {
    rfilename: String,
}

impl HubClient {
    /// Creates a client against the public registry and endpoints API.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_urls(token, DEFAULT_HUB_URL, DEFAULT_ENDPOINTS_URL)
    }

    /// Creates a client against custom base URLs (self-hosted registries, tests).
    #[must_use]
    pub fn with_urls(token: impl Into<String>, hub_url: impl Into<String>, endpoints_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            hub_url: hub_url.into().trim_end_matches('/').to_string(),
            endpoints_url: endpoints_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> HubResult<Response> {
        debug!(url = %url, "Hub request");
        let response = request.bearer_auth(&self.token).send().await.map_err(|e| {
            error!(url = %url, error = %e, "Hub request failed");
            HubError::Request { url: url.to_string(), message: e.to_string() }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!(url = %url, status = %status, "Hub returned error status");
        Err(HubError::Status { status: status.as_u16(), body })
    }

    async fn json_response(response: Response) -> HubResult<Value> {
        let text = response
            .text()
            .await
            .map_err(|e| HubError::InvalidResponse(format!("failed to read body: {e}")))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn commit(&self, repo: &RepoRef, summary: &str, files: Vec<(String, Vec<u8>)>) -> HubResult<()> {
        let url = format!("{}/api/{}/{}/commit/main", self.hub_url, repo.kind.api_segment(), repo.id);
        let body = commit_body(summary, &files)?;
        let request = self.client.post(&url).header("content-type", "application/x-ndjson").body(body);
        self.send(&url, request).await?;
        debug!(repo = %repo, files = files.len(), "Committed files");
        Ok(())
    }
}

/// Builds the ndjson commit payload: one header line, then one line per file.
fn commit_body(summary: &str, files: &[(String, Vec<u8>)]) -> HubResult<String> {
    let mut lines = vec![serde_json::to_string(&json!({
        "key": "header",
        "value": { "summary": summary, "description": "" },
    }))?];
    for (path, content) in files {
        lines.push(serde_json::to_string(&json!({
            "key": "file",
            "value": { "content": STANDARD.encode(content), "path": path, "encoding": "base64" },
        }))?);
    }
    Ok(lines.join("\n"))
}

/// Rejects repository file names that would escape the download directory.
fn safe_relative_path(name: &str) -> HubResult<PathBuf> {
    let path = Path::new(name);
    if path.components().all(|c| matches!(c, Component::Normal(_))) {
        Ok(path.to_path_buf())
    } else {
        Err(HubError::InvalidResponse(format!("refusing unsafe file name '{name}'")))
    }
}

fn collect_folder(folder: &Path) -> HubResult<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(folder).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| HubError::Io(std::io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(folder)
            .map_err(|e| HubError::Io(std::io::Error::other(e.to_string())))?;
        let path_in_repo = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
        files.push((path_in_repo, std::fs::read(entry.path())?));
    }
    Ok(files)
}

#[async_trait]
impl HubApi for HubClient {
    async fn create_repository(&self, spec: &RepoSpec) -> HubResult<String> {
        let (organization, name) = split_repo_id(&spec.repo.id)
            .ok_or_else(|| HubError::InvalidResponse(format!("invalid repository id '{}'", spec.repo.id)))?;
        let url = format!("{}/api/repos/create", self.hub_url);
        let body = CreateRepoRequest {
            name,
            organization,
            kind: match spec.repo.kind {
                RepoKind::Model => None,
                RepoKind::Dataset => Some("dataset"),
                RepoKind::Space => Some("space"),
            },
            private: spec.private,
            sdk: spec.space_sdk.as_deref(),
            hardware: spec.hardware.as_deref(),
        };

        match self.send(&url, self.client.post(&url).json(&body)).await {
            Ok(response) => {
                let created: CreateRepoResponse = response
                    .json()
                    .await
                    .map_err(|e| HubError::InvalidResponse(format!("failed to parse repo response: {e}")))?;
                Ok(created.url.unwrap_or_else(|| format!("{}/{}", self.hub_url, spec.repo)))
            }
            Err(HubError::Status { status: 409, body }) => {
                if spec.exist_ok {
                    debug!(repo = %spec.repo, "Repository already exists, reusing it");
                    Ok(format!("{}/{}", self.hub_url, spec.repo))
                } else {
                    debug!(repo = %spec.repo, body = %body, "Repository already exists");
                    Err(HubError::Conflict(spec.repo.id.clone()))
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn add_secret(&self, repo_id: &str, key: &str, value: &str) -> HubResult<()> {
        let url = format!("{}/api/spaces/{}/secrets", self.hub_url, repo_id);
        let request = self.client.post(&url).json(&json!({ "key": key, "value": value }));
        self.send(&url, request).await?;
        Ok(())
    }

    async fn upload_file(&self, repo: &RepoRef, path_in_repo: &str, content: Vec<u8>) -> HubResult<()> {
        self.commit(repo, &format!("Upload {path_in_repo}"), vec![(path_in_repo.to_string(), content)]).await
    }

    async fn upload_folder(&self, repo: &RepoRef, folder: &Path) -> HubResult<usize> {
        let files = collect_folder(folder)?;
        let count = files.len();
        self.commit(repo, &format!("Upload folder {}", folder.display()), files).await?;
        Ok(count)
    }

    async fn download_snapshot(&self, repo: &RepoRef, local_dir: &Path) -> HubResult<PathBuf> {
        let url = format!("{}/api/{}/{}/revision/main", self.hub_url, repo.kind.api_segment(), repo.id);
        let info: RepoInfo = self
            .send(&url, self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(|e| HubError::InvalidResponse(format!("failed to parse repo info: {e}")))?;

        tokio::fs::create_dir_all(local_dir).await?;
        for sibling in info.siblings {
            let rel = safe_relative_path(&sibling.rfilename)?;
            let file_url = format!("{}/{}/resolve/main/{}", self.hub_url, repo, encode_path(&sibling.rfilename));
            let bytes = self
                .send(&file_url, self.client.get(&file_url))
                .await?
                .bytes()
                .await
                .map_err(|e| HubError::InvalidResponse(format!("failed to read {}: {e}", sibling.rfilename)))?;

            let target = local_dir.join(rel);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &bytes).await?;
        }
        Ok(local_dir.to_path_buf())
    }

    async fn create_endpoint(&self, account: &str, payload: &Value) -> HubResult<String> {
        let url = format!("{}/v2/endpoint/{}", self.endpoints_url, account);
        let response = self.send(&url, self.client.post(&url).json(payload)).await?;
        let created = Self::json_response(response).await?;
        created
            .get("name")
            .or_else(|| payload.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| HubError::InvalidResponse("endpoint response has no name".to_string()))
    }

    async fn pause_endpoint(&self, account: &str, name: &str) -> HubResult<Value> {
        let url = format!("{}/v2/endpoint/{}/{}/pause", self.endpoints_url, account, name);
        let response = self.send(&url, self.client.post(&url)).await?;
        Self::json_response(response).await
    }

    async fn pause_space(&self, repo_id: &str) -> HubResult<Value> {
        let url = format!("{}/api/spaces/{}/pause", self.hub_url, repo_id);
        let response = self.send(&url, self.client.post(&url)).await?;
        Self::json_response(response).await
    }
}

/// Percent-encodes each segment of a repository file path.
fn encode_path(path: &str) -> String {
    path.split('/').map(urlencoding::encode).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    fn client_for(server: &mockito::Server) -> HubClient {
        HubClient::with_urls("hf_test", server.url(), server.url())
    }

    #[tokio::test]
    async fn test_create_space_sends_hardware_and_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/repos/create")
            .match_header("authorization", "Bearer hf_test")
            .match_body(Matcher::PartialJson(json!({
                "name": "autotrain-run1",
                "organization": "acme",
                "type": "space",
                "private": true,
                "sdk": "docker",
                "hardware": "a10g-large",
            })))
            .with_status(200)
            .with_body(r#"{"url": "https://hub/spaces/acme/autotrain-run1"}"#)
            .create_async()
            .await;

        let url = client_for(&server)
            .create_repository(&RepoSpec::private_docker_space("acme/autotrain-run1", "a10g-large"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(url, "https://hub/spaces/acme/autotrain-run1");
    }

    #[tokio::test]
    async fn test_create_repository_conflict() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/repos/create")
            .with_status(409)
            .with_body(r#"{"error": "You already created this space repo"}"#)
            .expect(2)
            .create_async()
            .await;
        let client = client_for(&server);

        let err = client
            .create_repository(&RepoSpec::private_docker_space("acme/autotrain-run1", "t4-small"))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Conflict(ref id) if id == "acme/autotrain-run1"));

        // Dataset repositories are created with exist_ok.
        assert!(client.create_repository(&RepoSpec::private_dataset("acme/autotrain-data-run1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_file_commits_base64_ndjson() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/spaces/acme/autotrain-run1/commit/main")
            .match_header("content-type", "application/x-ndjson")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""key":"header""#.to_string()),
                Matcher::Regex(r#""path":"Dockerfile""#.to_string()),
                Matcher::Regex(STANDARD.encode("FROM x")),
            ]))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        client_for(&server)
            .upload_file(&RepoRef::space("acme/autotrain-run1"), "Dockerfile", b"FROM x".to_vec())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_snapshot_writes_files() {
        let mut server = mockito::Server::new_async().await;
        let _info = server
            .mock("GET", "/api/datasets/acme/autotrain-run1/revision/main")
            .with_status(200)
            .with_body(r#"{"siblings": [{"rfilename": "script.py"}, {"rfilename": "data/train.csv"}]}"#)
            .create_async()
            .await;
        let _script = server
            .mock("GET", "/datasets/acme/autotrain-run1/resolve/main/script.py")
            .with_status(200)
            .with_body("print('hi')")
            .create_async()
            .await;
        let _csv = server
            .mock("GET", "/datasets/acme/autotrain-run1/resolve/main/data/train.csv")
            .with_status(200)
            .with_body("text\nhello\n")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("run1");
        client_for(&server)
            .download_snapshot(&RepoRef::new("acme/autotrain-run1", RepoKind::Dataset), &dir)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(dir.join("script.py")).unwrap(), "print('hi')");
        assert_eq!(std::fs::read_to_string(dir.join("data/train.csv")).unwrap(), "text\nhello\n");
    }

    #[tokio::test]
    async fn test_download_snapshot_encodes_file_names() {
        let mut server = mockito::Server::new_async().await;
        let _info = server
            .mock("GET", "/api/datasets/acme/run2/revision/main")
            .with_status(200)
            .with_body(r#"{"siblings": [{"rfilename": "data/my file#1.csv"}]}"#)
            .create_async()
            .await;
        let file = server
            .mock("GET", "/datasets/acme/run2/resolve/main/data/my%20file%231.csv")
            .with_status(200)
            .with_body("text\nhello\n")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        client_for(&server).download_snapshot(&RepoRef::dataset("acme/run2"), temp.path()).await.unwrap();

        file.assert_async().await;
        assert_eq!(std::fs::read_to_string(temp.path().join("data/my file#1.csv")).unwrap(), "text\nhello\n");
    }

    #[tokio::test]
    async fn test_download_snapshot_rejects_traversal() {
        let mut server = mockito::Server::new_async().await;
        let _info = server
            .mock("GET", "/api/datasets/acme/evil/revision/main")
            .with_status(200)
            .with_body(r#"{"siblings": [{"rfilename": "../outside.txt"}]}"#)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let err = client_for(&server)
            .download_snapshot(&RepoRef::dataset("acme/evil"), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_create_endpoint_error_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2/endpoint/acme")
            .with_status(400)
            .with_body(r#"{"error": "quota exceeded for p4de"}"#)
            .create_async()
            .await;

        let err = client_for(&server).create_endpoint("acme", &json!({"name": "run1"})).await.unwrap_err();
        assert_eq!(err.body(), Some(r#"{"error": "quota exceeded for p4de"}"#));
    }

    #[tokio::test]
    async fn test_pause_endpoint_returns_ack() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/endpoint/acme/run1/pause")
            .with_status(200)
            .with_body(r#"{"status": {"state": "paused"}}"#)
            .create_async()
            .await;

        let ack = client_for(&server).pause_endpoint("acme", "run1").await.unwrap();
        mock.assert_async().await;
        assert_eq!(ack["status"]["state"], "paused");
    }

    #[test]
    fn test_collect_folder_uses_forward_slashes() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("script.py"), "x").unwrap();
        std::fs::write(temp.path().join("nested/data.csv"), "y").unwrap();

        let files = collect_folder(temp.path()).unwrap();
        let paths: Vec<_> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["nested/data.csv", "script.py"]);
    }
}
