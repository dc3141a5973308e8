//! Request types shared by every [`crate::HubApi`] implementation.

use serde::{Deserialize, Serialize};

/// Kind of registry repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    Model,
    Dataset,
    Space,
}

impl RepoKind {
    /// Path segment used by the REST API (`/api/{segment}/...`).
    #[must_use]
    pub const fn api_segment(self) -> &'static str {
        match self {
            Self::Model => "models",
            Self::Dataset => "datasets",
            Self::Space => "spaces",
        }
    }

    /// Prefix used by file resolution URLs (`/{prefix}{repo}/resolve/...`).
    #[must_use]
    pub const fn url_prefix(self) -> &'static str {
        match self {
            Self::Model => "",
            Self::Dataset => "datasets/",
            Self::Space => "spaces/",
        }
    }
}

/// A repository address: identifier plus kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub id: String,
    pub kind: RepoKind,
}

impl RepoRef {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: RepoKind) -> Self {
        Self { id: id.into(), kind }
    }

    #[must_use]
    pub fn dataset(id: impl Into<String>) -> Self {
        Self::new(id, RepoKind::Dataset)
    }

    #[must_use]
    pub fn space(id: impl Into<String>) -> Self {
        Self::new(id, RepoKind::Space)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.url_prefix(), self.id)
    }
}

/// Repository creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSpec {
    pub repo: RepoRef,
    /// Hardware tier, only meaningful for spaces.
    pub hardware: Option<String>,
    /// Space SDK (`docker`), only meaningful for spaces.
    pub space_sdk: Option<String>,
    pub private: bool,
    /// Treat an already existing repository as success instead of a conflict.
    pub exist_ok: bool,
}

impl RepoSpec {
    #[must_use]
    pub fn private_dataset(id: impl Into<String>) -> Self {
        Self { repo: RepoRef::dataset(id), hardware: None, space_sdk: None, private: true, exist_ok: true }
    }

    #[must_use]
    pub fn private_docker_space(id: impl Into<String>, hardware: impl Into<String>) -> Self {
        Self {
            repo: RepoRef::space(id),
            hardware: Some(hardware.into()),
            space_sdk: Some("docker".to_string()),
            private: true,
            exist_ok: false,
        }
    }
}

/// Splits `owner/name` into its parts.
#[must_use]
pub fn split_repo_id(repo_id: &str) -> Option<(&str, &str)> {
    let (owner, name) = repo_id.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner, name))
}
