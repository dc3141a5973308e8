//! Registry client for Spacerun.
//!
//! This crate provides the registry/endpoint contract the orchestrator consumes
//! ([`HubApi`]) and its implementations.
//!
//! # Implementations
//!
//! - **HubClient**: HTTPS client for the registry and the managed endpoints API
//! - **MockHub**: In-memory recording hub for tests and dry runs

pub mod api;
pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use api::HubApi;
pub use client::{HubClient, DEFAULT_ENDPOINTS_URL, DEFAULT_HUB_URL};
pub use error::{HubError, HubResult};
pub use mock::MockHub;
pub use types::{split_repo_id, RepoKind, RepoRef, RepoSpec};
