//! Provisioned compute units and their lifecycle.

use crate::error::ReclaimError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

/// The two kinds of remote compute unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    HostedApp,
    ManagedEndpoint,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::HostedApp => "hosted-app",
            Self::ManagedEndpoint => "managed-endpoint",
        })
    }
}

impl FromStr for UnitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted-app" | "hosted_app" | "space" | "spaces" => Ok(Self::HostedApp),
            "managed-endpoint" | "managed_endpoint" | "endpoint" | "ep" => Ok(Self::ManagedEndpoint),
            other => Err(format!("unknown unit kind '{other}', expected hosted-app or endpoint")),
        }
    }
}

/// Lifecycle state of a unit.
///
/// Hosted apps go `Requested → RepoCreated → SecretsInjected → ArtifactsUploaded → Running`,
/// managed endpoints `Requested → EndpointCreated → Running`. Any state may end in `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Requested,
    RepoCreated,
    SecretsInjected,
    ArtifactsUploaded,
    EndpointCreated,
    Running,
    Paused,
}

impl UnitKind {
    const fn lifecycle(self) -> &'static [UnitState] {
        match self {
            Self::HostedApp => &[
                UnitState::Requested,
                UnitState::RepoCreated,
                UnitState::SecretsInjected,
                UnitState::ArtifactsUploaded,
                UnitState::Running,
            ],
            Self::ManagedEndpoint => &[UnitState::Requested, UnitState::EndpointCreated, UnitState::Running],
        }
    }
}

/// A live (or paused) remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedUnit {
    /// Fully-qualified identifier, `{account}/{name}`.
    pub id: String,
    pub kind: UnitKind,
    state: UnitState,
}

impl ProvisionedUnit {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: UnitKind) -> Self {
        Self { id: id.into(), kind, state: UnitState::Requested }
    }

    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    /// Moves to the next state of this kind's lifecycle. No-op once running or paused.
    pub fn advance(&mut self) -> UnitState {
        let lifecycle = self.kind.lifecycle();
        if let Some(pos) = lifecycle.iter().position(|s| *s == self.state)
            && let Some(next) = lifecycle.get(pos + 1)
        {
            info!(unit = %self.id, kind = %self.kind, from = ?self.state, to = ?next, "Unit state transition");
            self.state = *next;
        }
        self.state
    }

    /// Marks the unit as booted. Only the platform knows when this happens, so callers that
    /// observe it (status checks, the runner itself) record it here.
    pub fn mark_running(&mut self) {
        if self.state != UnitState::Paused {
            self.state = UnitState::Running;
        }
    }

    /// Paused units are inert but keep their identifier for inspection.
    pub fn mark_paused(&mut self) {
        info!(unit = %self.id, kind = %self.kind, from = ?self.state, "Unit paused");
        self.state = UnitState::Paused;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == UnitState::Paused
    }
}

/// Who a unit is: its `{account}/{name}` identifier and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitIdentity {
    pub id: String,
    pub kind: UnitKind,
}

impl UnitIdentity {
    /// Builds an identity, rejecting anything that is not `account/name`.
    pub fn parse(id: &str, kind: UnitKind) -> Result<Self, ReclaimError> {
        match id.split_once('/') {
            Some((account, name)) if !account.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self { id: id.to_string(), kind })
            }
            _ => Err(ReclaimError::InvalidIdentity(id.to_string())),
        }
    }

    #[must_use]
    pub fn account(&self) -> &str {
        self.id.split_once('/').map_or("", |(account, _)| account)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.id.split_once('/').map_or(self.id.as_str(), |(_, name)| name)
    }
}

impl From<&ProvisionedUnit> for UnitIdentity {
    fn from(unit: &ProvisionedUnit) -> Self {
        Self { id: unit.id.clone(), kind: unit.kind }
    }
}

impl std::fmt::Display for UnitIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_app_lifecycle() {
        let mut unit = ProvisionedUnit::new("acme/autotrain-run1", UnitKind::HostedApp);
        assert_eq!(unit.advance(), UnitState::RepoCreated);
        assert_eq!(unit.advance(), UnitState::SecretsInjected);
        assert_eq!(unit.advance(), UnitState::ArtifactsUploaded);
        assert_eq!(unit.advance(), UnitState::Running);
        assert_eq!(unit.advance(), UnitState::Running);
    }

    #[test]
    fn test_endpoint_lifecycle_and_pause() {
        let mut unit = ProvisionedUnit::new("acme/run1", UnitKind::ManagedEndpoint);
        assert_eq!(unit.advance(), UnitState::EndpointCreated);
        unit.mark_paused();
        assert!(unit.is_paused());
        assert_eq!(unit.advance(), UnitState::Paused);
        unit.mark_running();
        assert_eq!(unit.state(), UnitState::Paused);
        assert_eq!(unit.id, "acme/run1");
    }

    #[test]
    fn test_unit_identity_parse() {
        let identity = UnitIdentity::parse("acme/run1", UnitKind::ManagedEndpoint).unwrap();
        assert_eq!(identity.account(), "acme");
        assert_eq!(identity.name(), "run1");

        for bad in ["run1", "/run1", "acme/", "acme/a/b"] {
            assert!(matches!(
                UnitIdentity::parse(bad, UnitKind::HostedApp),
                Err(ReclaimError::InvalidIdentity(_))
            ));
        }
    }

    #[test]
    fn test_unit_kind_from_str() {
        assert_eq!("hosted-app".parse::<UnitKind>().unwrap(), UnitKind::HostedApp);
        assert_eq!("Endpoint".parse::<UnitKind>().unwrap(), UnitKind::ManagedEndpoint);
        assert!("pod".parse::<UnitKind>().is_err());
    }
}
