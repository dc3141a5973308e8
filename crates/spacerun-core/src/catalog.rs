//! Hardware catalog.
//!
//! Maps short backend identifiers to provider hardware. Hosted applications and managed
//! endpoints use disjoint tables: a hosted application resolves to a single hardware tier
//! string, a managed endpoint to a composite descriptor parsed from
//! `{vendor}_{region}_{accelerator}_{size}_{instanceType}`.

use crate::error::CatalogError;
use crate::unit::UnitKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

const HOSTED_APP_TIERS: &[(&str, &str)] = &[
    ("cpu", "cpu-basic"),
    ("cpuf", "cpu-upgrade"),
    ("t4s", "t4-small"),
    ("t4m", "t4-medium"),
    ("a10gs", "a10g-small"),
    ("a10gl", "a10g-large"),
    ("a100", "a100-large"),
];

const ENDPOINT_TIERS: &[(&str, &str)] = &[
    ("ep-aws-useast1-s", "aws_us-east-1_gpu_small_g4dn.xlarge"),
    ("ep-aws-useast1-m", "aws_us-east-1_gpu_medium_g5.2xlarge"),
    ("ep-aws-useast1-l", "aws_us-east-1_gpu_large_g4dn.12xlarge"),
    ("ep-aws-useast1-xl", "aws_us-east-1_gpu_xlarge_p4de"),
    ("ep-aws-useast1-2xl", "aws_us-east-1_gpu_2xlarge_p4de"),
    ("ep-aws-useast1-4xl", "aws_us-east-1_gpu_4xlarge_p4de"),
    ("ep-aws-useast1-8xl", "aws_us-east-1_gpu_8xlarge_p4de"),
];

/// Hardware for a managed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointHardware {
    pub vendor: String,
    pub region: String,
    pub accelerator: String,
    pub size: String,
    pub instance_type: String,
}

impl FromStr for EndpointHardware {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        let [vendor, region, accelerator, size, instance_type] = parts.as_slice() else {
            return Err(CatalogError::MalformedDescriptor(s.to_string()));
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CatalogError::MalformedDescriptor(s.to_string()));
        }
        Ok(Self {
            vendor: (*vendor).to_string(),
            region: (*region).to_string(),
            accelerator: (*accelerator).to_string(),
            size: (*size).to_string(),
            instance_type: (*instance_type).to_string(),
        })
    }
}

/// Resolved hardware, one variant per unit kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendDescriptor {
    HostedApp { hardware: String },
    ManagedEndpoint(EndpointHardware),
}

impl BackendDescriptor {
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        match self {
            Self::HostedApp { .. } => UnitKind::HostedApp,
            Self::ManagedEndpoint(_) => UnitKind::ManagedEndpoint,
        }
    }
}

/// A backend selection: unit kind plus its short identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub kind: UnitKind,
    pub short_id: String,
}

impl Backend {
    #[must_use]
    pub fn new(kind: UnitKind, short_id: impl Into<String>) -> Self {
        Self { kind, short_id: short_id.into() }
    }
}

impl FromStr for Backend {
    type Err = CatalogError;

    /// Parses user-facing identifiers: `spaces-<tier>` or `ep-<vendor>-<region>-<size>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Some(tier) = lower.strip_prefix("spaces-") {
            return Ok(Self::new(UnitKind::HostedApp, tier));
        }
        if lower.starts_with("ep-") {
            return Ok(Self::new(UnitKind::ManagedEndpoint, lower));
        }
        Err(CatalogError::UnknownBackend(s.to_string()))
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            UnitKind::HostedApp => write!(f, "spaces-{}", self.short_id),
            UnitKind::ManagedEndpoint => f.write_str(&self.short_id),
        }
    }
}

/// Read-only lookup table from short identifiers to hardware.
#[derive(Debug, Clone)]
pub struct HardwareCatalog {
    hosted_apps: BTreeMap<String, String>,
    endpoints: BTreeMap<String, String>,
}

impl Default for HardwareCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl HardwareCatalog {
    /// The built-in tiers.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            HOSTED_APP_TIERS.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())),
            ENDPOINT_TIERS.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
    }

    /// A catalog with custom tables. Endpoint values are canonical descriptor strings.
    #[must_use]
    pub fn new(
        hosted_apps: impl IntoIterator<Item = (String, String)>,
        endpoints: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self { hosted_apps: hosted_apps.into_iter().collect(), endpoints: endpoints.into_iter().collect() }
    }

    /// Looks up `short_id` in the table for `kind`.
    pub fn resolve(&self, short_id: &str, kind: UnitKind) -> Result<BackendDescriptor, CatalogError> {
        match kind {
            UnitKind::HostedApp => {
                let hardware = self
                    .hosted_apps
                    .get(&short_id.to_ascii_lowercase())
                    .ok_or_else(|| CatalogError::UnknownBackend(short_id.to_string()))?;
                Ok(BackendDescriptor::HostedApp { hardware: hardware.clone() })
            }
            UnitKind::ManagedEndpoint => {
                let canonical =
                    self.endpoints.get(short_id).ok_or_else(|| CatalogError::UnknownBackend(short_id.to_string()))?;
                Ok(BackendDescriptor::ManagedEndpoint(canonical.parse()?))
            }
        }
    }

    pub fn resolve_backend(&self, backend: &Backend) -> Result<BackendDescriptor, CatalogError> {
        self.resolve(&backend.short_id, backend.kind)
    }

    /// All `(short id, hardware)` pairs for one kind, sorted by identifier.
    #[must_use]
    pub fn entries(&self, kind: UnitKind) -> Vec<(&str, &str)> {
        let table = match kind {
            UnitKind::HostedApp => &self.hosted_apps,
            UnitKind::ManagedEndpoint => &self.endpoints,
        };
        table.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint_descriptor() {
        let hw: EndpointHardware = "aws_us-east-1_gpu_small_g4dn.xlarge".parse().unwrap();
        assert_eq!(hw.vendor, "aws");
        assert_eq!(hw.region, "us-east-1");
        assert_eq!(hw.accelerator, "gpu");
        assert_eq!(hw.size, "small");
        assert_eq!(hw.instance_type, "g4dn.xlarge");
    }

    #[test]
    fn test_parse_endpoint_descriptor_wrong_arity() {
        for bad in ["aws_us-east-1_gpu_small", "aws", "", "aws_us-east-1_gpu_small_g4dn_extra", "aws__gpu_small_x"] {
            assert_eq!(
                bad.parse::<EndpointHardware>(),
                Err(CatalogError::MalformedDescriptor(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_every_builtin_entry_resolves() {
        let catalog = HardwareCatalog::builtin();
        for (id, _) in catalog.entries(UnitKind::ManagedEndpoint) {
            let BackendDescriptor::ManagedEndpoint(hw) = catalog.resolve(id, UnitKind::ManagedEndpoint).unwrap() else {
                panic!("expected endpoint descriptor for {id}");
            };
            assert!(!hw.vendor.is_empty());
            assert!(!hw.region.is_empty());
        }
        for (id, _) in catalog.entries(UnitKind::HostedApp) {
            let BackendDescriptor::HostedApp { hardware } = catalog.resolve(id, UnitKind::HostedApp).unwrap() else {
                panic!("expected hosted app descriptor for {id}");
            };
            assert!(!hardware.is_empty());
        }
    }

    #[test]
    fn test_tables_are_disjoint() {
        let catalog = HardwareCatalog::builtin();
        assert_eq!(
            catalog.resolve("a10gl", UnitKind::ManagedEndpoint),
            Err(CatalogError::UnknownBackend("a10gl".to_string()))
        );
        assert_eq!(
            catalog.resolve("ep-aws-useast1-s", UnitKind::HostedApp),
            Err(CatalogError::UnknownBackend("ep-aws-useast1-s".to_string()))
        );
    }

    #[test]
    fn test_malformed_catalog_entry() {
        let catalog = HardwareCatalog::new(Vec::new(), [("ep-broken".to_string(), "aws_us-east-1_gpu".to_string())]);
        assert!(matches!(
            catalog.resolve("ep-broken", UnitKind::ManagedEndpoint),
            Err(CatalogError::MalformedDescriptor(_))
        ));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("spaces-A10GL".parse::<Backend>().unwrap(), Backend::new(UnitKind::HostedApp, "a10gl"));
        assert_eq!(
            "ep-aws-useast1-m".parse::<Backend>().unwrap(),
            Backend::new(UnitKind::ManagedEndpoint, "ep-aws-useast1-m")
        );
        assert!(matches!("local".parse::<Backend>(), Err(CatalogError::UnknownBackend(_))));
        assert_eq!(Backend::new(UnitKind::HostedApp, "t4s").to_string(), "spaces-t4s");
    }
}
