//! Orchestrator configuration.
//!
//! Precedence, highest first:
//! 1. CLI arguments (handled by the binary)
//! 2. Environment variables (`SPACERUN_HUB_URL`, `SPACERUN_ENDPOINTS_URL`)
//! 3. Local config file (`./.spacerunrc`)
//! 4. Global config file (`~/.spacerun/config.toml`)
//! 5. Defaults

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use spacerun_hub::{DEFAULT_ENDPOINTS_URL, DEFAULT_HUB_URL};
use std::path::{Path, PathBuf};

pub const HUB_URL_VAR: &str = "SPACERUN_HUB_URL";
pub const ENDPOINTS_URL_VAR: &str = "SPACERUN_ENDPOINTS_URL";

const DEFAULT_HOSTED_IMAGE: &str = "ghcr.io/spacerun/runner:latest";
const DEFAULT_STARTUP_COMMAND: &str = "spacerun run";
const DEFAULT_ENDPOINT_IMAGE: &str = "ghcr.io/spacerun/runner-endpoint:latest";
const DEFAULT_ENDPOINT_REPOSITORY: &str = "spacerun/runner";
const DEFAULT_PORT: u16 = 7860;

/// Image overrides, all optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSettings {
    #[serde(default)]
    pub hosted_image: Option<String>,
    #[serde(default)]
    pub startup_command: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub endpoint_image: Option<String>,
    #[serde(default)]
    pub endpoint_repository: Option<String>,
    #[serde(default)]
    pub health_route: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingSettings {
    /// Local root for normalized datasets.
    #[serde(default)]
    pub root: Option<String>,
}

/// Spacerun configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacerunConfig {
    #[serde(default)]
    pub hub_url: Option<String>,

    #[serde(default)]
    pub endpoints_url: Option<String>,

    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub image: ImageSettings,

    #[serde(default)]
    pub staging: StagingSettings,
}

/// Fully resolved image settings handed to the provisioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    /// Container image a hosted app boots.
    pub hosted_image: String,
    /// Command the hosted app's container runs.
    pub startup_command: String,
    pub port: u16,
    /// Container image URL for managed endpoints.
    pub endpoint_image: String,
    /// Model repository field of the endpoint payload.
    pub endpoint_repository: String,
    pub health_route: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            hosted_image: DEFAULT_HOSTED_IMAGE.to_string(),
            startup_command: DEFAULT_STARTUP_COMMAND.to_string(),
            port: DEFAULT_PORT,
            endpoint_image: DEFAULT_ENDPOINT_IMAGE.to_string(),
            endpoint_repository: DEFAULT_ENDPOINT_REPOSITORY.to_string(),
            health_route: "/".to_string(),
        }
    }
}

impl SpacerunConfig {
    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".spacerun")
            .join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".spacerunrc")
    }

    /// Loads the global then the local file; local values win. Missing files are skipped,
    /// unreadable or malformed ones are reported.
    pub fn discover_and_load() -> ConfigResult<Self> {
        Self::load_layers(&[Self::default_global_path(), Self::default_local_path()])
    }

    /// Merges each existing file in order, later files overriding earlier ones.
    pub fn load_layers(paths: &[PathBuf]) -> ConfigResult<Self> {
        let mut config = Self::default();
        for path in paths {
            match Self::load_from_file(path) {
                Ok(layer) => config.merge(&layer),
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(config)
    }

    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        fn take<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }

        take(&mut self.hub_url, &other.hub_url);
        take(&mut self.endpoints_url, &other.endpoints_url);
        take(&mut self.log_level, &other.log_level);
        take(&mut self.image.hosted_image, &other.image.hosted_image);
        take(&mut self.image.startup_command, &other.image.startup_command);
        take(&mut self.image.port, &other.image.port);
        take(&mut self.image.endpoint_image, &other.image.endpoint_image);
        take(&mut self.image.endpoint_repository, &other.image.endpoint_repository);
        take(&mut self.image.health_route, &other.image.health_route);
        take(&mut self.staging.root, &other.staging.root);
    }

    /// Applies URL overrides from the environment (or any lookup).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(HUB_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.hub_url = Some(url);
        }
        if let Some(url) = lookup(ENDPOINTS_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.endpoints_url = Some(url);
        }
    }

    #[must_use]
    pub fn hub_url(&self) -> &str {
        self.hub_url.as_deref().unwrap_or(DEFAULT_HUB_URL)
    }

    #[must_use]
    pub fn endpoints_url(&self) -> &str {
        self.endpoints_url.as_deref().unwrap_or(DEFAULT_ENDPOINTS_URL)
    }

    /// Staging root, defaulting to `./.spacerun/staging`.
    #[must_use]
    pub fn staging_root(&self) -> PathBuf {
        self.staging.root.as_ref().map_or_else(|| PathBuf::from(".spacerun").join("staging"), PathBuf::from)
    }

    /// Image settings with defaults filled in.
    pub fn images(&self) -> ConfigResult<ImageConfig> {
        let defaults = ImageConfig::default();
        let image = &self.image;
        let resolved = ImageConfig {
            hosted_image: image.hosted_image.clone().unwrap_or(defaults.hosted_image),
            startup_command: image.startup_command.clone().unwrap_or(defaults.startup_command),
            port: image.port.unwrap_or(defaults.port),
            endpoint_image: image.endpoint_image.clone().unwrap_or(defaults.endpoint_image),
            endpoint_repository: image.endpoint_repository.clone().unwrap_or(defaults.endpoint_repository),
            health_route: image.health_route.clone().unwrap_or(defaults.health_route),
        };

        for (key, value) in [
            ("image.hosted_image", &resolved.hosted_image),
            ("image.startup_command", &resolved.startup_command),
            ("image.endpoint_image", &resolved.endpoint_image),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue { key: key.to_string(), message: "must not be empty".to_string() });
            }
        }
        if !resolved.health_route.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "image.health_route".to_string(),
                message: format!("'{}' must start with '/'", resolved.health_route),
            });
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
hub_url = "http://localhost:9000"
log_level = "debug"

[image]
hosted_image = "registry.local/runner:1"
port = 8080

[staging]
root = "/var/spacerun"
"#,
        )
        .unwrap();

        let config = SpacerunConfig::load_from_file(&path).unwrap();
        assert_eq!(config.hub_url(), "http://localhost:9000");
        assert_eq!(config.endpoints_url(), DEFAULT_ENDPOINTS_URL);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.staging_root(), PathBuf::from("/var/spacerun"));

        let images = config.images().unwrap();
        assert_eq!(images.hosted_image, "registry.local/runner:1");
        assert_eq!(images.port, 8080);
        assert_eq!(images.startup_command, DEFAULT_STARTUP_COMMAND);
    }

    #[test]
    fn test_local_layer_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("config.toml");
        let local = temp_dir.path().join(".spacerunrc");
        std::fs::write(&global, "hub_url = \"http://global\"\nlog_level = \"warn\"\n").unwrap();
        std::fs::write(&local, "hub_url = \"http://local\"\n").unwrap();

        let config = SpacerunConfig::load_layers(&[global, local, temp_dir.path().join("missing.toml")]).unwrap();
        assert_eq!(config.hub_url(), "http://local");
        assert_eq!(config.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn test_malformed_layer_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "hub_url = [").unwrap();

        assert!(matches!(SpacerunConfig::load_layers(&[path]), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(HUB_URL_VAR, "http://env-hub"), (ENDPOINTS_URL_VAR, "")].into();
        let mut config = SpacerunConfig { endpoints_url: Some("http://file-ep".to_string()), ..Default::default() };
        config.apply_env_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.hub_url(), "http://env-hub");
        assert_eq!(config.endpoints_url(), "http://file-ep");
    }

    #[test]
    fn test_invalid_health_route() {
        let config = SpacerunConfig {
            image: ImageSettings { health_route: Some("health".to_string()), ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(config.images(), Err(ConfigError::InvalidValue { .. })));
    }
}
