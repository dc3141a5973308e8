//! CLI configuration loading.

use anyhow::Context;
use spacerun_core::SpacerunConfig;
use spacerun_hub::HubClient;

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments (handled by clap)
/// 2. Environment variables
/// 3. Local config file (./.spacerunrc)
/// 4. Global config file (~/.spacerun/config.toml)
/// 5. Defaults
pub fn load_config() -> anyhow::Result<SpacerunConfig> {
    let mut config = SpacerunConfig::discover_and_load().context("Failed to load spacerun configuration")?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Registry client for `token` against the configured URLs.
pub fn hub_client(config: &SpacerunConfig, token: &str) -> HubClient {
    HubClient::with_urls(token, config.hub_url(), config.endpoints_url())
}

/// Access token from the environment.
pub fn env_token() -> Option<String> {
    std::env::var(spacerun_core::secrets::TOKEN).ok().filter(|t| !t.trim().is_empty())
}
