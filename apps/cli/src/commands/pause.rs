//! Manual pause of a provisioned unit.

use crate::config::{env_token, hub_client};
use anyhow::{Context, Result};
use colored::Colorize;
use spacerun_core::{Reclaimer, SpacerunConfig, UnitIdentity, UnitKind};
use std::sync::Arc;

pub async fn execute(config: &SpacerunConfig, unit: &str, kind: UnitKind) -> Result<()> {
    let token = env_token().context("HF_TOKEN must be set to pause a unit")?;
    let identity = UnitIdentity::parse(unit, kind)?;

    let reclaimer = Reclaimer::new(Arc::new(hub_client(config, &token)));
    let ack = reclaimer.pause(&identity).await?;

    println!("{} {}", "Paused".bold().green(), identity);
    if !ack.is_null() {
        println!("{}", serde_json::to_string_pretty(&ack)?);
    }
    Ok(())
}
