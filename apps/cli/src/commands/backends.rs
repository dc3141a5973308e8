//! Backend listing.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use spacerun_core::{HardwareCatalog, UnitKind};

pub fn execute(json_output: bool) -> Result<()> {
    let catalog = HardwareCatalog::builtin();

    if json_output {
        let hosted: Vec<_> = catalog
            .entries(UnitKind::HostedApp)
            .into_iter()
            .map(|(id, hardware)| json!({ "backend": format!("spaces-{id}"), "hardware": hardware }))
            .collect();
        let endpoints: Vec<_> = catalog
            .entries(UnitKind::ManagedEndpoint)
            .into_iter()
            .map(|(id, hardware)| json!({ "backend": id, "hardware": hardware }))
            .collect();
        let out = json!({ "hosted-app": hosted, "managed-endpoint": endpoints });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for kind in [UnitKind::HostedApp, UnitKind::ManagedEndpoint] {
        let entries = catalog.entries(kind);
        println!();
        println!("{}", format!("{kind} backends ({})", entries.len()).bold().cyan());
        println!();
        println!("{:<22} {}", "Backend", "Hardware");
        println!("{}", "─".repeat(60));
        for (id, hardware) in entries {
            let backend = match kind {
                UnitKind::HostedApp => format!("spaces-{id}"),
                UnitKind::ManagedEndpoint => id.to_string(),
            };
            println!("{:<22} {}", backend.green(), hardware);
        }
    }
    println!();
    Ok(())
}
