//! Cleanup command - remove tunnels left behind by dead processes.

use anyhow::Result;
use lbtunnel_core::adapters::OsRouter;
use lbtunnel_core::{ConfigStore, TunnelManager};

use super::open_registry;

pub async fn run(json: bool) -> Result<()> {
    let config = ConfigStore::new()?.load().await?;
    let registry = open_registry(&config)?;

    let removed = TunnelManager::cleanup_orphaned(&registry, &OsRouter::new()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&removed)?);
        return Ok(());
    }

    if removed.is_empty() {
        println!("No orphaned tunnels found.");
        return Ok(());
    }

    for tunnel in &removed {
        println!("Removed {}", tunnel);
    }
    println!("\nTotal: {} tunnels", removed.len());
    Ok(())
}
