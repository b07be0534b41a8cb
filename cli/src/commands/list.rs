//! List command - show registered tunnels.

use anyhow::Result;
use lbtunnel_core::adapters::OsProcessLiveness;
use lbtunnel_core::ports::{ProcessLiveness, TunnelRegistry};
use lbtunnel_core::{ConfigStore, TunnelId};
use serde::Serialize;

use super::open_registry;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    #[serde(flatten)]
    tunnel: TunnelId,
    alive: bool,
}

pub async fn run(json: bool) -> Result<()> {
    let config = ConfigStore::new()?.load().await?;
    let registry = open_registry(&config)?;
    let liveness = OsProcessLiveness::new();

    let entries: Vec<Entry> = registry
        .list()
        .await?
        .into_iter()
        .map(|tunnel| Entry {
            alive: liveness.is_alive(tunnel.pid),
            tunnel,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No tunnels registered.");
        return Ok(());
    }

    // Table header
    println!(
        "{:<20} {:<8} {:<20} {:<16} STATE",
        "MACHINE", "PID", "DESTINATION", "GATEWAY"
    );
    println!("{}", "-".repeat(76));

    for entry in &entries {
        let state = if entry.alive { "running" } else { "orphaned" };
        println!(
            "{:<20} {:<8} {:<20} {:<16} {}",
            truncate(&entry.tunnel.machine_name, 20),
            entry.tunnel.pid,
            entry.tunnel.route.dest_cidr.to_string(),
            entry.tunnel.route.gateway.to_string(),
            state
        );
    }

    println!("\nTotal: {} tunnels", entries.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 1).collect();
        format!("{}…", kept)
    }
}
