//! Run command - keep a tunnel up until interrupted.

use std::time::Duration;

use anyhow::{Context, Result};
use lbtunnel_core::adapters::{
    CliHostDriver, JsonReporter, KubeServiceApi, MachineInspector, OsRouter, ProfileConfigLoader,
    TextReporter,
};
use lbtunnel_core::ports::Reporter;
use lbtunnel_core::{ConfigStore, Tunnel, TunnelManager};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::open_registry;

pub async fn run(profile: &str, interval: Option<u64>, json: bool) -> Result<()> {
    let config = ConfigStore::new()?.load().await?;
    let tick = match interval {
        Some(seconds) => Duration::from_secs(seconds.max(1)),
        None => config.tick_duration(),
    };

    let driver = match &config.driver_binary {
        Some(binary) => CliHostDriver::with_binary(binary.clone()),
        None => CliHostDriver::new(),
    };
    if driver.binary().is_none() {
        anyhow::bail!("minikube not found in known paths or PATH; set driverBinary in the config file");
    }
    let loader = match &config.profiles_dir {
        Some(dir) => ProfileConfigLoader::with_dir(dir.clone()),
        None => ProfileConfigLoader::new()?,
    };
    let services = KubeServiceApi::try_default()
        .await
        .context("unable to create Kubernetes client")?;

    let reporter: Box<dyn Reporter> = if json {
        Box::new(JsonReporter::stdout())
    } else {
        Box::new(TextReporter::stdout())
    };

    let tunnel = Tunnel::new(
        profile,
        MachineInspector::new(profile, driver, loader),
        OsRouter::new(),
        open_registry(&config)?,
        services,
        reporter,
    )
    .await?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        signal_token.cancel();
    });

    let status = TunnelManager::new(tick).run(tunnel, cancel).await;
    if status.has_errors() {
        anyhow::bail!("tunnel cleanup finished with errors");
    }
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            return;
        }
    }

    let _ = tokio::signal::ctrl_c().await;
}
