//! Config command - show or change tunnel settings.

use anyhow::Result;
use lbtunnel_core::ConfigStore;

pub async fn show(json: bool) -> Result<()> {
    let store = ConfigStore::new()?;
    let config = store.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let or_default = |path: &Option<std::path::PathBuf>| {
        path.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(default)".to_string())
    };

    println!("Config file:    {}", store.path().display());
    println!("Tick interval:  {}s", config.tick_interval);
    println!("Registry:       {}", or_default(&config.registry_path));
    println!("Profiles dir:   {}", or_default(&config.profiles_dir));
    println!("Driver binary:  {}", or_default(&config.driver_binary));
    Ok(())
}

pub async fn set_interval(seconds: u64) -> Result<()> {
    ConfigStore::new()?.set_tick_interval(seconds).await?;
    println!("Tick interval set to {}s", seconds);
    Ok(())
}
