//! Configuration management for tunnel settings.
//!
//! Stores configuration in JSON format at `~/.lbtunnel/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Configuration data stored in JSON format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Seconds between reconcile ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: u64,

    /// Registry file, instead of `~/.lbtunnel/tunnels.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<PathBuf>,

    /// Profile directory, instead of `~/.minikube/profiles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,

    /// Driver binary, instead of searching the usual locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_binary: Option<PathBuf>,
}

fn default_tick_interval() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            registry_path: None,
            profiles_dir: None,
            driver_binary: None,
        }
    }
}

impl Config {
    /// Tick interval as a duration; zero is bumped to one second.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(self.tick_interval.max(1))
    }
}

/// Configuration store for managing tunnel settings.
///
/// Handles reading and writing configuration to `~/.lbtunnel/config.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.lbtunnel/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(".lbtunnel").join("config.json"),
        })
    }

    /// Create a config store with a custom path (for testing).
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &Config) -> Result<()> {
        if let Some(config_dir) = self.config_path.parent() {
            fs::create_dir_all(config_dir)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }

    /// Get the tick interval in seconds.
    pub async fn get_tick_interval(&self) -> Result<u64> {
        Ok(self.load().await?.tick_interval)
    }

    /// Set the tick interval in seconds.
    pub async fn set_tick_interval(&self, interval: u64) -> Result<()> {
        if interval == 0 {
            return Err(Error::Config(
                "Tick interval must be at least one second".to_string(),
            ));
        }

        let mut config = self.load().await?;
        config.tick_interval = interval;
        self.save(&config).await
    }
}
