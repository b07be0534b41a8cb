//! CLI command implementations.

pub mod cleanup;
pub mod config;
pub mod list;
pub mod run;

use anyhow::Result;
use lbtunnel_core::adapters::{FileRegistry, OsProcessLiveness};
use lbtunnel_core::Config;

/// Opens the registry configured in `config`, or the default one.
pub(crate) fn open_registry(config: &Config) -> Result<FileRegistry> {
    Ok(match &config.registry_path {
        Some(path) => FileRegistry::with_path(path.clone(), OsProcessLiveness::new()),
        None => FileRegistry::new()?,
    })
}
