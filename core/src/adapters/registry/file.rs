//! File-backed tunnel registry.
//!
//! Stores running tunnels in `~/.lbtunnel/tunnels.json`. Every operation holds
//! an exclusive lock on `tunnels.json.lock` for its whole read-modify-write,
//! so independent processes never interleave updates.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::lock::{ensure_parent, lock_path, RegistryLock};
use crate::adapters::OsProcessLiveness;
use crate::domain::{Route, TunnelId};
use crate::error::{Error, Result};
use crate::ports::{ProcessLiveness, TunnelRegistry};

/// Registry persisted as a JSON array of tunnel ids.
pub struct FileRegistry<P = OsProcessLiveness> {
    path: PathBuf,
    liveness: Arc<P>,
}

impl FileRegistry<OsProcessLiveness> {
    /// Creates a registry at the default path (~/.lbtunnel/tunnels.json).
    pub fn new() -> Result<Self> {
        let path = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?
            .join(".lbtunnel")
            .join("tunnels.json");

        Ok(Self::with_path(path, OsProcessLiveness::new()))
    }
}

impl<P> FileRegistry<P> {
    /// Creates a registry at a custom path with a custom liveness check.
    pub fn with_path(path: PathBuf, liveness: P) -> Self {
        Self {
            path,
            liveness: Arc::new(liveness),
        }
    }

    /// Returns the registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<P: ProcessLiveness + 'static> FileRegistry<P> {
    /// Runs `update` on the stored entries while holding the registry lock.
    ///
    /// `update` returns its output and whether the entries changed; changed
    /// entries are written back before the lock is released.
    async fn transact<T, F>(&self, update: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Vec<TunnelId>, &P) -> Result<(T, bool)> + Send + 'static,
    {
        let path = self.path.clone();
        let liveness = Arc::clone(&self.liveness);

        tokio::task::spawn_blocking(move || {
            let _lock = RegistryLock::acquire(&lock_path(&path))?;
            let mut entries = read_entries(&path)?;
            let (output, dirty) = update(&mut entries, liveness.as_ref())?;
            if dirty {
                write_entries(&path, &entries)?;
            }
            Ok(output)
        })
        .await
        .map_err(|e| Error::Registry(format!("registry task failed: {}", e)))?
    }
}

impl<P: ProcessLiveness + 'static> TunnelRegistry for FileRegistry<P> {
    async fn is_already_defined_and_running(&self, id: &TunnelId) -> Result<Option<TunnelId>> {
        let id = id.clone();
        self.transact(move |entries, liveness| {
            Ok((super::find_conflict(entries, &id, liveness), false))
        })
        .await
    }

    async fn register(&self, id: &TunnelId) -> Result<()> {
        debug!(tunnel = %id, path = %self.path.display(), "registering tunnel");
        let id = id.clone();
        self.transact(move |entries, liveness| {
            super::claim(entries, &id, liveness)?;
            Ok(((), true))
        })
        .await
    }

    async fn remove(&self, route: &Route) -> Result<()> {
        debug!(route = %route, "removing tunnel from registry");
        let route = *route;
        self.transact(move |entries, _| {
            let removed = super::release(entries, &route);
            Ok(((), removed))
        })
        .await
    }

    async fn list(&self) -> Result<Vec<TunnelId>> {
        self.transact(|entries, _| Ok((entries.clone(), false)))
            .await
    }

    async fn remove_orphaned(&self) -> Result<Vec<TunnelId>> {
        self.transact(|entries, liveness| {
            let orphaned = super::drain_orphaned(entries, liveness);
            let dirty = !orphaned.is_empty();
            Ok((orphaned, dirty))
        })
        .await
    }
}

fn read_entries(path: &Path) -> Result<Vec<TunnelId>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Registry(format!("failed to read {}: {}", path.display(), e)))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&content)
        .map_err(|e| Error::Registry(format!("failed to parse {}: {}", path.display(), e)))
}

/// Writes to a temp file first, then renames over the registry (atomic write).
fn write_entries(path: &Path, entries: &[TunnelId]) -> Result<()> {
    ensure_parent(path)?;

    let content = serde_json::to_string_pretty(entries)
        .map_err(|e| Error::Registry(format!("failed to serialize registry: {}", e)))?;
    let temp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&temp_path)
        .map_err(|e| Error::Registry(format!("failed to create temp registry file: {}", e)))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::Registry(format!("failed to write registry: {}", e)))?;
    file.sync_all()
        .map_err(|e| Error::Registry(format!("failed to sync registry: {}", e)))?;

    fs::rename(&temp_path, path)
        .map_err(|e| Error::Registry(format!("failed to save registry: {}", e)))
}
