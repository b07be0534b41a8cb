//! In-memory tunnel registry.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{Route, TunnelId};
use crate::error::Result;
use crate::ports::{ProcessLiveness, TunnelRegistry};

/// Registry kept in process memory.
///
/// Clones share the same entries, so several tunnels in one process can
/// contend over it the way separate processes contend over a file.
pub struct MemoryRegistry<P> {
    entries: Arc<Mutex<Vec<TunnelId>>>,
    liveness: Arc<P>,
}

impl<P> Clone for MemoryRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            liveness: Arc::clone(&self.liveness),
        }
    }
}

impl<P: ProcessLiveness> MemoryRegistry<P> {
    pub fn new(liveness: P) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            liveness: Arc::new(liveness),
        }
    }

    /// Creates a registry pre-populated with `entries`.
    pub fn with_entries(liveness: P, entries: Vec<TunnelId>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            liveness: Arc::new(liveness),
        }
    }
}

impl<P: ProcessLiveness> TunnelRegistry for MemoryRegistry<P> {
    async fn is_already_defined_and_running(&self, id: &TunnelId) -> Result<Option<TunnelId>> {
        let entries = self.entries.lock();
        Ok(super::find_conflict(&entries, id, self.liveness.as_ref()))
    }

    async fn register(&self, id: &TunnelId) -> Result<()> {
        let mut entries = self.entries.lock();
        super::claim(&mut entries, id, self.liveness.as_ref())
    }

    async fn remove(&self, route: &Route) -> Result<()> {
        super::release(&mut self.entries.lock(), route);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TunnelId>> {
        Ok(self.entries.lock().clone())
    }

    async fn remove_orphaned(&self) -> Result<Vec<TunnelId>> {
        let mut entries = self.entries.lock();
        Ok(super::drain_orphaned(&mut entries, self.liveness.as_ref()))
    }
}
