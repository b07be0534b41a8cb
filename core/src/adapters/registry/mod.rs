//! Tunnel registry adapters.
//!
//! `FileRegistry` is the durable store shared by every process on the host;
//! `MemoryRegistry` keeps the same rules in process memory.

mod file;
mod lock;
mod memory;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

use crate::domain::{Route, TunnelId};
use crate::error::{Error, Result};
use crate::ports::ProcessLiveness;

/// Live entry owning `id.route` under another PID.
fn find_conflict<P: ProcessLiveness + ?Sized>(
    entries: &[TunnelId],
    id: &TunnelId,
    liveness: &P,
) -> Option<TunnelId> {
    entries
        .iter()
        .find(|entry| entry.route == id.route && entry.pid != id.pid && liveness.is_alive(entry.pid))
        .cloned()
}

/// Stores `id` as owner of its route, replacing its own or orphaned entries.
fn claim<P: ProcessLiveness + ?Sized>(
    entries: &mut Vec<TunnelId>,
    id: &TunnelId,
    liveness: &P,
) -> Result<()> {
    if let Some(owner) = find_conflict(entries, id, liveness) {
        return Err(Error::TunnelAlreadyExists(owner));
    }

    entries.retain(|entry| entry.route != id.route);
    entries.push(id.clone());
    Ok(())
}

/// Returns true if an entry was removed.
fn release(entries: &mut Vec<TunnelId>, route: &Route) -> bool {
    let before = entries.len();
    entries.retain(|entry| entry.route != *route);
    entries.len() != before
}

fn drain_orphaned<P: ProcessLiveness + ?Sized>(
    entries: &mut Vec<TunnelId>,
    liveness: &P,
) -> Vec<TunnelId> {
    let (alive, dead): (Vec<_>, Vec<_>) = std::mem::take(entries)
        .into_iter()
        .partition(|entry| liveness.is_alive(entry.pid));
    *entries = alive;
    dead
}
