//! Status reporting port (interface).

use crate::domain::TunnelStatus;

/// Port for publishing tunnel status snapshots.
///
/// Reporters receive an owned copy, so the tunnel can keep mutating its own
/// status while the observer reads the snapshot.
pub trait Reporter: Send {
    fn report(&mut self, status: TunnelStatus);

    /// Publishes the final snapshot of a tunnel. Must not be suppressed, even
    /// when it equals the previous one.
    fn finish(&mut self, status: TunnelStatus) {
        self.report(status);
    }
}
