//! Status reporters for human and machine consumers.

use std::io::Write;

use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::TunnelStatus;
use crate::ports::Reporter;

const NO_ERRORS: &str = "no errors";

/// Renders snapshots as a text block, skipping unchanged snapshots.
pub struct TextReporter<W> {
    out: W,
    last: Option<TunnelStatus>,
}

impl<W: Write + Send> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TextReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TextReporter<W> {
    fn write(&mut self, status: TunnelStatus) {
        let rendered = render(&status);
        if let Err(e) = self
            .out
            .write_all(rendered.as_bytes())
            .and_then(|_| self.out.flush())
        {
            warn!(error = %e, "failed to write tunnel status");
        }
        self.last = Some(status);
    }
}

impl<W: Write + Send> Reporter for TextReporter<W> {
    fn report(&mut self, status: TunnelStatus) {
        if self.last.as_ref() == Some(&status) {
            return;
        }
        self.write(status);
    }

    fn finish(&mut self, status: TunnelStatus) {
        self.write(status);
    }
}

/// Renders the human-readable status block.
pub fn render(status: &TunnelStatus) -> String {
    let id = &status.tunnel_id;
    format!(
        "Status:\n\
         \tmachine: {}\n\
         \tpid: {}\n\
         \troute: {}\n\
         \thost: {}\n\
         \tservices: [{}]\n\
         \x20   errors:\n\
         \t\thost: {}\n\
         \t\trouter: {}\n\
         \t\tloadbalancer emulator: {}\n",
        id.machine_name,
        id.pid,
        id.route,
        status.host_state,
        status.patched_services.join(", "),
        status.host_error.as_deref().unwrap_or(NO_ERRORS),
        status.route_error.as_deref().unwrap_or(NO_ERRORS),
        status
            .load_balancer_emulator_error
            .as_deref()
            .unwrap_or(NO_ERRORS),
    )
}

/// Writes every snapshot as one JSON object per line.
pub struct JsonReporter<W> {
    out: W,
}

impl<W: Write + Send> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Reporter for JsonReporter<W> {
    fn report(&mut self, status: TunnelStatus) {
        let result = serde_json::to_writer(&mut self.out, &status)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.out))
            .and_then(|_| self.out.flush());

        if let Err(e) = result {
            warn!(error = %e, "failed to write tunnel status");
        }
    }
}

/// Forwards snapshots to a channel, e.g. for a UI task.
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<TunnelStatus>,
}

impl ChannelReporter {
    /// Creates a reporter and the receiving end of its stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TunnelStatus>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&mut self, status: TunnelStatus) {
        // The observer may have gone away; the tunnel keeps running regardless
        let _ = self.tx.send(status);
    }
}
