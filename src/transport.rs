//! The transport seam between the client and the wire.
//!
//! The client drives a [`Transport`] for its outbound side and consumes a
//! stream of [`TransportEvent`]s for everything the connection reports
//! back. Production code uses [`WsTransport`](crate::websocket::WsTransport);
//! tests substitute a recording mock behind the same trait.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

/// Notifications a transport delivers to the client's driver task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection is established. `reconnection` is `false` for the first
    /// connection in the transport's lifetime and `true` afterwards.
    Open { reconnection: bool },
    /// One inbound text frame, holding one or more CR-LF-terminated lines.
    Data(String),
    /// The connection closed, either deliberately or because the peer
    /// dropped it.
    Closed,
}

/// A frame-oriented duplex text channel with a connect/disconnect/restart
/// lifecycle.
///
/// Implementations deliver [`TransportEvent`]s through the channel handed
/// to them at construction. `send` takes a complete IRC frame (CR-LF
/// included); whether the terminator travels on the wire is the
/// implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `uri` and begin delivering events.
    async fn start(&self, uri: &str, cancel: &CancellationToken) -> Result<(), TransportError>;

    /// Write one frame. `suppress_log` hides the frame body from logs for
    /// credential-bearing sends.
    async fn send(&self, frame: &str, suppress_log: bool) -> Result<(), TransportError>;

    /// Close the connection.
    async fn disconnect(&self, cancel: &CancellationToken) -> Result<(), TransportError>;

    /// Close, wait `delay`, then reconnect to the last `start` target.
    async fn restart(&self, delay: Duration, cancel: &CancellationToken)
        -> Result<(), TransportError>;

    /// Whether a connection is currently open.
    fn is_connected(&self) -> bool;
}
