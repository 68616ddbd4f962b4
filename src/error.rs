//! Error types for the TMI client.
//!
//! Construction-time misconfiguration is the only condition that fails
//! loudly; runtime failures (transport drops, rate-limit denials, handler
//! panics) are logged and absorbed by the client itself.

use thiserror::Error;

/// Errors raised while building an [`IrcClient`](crate::IrcClient).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// An authenticated client needs a non-empty username.
    #[error("username must not be empty for an authenticated client")]
    EmptyUsername,

    /// The OAuth token could not be normalized into `oauth:<token>` form.
    #[error("malformed OAuth token: {0}")]
    MalformedToken(String),
}

/// Errors surfaced by a [`Transport`](crate::transport::Transport)
/// implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// A write or lifecycle call was made while no connection is open.
    #[error("transport is not connected")]
    NotConnected,

    /// The operation was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// The WebSocket handshake or an established stream failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Underlying socket I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors encountered while decoding a raw IRC line into a typed event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EventParseError {
    /// The line was empty or held no command token.
    #[error("empty line")]
    EmptyLine,

    /// The line did not match the IRC grammar.
    #[error("malformed line")]
    MalformedLine,

    /// A required positional parameter was absent.
    #[error("missing parameter: {0}")]
    MissingParam(&'static str),

    /// The line carried no source prefix but the decoder needs one.
    #[error("missing prefix")]
    MissingPrefix,

    /// A required message tag was absent.
    #[error("missing tag: {0}")]
    MissingTag(&'static str),
}
