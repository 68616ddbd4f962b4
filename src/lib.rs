//! # minitwitch-irc
//!
//! A client for Twitch's TMI chat service: IRC over WebSocket with IRCv3
//! message tags and the Twitch command extensions.
//!
//! ## Features
//!
//! - Persistent `wss://` connection with login, server-initiated reconnect
//!   handling and automatic channel rejoin
//! - Zero-copy slicing of inbound frames into classified IRC lines
//! - Typed events for chat messages, whispers, subs/gifts/raids, moderation
//!   actions and room-mode changes, fanned out to a pluggable handler
//! - Sliding-window rate limiting for sends (per-channel or global, with
//!   moderator uplift) and channel joins, with cooperative retry
//! - Anonymous (read-only) mode when no OAuth token is supplied
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use minitwitch_irc::{ClientConfig, EventHandler, IrcClient, Privmsg};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl EventHandler for Echo {
//!     async fn on_message(&self, message: Privmsg) {
//!         println!("#{} {}: {}", message.channel, message.sender, message.text);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig {
//!         username: "alice".into(),
//!         token: Some("oauth:abcd1234".into()),
//!         ..ClientConfig::default()
//!     };
//!     let client = IrcClient::new(config, Arc::new(Echo)).expect("valid config");
//!
//!     if client.connect().await {
//!         client.join_channel("bob").await;
//!         client.send_message("bob", "hello chat").await;
//!     }
//! }
//! ```

#![deny(clippy::all)]

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod line;
pub mod message;
pub mod rate_limit;
pub mod state;
pub mod transport;
pub mod websocket;

pub use self::client::IrcClient;
pub use self::command::{CommandSet, IrcCommand};
pub use self::config::{ClientConfig, ExceptionSink, DEFAULT_ENDPOINT};
pub use self::error::{ClientError, EventParseError, TransportError};
pub use self::events::{
    ClearChat, ClearChatAction, ClearMsg, GlobalUserstate, Membership, Notice, Privmsg, Roomstate,
    RoomstateDelta, Usernotice, UsernoticeKind, Userstate, Whisper,
};
pub use self::handler::{EventHandler, NoopHandler};
pub use self::message::RawLine;
pub use self::rate_limit::RateLimitGovernor;
pub use self::state::{ConnectionPhase, JoinedChannel};
pub use self::transport::{Transport, TransportEvent};
pub use self::websocket::WsTransport;
