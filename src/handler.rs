//! User-facing event sink.
//!
//! One polymorphic handler with a method per event, every method defaulted
//! to a no-op so implementors override only what they care about. The
//! dispatcher invokes hooks fire-and-forget: each invocation runs in its
//! own task behind a panic shield, and a slow hook never back-pressures
//! the inbound stream.

use async_trait::async_trait;

use crate::events::{
    ClearChat, ClearMsg, GlobalUserstate, Membership, Notice, Privmsg, Roomstate, Usernotice,
    Userstate, Whisper,
};
use crate::state::JoinedChannel;

/// Event hooks invoked by the dispatcher.
///
/// Hooks race against each other and against subsequent dispatches; a
/// panicking hook is reported to the configured exception sink and never
/// disturbs dispatch.
#[async_trait]
#[allow(unused_variables)]
pub trait EventHandler: Send + Sync + 'static {
    /// First successful login of the client's lifetime.
    async fn on_connect(&self) {}
    /// Any successful login after the first, and server-initiated
    /// RECONNECT notices.
    async fn on_reconnect(&self) {}
    /// The transport connection closed.
    async fn on_disconnect(&self) {}

    /// A chat message arrived.
    async fn on_message(&self, message: Privmsg) {}
    /// A whisper arrived.
    async fn on_whisper(&self, whisper: Whisper) {}

    /// The server confirmed one of our JOINs with a full ROOMSTATE.
    async fn on_channel_join(&self, channel: JoinedChannel) {}
    /// A PART for the authenticated user was observed.
    async fn on_channel_part(&self, membership: Membership) {}
    /// Another user joined a channel we are in.
    async fn on_user_join(&self, membership: Membership) {}

    /// The whole chat was cleared.
    async fn on_chat_clear(&self, event: ClearChat) {}
    /// A user was banned.
    async fn on_user_ban(&self, event: ClearChat) {}
    /// A user was timed out.
    async fn on_user_timeout(&self, event: ClearChat) {}
    /// A single message was deleted.
    async fn on_message_delete(&self, event: ClearMsg) {}

    /// A server NOTICE arrived.
    async fn on_notice(&self, notice: Notice) {}
    /// Channel-scoped USERSTATE for the authenticated user.
    async fn on_user_state(&self, state: Userstate) {}
    /// GLOBALUSERSTATE after login.
    async fn on_global_state(&self, state: GlobalUserstate) {}

    /// `sub` / `resub`.
    async fn on_subscription(&self, event: Usernotice) {}
    /// `subgift`.
    async fn on_gift_subscription(&self, event: Usernotice) {}
    /// `submysterygift`.
    async fn on_mystery_gift(&self, event: Usernotice) {}
    /// `raid`.
    async fn on_raid(&self, event: Usernotice) {}
    /// `giftpaidupgrade` / `anongiftpaidupgrade`.
    async fn on_paid_upgrade(&self, event: Usernotice) {}
    /// `primepaidupgrade`.
    async fn on_prime_upgrade(&self, event: Usernotice) {}
    /// `announcement`.
    async fn on_announcement(&self, event: Usernotice) {}

    /// Emote-only mode toggled.
    async fn on_emote_only_change(&self, state: Roomstate) {}
    /// Follower-only mode changed.
    async fn on_follower_mode_change(&self, state: Roomstate) {}
    /// Unique-chat (r9k) mode toggled.
    async fn on_unique_mode_change(&self, state: Roomstate) {}
    /// Slow mode changed.
    async fn on_slow_mode_change(&self, state: Roomstate) {}
    /// Subscriber-only mode toggled.
    async fn on_sub_only_change(&self, state: Roomstate) {}
}

/// Handler that ignores every event. Useful for send-only clients.
pub struct NoopHandler;

#[async_trait]
impl EventHandler for NoopHandler {}
