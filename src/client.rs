//! The TMI client: connection lifecycle, inbound dispatch, send surface.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use rand::Rng;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::command::IrcCommand;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::{
    ClearChat, ClearChatAction, ClearMsg, GlobalUserstate, Membership, Notice, Privmsg, Roomstate,
    RoomstateDelta, Usernotice, UsernoticeKind, Userstate, Whisper,
};
use crate::handler::EventHandler;
use crate::line::lines;
use crate::message::RawLine;
use crate::rate_limit::RateLimitGovernor;
use crate::state::{ClientState, ConnectionPhase, JoinedChannel};
use crate::transport::{Transport, TransportEvent};
use crate::websocket::WsTransport;

/// How long `connect` waits for the welcome numeric.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// How long `join_channel` waits for the admitting ROOMSTATE.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Backoff between governor-denied send attempts.
const SEND_RETRY_DELAY: Duration = Duration::from_millis(2500);
/// Backoff between governor-denied join attempts.
const JOIN_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Pacing between channel rejoins after a reconnect.
const REJOIN_SPACING: Duration = Duration::from_secs(1);

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn EventHandler>,
    state: ClientState,
    governor: RateLimitGovernor,
    /// Released once per confirmed login; `connect` waits here.
    conn_latch: Semaphore,
    /// Released once per admitting ROOMSTATE; `join_channel` waits here.
    join_latch: Semaphore,
    shutdown: CancellationToken,
    log_prefix: String,
}

/// A TMI chat client.
///
/// Cheaply cloneable; all clones share one connection, one dispatch driver
/// and one rate-limit governor. Construction spawns the driver task, so it
/// must happen inside a Tokio runtime.
#[derive(Clone)]
pub struct IrcClient {
    inner: Arc<ClientInner>,
}

impl IrcClient {
    /// Build a client over the live WebSocket transport.
    pub fn new(config: ClientConfig, handler: Arc<dyn EventHandler>) -> Result<Self, ClientError> {
        let config = config.normalized()?;
        let prefix = log_prefix(&config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(WsTransport::new(prefix, events_tx));
        Self::with_transport(config, handler, transport, events_rx)
    }

    /// Build a client over a caller-supplied transport.
    ///
    /// The transport must deliver its [`TransportEvent`]s through `events`.
    /// This is the seam test harnesses and alternative transports plug into.
    pub fn with_transport(
        config: ClientConfig,
        handler: Arc<dyn EventHandler>,
        transport: Arc<dyn Transport>,
        events: UnboundedReceiver<TransportEvent>,
    ) -> Result<Self, ClientError> {
        let config = config.normalized()?;
        let log_prefix = log_prefix(&config);
        let governor = RateLimitGovernor::new(
            config.message_limit,
            config.mod_message_limit,
            config.join_limit,
            config.global_rate_limit,
        );
        let client = Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                handler,
                state: ClientState::new(),
                governor,
                conn_latch: Semaphore::new(0),
                join_latch: Semaphore::new(0),
                shutdown: CancellationToken::new(),
                log_prefix,
            }),
        };
        client.spawn_driver(events);
        Ok(client)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Connect and wait for the login to be confirmed.
    ///
    /// Returns `true` once the welcome numeric arrives, `false` on
    /// transport failure or after 15 s without one.
    pub async fn connect(&self) -> bool {
        self.connect_with_cancel(&CancellationToken::new()).await
    }

    /// [`connect`](Self::connect) with a caller-owned cancellation token.
    pub async fn connect_with_cancel(&self, cancel: &CancellationToken) -> bool {
        let prefix = &self.inner.log_prefix;
        if self.inner.state.phase() == ConnectionPhase::Disposed {
            error!("{prefix} connect rejected: client is disposed");
            return false;
        }
        self.inner.state.set_phase(ConnectionPhase::Connecting);
        info!("{prefix} connecting to {}", self.inner.config.endpoint);

        if let Err(e) = self
            .inner
            .transport
            .start(&self.inner.config.endpoint, cancel)
            .await
        {
            error!("{prefix} transport start failed: {e}");
            return false;
        }

        let latch = timeout(CONNECT_TIMEOUT, self.inner.conn_latch.acquire());
        tokio::select! {
            _ = cancel.cancelled() => false,
            outcome = latch => match outcome {
                Ok(Ok(permit)) => {
                    permit.forget();
                    self.inner.state.phase() != ConnectionPhase::Disposed
                }
                _ => {
                    error!(
                        "{prefix} login not confirmed within {}s",
                        CONNECT_TIMEOUT.as_secs()
                    );
                    false
                }
            },
        }
    }

    /// Start connecting without awaiting the outcome.
    pub fn connect_detached(&self) {
        let client = self.clone();
        tokio::spawn(async move {
            client.connect().await;
        });
    }

    /// Close the transport connection.
    pub async fn disconnect(&self) {
        self.disconnect_with_cancel(&CancellationToken::new()).await;
    }

    /// [`disconnect`](Self::disconnect) with a caller-owned cancellation token.
    pub async fn disconnect_with_cancel(&self, cancel: &CancellationToken) {
        if let Err(e) = self.inner.transport.disconnect(cancel).await {
            warn!("{} disconnect failed: {e}", self.inner.log_prefix);
        }
        if self.inner.state.phase() != ConnectionPhase::Disposed {
            self.inner.state.set_phase(ConnectionPhase::Idle);
        }
    }

    /// Close the connection without awaiting the outcome.
    pub fn disconnect_detached(&self) {
        let client = self.clone();
        tokio::spawn(async move {
            client.disconnect().await;
        });
    }

    /// Tear the client down: stop the driver, close the transport, drop all
    /// channel state and wake any waiters.
    pub async fn dispose(&self) {
        self.inner.state.set_phase(ConnectionPhase::Disposed);
        self.inner.shutdown.cancel();
        let _ = self
            .inner
            .transport
            .disconnect(&CancellationToken::new())
            .await;
        self.inner.state.clear();
        release_latch(&self.inner.conn_latch);
        release_latch(&self.inner.join_latch);
        info!("{} disposed", self.inner.log_prefix);
    }

    // ------------------------------------------------------------------
    // Send surface
    // ------------------------------------------------------------------

    /// Write a raw IRC frame, bypassing the rate-limit governor.
    pub async fn send_raw(&self, frame: &str) {
        if !self.ensure_connected("send_raw") {
            return;
        }
        self.write(frame, false).await;
    }

    /// Send a chat message to `channel`.
    pub async fn send_message(&self, channel: &str, text: &str) {
        self.send_message_with(channel, text, false, "").await;
    }

    /// Send a chat message with the action flag and/or a client nonce.
    ///
    /// An action message renders like `/me`; a non-empty nonce is echoed
    /// back in the server's PRIVMSG and must not contain spaces.
    pub async fn send_message_with(&self, channel: &str, text: &str, action: bool, nonce: &str) {
        self.send_message_with_cancel(channel, text, action, nonce, &CancellationToken::new())
            .await;
    }

    /// [`send_message_with`](Self::send_message_with) with a caller-owned
    /// cancellation token.
    pub async fn send_message_with_cancel(
        &self,
        channel: &str,
        text: &str,
        action: bool,
        nonce: &str,
        cancel: &CancellationToken,
    ) {
        if !self.check_may_chat("send_message", nonce) {
            return;
        }
        let channel = normalize_channel(channel);
        if !self.acquire_send_slot(&channel, cancel).await {
            return;
        }

        let mut frame = String::with_capacity(text.len() + channel.len() + 32);
        if !nonce.is_empty() {
            frame.push_str("@client-nonce=");
            frame.push_str(nonce);
            frame.push(' ');
        }
        frame.push_str("PRIVMSG #");
        frame.push_str(&channel);
        frame.push_str(" :");
        if action {
            frame.push_str(".me ");
        }
        frame.push_str(text);
        self.write(&frame, false).await;
    }

    /// Reply to a previously received message.
    pub async fn reply(&self, parent: &Privmsg, text: &str) {
        match parent.id.as_deref() {
            Some(id) => self.reply_to(id, &parent.channel, text, false).await,
            None => error!(
                "{} reply rejected: parent message carries no id",
                self.inner.log_prefix
            ),
        }
    }

    /// Reply to the message with id `parent_id` in `channel`.
    pub async fn reply_to(&self, parent_id: &str, channel: &str, text: &str, action: bool) {
        self.reply_to_with_cancel(parent_id, channel, text, action, &CancellationToken::new())
            .await;
    }

    /// [`reply_to`](Self::reply_to) with a caller-owned cancellation token.
    pub async fn reply_to_with_cancel(
        &self,
        parent_id: &str,
        channel: &str,
        text: &str,
        action: bool,
        cancel: &CancellationToken,
    ) {
        if !self.check_may_chat("reply", "") {
            return;
        }
        let channel = normalize_channel(channel);
        if !self.acquire_send_slot(&channel, cancel).await {
            return;
        }

        let mut frame = String::with_capacity(text.len() + channel.len() + parent_id.len() + 40);
        frame.push_str("@reply-parent-msg-id=");
        frame.push_str(parent_id);
        frame.push_str(" PRIVMSG #");
        frame.push_str(&channel);
        frame.push_str(" :");
        if action {
            frame.push_str(".me ");
        }
        frame.push_str(text);
        self.write(&frame, false).await;
    }

    /// Join `channel` and wait for the server's confirmation.
    ///
    /// Returns `true` once the admitting ROOMSTATE arrives, `false` on a
    /// 10 s timeout or when disconnected.
    pub async fn join_channel(&self, channel: &str) -> bool {
        self.join_channel_with_cancel(channel, &CancellationToken::new())
            .await
    }

    /// [`join_channel`](Self::join_channel) with a caller-owned token.
    pub async fn join_channel_with_cancel(
        &self,
        channel: &str,
        cancel: &CancellationToken,
    ) -> bool {
        if !self.ensure_connected("join_channel") {
            return false;
        }
        let prefix = &self.inner.log_prefix;
        let channel = normalize_channel(channel);

        while !self.inner.governor.may_join() {
            debug!("{prefix} join quota exhausted, retrying #{channel}");
            warn!(
                "{prefix} join of #{channel} delayed {}ms by rate limit",
                JOIN_RETRY_DELAY.as_millis()
            );
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = sleep(JOIN_RETRY_DELAY) => {}
            }
        }

        if !self.write(&format!("JOIN #{channel}"), false).await {
            return false;
        }

        let latch = timeout(JOIN_TIMEOUT, self.inner.join_latch.acquire());
        tokio::select! {
            _ = cancel.cancelled() => false,
            outcome = latch => match outcome {
                Ok(Ok(permit)) => {
                    permit.forget();
                    self.inner.state.phase() != ConnectionPhase::Disposed
                }
                _ => {
                    error!(
                        "{prefix} no ROOMSTATE for #{channel} within {}s",
                        JOIN_TIMEOUT.as_secs()
                    );
                    false
                }
            },
        }
    }

    /// Join several channels; `true` only if every join was confirmed.
    pub async fn join_channels<I>(&self, channels: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut all_joined = true;
        for channel in channels {
            all_joined &= self.join_channel(channel.as_ref()).await;
        }
        all_joined
    }

    /// Leave `channel`.
    pub async fn part_channel(&self, channel: &str) {
        if !self.ensure_connected("part_channel") {
            return;
        }
        let channel = normalize_channel(channel);
        self.write(&format!("PART #{channel}"), false).await;
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Channels currently joined, with their room modes.
    pub fn joined_channels(&self) -> Vec<JoinedChannel> {
        self.inner.state.joined_channels()
    }

    /// Whether the authenticated user holds the moderator badge in `channel`.
    pub fn is_moderator(&self, channel: &str) -> bool {
        self.inner.state.is_moderator(&normalize_channel(channel))
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.inner.state.phase()
    }

    /// Whether the client runs without credentials.
    pub fn is_anonymous(&self) -> bool {
        self.inner.config.is_anonymous()
    }

    // ------------------------------------------------------------------
    // Driver and login
    // ------------------------------------------------------------------

    fn spawn_driver(&self, mut events: UnboundedReceiver<TransportEvent>) {
        let client = self.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = client.inner.shutdown.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                match event {
                    TransportEvent::Open { reconnection } => {
                        client.login().await;
                        if reconnection {
                            // Rejoins wait on the join latch, which only the
                            // driver can release; they must not run inline.
                            let rejoiner = client.clone();
                            tokio::spawn(async move { rejoiner.rejoin_channels().await });
                        }
                    }
                    TransportEvent::Data(frame) => client.dispatch_frame(&frame).await,
                    TransportEvent::Closed => {
                        let handler = Arc::clone(&client.inner.handler);
                        client.spawn_hook("on_disconnect", async move {
                            handler.on_disconnect().await;
                        });
                    }
                }
            }
        });
    }

    async fn login(&self) {
        let config = &self.inner.config;
        self.write("CAP REQ :twitch.tv/tags twitch.tv/commands", false)
            .await;
        match &config.token {
            Some(token) => {
                let hide = config.hide_auth_logs;
                self.write(&format!("PASS oauth:{token}"), hide).await;
                self.write(&format!("NICK {}", config.username), hide).await;
            }
            None => {
                let nick = format!("justinfan{}", rand::thread_rng().gen_range(100..900));
                self.write(&format!("NICK {nick}"), false).await;
            }
        }
    }

    async fn rejoin_channels(&self) {
        let prefix = &self.inner.log_prefix;
        let channels = self.inner.state.joined_channels();
        for (index, channel) in channels.iter().enumerate() {
            if index > 0 {
                sleep(REJOIN_SPACING).await;
            }
            if self
                .join_channel_with_cancel(&channel.name, &self.inner.shutdown.child_token())
                .await
            {
                info!("{prefix} rejoined #{}", channel.name);
            } else {
                warn!("{prefix} failed to rejoin #{}", channel.name);
            }
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    async fn dispatch_frame(&self, frame: &str) {
        for (command, line) in lines(frame) {
            if self.inner.config.ignored_commands.contains(command) {
                continue;
            }
            self.dispatch_line(command, line).await;
        }
    }

    async fn dispatch_line(&self, command: IrcCommand, line: &str) {
        let prefix = &self.inner.log_prefix;

        // Commands handled without the full section parse.
        match command {
            IrcCommand::Ping => {
                let payload = line
                    .split_once(" :")
                    .map(|(_, p)| p)
                    .unwrap_or("tmi.twitch.tv");
                self.write(&format!("PONG :{payload}"), false).await;
                return;
            }
            IrcCommand::Reconnect => {
                info!("{prefix} server requested a reconnect");
                self.inner.state.set_phase(ConnectionPhase::Connecting);
                let client = self.clone();
                let delay = self.inner.config.reconnect_delay;
                tokio::spawn(async move {
                    let cancel = client.inner.shutdown.child_token();
                    if let Err(e) = client.inner.transport.restart(delay, &cancel).await {
                        error!("{} transport restart failed: {e}", client.inner.log_prefix);
                    }
                });
                let handler = Arc::clone(&self.inner.handler);
                self.spawn_hook("on_reconnect", async move {
                    handler.on_reconnect().await;
                });
                return;
            }
            IrcCommand::Connected => {
                self.inner.state.set_phase(ConnectionPhase::Authenticated);
                release_latch(&self.inner.conn_latch);
                let handler = Arc::clone(&self.inner.handler);
                if self.inner.state.record_login() {
                    info!("{prefix} logged in");
                    self.spawn_hook("on_connect", async move {
                        handler.on_connect().await;
                    });
                } else {
                    info!("{prefix} logged in again");
                    self.spawn_hook("on_reconnect", async move {
                        handler.on_reconnect().await;
                    });
                }
                return;
            }
            IrcCommand::Unknown => {
                trace!("{prefix} ignoring unrecognized line: {line}");
                return;
            }
            _ => {}
        }

        let raw = match RawLine::parse(line) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{prefix} undecodable line ({e}): {line}");
                return;
            }
        };

        match command {
            IrcCommand::Privmsg => match Privmsg::from_line(&raw) {
                Ok(message) => {
                    let handler = Arc::clone(&self.inner.handler);
                    self.spawn_hook("on_message", async move {
                        handler.on_message(message).await;
                    });
                }
                Err(e) => warn!("{prefix} bad PRIVMSG ({e}): {line}"),
            },
            IrcCommand::Usernotice => match Usernotice::from_line(&raw) {
                Ok(Some(event)) => self.dispatch_usernotice(event),
                Ok(None) => {}
                Err(e) => warn!("{prefix} bad USERNOTICE ({e}): {line}"),
            },
            IrcCommand::Clearchat => match ClearChat::from_line(&raw) {
                Ok(event) => {
                    let handler = Arc::clone(&self.inner.handler);
                    match event.action {
                        ClearChatAction::Clear => self.spawn_hook("on_chat_clear", async move {
                            handler.on_chat_clear(event).await;
                        }),
                        ClearChatAction::Ban => self.spawn_hook("on_user_ban", async move {
                            handler.on_user_ban(event).await;
                        }),
                        ClearChatAction::Timeout(_) => {
                            self.spawn_hook("on_user_timeout", async move {
                                handler.on_user_timeout(event).await;
                            })
                        }
                    }
                }
                Err(e) => warn!("{prefix} bad CLEARCHAT ({e}): {line}"),
            },
            IrcCommand::Clearmsg => match ClearMsg::from_line(&raw) {
                Ok(event) => {
                    let handler = Arc::clone(&self.inner.handler);
                    self.spawn_hook("on_message_delete", async move {
                        handler.on_message_delete(event).await;
                    });
                }
                Err(e) => warn!("{prefix} bad CLEARMSG ({e}): {line}"),
            },
            IrcCommand::Roomstate => match Roomstate::from_line(&raw) {
                Ok(state) => self.dispatch_roomstate(state, line),
                Err(e) => warn!("{prefix} bad ROOMSTATE ({e}): {line}"),
            },
            IrcCommand::Join => match Membership::from_line(&raw) {
                Ok(membership) => {
                    let handler = Arc::clone(&self.inner.handler);
                    self.spawn_hook("on_user_join", async move {
                        handler.on_user_join(membership).await;
                    });
                }
                Err(e) => warn!("{prefix} bad JOIN ({e}): {line}"),
            },
            IrcCommand::Part => match Membership::from_line(&raw) {
                Ok(membership) => {
                    if self.inner.state.remove_channel(&membership.channel) {
                        debug!("{prefix} parted #{}", membership.channel);
                    }
                    let handler = Arc::clone(&self.inner.handler);
                    self.spawn_hook("on_channel_part", async move {
                        handler.on_channel_part(membership).await;
                    });
                }
                Err(e) => warn!("{prefix} bad PART ({e}): {line}"),
            },
            IrcCommand::Notice => match Notice::from_line(&raw) {
                Ok(notice) => {
                    match notice.msg_id.as_deref() {
                        Some("msg_channel_suspended") => {
                            error!("{prefix} channel is suspended: {}", notice.text)
                        }
                        Some(id) if id.contains("bad_auth") => {
                            error!("{prefix} authentication rejected: {}", notice.text)
                        }
                        _ => {}
                    }
                    let handler = Arc::clone(&self.inner.handler);
                    self.spawn_hook("on_notice", async move {
                        handler.on_notice(notice).await;
                    });
                }
                Err(e) => warn!("{prefix} bad NOTICE ({e}): {line}"),
            },
            IrcCommand::Userstate => match Userstate::from_line(&raw) {
                Ok(state) => {
                    if self
                        .inner
                        .state
                        .set_moderator(&state.channel, state.is_moderator)
                    {
                        debug!(
                            "{prefix} moderator badge in #{} is now {}",
                            state.channel, state.is_moderator
                        );
                    }
                    let handler = Arc::clone(&self.inner.handler);
                    self.spawn_hook("on_user_state", async move {
                        handler.on_user_state(state).await;
                    });
                }
                Err(e) => warn!("{prefix} bad USERSTATE ({e}): {line}"),
            },
            IrcCommand::GlobalUserstate => match GlobalUserstate::from_line(&raw) {
                Ok(state) => {
                    let handler = Arc::clone(&self.inner.handler);
                    self.spawn_hook("on_global_state", async move {
                        handler.on_global_state(state).await;
                    });
                }
                Err(e) => warn!("{prefix} bad GLOBALUSERSTATE ({e}): {line}"),
            },
            IrcCommand::Whisper => match Whisper::from_line(&raw) {
                Ok(whisper) => {
                    let handler = Arc::clone(&self.inner.handler);
                    self.spawn_hook("on_whisper", async move {
                        handler.on_whisper(whisper).await;
                    });
                }
                Err(e) => warn!("{prefix} bad WHISPER ({e}): {line}"),
            },
            // Handled before the section parse.
            IrcCommand::Ping
            | IrcCommand::Reconnect
            | IrcCommand::Connected
            | IrcCommand::Unknown => {}
        }
    }

    fn dispatch_usernotice(&self, event: Usernotice) {
        let handler = Arc::clone(&self.inner.handler);
        match event.kind {
            UsernoticeKind::Subscription => self.spawn_hook("on_subscription", async move {
                handler.on_subscription(event).await;
            }),
            UsernoticeKind::GiftSubscription => {
                self.spawn_hook("on_gift_subscription", async move {
                    handler.on_gift_subscription(event).await;
                })
            }
            UsernoticeKind::MysteryGift => self.spawn_hook("on_mystery_gift", async move {
                handler.on_mystery_gift(event).await;
            }),
            UsernoticeKind::Raid => self.spawn_hook("on_raid", async move {
                handler.on_raid(event).await;
            }),
            UsernoticeKind::PaidUpgrade { .. } => self.spawn_hook("on_paid_upgrade", async move {
                handler.on_paid_upgrade(event).await;
            }),
            UsernoticeKind::PrimeUpgrade => self.spawn_hook("on_prime_upgrade", async move {
                handler.on_prime_upgrade(event).await;
            }),
            UsernoticeKind::Announcement => self.spawn_hook("on_announcement", async move {
                handler.on_announcement(event).await;
            }),
        }
    }

    fn dispatch_roomstate(&self, state: Roomstate, line: &str) {
        let prefix = &self.inner.log_prefix;
        if state.is_full() {
            release_latch(&self.inner.join_latch);
            let joined = JoinedChannel::from_roomstate(&state);
            if self.inner.state.admit_channel(joined.clone()) {
                debug!("{prefix} joined #{}", joined.name);
            }
            let handler = Arc::clone(&self.inner.handler);
            self.spawn_hook("on_channel_join", async move {
                handler.on_channel_join(joined).await;
            });
            return;
        }
        let Some(delta) = state.delta() else {
            warn!("{prefix} unrecognized ROOMSTATE shape: {line}");
            return;
        };
        let handler = Arc::clone(&self.inner.handler);
        match delta {
            RoomstateDelta::EmoteOnly => self.spawn_hook("on_emote_only_change", async move {
                handler.on_emote_only_change(state).await;
            }),
            RoomstateDelta::FollowersOnly => {
                self.spawn_hook("on_follower_mode_change", async move {
                    handler.on_follower_mode_change(state).await;
                })
            }
            RoomstateDelta::UniqueMode => self.spawn_hook("on_unique_mode_change", async move {
                handler.on_unique_mode_change(state).await;
            }),
            RoomstateDelta::Slow => self.spawn_hook("on_slow_mode_change", async move {
                handler.on_slow_mode_change(state).await;
            }),
            RoomstateDelta::SubsOnly => self.spawn_hook("on_sub_only_change", async move {
                handler.on_sub_only_change(state).await;
            }),
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Run a user hook in its own task behind a panic shield.
    fn spawn_hook<F>(&self, hook: &'static str, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let sink = self.inner.config.exception_sink.clone();
        let prefix = self.inner.log_prefix.clone();
        tokio::spawn(async move {
            if let Err(payload) = AssertUnwindSafe(fut).catch_unwind().await {
                let rendered = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                match sink {
                    Some(sink) => sink(hook, rendered),
                    None => error!("{prefix} handler {hook} panicked: {rendered}"),
                }
            }
        });
    }

    fn ensure_connected(&self, op: &str) -> bool {
        let prefix = &self.inner.log_prefix;
        if self.inner.state.phase() == ConnectionPhase::Disposed {
            error!("{prefix} {op} rejected: client is disposed");
            return false;
        }
        if !self.inner.transport.is_connected() {
            error!("{prefix} {op} rejected: transport is not connected");
            return false;
        }
        true
    }

    /// Shared preamble for the chat-writing operations.
    fn check_may_chat(&self, op: &str, nonce: &str) -> bool {
        if !self.ensure_connected(op) {
            return false;
        }
        let prefix = &self.inner.log_prefix;
        if self.inner.config.is_anonymous() {
            error!("{prefix} {op} rejected: anonymous clients cannot send messages");
            return false;
        }
        if nonce.contains(' ') {
            error!("{prefix} {op} rejected: client nonce must not contain spaces");
            return false;
        }
        true
    }

    /// Block until the governor grants a send slot for `channel`.
    ///
    /// Returns `false` only when cancelled.
    async fn acquire_send_slot(&self, channel: &str, cancel: &CancellationToken) -> bool {
        let prefix = &self.inner.log_prefix;
        loop {
            let is_moderator = self.inner.state.is_moderator(channel);
            if self.inner.governor.may_send(channel, is_moderator) {
                return true;
            }
            debug!("{prefix} send quota exhausted for #{channel}, retrying");
            warn!(
                "{prefix} message to #{channel} delayed {}ms by rate limit",
                SEND_RETRY_DELAY.as_millis()
            );
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = sleep(SEND_RETRY_DELAY) => {}
            }
        }
    }

    async fn write(&self, frame: &str, suppress_log: bool) -> bool {
        let framed = if frame.ends_with("\r\n") {
            frame.to_string()
        } else {
            format!("{frame}\r\n")
        };
        match self.inner.transport.send(&framed, suppress_log).await {
            Ok(()) => true,
            Err(e) => {
                error!("{} write failed: {e}", self.inner.log_prefix);
                false
            }
        }
    }
}

fn log_prefix(config: &ClientConfig) -> String {
    if config.is_anonymous() {
        "[MiniTwitch:Irc-Anonymous]".to_string()
    } else {
        format!("[MiniTwitch:Irc-{}]", config.username)
    }
}

/// Single-slot release: a latch with a pending permit is left untouched so
/// repeated releases cannot accumulate credit.
fn release_latch(latch: &Semaphore) {
    if latch.available_permits() == 0 {
        latch.add_permits(1);
    }
}

fn normalize_channel(channel: &str) -> String {
    channel.trim().trim_start_matches('#').to_lowercase()
}
