//! Client configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::command::CommandSet;
use crate::error::ClientError;

/// Default TMI endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Messages permitted per 30 s window for a regular user.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 20;

/// Messages permitted per 30 s window when the user is a moderator.
pub const DEFAULT_MOD_MESSAGE_LIMIT: u32 = 100;

/// Channel joins permitted per 10 s window.
pub const DEFAULT_JOIN_LIMIT: u32 = 20;

/// Sink for panics escaping a user event hook.
///
/// Receives the hook name and the rendered panic payload. The default sink
/// logs at error level.
pub type ExceptionSink = Arc<dyn Fn(&'static str, String) + Send + Sync>;

/// Immutable configuration for an [`IrcClient`](crate::IrcClient).
///
/// All fields are plain data; construct with struct-update syntax over
/// [`Default`]:
///
/// ```
/// use minitwitch_irc::ClientConfig;
///
/// let config = ClientConfig {
///     username: "alice".into(),
///     token: Some("abcd1234".into()),
///     ..ClientConfig::default()
/// };
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Login name of the authenticated user. Ignored in anonymous mode.
    pub username: String,
    /// OAuth token, with or without the `oauth:` prefix. `None` puts the
    /// client in anonymous (read-only) mode.
    pub token: Option<String>,
    /// TMI endpoint to connect to.
    pub endpoint: String,
    /// Delay before restarting the transport after a server-initiated
    /// RECONNECT.
    pub reconnect_delay: Duration,
    /// Per-window message cap for channels where the user is not a moderator.
    pub message_limit: u32,
    /// Per-window message cap for channels where the user is a moderator.
    pub mod_message_limit: u32,
    /// Per-window channel-join cap.
    pub join_limit: u32,
    /// When set, message quotas are accounted across all channels together
    /// instead of per channel.
    pub global_rate_limit: bool,
    /// Inbound commands to drop without dispatching.
    pub ignored_commands: CommandSet,
    /// Suppress frame logging for credential-bearing sends (PASS/NICK).
    pub hide_auth_logs: bool,
    /// Sink for panics escaping user event hooks. `None` logs at error level.
    pub exception_sink: Option<ExceptionSink>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            token: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect_delay: Duration::from_secs(30),
            message_limit: DEFAULT_MESSAGE_LIMIT,
            mod_message_limit: DEFAULT_MOD_MESSAGE_LIMIT,
            join_limit: DEFAULT_JOIN_LIMIT,
            global_rate_limit: false,
            ignored_commands: CommandSet::EMPTY,
            hide_auth_logs: true,
            exception_sink: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("message_limit", &self.message_limit)
            .field("mod_message_limit", &self.mod_message_limit)
            .field("join_limit", &self.join_limit)
            .field("global_rate_limit", &self.global_rate_limit)
            .field("hide_auth_logs", &self.hide_auth_logs)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Normalize and validate the credentials.
    ///
    /// Lowercases the username, strips a leading `oauth:` from the token and
    /// rejects tokens with embedded whitespace. This is the only validation
    /// that may fail loudly; everything past construction is log-and-return.
    pub(crate) fn normalized(mut self) -> Result<Self, ClientError> {
        if let Some(token) = self.token.take() {
            let token = token.strip_prefix("oauth:").unwrap_or(&token).to_string();
            if token.is_empty() || token.chars().any(char::is_whitespace) {
                return Err(ClientError::MalformedToken(token));
            }
            if self.username.trim().is_empty() {
                return Err(ClientError::EmptyUsername);
            }
            self.username = self.username.trim().to_lowercase();
            self.token = Some(token);
        }
        Ok(self)
    }

    pub(crate) fn is_anonymous(&self) -> bool {
        self.token.is_none()
    }
}
