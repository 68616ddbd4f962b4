//! Client-side connection and channel state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

use crate::events::Roomstate;

/// Lifecycle phase of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionPhase {
    /// Constructed, never asked to connect.
    Idle = 0,
    /// Transport start requested, login not yet confirmed.
    Connecting = 1,
    /// Login confirmed by the welcome numeric.
    Authenticated = 2,
    /// Torn down; no further operations are accepted.
    Disposed = 3,
}

impl ConnectionPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Authenticated,
            _ => Self::Disposed,
        }
    }
}

/// A channel the client is currently joined to, with the room modes from
/// its admitting ROOMSTATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedChannel {
    /// Channel login, without the `#`.
    pub name: String,
    /// Minutes of followage required to chat; `-1` when off.
    pub followers_only: i64,
    /// Subscribers-only chat.
    pub subs_only: bool,
    /// Emote-only chat.
    pub emote_only: bool,
    /// Seconds between messages per user; `0` when off.
    pub slow: u64,
    /// Unique-chat (historically r9k) mode.
    pub unique_mode: bool,
}

impl JoinedChannel {
    /// Build a descriptor from a full ROOMSTATE.
    pub fn from_roomstate(rs: &Roomstate) -> Self {
        Self {
            name: rs.channel.clone(),
            followers_only: rs.followers_only.unwrap_or(-1),
            subs_only: rs.subs_only.unwrap_or(false),
            emote_only: rs.emote_only.unwrap_or(false),
            slow: rs.slow.unwrap_or(0),
            unique_mode: rs.unique_mode.unwrap_or(false),
        }
    }
}

/// Shared mutable state behind the dispatcher and the send surface.
pub(crate) struct ClientState {
    phase: AtomicU8,
    has_connected: AtomicBool,
    joined: Mutex<Vec<JoinedChannel>>,
    moderated: Mutex<HashSet<String>>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(ConnectionPhase::Idle as u8),
            has_connected: AtomicBool::new(false),
            joined: Mutex::new(Vec::new()),
            moderated: Mutex::new(HashSet::new()),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        ConnectionPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn set_phase(&self, phase: ConnectionPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Record a successful login. Returns `true` on the first one in the
    /// client's lifetime (Connect), `false` afterwards (Reconnect).
    pub fn record_login(&self) -> bool {
        !self.has_connected.swap(true, Ordering::SeqCst)
    }

    /// Admit a channel on its full ROOMSTATE. Returns `false` if it was
    /// already present (the set never holds duplicates).
    pub fn admit_channel(&self, channel: JoinedChannel) -> bool {
        let mut joined = self.joined.lock().expect("state lock poisoned");
        if joined.iter().any(|c| c.name == channel.name) {
            return false;
        }
        joined.push(channel);
        true
    }

    /// Drop a channel on PART. Returns `true` if it was present.
    pub fn remove_channel(&self, name: &str) -> bool {
        let mut joined = self.joined.lock().expect("state lock poisoned");
        let before = joined.len();
        joined.retain(|c| c.name != name);
        joined.len() != before
    }

    pub fn joined_channels(&self) -> Vec<JoinedChannel> {
        self.joined.lock().expect("state lock poisoned").clone()
    }

    pub fn is_moderator(&self, channel: &str) -> bool {
        self.moderated
            .lock()
            .expect("state lock poisoned")
            .contains(channel)
    }

    /// Track the self-user's moderator badge for `channel`. Returns `true`
    /// when this changed the set.
    pub fn set_moderator(&self, channel: &str, is_mod: bool) -> bool {
        let mut moderated = self.moderated.lock().expect("state lock poisoned");
        if is_mod {
            moderated.insert(channel.to_string())
        } else {
            moderated.remove(channel)
        }
    }

    pub fn clear(&self) {
        self.joined.lock().expect("state lock poisoned").clear();
        self.moderated.lock().expect("state lock poisoned").clear();
    }
}
