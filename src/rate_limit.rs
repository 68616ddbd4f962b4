//! Sliding-window rate-limit accounting for sends and joins.
//!
//! TMI enforces three quotas: messages per 30 s for regular users, an
//! uplifted cap for moderators, and channel joins per 10 s. The governor
//! keeps a timestamp ledger per channel (plus one for joins) and answers
//! "may I send/join right now?"; a `true` answer has already recorded the
//! slot, so concurrent callers can never overshoot a quota.
//!
//! There is no timer: stale entries are trimmed lazily on the next
//! decision, bounded by the window size. Timestamps are monotonic
//! `Instant`s, so wall-clock skew cannot widen a window.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Window for message quotas.
pub const MESSAGE_WINDOW: Duration = Duration::from_secs(30);

/// Window for the join quota.
pub const JOIN_WINDOW: Duration = Duration::from_secs(10);

/// An entry is fresh while its age is strictly below the window; an entry
/// aged exactly one window has expired.
#[inline]
fn is_fresh(age: Duration, window: Duration) -> bool {
    age < window
}

#[derive(Default)]
struct Ledgers {
    sends: HashMap<String, VecDeque<Instant>>,
    joins: VecDeque<Instant>,
}

/// Decide-and-record rate limiter for the send and join paths.
pub struct RateLimitGovernor {
    normal_limit: u32,
    mod_limit: u32,
    join_limit: u32,
    global: bool,
    message_window: Duration,
    join_window: Duration,
    ledgers: Mutex<Ledgers>,
}

impl RateLimitGovernor {
    /// Governor with the standard TMI windows (30 s messages, 10 s joins).
    pub fn new(normal_limit: u32, mod_limit: u32, join_limit: u32, global: bool) -> Self {
        Self::with_windows(
            normal_limit,
            mod_limit,
            join_limit,
            global,
            MESSAGE_WINDOW,
            JOIN_WINDOW,
        )
    }

    /// Governor with explicit windows.
    pub fn with_windows(
        normal_limit: u32,
        mod_limit: u32,
        join_limit: u32,
        global: bool,
        message_window: Duration,
        join_window: Duration,
    ) -> Self {
        Self {
            normal_limit,
            mod_limit,
            join_limit,
            global,
            message_window,
            join_window,
            ledgers: Mutex::new(Ledgers::default()),
        }
    }

    /// May a message go out to `channel` right now?
    ///
    /// A `true` answer has already consumed a slot in the channel's ledger.
    /// In global mode the headroom check runs against `mod_limit` across
    /// all channels, with non-moderators additionally capped at
    /// `normal_limit`; in per-channel mode the caller's role picks the cap
    /// for this channel alone.
    pub fn may_send(&self, channel: &str, caller_is_moderator: bool) -> bool {
        let now = Instant::now();
        let mut ledgers = self.ledgers.lock().expect("governor lock poisoned");

        let window = self.message_window;
        let ledger = ledgers.sends.entry(channel.to_string()).or_default();
        while ledger
            .front()
            .is_some_and(|&t| !is_fresh(now.duration_since(t), window))
        {
            ledger.pop_front();
        }
        let sent = ledger.len() as u32;

        let permitted = if self.global {
            let global_sent: u32 = ledgers
                .sends
                .values()
                .map(|l| {
                    l.iter()
                        .filter(|&&t| is_fresh(now.duration_since(t), window))
                        .count() as u32
                })
                .sum();
            global_sent < self.mod_limit
                && (caller_is_moderator || global_sent < self.normal_limit)
        } else {
            let cap = if caller_is_moderator {
                self.mod_limit
            } else {
                self.normal_limit
            };
            sent < cap
        };

        if permitted {
            ledgers
                .sends
                .get_mut(channel)
                .expect("ledger created above")
                .push_back(now);
        }
        permitted
    }

    /// May a JOIN go out right now? A `true` answer has consumed a slot.
    pub fn may_join(&self) -> bool {
        let now = Instant::now();
        let mut ledgers = self.ledgers.lock().expect("governor lock poisoned");

        let window = self.join_window;
        while ledgers
            .joins
            .front()
            .is_some_and(|&t| !is_fresh(now.duration_since(t), window))
        {
            ledgers.joins.pop_front();
        }

        if (ledgers.joins.len() as u32) < self.join_limit {
            ledgers.joins.push_back(now);
            true
        } else {
            false
        }
    }
}
