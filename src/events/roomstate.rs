//! ROOMSTATE decoding.
//!
//! The server emits a full ROOMSTATE (every room-mode tag present) once
//! right after a successful JOIN, and a single-tag delta whenever a mode
//! changes afterwards. The dispatcher keys join confirmation on the full
//! variant and mode-change hooks on the delta.

use crate::error::EventParseError;
use crate::message::RawLine;

/// Which single room mode a delta ROOMSTATE changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomstateDelta {
    EmoteOnly,
    FollowersOnly,
    UniqueMode,
    Slow,
    SubsOnly,
}

/// A decoded ROOMSTATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roomstate {
    /// Channel login, without the `#`.
    pub channel: String,
    /// Channel's user id.
    pub room_id: Option<u64>,
    pub emote_only: Option<bool>,
    /// Minutes of followage required; `-1` when off.
    pub followers_only: Option<i64>,
    /// Unique-chat (r9k) mode.
    pub unique_mode: Option<bool>,
    /// Seconds between messages per user.
    pub slow: Option<u64>,
    pub subs_only: Option<bool>,
}

impl Roomstate {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        let channel = line
            .channel_param()
            .ok_or(EventParseError::MissingParam("channel"))?;
        Ok(Self {
            channel: channel.to_string(),
            room_id: line.tag_number("room-id"),
            emote_only: line.tag_flag("emote-only"),
            followers_only: line.tag_number("followers-only"),
            unique_mode: line.tag_flag("r9k"),
            slow: line.tag_number("slow"),
            subs_only: line.tag_flag("subs-only"),
        })
    }

    /// Whether every room mode is present — the post-JOIN admission shape.
    pub fn is_full(&self) -> bool {
        self.emote_only.is_some()
            && self.followers_only.is_some()
            && self.unique_mode.is_some()
            && self.slow.is_some()
            && self.subs_only.is_some()
    }

    /// The single changed mode, when exactly one is present.
    pub fn delta(&self) -> Option<RoomstateDelta> {
        let present = [
            self.emote_only.map(|_| RoomstateDelta::EmoteOnly),
            self.followers_only.map(|_| RoomstateDelta::FollowersOnly),
            self.unique_mode.map(|_| RoomstateDelta::UniqueMode),
            self.slow.map(|_| RoomstateDelta::Slow),
            self.subs_only.map(|_| RoomstateDelta::SubsOnly),
        ];
        let mut found = None;
        for delta in present.into_iter().flatten() {
            if found.is_some() {
                return None;
            }
            found = Some(delta);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> Roomstate {
        Roomstate::from_line(&RawLine::parse(raw).unwrap()).unwrap()
    }

    #[test]
    fn full_roomstate_after_join() {
        let rs = decode(
            "@emote-only=0;followers-only=-1;r9k=0;rituals=0;room-id=1;slow=0;subs-only=0 \
             :tmi.twitch.tv ROOMSTATE #bob",
        );
        assert!(rs.is_full());
        assert_eq!(rs.channel, "bob");
        assert_eq!(rs.room_id, Some(1));
        assert_eq!(rs.followers_only, Some(-1));
        assert_eq!(rs.delta(), None);
    }

    #[test]
    fn single_tag_deltas() {
        assert_eq!(
            decode("@emote-only=1;room-id=1 :tmi.twitch.tv ROOMSTATE #bob").delta(),
            Some(RoomstateDelta::EmoteOnly)
        );
        assert_eq!(
            decode("@slow=30;room-id=1 :tmi.twitch.tv ROOMSTATE #bob").delta(),
            Some(RoomstateDelta::Slow)
        );
        assert_eq!(
            decode("@followers-only=10;room-id=1 :tmi.twitch.tv ROOMSTATE #bob").delta(),
            Some(RoomstateDelta::FollowersOnly)
        );
        assert_eq!(
            decode("@r9k=1 :tmi.twitch.tv ROOMSTATE #bob").delta(),
            Some(RoomstateDelta::UniqueMode)
        );
        assert_eq!(
            decode("@subs-only=1 :tmi.twitch.tv ROOMSTATE #bob").delta(),
            Some(RoomstateDelta::SubsOnly)
        );
    }

    #[test]
    fn unrecognized_shapes() {
        // No mode tags at all.
        let bare = decode("@room-id=1 :tmi.twitch.tv ROOMSTATE #bob");
        assert!(!bare.is_full());
        assert_eq!(bare.delta(), None);
        // Two modes at once is neither full nor a single delta.
        let two = decode("@emote-only=1;slow=30 :tmi.twitch.tv ROOMSTATE #bob");
        assert!(!two.is_full());
        assert_eq!(two.delta(), None);
    }
}
