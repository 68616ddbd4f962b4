//! USERNOTICE decoding: subs, gifts, raids, upgrades, announcements.

use crate::error::EventParseError;
use crate::message::RawLine;

/// Ritual event category, from the `msg-id` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernoticeKind {
    /// `sub` / `resub`.
    Subscription,
    /// `subgift`.
    GiftSubscription,
    /// `submysterygift` — the announcement that N gifts are incoming.
    MysteryGift,
    /// `raid`.
    Raid,
    /// `giftpaidupgrade` / `anongiftpaidupgrade`.
    PaidUpgrade {
        /// Whether the original gifter was anonymous.
        anonymous: bool,
    },
    /// `primepaidupgrade`.
    PrimeUpgrade,
    /// `announcement`.
    Announcement,
}

impl UsernoticeKind {
    /// `None` for msg-ids outside the dispatch vocabulary; those notices
    /// are dropped silently.
    pub fn from_msg_id(msg_id: &str) -> Option<Self> {
        match msg_id {
            "sub" | "resub" => Some(Self::Subscription),
            "subgift" => Some(Self::GiftSubscription),
            "submysterygift" => Some(Self::MysteryGift),
            "raid" => Some(Self::Raid),
            "giftpaidupgrade" => Some(Self::PaidUpgrade { anonymous: false }),
            "anongiftpaidupgrade" => Some(Self::PaidUpgrade { anonymous: true }),
            "primepaidupgrade" => Some(Self::PrimeUpgrade),
            "announcement" => Some(Self::Announcement),
            _ => None,
        }
    }
}

/// A decoded USERNOTICE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usernotice {
    pub channel: String,
    pub kind: UsernoticeKind,
    /// Login of the user the notice is about.
    pub login: Option<String>,
    pub display_name: Option<String>,
    /// Server-rendered description, e.g. `alice subscribed at Tier 1.`.
    pub system_msg: Option<String>,
    /// The user's own message, when they attached one.
    pub text: Option<String>,
    /// Cumulative months for subs, viewer count for raids, gift count for
    /// mystery gifts.
    pub count: Option<u64>,
    pub id: Option<String>,
}

impl Usernotice {
    /// Decode a USERNOTICE line. `Ok(None)` means the msg-id is outside
    /// the recognized vocabulary.
    pub fn from_line(line: &RawLine<'_>) -> Result<Option<Self>, EventParseError> {
        let channel = line
            .channel_param()
            .ok_or(EventParseError::MissingParam("channel"))?;
        let msg_id = line.tag("msg-id").ok_or(EventParseError::MissingTag("msg-id"))?;
        let Some(kind) = UsernoticeKind::from_msg_id(msg_id) else {
            return Ok(None);
        };

        let count = match kind {
            UsernoticeKind::Subscription => line.tag_number("msg-param-cumulative-months"),
            UsernoticeKind::Raid => line.tag_number("msg-param-viewerCount"),
            UsernoticeKind::MysteryGift => line.tag_number("msg-param-mass-gift-count"),
            UsernoticeKind::GiftSubscription => line.tag_number("msg-param-gift-months"),
            _ => None,
        };

        Ok(Some(Self {
            channel: channel.to_string(),
            kind,
            login: line.tag("login").map(String::from),
            display_name: line.tag_unescaped("display-name").filter(|s| !s.is_empty()),
            system_msg: line.tag_unescaped("system-msg").filter(|s| !s.is_empty()),
            text: line.param(1).map(String::from),
            count,
            id: line.tag("id").map(String::from),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> Option<Usernotice> {
        Usernotice::from_line(&RawLine::parse(raw).unwrap()).unwrap()
    }

    #[test]
    fn resub_with_message() {
        let n = decode(
            "@msg-id=resub;login=alice;display-name=Alice;msg-param-cumulative-months=7;\
             system-msg=Alice\\ssubscribed\\sat\\sTier\\s1. \
             :tmi.twitch.tv USERNOTICE #bob :seven months!",
        )
        .unwrap();
        assert_eq!(n.kind, UsernoticeKind::Subscription);
        assert_eq!(n.channel, "bob");
        assert_eq!(n.login.as_deref(), Some("alice"));
        assert_eq!(n.system_msg.as_deref(), Some("Alice subscribed at Tier 1."));
        assert_eq!(n.text.as_deref(), Some("seven months!"));
        assert_eq!(n.count, Some(7));
    }

    #[test]
    fn raid_viewer_count() {
        let n = decode(
            "@msg-id=raid;login=alice;msg-param-viewerCount=420 \
             :tmi.twitch.tv USERNOTICE #bob",
        )
        .unwrap();
        assert_eq!(n.kind, UsernoticeKind::Raid);
        assert_eq!(n.count, Some(420));
        assert_eq!(n.text, None);
    }

    #[test]
    fn paid_upgrade_variants() {
        let gifted = decode("@msg-id=giftpaidupgrade :tmi.twitch.tv USERNOTICE #bob").unwrap();
        assert_eq!(gifted.kind, UsernoticeKind::PaidUpgrade { anonymous: false });
        let anon = decode("@msg-id=anongiftpaidupgrade :tmi.twitch.tv USERNOTICE #bob").unwrap();
        assert_eq!(anon.kind, UsernoticeKind::PaidUpgrade { anonymous: true });
    }

    #[test]
    fn unknown_msg_id_is_ignored() {
        assert!(decode("@msg-id=ritualname :tmi.twitch.tv USERNOTICE #bob").is_none());
    }

    #[test]
    fn missing_msg_id_is_an_error() {
        let line = RawLine::parse(":tmi.twitch.tv USERNOTICE #bob").unwrap();
        assert_eq!(
            Usernotice::from_line(&line),
            Err(EventParseError::MissingTag("msg-id"))
        );
    }
}
