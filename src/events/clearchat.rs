//! CLEARCHAT decoding: chat clears, bans and timeouts.

use crate::error::EventParseError;
use crate::message::RawLine;

/// What a CLEARCHAT did, derived from the presence of a target user and a
/// ban duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearChatAction {
    /// The whole chat was cleared.
    Clear,
    /// A user was banned permanently.
    Ban,
    /// A user was timed out for the given number of seconds.
    Timeout(u64),
}

/// A decoded CLEARCHAT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearChat {
    pub channel: String,
    /// The moderated user; `None` for a full chat clear.
    pub target: Option<String>,
    pub action: ClearChatAction,
}

impl ClearChat {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        let channel = line
            .channel_param()
            .ok_or(EventParseError::MissingParam("channel"))?;
        let target = line.param(1).filter(|t| !t.is_empty());
        let action = match (target, line.tag_number::<u64>("ban-duration")) {
            (None, _) => ClearChatAction::Clear,
            (Some(_), None) => ClearChatAction::Ban,
            (Some(_), Some(secs)) => ClearChatAction::Timeout(secs),
        };
        Ok(Self {
            channel: channel.to_string(),
            target: target.map(String::from),
            action,
        })
    }
}
