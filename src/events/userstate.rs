//! USERSTATE and GLOBALUSERSTATE decoding.

use crate::error::EventParseError;
use crate::message::RawLine;

/// The authenticated user's state within one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Userstate {
    pub channel: String,
    pub display_name: Option<String>,
    pub color: Option<String>,
    /// Raw badge list, e.g. `moderator/1,subscriber/12`.
    pub badges: Option<String>,
    /// The self-user's moderator bit in this channel.
    pub is_moderator: bool,
}

impl Userstate {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        let channel = line
            .channel_param()
            .ok_or(EventParseError::MissingParam("channel"))?;
        Ok(Self {
            channel: channel.to_string(),
            display_name: line.tag_unescaped("display-name").filter(|s| !s.is_empty()),
            color: line.tag("color").filter(|c| !c.is_empty()).map(String::from),
            badges: line.tag("badges").filter(|b| !b.is_empty()).map(String::from),
            is_moderator: line.tag_flag("mod").unwrap_or(false),
        })
    }
}

/// The authenticated user's global state, sent once after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalUserstate {
    pub user_id: Option<u64>,
    pub display_name: Option<String>,
    pub color: Option<String>,
    pub badges: Option<String>,
}

impl GlobalUserstate {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        Ok(Self {
            user_id: line.tag_number("user-id"),
            display_name: line.tag_unescaped("display-name").filter(|s| !s.is_empty()),
            color: line.tag("color").filter(|c| !c.is_empty()).map(String::from),
            badges: line.tag("badges").filter(|b| !b.is_empty()).map(String::from),
        })
    }
}
