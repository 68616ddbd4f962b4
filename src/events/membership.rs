//! JOIN / PART membership decoding.

use crate::error::EventParseError;
use crate::message::RawLine;

/// A user entering or leaving a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Channel login, without the `#`.
    pub channel: String,
    /// The joining or parting user's login.
    pub user: String,
}

impl Membership {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        let channel = line
            .channel_param()
            .ok_or(EventParseError::MissingParam("channel"))?;
        let user = line.nick().ok_or(EventParseError::MissingPrefix)?;
        Ok(Self {
            channel: channel.to_string(),
            user: user.to_string(),
        })
    }
}
