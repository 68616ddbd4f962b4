//! CLEARMSG decoding: single-message deletion.

use crate::error::EventParseError;
use crate::message::RawLine;

/// A decoded CLEARMSG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearMsg {
    pub channel: String,
    /// Login of the author of the deleted message.
    pub login: Option<String>,
    /// Id of the deleted message.
    pub target_msg_id: Option<String>,
    /// Text of the deleted message.
    pub text: Option<String>,
}

impl ClearMsg {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        let channel = line
            .channel_param()
            .ok_or(EventParseError::MissingParam("channel"))?;
        Ok(Self {
            channel: channel.to_string(),
            login: line.tag("login").map(String::from),
            target_msg_id: line.tag("target-msg-id").map(String::from),
            text: line.param(1).map(String::from),
        })
    }
}
