//! NOTICE decoding.

use crate::error::EventParseError;
use crate::message::RawLine;

/// A server NOTICE, sub-typed by its `msg-id` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Channel login; `None` when the server addressed `*`.
    pub channel: Option<String>,
    pub msg_id: Option<String>,
    pub text: String,
}

impl Notice {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        let channel = line
            .channel_param()
            .filter(|c| *c != "*")
            .map(String::from);
        let text = line
            .param(1)
            .ok_or(EventParseError::MissingParam("text"))?;
        Ok(Self {
            channel,
            msg_id: line.tag("msg-id").map(String::from),
            text: text.to_string(),
        })
    }
}
