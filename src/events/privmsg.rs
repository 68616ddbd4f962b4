//! Chat message decoding.

use crate::error::EventParseError;
use crate::message::RawLine;

/// A PRIVMSG: one chat message in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privmsg {
    /// Channel login, without the `#`.
    pub channel: String,
    /// Sender's login name.
    pub sender: String,
    /// Sender's display name, when the tag is present.
    pub display_name: Option<String>,
    /// Sender's user id.
    pub user_id: Option<u64>,
    /// Sender's name color, e.g. `#FF4500`.
    pub color: Option<String>,
    /// Unique message id.
    pub id: Option<String>,
    /// Message text, with an ACTION wrapper already stripped.
    pub text: String,
    /// Whether this was a `.me` action message.
    pub is_action: bool,
    /// Bits cheered with this message.
    pub bits: Option<u64>,
    /// Client nonce echoed back by the server.
    pub nonce: Option<String>,
    /// Message id of the parent, when this message is a reply.
    pub reply_parent_id: Option<String>,
}

impl Privmsg {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        let channel = line
            .channel_param()
            .ok_or(EventParseError::MissingParam("channel"))?;
        let sender = line.nick().ok_or(EventParseError::MissingPrefix)?;
        let raw_text = line
            .param(1)
            .ok_or(EventParseError::MissingParam("text"))?;

        // `.me` messages arrive wrapped as CTCP ACTION.
        let (text, is_action) = match raw_text
            .strip_prefix("\u{1}ACTION ")
            .and_then(|t| t.strip_suffix('\u{1}'))
        {
            Some(inner) => (inner, true),
            None => (raw_text, false),
        };

        Ok(Self {
            channel: channel.to_string(),
            sender: sender.to_string(),
            display_name: line.tag_unescaped("display-name").filter(|s| !s.is_empty()),
            user_id: line.tag_number("user-id"),
            color: line.tag("color").filter(|c| !c.is_empty()).map(String::from),
            id: line.tag("id").map(String::from),
            text: text.to_string(),
            is_action,
            bits: line.tag_number("bits"),
            nonce: line.tag("client-nonce").map(String::from),
            reply_parent_id: line.tag("reply-parent-msg-id").map(String::from),
        })
    }
}
