//! WHISPER decoding.

use crate::error::EventParseError;
use crate::message::RawLine;

/// A direct message outside any channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whisper {
    /// Sender's login.
    pub sender: String,
    pub display_name: Option<String>,
    pub user_id: Option<u64>,
    /// Recipient login (the authenticated user).
    pub target: String,
    pub text: String,
}

impl Whisper {
    pub fn from_line(line: &RawLine<'_>) -> Result<Self, EventParseError> {
        let sender = line.nick().ok_or(EventParseError::MissingPrefix)?;
        let target = line
            .param(0)
            .ok_or(EventParseError::MissingParam("target"))?;
        let text = line
            .param(1)
            .ok_or(EventParseError::MissingParam("text"))?;
        Ok(Self {
            sender: sender.to_string(),
            display_name: line.tag_unescaped("display-name").filter(|s| !s.is_empty()),
            user_id: line.tag_number("user-id"),
            target: target.to_string(),
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whisper_fields() {
        let line = RawLine::parse(
            "@display-name=Alice;user-id=42 :alice!alice@alice.tmi.twitch.tv WHISPER bob :psst",
        )
        .unwrap();
        let w = Whisper::from_line(&line).unwrap();
        assert_eq!(w.sender, "alice");
        assert_eq!(w.target, "bob");
        assert_eq!(w.text, "psst");
        assert_eq!(w.user_id, Some(42));
    }
}
