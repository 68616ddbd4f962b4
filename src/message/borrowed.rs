//! Borrowed view of a single raw TMI line.

use crate::error::EventParseError;

use super::nom_parser::parse_line;
use super::tags::unescape_tag_value;

/// A parsed TMI line whose sections borrow from the inbound frame.
///
/// This is the input to every typed decoder in [`crate::events`]. Tag
/// lookup scans the raw tags section; nothing is materialized until a
/// decoder asks for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    tags: Option<&'a str>,
    prefix: Option<&'a str>,
    command: &'a str,
    params: Vec<&'a str>,
}

impl<'a> RawLine<'a> {
    /// Parse one line (without its CR-LF terminator).
    pub fn parse(line: &'a str) -> Result<Self, EventParseError> {
        if line.is_empty() {
            return Err(EventParseError::EmptyLine);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        let sections = match parse_line(line) {
            Ok((_, s)) => s,
            Err(_) => return Err(EventParseError::MalformedLine),
        };
        Ok(Self {
            tags: sections.tags,
            prefix: sections.prefix,
            command: sections.command,
            params: sections.params,
        })
    }

    pub fn command(&self) -> &'a str {
        self.command
    }

    /// Raw value of a message tag, still in wire escaping.
    ///
    /// A tag present without `=` yields an empty value.
    pub fn tag(&self, key: &str) -> Option<&'a str> {
        let tags = self.tags?;
        for pair in tags.split(';') {
            let (k, v) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            if k == key {
                return Some(v);
            }
        }
        None
    }

    /// Unescaped, owned value of a message tag.
    pub fn tag_unescaped(&self, key: &str) -> Option<String> {
        self.tag(key).map(unescape_tag_value)
    }

    /// Tag parsed as an integer; `None` when absent or non-numeric.
    pub fn tag_number<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.tag(key).and_then(|v| v.parse().ok())
    }

    /// Tag interpreted as a Twitch boolean flag (`1` true, anything else false).
    pub fn tag_flag(&self, key: &str) -> Option<bool> {
        self.tag(key).map(|v| v == "1")
    }

    /// Nickname portion of the source prefix (`nick!user@host` → `nick`).
    pub fn nick(&self) -> Option<&'a str> {
        let prefix = self.prefix?;
        Some(prefix.split(['!', '@']).next().unwrap_or(prefix))
    }

    /// Positional parameter by index.
    pub fn param(&self, index: usize) -> Option<&'a str> {
        self.params.get(index).copied()
    }

    /// First parameter with a leading `#` stripped — the channel login for
    /// every channel-scoped TMI command.
    pub fn channel_param(&self) -> Option<&'a str> {
        self.param(0).map(|p| p.strip_prefix('#').unwrap_or(p))
    }

    /// Last parameter, which is the trailing text for commands that have one.
    pub fn trailing(&self) -> Option<&'a str> {
        self.params.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lookup() {
        let line =
            RawLine::parse("@mod=1;color=#FF0000;flag :tmi.twitch.tv USERSTATE #chan").unwrap();
        assert_eq!(line.tag("mod"), Some("1"));
        assert_eq!(line.tag("color"), Some("#FF0000"));
        assert_eq!(line.tag("flag"), Some(""));
        assert_eq!(line.tag("absent"), None);
        assert_eq!(line.tag_flag("mod"), Some(true));
    }

    #[test]
    fn tag_unescaped_value() {
        let line = RawLine::parse("@system-msg=5\\sraiders :tmi.twitch.tv USERNOTICE #chan")
            .unwrap();
        assert_eq!(line.tag_unescaped("system-msg").as_deref(), Some("5 raiders"));
    }

    #[test]
    fn tag_numbers() {
        let line =
            RawLine::parse("@ban-duration=600;bits=abc :tmi.twitch.tv CLEARCHAT #chan :bob")
                .unwrap();
        assert_eq!(line.tag_number::<u64>("ban-duration"), Some(600));
        assert_eq!(line.tag_number::<u64>("bits"), None);
    }

    #[test]
    fn prefix_nick() {
        let line = RawLine::parse(":alice!alice@alice.tmi.twitch.tv PRIVMSG #chan :hi").unwrap();
        assert_eq!(line.nick(), Some("alice"));

        let server = RawLine::parse(":tmi.twitch.tv NOTICE * :msg").unwrap();
        assert_eq!(server.nick(), Some("tmi.twitch.tv"));
    }

    #[test]
    fn channel_and_trailing() {
        let line = RawLine::parse(":tmi.twitch.tv CLEARMSG #chan :deleted text").unwrap();
        assert_eq!(line.channel_param(), Some("chan"));
        assert_eq!(line.trailing(), Some("deleted text"));
    }

    #[test]
    fn empty_line_rejected() {
        assert_eq!(RawLine::parse(""), Err(EventParseError::EmptyLine));
    }
}
