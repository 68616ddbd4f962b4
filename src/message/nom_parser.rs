//! Nom-based parser for a single TMI line.
//!
//! Splits `[@tags] [:prefix] <command> [params...] [:trailing]` into
//! borrowed slices of the input. This runs only for lines the dispatcher
//! actually decodes; the frame-level hot path classifies without it.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    sequence::preceded,
    IResult,
};

/// Tags section: after `@`, up to the first space.
fn tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

/// Source prefix: after `:`, up to the first space.
fn prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// Command token. TMI commands are alphanumeric (words or numerics).
fn command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric())(input)
}

/// Split one line into its raw sections.
pub(super) fn parse_line(input: &str) -> IResult<&str, Sections<'_>> {
    let (input, tags) = opt(tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = command(input)?;

    let mut params = Vec::new();
    let mut rest = input;
    while let Some(stripped) = rest.strip_prefix(' ') {
        rest = stripped;
        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            rest = "";
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        if end == 0 {
            break;
        }
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    Ok((
        rest,
        Sections {
            tags,
            prefix,
            command,
            params,
        },
    ))
}

/// The raw sections of one parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Sections<'a> {
    pub tags: Option<&'a str>,
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: Vec<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Sections<'_> {
        parse_line(input).expect("valid line").1
    }

    #[test]
    fn bare_command() {
        let s = parse("PING");
        assert_eq!(s.command, "PING");
        assert!(s.tags.is_none());
        assert!(s.prefix.is_none());
        assert!(s.params.is_empty());
    }

    #[test]
    fn command_with_trailing() {
        let s = parse("PRIVMSG #chan :Hello, world!");
        assert_eq!(s.command, "PRIVMSG");
        assert_eq!(s.params, vec!["#chan", "Hello, world!"]);
    }

    #[test]
    fn full_tmi_line() {
        let s = parse("@badge-info=;mod=1 :nick!nick@nick.tmi.twitch.tv PRIVMSG #chan :hi there");
        assert_eq!(s.tags, Some("badge-info=;mod=1"));
        assert_eq!(s.prefix, Some("nick!nick@nick.tmi.twitch.tv"));
        assert_eq!(s.command, "PRIVMSG");
        assert_eq!(s.params, vec!["#chan", "hi there"]);
    }

    #[test]
    fn welcome_numeric() {
        let s = parse(":tmi.twitch.tv 001 alice :Welcome, GLHF!");
        assert_eq!(s.prefix, Some("tmi.twitch.tv"));
        assert_eq!(s.command, "001");
        assert_eq!(s.params, vec!["alice", "Welcome, GLHF!"]);
    }

    #[test]
    fn empty_trailing_kept() {
        let s = parse("PRIVMSG #chan :");
        assert_eq!(s.params, vec!["#chan", ""]);
    }

    #[test]
    fn middle_params_split_on_spaces() {
        let s = parse(":tmi.twitch.tv CLEARCHAT #chan :victim");
        assert_eq!(s.params, vec!["#chan", "victim"]);
    }
}
