//! Slicing inbound WebSocket payloads into classified IRC lines.
//!
//! A single TMI text frame carries one or more CR-LF-terminated IRC lines.
//! [`lines`] walks the frame in order, yielding each line as a borrowed
//! slice (CR-LF stripped) together with its [`IrcCommand`] classification.
//! No allocation happens here; the full tag/prefix/params parse is deferred
//! to the typed decoders and only runs for lines the dispatcher keeps.

use crate::command::IrcCommand;

/// Iterator over the classified lines of one inbound frame.
pub struct Lines<'a> {
    rest: &'a str,
}

/// Split `frame` into `(command, line)` pairs, in arrival order.
///
/// A trailing line without CR-LF is still yielded; empty lines produced by
/// consecutive terminators are skipped.
pub fn lines(frame: &str) -> Lines<'_> {
    Lines { rest: frame }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (IrcCommand, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.is_empty() {
                return None;
            }
            let (line, rest) = match self.rest.find('\n') {
                Some(idx) => (&self.rest[..idx], &self.rest[idx + 1..]),
                None => (self.rest, ""),
            };
            self.rest = rest;
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            return Some((classify_line(line), line));
        }
    }
}

/// Classify one IRC line by its command token.
///
/// Skips the optional `@tags` and `:prefix` sections by slicing to the next
/// space, then matches the command token.
pub fn classify_line(line: &str) -> IrcCommand {
    let mut rest = line;
    if rest.starts_with('@') {
        rest = match rest.find(' ') {
            Some(idx) => &rest[idx + 1..],
            None => return IrcCommand::Unknown,
        };
    }
    rest = rest.trim_start_matches(' ');
    if rest.starts_with(':') {
        rest = match rest.find(' ') {
            Some(idx) => &rest[idx + 1..],
            None => return IrcCommand::Unknown,
        };
    }
    rest = rest.trim_start_matches(' ');
    let token = rest.split(' ').next().unwrap_or("");
    IrcCommand::classify(token)
}
