//! IRCv3 message-tag value escaping.
//!
//! TMI escapes tag values per the IRCv3 message-tags spec; `display-name`
//! and `system-msg` are the values that carry escapes in practice.

/// Unescape a tag value from wire form.
///
/// `\:` → `;`, `\s` → ` `, `\\` → `\`, `\r` → CR, `\n` → LF. An unknown
/// escape keeps the escaped character; a trailing lone backslash is dropped.
pub fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}

/// Escape a tag value for the wire.
pub fn escape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => out.push_str("\\:"),
            ' ' => out.push_str("\\s"),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_table() {
        assert_eq!(unescape_tag_value("a\\:b"), "a;b");
        assert_eq!(unescape_tag_value("hello\\sworld"), "hello world");
        assert_eq!(unescape_tag_value("path\\\\file"), "path\\file");
        assert_eq!(unescape_tag_value("a\\rb\\nc"), "a\rb\nc");
    }

    #[test]
    fn unescape_system_msg() {
        assert_eq!(
            unescape_tag_value("alice\\ssubscribed\\sat\\sTier\\s1."),
            "alice subscribed at Tier 1."
        );
    }

    #[test]
    fn unknown_escape_keeps_char() {
        assert_eq!(unescape_tag_value("a\\xb"), "axb");
    }

    #[test]
    fn trailing_backslash_dropped() {
        assert_eq!(unescape_tag_value("test\\"), "test");
    }

    #[test]
    fn escape_roundtrip() {
        for original in ["plain", "with space", "a;b", "back\\slash", "cr\rlf\n"] {
            assert_eq!(unescape_tag_value(&escape_tag_value(original)), original);
        }
    }
}
