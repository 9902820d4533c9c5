//! Escaping for tab-separated, line-oriented lookup files.
//!
//! Fields may contain any character. Backslash, tab, carriage return and
//! line feed are written as `\\`, `\t`, `\r` and `\n` so that every record
//! stays on one line and splits on the first tab.

use crate::error::{Result, TesseraError};

pub fn escape_field(field: &str) -> String {
    let mut escaped = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn unescape_field(field: &str) -> Result<String> {
    let mut unescaped = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => unescaped.push('\\'),
            Some('t') => unescaped.push('\t'),
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some(other) => {
                return Err(TesseraError::persistence(format!(
                    "Unknown escape sequence \\{other} in {field:?}"
                )));
            }
            None => {
                return Err(TesseraError::persistence(format!(
                    "Dangling escape at end of {field:?}"
                )));
            }
        }
    }
    Ok(unescaped)
}

/// Split a record on its first tab.
pub fn split_record(line: &str) -> Option<(&str, &str)> {
    line.split_once('\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_control_characters() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a\tb\nc\\d"), "a\\tb\\nc\\\\d");
        assert_eq!(unescape_field("a\\tb\\nc\\\\d").unwrap(), "a\tb\nc\\d");
    }

    #[test]
    fn test_unescape_rejects_bad_sequences() {
        assert!(unescape_field("bad\\x").is_err());
        assert!(unescape_field("dangling\\").is_err());
    }

    #[test]
    fn test_split_record() {
        assert_eq!(split_record("3\tword\tmore"), Some(("3", "word\tmore")));
        assert_eq!(split_record("no tab"), None);
    }
}
