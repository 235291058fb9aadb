//! Single-quote shell escaping.
//!
//! `'` is the only byte that can end a POSIX single-quoted literal, so every
//! `'` becomes `'\''` (close, escaped quote, reopen) and everything else,
//! newlines included, passes through unchanged.

use thiserror::Error;

/// Largest encoded value the chroot script accepts for a single field.
pub const MAX_ENCODED_LEN: usize = 1023;

const QUOTE_UNIT: &str = r"'\''";

/// Encoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The encoded form would exceed the configured bound.
    #[error("value too long to embed safely: encoded form exceeds {limit} bytes")]
    Truncated { limit: usize },
}

/// Escape `input` for placement between single quotes.
///
/// `format!("'{}'", escape_single_quoted(s))` evaluates to exactly `s` in a POSIX shell.
pub fn escape_single_quoted(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '\'' {
            out.push_str(QUOTE_UNIT);
        } else {
            out.push(ch);
        }
    }
    out
}

/// Like [`escape_single_quoted`] but refuses to produce more than `limit` bytes.
///
/// Encoded units are never split: an input whose encoding would cross the
/// bound is reported as [`EncodeError::Truncated`] instead of being clipped.
pub fn escape_single_quoted_bounded(input: &str, limit: usize) -> Result<String, EncodeError> {
    let encoded = escape_single_quoted(input);
    if encoded.len() > limit {
        return Err(EncodeError::Truncated { limit });
    }
    Ok(encoded)
}

/// Wrap `input` in single quotes, escaping as needed.
pub fn quote(input: &str) -> String {
    format!("'{}'", escape_single_quoted(input))
}

/// Quote only when the word contains something the shell would interpret.
///
/// Used for echoing argument vectors back to the operator in a copy-pasteable form.
pub fn quote_word(word: &str) -> String {
    let plain = !word.is_empty()
        && word.bytes().all(|b| {
            b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/' | b',' | b'=' | b':' | b'@' | b'+')
        });
    if plain { word.to_string() } else { quote(word) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_apostrophe() {
        assert_eq!(escape_single_quoted("it's"), r"it'\''s");
    }

    #[test]
    fn test_escape_passthrough() {
        assert_eq!(escape_single_quoted("p@ss w\"ord$\n`x`"), "p@ss w\"ord$\n`x`");
        assert_eq!(escape_single_quoted(""), "");
    }

    #[test]
    fn test_escape_only_quotes() {
        assert_eq!(escape_single_quoted("''"), r"'\'''\''");
    }

    #[test]
    fn test_bounded_ok_at_limit() {
        let input = "a".repeat(MAX_ENCODED_LEN);
        assert_eq!(
            escape_single_quoted_bounded(&input, MAX_ENCODED_LEN).expect("fits"),
            input
        );
    }

    #[test]
    fn test_bounded_rejects_overflow() {
        let input = "a".repeat(MAX_ENCODED_LEN + 1);
        assert_eq!(
            escape_single_quoted_bounded(&input, MAX_ENCODED_LEN),
            Err(EncodeError::Truncated { limit: MAX_ENCODED_LEN })
        );
    }

    #[test]
    fn test_bounded_counts_expanded_quotes() {
        // 3 bytes of input, 12 bytes encoded
        assert!(escape_single_quoted_bounded("'''", 11).is_err());
        assert!(escape_single_quoted_bounded("'''", 12).is_ok());
    }

    #[test]
    fn test_quote_word() {
        assert_eq!(quote_word("/dev/sda1"), "/dev/sda1");
        assert_eq!(quote_word("noatime,compress=lzo,subvol=@"), "noatime,compress=lzo,subvol=@");
        assert_eq!(quote_word("United States"), "'United States'");
        assert_eq!(quote_word(""), "''");
        assert_eq!(quote_word("a'b"), r"'a'\''b'");
    }
}
