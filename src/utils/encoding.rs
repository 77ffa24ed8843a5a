//! Strict UTF-8 decoding for fetched and uploaded content.

use crate::error::{Error, Result};

/// Decode `bytes` as UTF-8 without replacement.
///
/// Invalid sequences are an error naming `path`; nothing is guessed or
/// transcoded.
pub fn decode_utf8(path: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| Error::Decode { path: path.to_string() })
}

/// Return the first `max_chars` characters of `text` (char-boundary safe).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_utf8() {
        let text = decode_utf8("a.rs", "Test content 🚀".as_bytes().to_vec()).unwrap();
        assert_eq!(text, "Test content 🚀");
    }

    #[test]
    fn decode_rejects_invalid_sequences() {
        let err = decode_utf8("logo.png", vec![0x89, 0x50, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::Decode { ref path } if path == "logo.png"));
    }

    #[test]
    fn truncate_is_char_based() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
