//! Transfer encodings for outgoing messages.
//!
//! Base64 and Quoted-Printable (RFC 2045) for bodies, RFC 2047 encoded-words
//! for header values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::fmt::Write as _;

/// Maximum encoded line length, excluding CRLF.
const MAX_LINE_LENGTH: usize = 76;

/// Longest encoded-word allowed by RFC 2047.
const MAX_ENCODED_WORD: usize = 75;

const PREFIX: &str = "=?utf-8?B?";
const SUFFIX: &str = "?=";

/// Content-Transfer-Encoding of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII, written as-is.
    SevenBit,
    /// 8-bit text, written as-is.
    EightBit,
    /// Base64, wrapped at 76 columns.
    #[default]
    Base64,
    /// Quoted-Printable.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses an encoding name as used by callers (`base64`, `7bit`, ...).
    ///
    /// Unknown names fall back to Base64, which is safe for any content.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::Base64,
        }
    }

    /// Encodes `data` for this transfer encoding.
    #[must_use]
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            Self::SevenBit | Self::EightBit => normalize_line_endings(&String::from_utf8_lossy(data)),
            Self::Base64 => encode_base64_wrapped(data),
            Self::QuotedPrintable => encode_quoted_printable(&String::from_utf8_lossy(data)),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 broken into 76-column CRLF lines.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);
    for (i, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        // Base64 output is pure ASCII.
        result.push_str(&String::from_utf8_lossy(chunk));
    }
    result
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Hard line breaks in the input are kept as CRLF; long lines get soft
/// breaks so no output line exceeds 76 characters.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::new();

    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            result.push_str("\r\n");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        let bytes = line.as_bytes();
        let mut line_length = 0;

        for (pos, byte) in bytes.iter().enumerate() {
            let is_last = pos + 1 == bytes.len();
            let mut token = String::with_capacity(3);
            match byte {
                b'!'..=b'<' | b'>'..=b'~' => token.push(*byte as char),
                // Trailing whitespace would be stripped in transit
                b' ' | b'\t' if !is_last => token.push(*byte as char),
                _ => {
                    let _ = write!(token, "={byte:02X}");
                }
            }

            // Keep room for the soft break '=' unless this is the last token
            let limit = if is_last { MAX_LINE_LENGTH } else { MAX_LINE_LENGTH - 1 };
            if line_length + token.len() > limit {
                result.push_str("=\r\n");
                line_length = 0;
            }
            result.push_str(&token);
            line_length += token.len();
        }
    }

    result
}

/// Encodes a header value as RFC 2047 encoded-words when it is not plain ASCII.
///
/// Values are split on character boundaries so each encoded-word stays within
/// the 75 character limit.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) && !text.contains("=?") {
        return text.to_string();
    }

    // 4 base64 chars per 3 input bytes
    let max_chunk = (MAX_ENCODED_WORD - PREFIX.len() - SUFFIX.len()) / 4 * 3;

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > max_chunk {
            words.push(format!("{PREFIX}{}{SUFFIX}", encode_base64(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(format!("{PREFIX}{}{SUFFIX}", encode_base64(chunk.as_bytes())));
    }

    words.join("\r\n ")
}

/// Converts bare LF line endings to CRLF.
fn normalize_line_endings(text: &str) -> String {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\r\n")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::Base64);
    }

    #[test]
    fn test_base64_wrapped() {
        let data = vec![b'a'; 200];
        let encoded = encode_base64_wrapped(&data);
        assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
        assert_eq!(encoded.replace("\r\n", ""), encode_base64(&data));
    }

    #[test]
    fn test_quoted_printable_plain_ascii() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_non_ascii() {
        assert_eq!(encode_quoted_printable("Héllo"), "H=C3=A9llo");
    }

    #[test]
    fn test_quoted_printable_equals_and_trailing_space() {
        assert_eq!(encode_quoted_printable("a=b "), "a=3Db=20");
    }

    #[test]
    fn test_quoted_printable_keeps_line_breaks() {
        assert_eq!(encode_quoted_printable("one\ntwo\r\nthree"), "one\r\ntwo\r\nthree");
    }

    #[test]
    fn test_rfc2047_ascii_untouched() {
        assert_eq!(encode_rfc2047("Welcome aboard"), "Welcome aboard");
    }

    #[test]
    fn test_rfc2047_utf8() {
        assert_eq!(encode_rfc2047("Héllo"), "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_long_value_splits() {
        let encoded = encode_rfc2047(&"é".repeat(60));
        assert!(encoded.contains("\r\n "));
        assert!(encoded.split("\r\n ").all(|word| word.len() <= 75));
    }

    proptest! {
        #[test]
        fn quoted_printable_lines_fit(text in "\\PC{0,400}") {
            let encoded = encode_quoted_printable(&text);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= 76, "line too long: {}", line.len());
            }
        }
    }
}
