//! MIME content type values.

use std::fmt;

/// Characters that force a parameter value to be quoted (RFC 2045 tspecials).
const TSPECIALS: &[char] = &['(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', ' '];

/// MIME content type with ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "alternative").
    pub sub_type: String,
    /// Parameters in output order.
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Parses a `type/subtype` string, ignoring any parameters.
    ///
    /// Returns `None` when the value has no `/`.
    #[must_use]
    pub fn parse_essence(value: &str) -> Option<Self> {
        let essence = value.split(';').next()?.trim();
        let (main, sub) = essence.split_once('/')?;
        if main.is_empty() || sub.is_empty() {
            return None;
        }
        Some(Self::new(main.to_lowercase(), sub.to_lowercase()))
    }

    /// `text/plain; charset=utf-8`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// `text/html; charset=utf-8`.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// `multipart/mixed` with the given boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// `multipart/alternative` with the given boundary.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the `type/subtype` string.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (key, value) in &self.parameters {
            if value.is_empty() || value.contains(TSPECIALS) {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }
        Ok(())
    }
}

/// Guesses a content type from a file name's extension.
#[must_use]
pub fn guess_from_filename(filename: &str) -> ContentType {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    let (main, sub) = match extension.as_str() {
        "txt" | "log" => ("text", "plain"),
        "html" | "htm" => ("text", "html"),
        "csv" => ("text", "csv"),
        "ics" => ("text", "calendar"),
        "pdf" => ("application", "pdf"),
        "json" => ("application", "json"),
        "zip" => ("application", "zip"),
        "xml" => ("application", "xml"),
        "png" => ("image", "png"),
        "jpg" | "jpeg" => ("image", "jpeg"),
        "gif" => ("image", "gif"),
        "svg" => ("image", "svg+xml"),
        "webp" => ("image", "webp"),
        _ => ("application", "octet-stream"),
    };
    ContentType::new(main, sub)
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

    #[test]
    fn test_display_text_plain() {
        assert_eq!(ContentType::text_plain().to_string(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_display_quotes_boundary() {
        let ct = ContentType::multipart_alternative("=_abc");
        assert_eq!(ct.to_string(), "multipart/alternative; boundary=\"=_abc\"");
        assert_eq!(ct.parameter("BOUNDARY"), Some("=_abc"));
    }

    #[test]
    fn test_parse_essence() {
        let ct = ContentType::parse_essence("Application/PDF; name=x").unwrap();
        assert_eq!(ct.essence(), "application/pdf");
        assert!(ContentType::parse_essence("garbage").is_none());
    }

    #[test]
    fn test_guess_from_filename() {
        assert_eq!(guess_from_filename("report.PDF").essence(), "application/pdf");
        assert_eq!(guess_from_filename("photo.jpeg").essence(), "image/jpeg");
        assert_eq!(
            guess_from_filename("README").essence(),
            "application/octet-stream"
        );
    }
}
