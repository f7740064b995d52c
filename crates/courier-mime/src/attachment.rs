//! Attachments: files read at build time or in-memory content.

use crate::content_type::{ContentType, guess_from_filename};
use crate::encoding::TransferEncoding;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Where the attachment bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// File on disk; read when the message is built.
    File(PathBuf),
    /// Content held in memory.
    Bytes(Vec<u8>),
}

/// Attachment to add to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// Content type; guessed from the file name when not given.
    pub content_type: ContentType,
    /// Transfer encoding for the part.
    pub encoding: TransferEncoding,
    /// Content source.
    pub source: AttachmentSource,
}

impl Attachment {
    /// Creates an attachment backed by a file.
    ///
    /// The file is not touched until the message is built.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            content_type: guess_from_filename(&filename),
            filename,
            encoding: TransferEncoding::Base64,
            source: AttachmentSource::File(path.to_path_buf()),
        }
    }

    /// Creates an attachment from in-memory content.
    #[must_use]
    pub fn from_bytes(content: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            content_type: guess_from_filename(&filename),
            filename,
            encoding: TransferEncoding::Base64,
            source: AttachmentSource::Bytes(content.into()),
        }
    }

    /// Overrides the file name shown to the recipient.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Overrides the content type. Values without a `/` are ignored.
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        if let Some(ct) = ContentType::parse_essence(content_type) {
            self.content_type = ct;
        }
        self
    }

    /// Overrides the transfer encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: TransferEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Reads the attachment content.
    ///
    /// # Errors
    ///
    /// Returns an error if a file-backed attachment cannot be read.
    pub fn load(&self) -> Result<Vec<u8>> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => Ok(bytes.clone()),
            AttachmentSource::File(path) => std::fs::read(path).map_err(|source| Error::Attachment {
                path: path.clone(),
                source,
            }),
        }
    }
}

/// Attachment whose content has been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAttachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// Content type.
    pub content_type: ContentType,
    /// Transfer encoding.
    pub encoding: TransferEncoding,
    /// Raw content.
    pub content: Vec<u8>,
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
    fn test_from_path_guesses_type() {
        let attachment = Attachment::from_path("/tmp/invoices/march.pdf");
        assert_eq!(attachment.filename, "march.pdf");
        assert_eq!(attachment.content_type.essence(), "application/pdf");
        assert_eq!(attachment.encoding, TransferEncoding::Base64);
    }

    #[test]
    fn test_overrides() {
        let attachment = Attachment::from_bytes(b"a,b".to_vec(), "data")
            .with_filename("data.csv")
            .with_content_type("text/csv")
            .with_encoding(TransferEncoding::SevenBit);
        assert_eq!(attachment.filename, "data.csv");
        assert_eq!(attachment.content_type.essence(), "text/csv");
        assert_eq!(attachment.load().unwrap(), b"a,b");
    }

    #[test]
    fn test_missing_file_fails_on_load() {
        let attachment = Attachment::from_path("/definitely/not/here.txt");
        assert!(matches!(attachment.load(), Err(Error::Attachment { .. })));
    }
}
