//! The logical message handed to the dispatch pipeline.

use std::path::PathBuf;

/// A CC or BCC entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Email address; entries with an empty address are skipped.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
}

impl Contact {
    /// Creates a contact.
    #[must_use]
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            name,
        }
    }
}

/// A file on disk to attach. The file is read when the message is composed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Path of the file.
    pub path: PathBuf,
    /// Attachment name; defaults to the file name.
    pub name: Option<String>,
    /// Transfer encoding (`base64`, `quoted-printable`, `7bit`, `8bit`).
    pub encoding: Option<String>,
    /// MIME type; guessed from the name when unset.
    pub mime_type: Option<String>,
}

impl FileAttachment {
    /// Creates a file attachment with defaults for everything but the path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
            encoding: None,
            mime_type: None,
        }
    }
}

/// In-memory content to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringAttachment {
    /// Raw content.
    pub content: Vec<u8>,
    /// File name shown to the recipient.
    pub filename: String,
    /// Transfer encoding.
    pub encoding: Option<String>,
    /// MIME type; guessed from the name when unset.
    pub mime_type: Option<String>,
}

impl StringAttachment {
    /// Creates a string attachment.
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            encoding: None,
            mime_type: None,
        }
    }
}

/// A message before rendering.
///
/// `subject`, `body` and `html_body` are template sources. When `html_body`
/// is unset the HTML part is derived from `body` through Markdown at send
/// time; the message itself is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// From address; falls back to the settings.
    pub from_email: Option<String>,
    /// From display name; falls back to the settings.
    pub from_name: Option<String>,
    /// Reply-To address.
    pub reply_to: Option<String>,
    /// Recipient address, used by [`Mailer::send_email`](crate::Mailer::send_email).
    pub to_email: Option<String>,
    /// Recipient first name for placeholder recipients.
    pub to_first_name: Option<String>,
    /// Recipient last name for placeholder recipients.
    pub to_last_name: Option<String>,
    /// Subject template.
    pub subject: String,
    /// Plain text body template.
    pub body: String,
    /// HTML body template.
    pub html_body: Option<String>,
    /// CC entries.
    pub cc: Vec<Contact>,
    /// BCC entries.
    pub bcc: Vec<Contact>,
    /// Extra headers, in order. Duplicate names are kept.
    pub custom_headers: Vec<(String, String)>,
    /// Files to attach.
    pub attachments: Vec<FileAttachment>,
    /// In-memory attachments.
    pub string_attachments: Vec<StringAttachment>,
    /// Envelope sender override.
    pub sender: Option<String>,
}

impl Message {
    /// Creates a message with a subject and plain body.
    #[must_use]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Sets the recipient address.
    #[must_use]
    pub fn to(mut self, email: impl Into<String>) -> Self {
        self.to_email = Some(email.into());
        self
    }

    /// Sets the recipient name used when no account matches the address.
    #[must_use]
    pub fn to_name(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.to_first_name = first_name;
        self.to_last_name = last_name;
        self
    }

    /// Sets the From address and name.
    #[must_use]
    pub fn from(mut self, email: impl Into<String>, name: Option<String>) -> Self {
        self.from_email = Some(email.into());
        self.from_name = name;
        self
    }

    /// Sets the Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, email: impl Into<String>) -> Self {
        self.reply_to = Some(email.into());
        self
    }

    /// Sets the envelope sender.
    #[must_use]
    pub fn sender(mut self, email: impl Into<String>) -> Self {
        self.sender = Some(email.into());
        self
    }

    /// Sets the HTML body template.
    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Adds a CC entry.
    #[must_use]
    pub fn cc(mut self, email: impl Into<String>, name: Option<String>) -> Self {
        self.cc.push(Contact::new(email, name));
        self
    }

    /// Adds a BCC entry.
    #[must_use]
    pub fn bcc(mut self, email: impl Into<String>, name: Option<String>) -> Self {
        self.bcc.push(Contact::new(email, name));
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Adds a file attachment.
    #[must_use]
    pub fn attach(mut self, attachment: FileAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds an in-memory attachment.
    #[must_use]
    pub fn attach_content(mut self, attachment: StringAttachment) -> Self {
        self.string_attachments.push(attachment);
        self
    }

    /// Returns the HTML body template if one is set and not blank.
    #[must_use]
    pub fn explicit_html_body(&self) -> Option<&str> {
        self.html_body.as_deref().filter(|html| !html.trim().is_empty())
    }
}
