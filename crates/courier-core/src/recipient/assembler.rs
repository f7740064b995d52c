//! Addresses, headers and attachments of the outgoing message.

use courier_mime::{Attachment, MessageBuilder, TransferEncoding};
use tracing::debug;

use super::model::Recipient;
use crate::message::{Contact, FileAttachment, Message, StringAttachment};

/// Display name given to test-override recipients.
pub const TEST_RECIPIENT_NAME: &str = "Test Email";

/// Fills a message builder with recipients, headers and attachments.
#[derive(Debug, Clone, Default)]
pub struct RecipientAssembler {
    test_recipients: Vec<String>,
}

impl RecipientAssembler {
    /// Creates an assembler. A non-empty `test_recipients` replaces the
    /// real recipient of every message.
    #[must_use]
    pub fn new(test_recipients: Vec<String>) -> Self {
        Self { test_recipients }
    }

    /// Returns true if a test-recipient override is active.
    #[must_use]
    pub fn is_overriding(&self) -> bool {
        !self.test_recipients.is_empty()
    }

    /// Adds To, custom headers, CC, BCC, the envelope sender and the
    /// attachments of `message`, in that order.
    #[must_use]
    pub fn assemble(
        &self,
        mut builder: MessageBuilder,
        recipient: &Recipient,
        message: &Message,
    ) -> MessageBuilder {
        if self.is_overriding() {
            debug!(
                intended = %recipient.email,
                count = self.test_recipients.len(),
                "Redirecting to test recipients"
            );
            for address in &self.test_recipients {
                builder = builder.to(address, Some(TEST_RECIPIENT_NAME.to_string()));
            }
        } else {
            builder = builder.to(&recipient.email, recipient.display_name());
        }

        for (name, value) in &message.custom_headers {
            builder = builder.header(name, value);
        }

        for Contact { email, name } in message.cc.iter().filter(|c| !c.email.trim().is_empty()) {
            builder = builder.cc(email, Some(name.clone().unwrap_or_default()));
        }
        for Contact { email, name } in message.bcc.iter().filter(|c| !c.email.trim().is_empty()) {
            builder = builder.bcc(email, Some(name.clone().unwrap_or_default()));
        }

        if let Some(sender) = message.sender.as_deref().filter(|s| !s.trim().is_empty()) {
            builder = builder.sender(sender);
        }

        for attachment in &message.attachments {
            builder = builder.attach(file_attachment(attachment));
        }
        for attachment in &message.string_attachments {
            builder = builder.attach(string_attachment(attachment));
        }

        builder
    }
}

fn file_attachment(source: &FileAttachment) -> Attachment {
    let mut attachment = Attachment::from_path(&source.path);
    if let Some(name) = source.name.as_deref().filter(|n| !n.is_empty()) {
        attachment = attachment.with_filename(name);
    }
    apply_options(attachment, source.encoding.as_deref(), source.mime_type.as_deref())
}

fn string_attachment(source: &StringAttachment) -> Attachment {
    let attachment = Attachment::from_bytes(source.content.clone(), &source.filename);
    apply_options(attachment, source.encoding.as_deref(), source.mime_type.as_deref())
}

fn apply_options(
    mut attachment: Attachment,
    encoding: Option<&str>,
    mime_type: Option<&str>,
) -> Attachment {
    if let Some(encoding) = encoding {
        attachment = attachment.with_encoding(TransferEncoding::parse(encoding));
    }
    if let Some(mime_type) = mime_type {
        attachment = attachment.with_content_type(mime_type);
    }
    attachment
}
