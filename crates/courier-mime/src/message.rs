//! Outgoing message structure and RFC 5322 serialization.

use crate::attachment::{Attachment, LoadedAttachment};
use crate::content_type::ContentType;
use crate::encoding::{TransferEncoding, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::mailbox::{Address, Mailbox, address_list};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt::Write as _;

/// SMTP envelope: reverse path and forward paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Envelope sender (MAIL FROM).
    pub from: Address,
    /// Every recipient (RCPT TO), including Bcc.
    pub recipients: Vec<Address>,
}

/// A composed message ready for delivery.
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    from: Mailbox,
    reply_to: Option<Mailbox>,
    sender: Option<Address>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: String,
    text_body: Option<String>,
    html_body: Option<String>,
    attachments: Vec<LoadedAttachment>,
}

impl Message {
    /// Starts a new builder.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Top-level headers (Bcc is never included).
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// From mailbox.
    #[must_use]
    pub const fn from(&self) -> &Mailbox {
        &self.from
    }

    /// Reply-To mailbox.
    #[must_use]
    pub const fn reply_to(&self) -> Option<&Mailbox> {
        self.reply_to.as_ref()
    }

    /// Envelope sender override.
    #[must_use]
    pub const fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    /// To mailboxes.
    #[must_use]
    pub fn to(&self) -> &[Mailbox] {
        &self.to
    }

    /// Cc mailboxes.
    #[must_use]
    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    /// Bcc mailboxes.
    #[must_use]
    pub fn bcc(&self) -> &[Mailbox] {
        &self.bcc
    }

    /// Decoded subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Plain-text body.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        self.text_body.as_deref()
    }

    /// HTML body.
    #[must_use]
    pub fn html_body(&self) -> Option<&str> {
        self.html_body.as_deref()
    }

    /// Loaded attachments in insertion order.
    #[must_use]
    pub fn attachments(&self) -> &[LoadedAttachment] {
        &self.attachments
    }

    /// Envelope for SMTP delivery.
    ///
    /// The sender override wins over the From address.
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        let from = self
            .sender
            .clone()
            .unwrap_or_else(|| self.from.address.clone());
        let recipients = self
            .to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|mailbox| mailbox.address.clone())
            .collect();
        Envelope { from, recipients }
    }

    /// Serializes the message as RFC 5322 text with CRLF line endings.
    #[must_use]
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = self.headers.to_string();
        out.push_str("MIME-Version: 1.0\r\n");

        let body = self.body_part();
        if self.attachments.is_empty() {
            write_part(&mut out, &body);
        } else {
            let mut children = vec![body];
            children.extend(self.attachments.iter().map(attachment_part));
            write_part(&mut out, &Part::Multipart {
                content_type: ContentType::multipart_mixed(boundary()),
                children,
            });
        }

        out.into_bytes()
    }

    fn body_part(&self) -> Part {
        let text = self.text_body.as_ref().map(|text| Part::Leaf {
            content_type: ContentType::text_plain(),
            encoding: TransferEncoding::QuotedPrintable,
            disposition: None,
            body: TransferEncoding::QuotedPrintable.encode(text.as_bytes()),
        });
        let html = self.html_body.as_ref().map(|html| Part::Leaf {
            content_type: ContentType::text_html(),
            encoding: TransferEncoding::QuotedPrintable,
            disposition: None,
            body: TransferEncoding::QuotedPrintable.encode(html.as_bytes()),
        });

        match (text, html) {
            (Some(text), Some(html)) => Part::Multipart {
                content_type: ContentType::multipart_alternative(boundary()),
                children: vec![text, html],
            },
            (Some(single), None) | (None, Some(single)) => single,
            (None, None) => Part::Leaf {
                content_type: ContentType::text_plain(),
                encoding: TransferEncoding::SevenBit,
                disposition: None,
                body: String::new(),
            },
        }
    }
}

/// Builder for [`Message`].
///
/// Addresses are validated and file attachments are read in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<(String, Option<String>)>,
    reply_to: Option<String>,
    sender: Option<String>,
    to: Vec<(String, Option<String>)>,
    cc: Vec<(String, Option<String>)>,
    bcc: Vec<(String, Option<String>)>,
    subject: String,
    text_body: Option<String>,
    html_body: Option<String>,
    extra_headers: Vec<(String, String)>,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From mailbox.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>, name: Option<String>) -> Self {
        self.from = Some((address.into(), name));
        self
    }

    /// Sets the Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Overrides the envelope sender.
    #[must_use]
    pub fn sender(mut self, address: impl Into<String>) -> Self {
        self.sender = Some(address.into());
        self
    }

    /// Adds a To recipient.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>, name: Option<String>) -> Self {
        self.to.push((address.into(), name));
        self
    }

    /// Adds a Cc recipient.
    #[must_use]
    pub fn cc(mut self, address: impl Into<String>, name: Option<String>) -> Self {
        self.cc.push((address.into(), name));
        self
    }

    /// Adds a Bcc recipient.
    #[must_use]
    pub fn bcc(mut self, address: impl Into<String>, name: Option<String>) -> Self {
        self.bcc.push((address.into(), name));
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    /// Sets the HTML body. With a text body this produces multipart/alternative.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Adds a custom header. Repeated names produce repeated fields.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Validates addresses, reads attachments and assembles the headers.
    ///
    /// # Errors
    ///
    /// Returns an error if From is missing, there are no recipients, an
    /// address or header is invalid, or an attachment cannot be read.
    pub fn build(self) -> Result<Message> {
        let (from_address, from_name) = self.from.ok_or(Error::MissingFrom)?;
        let from = mailbox(from_address, from_name)?;
        let reply_to = self.reply_to.map(Mailbox::new).transpose()?;
        let sender = self.sender.map(Address::new).transpose()?;
        let to = mailboxes(self.to)?;
        let cc = mailboxes(self.cc)?;
        let bcc = mailboxes(self.bcc)?;
        if to.is_empty() && cc.is_empty() && bcc.is_empty() {
            return Err(Error::NoRecipients);
        }

        let mut attachments = Vec::with_capacity(self.attachments.len());
        for attachment in &self.attachments {
            attachments.push(LoadedAttachment {
                content: attachment.load()?,
                filename: attachment.filename.clone(),
                content_type: attachment.content_type.clone(),
                encoding: attachment.encoding,
            });
        }

        let mut headers = Headers::new();
        headers.add("Date", chrono::Utc::now().to_rfc2822())?;
        headers.add("Message-ID", message_id(from.address.domain()))?;
        if let Some(reply_to) = &reply_to {
            headers.add("Reply-To", reply_to.to_header_value())?;
        }
        headers.add("From", from.to_header_value())?;
        if !to.is_empty() {
            headers.add("To", address_list(&to))?;
        }
        if !cc.is_empty() {
            headers.add("Cc", address_list(&cc))?;
        }
        headers.add("Subject", encode_rfc2047(&self.subject))?;
        for (name, value) in self.extra_headers {
            headers.add(name, encode_rfc2047(&value))?;
        }

        Ok(Message {
            headers,
            from,
            reply_to,
            sender,
            to,
            cc,
            bcc,
            subject: self.subject,
            text_body: self.text_body,
            html_body: self.html_body,
            attachments,
        })
    }
}

fn mailbox(address: String, name: Option<String>) -> Result<Mailbox> {
    match name {
        Some(name) => Mailbox::with_name(name, address),
        None => Mailbox::new(address),
    }
}

fn mailboxes(entries: Vec<(String, Option<String>)>) -> Result<Vec<Mailbox>> {
    entries
        .into_iter()
        .map(|(address, name)| mailbox(address, name))
        .collect()
}

/// MIME body tree.
enum Part {
    Leaf {
        content_type: ContentType,
        encoding: TransferEncoding,
        disposition: Option<String>,
        body: String,
    },
    Multipart {
        content_type: ContentType,
        children: Vec<Part>,
    },
}

fn attachment_part(attachment: &LoadedAttachment) -> Part {
    let filename = encode_rfc2047(&attachment.filename).replace('"', "");
    Part::Leaf {
        content_type: attachment
            .content_type
            .clone()
            .with_parameter("name", filename.clone()),
        encoding: attachment.encoding,
        disposition: Some(format!("attachment; filename=\"{filename}\"")),
        body: attachment.encoding.encode(&attachment.content),
    }
}

fn write_part(out: &mut String, part: &Part) {
    match part {
        Part::Leaf {
            content_type,
            encoding,
            disposition,
            body,
        } => {
            let _ = write!(out, "Content-Type: {content_type}\r\n");
            let _ = write!(out, "Content-Transfer-Encoding: {encoding}\r\n");
            if let Some(disposition) = disposition {
                let _ = write!(out, "Content-Disposition: {disposition}\r\n");
            }
            out.push_str("\r\n");
            out.push_str(body);
            out.push_str("\r\n");
        }
        Part::Multipart {
            content_type,
            children,
        } => {
            let boundary = content_type.parameter("boundary").unwrap_or_default().to_string();
            let _ = write!(out, "Content-Type: {content_type}\r\n\r\n");
            for child in children {
                let _ = write!(out, "--{boundary}\r\n");
                write_part(out, child);
            }
            let _ = write!(out, "--{boundary}--\r\n");
        }
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn boundary() -> String {
    format!("=_{}", random_token(28))
}

fn message_id(domain: &str) -> String {
    let domain = if domain.is_empty() { "localhost" } else { domain };
    format!("<{}@{domain}>", random_token(32))
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

    fn base() -> MessageBuilder {
        MessageBuilder::new()
            .from("noreply@example.com", Some("Example".to_string()))
            .to("ann@example.com", Some("Ann Lee".to_string()))
            .subject("Welcome")
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8(message.formatted()).unwrap()
    }

    #[test]
    fn test_text_only_is_single_part() {
        let message = base().text_body("Hello").build().unwrap();
        let raw = formatted(&message);

        assert!(raw.contains("From: Example <noreply@example.com>\r\n"));
        assert!(raw.contains("To: Ann Lee <ann@example.com>\r\n"));
        assert!(raw.contains("Subject: Welcome\r\n"));
        assert!(raw.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(!raw.contains("multipart"));
    }

    #[test]
    fn test_text_and_html_is_alternative() {
        let message = base()
            .text_body("Hello")
            .html_body("<p>Hello</p>")
            .build()
            .unwrap();
        let raw = formatted(&message);

        let text_at = raw.find("text/plain").unwrap();
        let html_at = raw.find("text/html").unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(text_at < html_at, "plain part must come first");
    }

    #[test]
    fn test_attachments_make_mixed() {
        let message = base()
            .text_body("See attached")
            .attach(Attachment::from_bytes(b"id,total\n1,10\n".to_vec(), "totals.csv"))
            .build()
            .unwrap();
        let raw = formatted(&message);

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("Content-Disposition: attachment; filename=\"totals.csv\""));
        assert_eq!(message.attachments().len(), 1);
    }

    #[test]
    fn test_bcc_not_in_headers_but_in_envelope() {
        let message = base()
            .text_body("x")
            .cc("cc@example.com", None)
            .bcc("hidden@example.com", None)
            .build()
            .unwrap();
        let raw = formatted(&message);
        let envelope = message.envelope();

        assert!(!raw.contains("hidden@example.com"));
        assert!(raw.contains("Cc: cc@example.com\r\n"));
        let rcpts: Vec<&str> = envelope.recipients.iter().map(Address::as_str).collect();
        assert_eq!(rcpts, vec!["ann@example.com", "cc@example.com", "hidden@example.com"]);
    }

    #[test]
    fn test_sender_overrides_envelope_from() {
        let message = base().sender("bounces@example.com").build().unwrap();
        assert_eq!(message.envelope().from.as_str(), "bounces@example.com");
        assert_eq!(message.from().address.as_str(), "noreply@example.com");
    }

    #[test]
    fn test_reply_to_written_before_from() {
        let message = base().reply_to("help@example.com").build().unwrap();
        let raw = formatted(&message);
        assert!(raw.find("Reply-To:").unwrap() < raw.find("From:").unwrap());
    }

    #[test]
    fn test_custom_headers_repeat() {
        let message = base()
            .header("X-Tag", "a")
            .header("X-Tag", "b")
            .build()
            .unwrap();
        assert_eq!(message.headers().get_all("x-tag"), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_from() {
        let result = MessageBuilder::new().to("a@example.com", None).build();
        assert!(matches!(result, Err(Error::MissingFrom)));
    }

    #[test]
    fn test_no_recipients() {
        let result = MessageBuilder::new().from("a@example.com", None).build();
        assert!(matches!(result, Err(Error::NoRecipients)));
    }

    #[test]
    fn test_missing_attachment_file() {
        let result = base()
            .attach(Attachment::from_path("/no/such/file.pdf"))
            .build();
        assert!(matches!(result, Err(Error::Attachment { .. })));
    }
}
