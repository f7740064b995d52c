//! # courier-mime
//!
//! Composition of outgoing RFC 5322 / MIME messages.
//!
//! ## Features
//!
//! - **Builder API**: From, Reply-To, To/Cc/Bcc, envelope sender, custom headers
//! - **Multipart**: plain + HTML bodies become `multipart/alternative`,
//!   attachments wrap everything in `multipart/mixed`
//! - **Encodings**: Base64, Quoted-Printable, RFC 2047 header encoding
//! - **Attachments**: files read lazily at build time, or in-memory content
//!
//! ## Quick Start
//!
//! ```ignore
//! use courier_mime::{Attachment, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .from("noreply@example.com", Some("Example".into()))
//!     .to("ann@example.com", None)
//!     .subject("Your invoice")
//!     .text_body("Plain text version")
//!     .html_body("<p>HTML version</p>")
//!     .attach(Attachment::from_path("invoice.pdf"))
//!     .build()?;
//!
//! let envelope = message.envelope();
//! let bytes = message.formatted();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod content_type;
mod error;
mod header;
mod mailbox;
mod message;

pub mod encoding;

pub use attachment::{Attachment, AttachmentSource, LoadedAttachment};
pub use content_type::{ContentType, guess_from_filename};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::Headers;
pub use mailbox::{Address, Mailbox, address_list};
pub use message::{Envelope, Message, MessageBuilder};
