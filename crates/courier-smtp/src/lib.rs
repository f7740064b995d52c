//! # courier-smtp
//!
//! Async SMTP client (RFC 5321) used to deliver outgoing mail, plus the
//! POP3 login some relays require before they accept SMTP.
//!
//! ## Features
//!
//! - **Type-state connection management**: invalid SMTP state transitions
//!   do not compile
//! - **TLS**: implicit TLS (port 465) and STARTTLS
//! - **Authentication**: PLAIN and LOGIN
//! - **Keep-alive**: [`SmtpTransport`] can hold one session open between sends
//! - **POP-before-SMTP**: [`pop::authorize`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use courier_smtp::{Credentials, Security, SmtpConfig, SmtpTransport};
//!
//! let config = SmtpConfig::builder("smtp.example.com")
//!     .security(Security::StartTls)
//!     .credentials(Credentials::new("mailer", "secret"))
//!     .keep_alive(true)
//!     .build();
//!
//! let transport = SmtpTransport::new(config);
//! transport.send(&message).await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── ehlo/starttls ──→ Connected ── authenticate/without_auth ──→ Ready
//!                                                                           │
//! Ready ←── send_message ── Data ←── data ── RecipientAdded ←── rcpt_to ── mail_from
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Connection management and type-state client
//! - [`parser`]: Reply parser
//! - [`pop`]: POP3 authorization
//! - [`types`]: Replies, extensions and AUTH mechanisms

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod pop;
mod transport;
pub mod types;

pub use connection::{
    Client, Connected, Data, MailTransaction, Ready, RecipientAdded, ServerInfo, SmtpConnection,
};
pub use courier_mime::{Address, Envelope};
pub use error::{Error, Result};
pub use pop::PopConfig;
pub use transport::{Credentials, DEFAULT_TIMEOUT, Security, SmtpConfig, SmtpConfigBuilder, SmtpTransport};
pub use types::{AuthMechanism, Extension, Reply, ReplyCode};
