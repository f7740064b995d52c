//! # courier-core
//!
//! Transactional email dispatch.
//!
//! Given a message (explicit, or a localized keyed template) and a
//! recipient, [`Mailer`] resolves the content, renders it with `MiniJinja`,
//! picks a transport from the stored settings and delivers it, letting
//! hooks veto or observe the send.
//!
//! ```text
//! settings → before hooks → transport → recipients → render → deliver → after hooks
//! ```
//!
//! This crate provides:
//! - **Settings** - memoized [`SettingsProvider`] over a [`SettingsStore`]
//!   (`SQLite` or in-memory), with scoped overrides for test sends
//! - **Keyed messages** - built-in and registered localized templates
//! - **Rendering** - `MiniJinja` templates with a Markdown-derived HTML part
//! - **Transports** - SMTP, Gmail, POP-before-SMTP, sendmail, native mail
//! - **Hooks** - before-send veto and after-send notification
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use courier_core::{Mailer, MailerConfig, SettingsProvider, SqliteSettingsStore};
//!
//! let store = Arc::new(SqliteSettingsStore::new("settings.db").await?);
//! let mailer = Mailer::builder(Arc::new(SettingsProvider::new(store)))
//!     .config(MailerConfig::from_env())
//!     .build();
//!
//! let mut variables = courier_core::Variables::new();
//! variables.insert("link".into(), "https://example.com/reset/abc".into());
//! mailer.send_by_key("ann@example.com", "forgot_password", variables).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
mod error;
pub mod message;
pub mod recipient;
pub mod render;
pub mod settings;
pub mod transport;

pub use config::MailerConfig;
pub use dispatch::{
    DispatchEvent, DispatchOutcome, DispatchState, HookVerdict, Mailer, MailerBuilder,
    RecipientRef, SendHook, TestEmailReport,
};
pub use error::{Error, Result};
pub use message::{
    Contact, DefaultMessages, FileAttachment, KeyedMessage, KeyedMessageStore, Message,
    MessageResolver, ResolvedMessage, StringAttachment,
};
pub use recipient::{MemoryUserDirectory, Recipient, RecipientAssembler, UserId, UserLookup};
pub use render::{
    MarkdownTransform, MiniJinjaRenderer, PulldownMarkdown, RenderError, TemplateRenderer,
    TemplateScope, Variables,
};
pub use settings::{
    EmailSettings, MemorySettingsStore, PASSWORD_MASK, Protocol, SettingsProvider, SettingsStore,
    SqliteSettingsStore,
};
pub use transport::{Transport, TransportFactory, TransportPlan, TransportSelector};
