//! Transport plans and the seam delivery goes through.
//!
//! [`TransportSelector`] turns settings into a [`TransportPlan`]; a
//! [`TransportFactory`] turns the plan into something that can deliver.
//! [`NetworkTransports`] is the real factory; tests swap in their own.

mod network;
mod selector;
mod sendmail;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use courier_smtp::{Credentials, Security};
pub use network::NetworkTransports;
pub use selector::{TransportSelector, apply_smtp};
pub use sendmail::SendmailTransport;

use crate::Result;

/// SMTP connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpOptions {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// AUTH credentials, when SMTP authentication is on.
    pub credentials: Option<Credentials>,
    /// Reuse the connection between sends.
    pub keep_alive: bool,
    /// Connection security.
    pub security: Security,
    /// Per-operation timeout.
    pub timeout: Duration,
}

/// POP3 login performed before an SMTP send.
#[derive(Clone, PartialEq, Eq)]
pub struct PopOptions {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Per-operation timeout.
    pub timeout: Duration,
    /// Log the exchange verbosely.
    pub debug: bool,
}

impl fmt::Debug for PopOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Local sendmail binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendmailOptions {
    /// Path of the binary.
    pub path: PathBuf,
}

/// How a message will be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportPlan {
    /// SMTP relay (also Gmail).
    Smtp(SmtpOptions),
    /// POP3 login, then SMTP.
    PopBeforeSmtp {
        /// POP3 login.
        pop: PopOptions,
        /// SMTP relay used after the login.
        smtp: SmtpOptions,
    },
    /// Local sendmail binary.
    Sendmail(SendmailOptions),
    /// Local mail system: unauthenticated SMTP to `localhost:25`.
    NativeMail,
}

impl TransportPlan {
    /// Short name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::PopBeforeSmtp { .. } => "pop-before-smtp",
            Self::Sendmail(_) => "sendmail",
            Self::NativeMail => "native",
        }
    }
}

/// Hands composed messages off for delivery.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Pre-flight run once per dispatch before the message is assembled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`](crate::Error::Delivery) if the pre-flight
    /// is rejected.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Delivers `message` to every envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`](crate::Error::Delivery) on failure.
    async fn deliver(&self, message: &courier_mime::Message) -> Result<()>;
}

/// Builds transports from plans.
pub trait TransportFactory: Send + Sync {
    /// Returns a transport carrying out `plan`.
    fn build(&self, plan: &TransportPlan) -> Arc<dyn Transport>;
}
