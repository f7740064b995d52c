//! High-level SMTP transport with optional connection keep-alive.

use crate::connection::{Client, Ready, connect, connect_tls};
use crate::error::{Error, Result};
use courier_mime::{Envelope, Message};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default per-operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plaintext session.
    #[default]
    None,
    /// Plaintext connect, upgraded with STARTTLS (usually port 587).
    StartTls,
    /// TLS from the start (usually port 465).
    Implicit,
}

impl Security {
    /// Returns the conventional port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Implicit => 465,
        }
    }
}

/// SMTP AUTH credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SMTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// AUTH credentials; `None` sends without authenticating.
    pub credentials: Option<Credentials>,
    /// Timeout for each connect, read and write.
    pub timeout: Duration,
    /// Keep the session open between sends.
    pub keep_alive: bool,
    /// Name announced in EHLO.
    pub hello_name: String,
}

impl SmtpConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> SmtpConfigBuilder {
        SmtpConfigBuilder::new(host)
    }
}

/// Builder for [`SmtpConfig`].
#[derive(Debug, Clone)]
pub struct SmtpConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    credentials: Option<Credentials>,
    timeout: Duration,
    keep_alive: bool,
    hello_name: String,
}

impl SmtpConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            keep_alive: false,
            hello_name: "localhost".to_string(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets AUTH credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables keep-alive.
    #[must_use]
    pub const fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the EHLO name.
    #[must_use]
    pub fn hello_name(mut self, hello_name: impl Into<String>) -> Self {
        self.hello_name = hello_name.into();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> SmtpConfig {
        SmtpConfig {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            credentials: self.credentials,
            timeout: self.timeout,
            keep_alive: self.keep_alive,
            hello_name: self.hello_name,
        }
    }
}

/// Sends messages over SMTP, optionally reusing one session.
#[derive(Debug)]
pub struct SmtpTransport {
    config: SmtpConfig,
    idle: Mutex<Option<Client<Ready>>>,
}

impl SmtpTransport {
    /// Creates a transport. No connection is made until the first send.
    #[must_use]
    pub fn new(config: SmtpConfig) -> Self {
        Self {
            config,
            idle: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Sends a composed message to every envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, authenticating or any step of the
    /// mail transaction fails.
    pub async fn send(&self, message: &Message) -> Result<()> {
        self.send_raw(&message.envelope(), &message.formatted()).await
    }

    /// Sends raw RFC 5322 data with an explicit envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, authenticating or any step of the
    /// mail transaction fails.
    pub async fn send_raw(&self, envelope: &Envelope, data: &[u8]) -> Result<()> {
        let mut idle = self.idle.lock().await;

        let client = match idle.take() {
            Some(mut client) => match client.noop().await {
                Ok(()) => client,
                Err(e) => {
                    tracing::warn!(?e, host = %self.config.host, "kept-alive SMTP session is gone, reconnecting");
                    self.open().await?
                }
            },
            None => self.open().await?,
        };

        let client = transact(client, envelope, data).await?;

        if self.config.keep_alive {
            *idle = Some(client);
        } else if let Err(e) = client.quit().await {
            // Message was already accepted
            tracing::debug!(?e, "QUIT failed");
        }
        Ok(())
    }

    /// Closes a kept-alive session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if QUIT fails.
    pub async fn close(&self) -> Result<()> {
        if let Some(client) = self.idle.lock().await.take() {
            client.quit().await?;
        }
        Ok(())
    }

    async fn open(&self) -> Result<Client<Ready>> {
        let SmtpConfig {
            host,
            port,
            security,
            timeout,
            ..
        } = &self.config;

        let stream = match security {
            Security::Implicit => connect_tls(host, *port, *timeout).await?,
            Security::StartTls | Security::None => connect(host, *port, *timeout).await?,
        };

        let client = Client::from_stream(stream)
            .await?
            .ehlo(&self.config.hello_name)
            .await?;

        let client = if *security == Security::StartTls {
            client.starttls(host).await?
        } else {
            client
        };

        match &self.config.credentials {
            Some(credentials) => {
                client
                    .authenticate(&credentials.username, credentials.password())
                    .await
            }
            None => Ok(client.without_auth()),
        }
    }
}

async fn transact(client: Client<Ready>, envelope: &Envelope, data: &[u8]) -> Result<Client<Ready>> {
    let mut recipients = envelope.recipients.iter();
    let first = recipients
        .next()
        .ok_or_else(|| Error::Protocol("No recipients specified".into()))?;

    let client = client.mail_from(envelope.from.clone()).await?;
    let mut client = client.rcpt_to(first.clone()).await?;
    for recipient in recipients {
        client = client.rcpt_to(recipient.clone()).await?;
    }

    client.data().await?.send_message(data).await
}
