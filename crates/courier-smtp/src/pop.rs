//! POP3 authorization handshake for POP-before-SMTP relays.
//!
//! Some servers only relay mail for clients that logged in over POP3
//! shortly before. [`authorize`] performs `USER`/`PASS`/`QUIT` and nothing
//! else.

use crate::connection::{MailStream, connect, connect_tls};
use crate::error::{Error, Result};
use crate::transport::DEFAULT_TIMEOUT;
use std::fmt;
use std::time::Duration;

/// Port conventionally used for POP3 over implicit TLS.
const POP3S_PORT: u16 = 995;

/// POP3 login parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct PopConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub username: String,
    password: String,
    /// Timeout for each connect, read and write.
    pub timeout: Duration,
    /// Connect with implicit TLS.
    pub tls: bool,
    /// Log the exchange at debug level instead of trace.
    pub debug: bool,
}

impl PopConfig {
    /// Creates a configuration. TLS is enabled when the port is 995.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
            tls: port == POP3S_PORT,
            debug: false,
        }
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables verbose logging of the exchange.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Forces implicit TLS on or off.
    #[must_use]
    pub const fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }
}

impl fmt::Debug for PopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("tls", &self.tls)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Logs in to the POP3 server and logs out again.
///
/// # Errors
///
/// Returns an error if the connection fails or the server rejects the
/// greeting, the user name or the password.
pub async fn authorize(config: &PopConfig) -> Result<()> {
    let stream = if config.tls {
        connect_tls(&config.host, config.port, config.timeout).await?
    } else {
        connect(&config.host, config.port, config.timeout).await?
    };
    let mut session = PopSession {
        stream,
        debug: config.debug,
    };

    session.expect_ok("greeting").await?;
    session
        .command(&format!("USER {}", config.username), "USER")
        .await?;
    session
        .command(&format!("PASS {}", config.password), "PASS")
        .await?;

    if let Err(e) = session.command("QUIT", "QUIT").await {
        // Authorization already succeeded
        tracing::debug!(?e, "POP3 QUIT failed");
    }
    Ok(())
}

struct PopSession {
    stream: MailStream,
    debug: bool,
}

impl PopSession {
    async fn command(&mut self, line: &str, label: &'static str) -> Result<String> {
        self.log(label, "POP3 >");
        self.stream.write_all(format!("{line}\r\n").as_bytes()).await?;
        self.expect_ok(label).await
    }

    async fn expect_ok(&mut self, label: &'static str) -> Result<String> {
        let line = self.stream.read_line().await?;
        self.log(&line, "POP3 <");
        parse_status(&line).map_err(|e| match e {
            Error::PopError(text) => Error::PopError(format!("{label} rejected: {text}")),
            other => other,
        })
    }

    fn log(&self, text: &str, direction: &'static str) {
        if self.debug {
            tracing::debug!(text, "{direction}");
        } else {
            tracing::trace!(text, "{direction}");
        }
    }
}

/// Parses a POP3 status line into its text.
fn parse_status(line: &str) -> Result<String> {
    if let Some(rest) = line.strip_prefix("+OK") {
        Ok(rest.trim().to_string())
    } else if let Some(rest) = line.strip_prefix("-ERR") {
        Err(Error::PopError(rest.trim().to_string()))
    } else {
        Err(Error::Protocol(format!("Unexpected POP3 response: {line:?}")))
    }
}
