//! Transports that talk to real servers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use courier_smtp::pop::{self, PopConfig};
use courier_smtp::{SmtpConfig, SmtpTransport};
use tracing::debug;

use super::sendmail::SendmailTransport;
use super::{PopOptions, Security, SmtpOptions, Transport, TransportFactory, TransportPlan};
use crate::settings::DEFAULT_TIMEOUT;
use crate::{Error, Result};

const NATIVE_HOST: &str = "localhost";
const NATIVE_PORT: u16 = 25;

/// Keep-alive transports held at once; the least recently used goes first.
const MAX_KEPT_ALIVE: usize = 4;

/// Factory for SMTP, POP-before-SMTP, sendmail and native transports.
///
/// Keep-alive SMTP transports are cached so the session survives between
/// dispatches. There is one entry per server; when the options for a
/// server change, or the cache is full, the displaced transport is closed.
pub struct NetworkTransports {
    hello_name: String,
    kept_alive: Mutex<Vec<(SmtpOptions, Arc<SmtpTransport>)>>,
}

impl NetworkTransports {
    /// Creates a factory announcing `hello_name` in EHLO.
    #[must_use]
    pub fn new(hello_name: impl Into<String>) -> Self {
        Self {
            hello_name: hello_name.into(),
            kept_alive: Mutex::new(Vec::new()),
        }
    }

    fn smtp(&self, options: &SmtpOptions) -> Arc<SmtpTransport> {
        if !options.keep_alive {
            return Arc::new(SmtpTransport::new(self.smtp_config(options)));
        }

        let mut kept_alive = self
            .kept_alive
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = kept_alive.iter().position(|(cached, _)| cached == options) {
            // Most recently used entries live at the back
            let entry = kept_alive.remove(index);
            let transport = Arc::clone(&entry.1);
            kept_alive.push(entry);
            return transport;
        }

        let mut displaced = Vec::new();
        kept_alive.retain(|(cached, transport)| {
            let same_server = cached.host == options.host && cached.port == options.port;
            if same_server {
                displaced.push(Arc::clone(transport));
            }
            !same_server
        });
        while kept_alive.len() >= MAX_KEPT_ALIVE {
            let (_, transport) = kept_alive.remove(0);
            displaced.push(transport);
        }

        debug!(host = %options.host, port = options.port, "Caching keep-alive SMTP transport");
        let transport = Arc::new(SmtpTransport::new(self.smtp_config(options)));
        kept_alive.push((options.clone(), Arc::clone(&transport)));
        drop(kept_alive);

        for old in displaced {
            close_in_background(old);
        }
        transport
    }

    #[cfg(test)]
    fn kept_alive_len(&self) -> usize {
        self.kept_alive
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn smtp_config(&self, options: &SmtpOptions) -> SmtpConfig {
        let mut builder = SmtpConfig::builder(&options.host)
            .port(options.port)
            .security(options.security)
            .timeout(options.timeout)
            .keep_alive(options.keep_alive)
            .hello_name(&self.hello_name);
        if let Some(credentials) = &options.credentials {
            builder = builder.credentials(credentials.clone());
        }
        builder.build()
    }
}

impl TransportFactory for NetworkTransports {
    fn build(&self, plan: &TransportPlan) -> Arc<dyn Transport> {
        match plan {
            TransportPlan::Smtp(options) => Arc::new(SmtpDelivery {
                transport: self.smtp(options),
                pop: None,
            }),
            TransportPlan::PopBeforeSmtp { pop, smtp } => Arc::new(SmtpDelivery {
                transport: self.smtp(smtp),
                pop: Some(pop_config(pop)),
            }),
            TransportPlan::Sendmail(options) => Arc::new(SendmailTransport::new(&options.path)),
            TransportPlan::NativeMail => Arc::new(SmtpDelivery {
                transport: self.smtp(&native_options(DEFAULT_TIMEOUT)),
                pop: None,
            }),
        }
    }
}

/// Sends QUIT on a displaced transport's parked session.
///
/// Outside a runtime the transport is just dropped, which closes the socket.
fn close_in_background(transport: Arc<SmtpTransport>) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    runtime.spawn(async move {
        if let Err(error) = transport.close().await {
            debug!(%error, "Closing displaced SMTP session failed");
        }
    });
}

fn native_options(timeout: Duration) -> SmtpOptions {
    SmtpOptions {
        host: NATIVE_HOST.to_string(),
        port: NATIVE_PORT,
        credentials: None,
        keep_alive: false,
        security: Security::None,
        timeout,
    }
}

fn pop_config(options: &PopOptions) -> PopConfig {
    PopConfig::new(
        &options.host,
        options.port,
        &options.username,
        &options.password,
    )
    .with_timeout(options.timeout)
    .with_debug(options.debug)
}

/// SMTP delivery, optionally preceded by a POP3 login.
struct SmtpDelivery {
    transport: Arc<SmtpTransport>,
    pop: Option<PopConfig>,
}

#[async_trait]
impl Transport for SmtpDelivery {
    async fn prepare(&self) -> Result<()> {
        let Some(config) = &self.pop else {
            return Ok(());
        };
        debug!(host = %config.host, port = config.port, "POP before SMTP authorization");
        pop::authorize(config)
            .await
            .map_err(|e| Error::Delivery(format!("POP authorization failed: {e}")))
    }

    async fn deliver(&self, message: &courier_mime::Message) -> Result<()> {
        self.transport.send(message).await.map_err(Error::delivery)
    }
}
