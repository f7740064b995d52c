//! Line-oriented mail protocol stream (TCP or TLS) with per-operation timeouts.
//!
//! Shared by the SMTP client and the POP3 authorization handshake.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// Underlying transport of a [`MailStream`].
#[derive(Debug)]
enum Inner {
    Tcp(BufReader<TcpStream>),
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

/// Mail protocol stream (TCP or TLS).
#[derive(Debug)]
pub struct MailStream {
    inner: Inner,
    timeout: Duration,
}

impl MailStream {
    /// Returns true if the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.inner, Inner::Tls(_))
    }

    /// Returns the per-operation timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reads a line, without its line ending.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails, times out, or the peer closed the
    /// connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match &mut self.inner {
            Inner::Tcp(reader) => with_timeout(self.timeout, "reading", reader.read_line(&mut line)).await?,
            Inner::Tls(reader) => with_timeout(self.timeout, "reading", reader.read_line(&mut line)).await?,
        };
        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        match &mut self.inner {
            Inner::Tcp(reader) => {
                let stream = reader.get_mut();
                with_timeout(timeout, "writing", async {
                    stream.write_all(data).await?;
                    stream.flush().await
                })
                .await
            }
            Inner::Tls(reader) => {
                let stream = reader.get_mut();
                with_timeout(timeout, "writing", async {
                    stream.write_all(data).await?;
                    stream.flush().await
                })
                .await
            }
        }
    }

    /// Upgrades a TCP stream to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted or the TLS
    /// handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp_stream = match self.inner {
            Inner::Tcp(reader) => reader.into_inner(),
            Inner::Tls(_) => return Err(Error::Protocol("Already using TLS".into())),
        };
        let tls_stream = tls_handshake(hostname, tcp_stream, self.timeout).await?;
        Ok(Self {
            inner: Inner::Tls(Box::new(BufReader::new(tls_stream))),
            timeout: self.timeout,
        })
    }
}

/// Connects over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails or times out.
pub async fn connect(hostname: &str, port: u16, timeout: Duration) -> Result<MailStream> {
    let stream = tcp_connect(hostname, port, timeout).await?;
    Ok(MailStream {
        inner: Inner::Tcp(BufReader::new(stream)),
        timeout,
    })
}

/// Connects over implicit TLS (e.g. SMTPS on 465, POP3S on 995).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails or times out.
pub async fn connect_tls(hostname: &str, port: u16, timeout: Duration) -> Result<MailStream> {
    let stream = tcp_connect(hostname, port, timeout).await?;
    let tls_stream = tls_handshake(hostname, stream, timeout).await?;
    Ok(MailStream {
        inner: Inner::Tls(Box::new(BufReader::new(tls_stream))),
        timeout,
    })
}

async fn tcp_connect(hostname: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = format!("{hostname}:{port}");
    tracing::debug!(%addr, "connecting");
    with_timeout(timeout, "connecting", TcpStream::connect(&addr)).await
}

async fn tls_handshake(
    hostname: &str,
    stream: TcpStream,
    timeout: Duration,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;
    with_timeout(
        timeout,
        "negotiating TLS",
        create_tls_connector().connect(server_name, stream),
    )
    .await
}

async fn with_timeout<T, F>(timeout: Duration, action: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Timeout(timeout, action)),
    }
}

/// Creates a TLS connector with the bundled web PKI roots.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
