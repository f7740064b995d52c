//! Type-state SMTP client.

use super::{MailStream, ServerInfo};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use courier_mime::Address;
use std::marker::PhantomData;

/// Type-state marker: greeted, EHLO/STARTTLS/AUTH allowed.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: session set up, ready for mail transactions.
#[derive(Debug)]
pub struct Ready;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: MailStream,
    server_info: ServerInfo,
    hello_name: String,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server
    /// does not answer 220.
    pub async fn from_stream(mut stream: MailStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(greeting.into_error());
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: Vec::new(),
            },
            hello_name: String::from("localhost"),
            _state: PhantomData,
        })
    }

    /// Sends EHLO and discovers server capabilities, falling back to HELO
    /// when the server does not speak ESMTP.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings are rejected.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        self.hello_name = client_hostname.to_string();
        let reply = self
            .send_command(&Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        if reply.is_success() {
            // First line echoes the server name, the rest are extensions
            self.server_info.extensions = reply
                .message
                .iter()
                .skip(1)
                .map(String::as_str)
                .map(Extension::parse)
                .collect();
            return Ok(self);
        }

        tracing::debug!(code = %reply.code, "EHLO rejected, trying HELO");
        self.expect(
            &Command::Helo {
                hostname: client_hostname.to_string(),
            },
            ReplyCode::is_success,
        )
        .await?;
        self.server_info.extensions.clear();
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS and greets again.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub async fn starttls(mut self, server_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }
        self.expect(&Command::StartTls, ReplyCode::is_success).await?;

        self.stream = self.stream.upgrade_to_tls(server_hostname).await?;
        let hello_name = self.hello_name.clone();
        self.ehlo(&hello_name).await
    }

    /// Authenticates with the best mechanism the server advertises.
    ///
    /// PLAIN is preferred; LOGIN is used when it is the only one offered.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn authenticate(self, username: &str, password: &str) -> Result<Client<Ready>> {
        let mechanisms = self.server_info.auth_mechanisms();
        let login_only = !mechanisms.contains(&AuthMechanism::Plain)
            && mechanisms.contains(&AuthMechanism::Login);
        if login_only {
            self.auth_login(username, password).await
        } else {
            self.auth_plain(username, password).await
        }
    }

    /// Authenticates using the PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(mut self, username: &str, password: &str) -> Result<Client<Ready>> {
        let credentials = format!("\0{username}\0{password}");
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(credentials.as_bytes())),
        };
        self.expect(&cmd, |code| code == ReplyCode::AUTH_SUCCEEDED).await?;
        Ok(self.transition())
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_login(mut self, username: &str, password: &str) -> Result<Client<Ready>> {
        let is_continue = |code: ReplyCode| code == ReplyCode::AUTH_CONTINUE;
        self.expect(
            &Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            },
            is_continue,
        )
        .await?;
        self.expect(&Command::AuthResponse(STANDARD.encode(username)), is_continue)
            .await?;
        self.expect(&Command::AuthResponse(STANDARD.encode(password)), |code| {
            code == ReplyCode::AUTH_SUCCEEDED
        })
        .await?;
        Ok(self.transition())
    }

    /// Skips authentication for servers that relay without it.
    #[must_use]
    pub fn without_auth(self) -> Client<Ready> {
        self.transition()
    }
}

impl Client<Ready> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<MailTransaction>> {
        let eight_bit = self.server_info.supports_8bitmime();
        self.expect(&Command::MailFrom { from, eight_bit }, ReplyCode::is_success)
            .await?;
        Ok(self.transition())
    }

    /// Checks that the connection is still usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer NOOP with 250.
    pub async fn noop(&mut self) -> Result<()> {
        self.expect(&Command::Noop, ReplyCode::is_success).await?;
        Ok(())
    }
}

impl Client<MailTransaction> {
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        self.expect(&Command::RcptTo { to }, ReplyCode::is_success).await?;
        Ok(self.transition())
    }

    /// Aborts the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<Ready>> {
        self.expect(&Command::Rset, ReplyCode::is_success).await?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.expect(&Command::RcptTo { to }, ReplyCode::is_success).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer DATA with 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        self.expect(&Command::Data, |code| code == ReplyCode::START_DATA)
            .await?;
        Ok(self.transition())
    }

    /// Aborts the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<Ready>> {
        self.expect(&Command::Rset, ReplyCode::is_success).await?;
        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed and the terminating `.` line is added.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Ready>> {
        let mut payload = Vec::with_capacity(message.len() + 64);
        let body = message
            .strip_suffix(b"\r\n")
            .or_else(|| message.strip_suffix(b"\n"))
            .unwrap_or(message);
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                payload.push(b'.');
            }
            payload.extend_from_slice(line);
            payload.extend_from_slice(b"\r\n");
        }
        payload.extend_from_slice(b".\r\n");
        self.stream.write_all(&payload).await?;

        let reply = read_reply(&mut self.stream).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        tracing::debug!(bytes = payload.len(), "message accepted");
        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        tracing::trace!(command = cmd.verb(), "SMTP >");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        tracing::trace!(code = %reply.code, "SMTP <");
        Ok(reply)
    }

    async fn expect(&mut self, cmd: &Command, accept: impl Fn(ReplyCode) -> bool) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        if accept(reply.code) {
            Ok(reply)
        } else {
            Err(reply.into_error())
        }
    }

    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            hello_name: self.hello_name,
            _state: PhantomData,
        }
    }

    /// Returns true if the session runs over TLS.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        self.expect(&Command::Quit, ReplyCode::is_success).await?;
        Ok(())
    }
}

async fn read_reply(stream: &mut MailStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}
