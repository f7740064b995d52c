//! Maps email settings to a transport plan.

use std::path::PathBuf;

use tracing::{debug, warn};

use super::{Credentials, PopOptions, Security, SendmailOptions, SmtpOptions, TransportPlan};
use crate::config::MailerConfig;
use crate::settings::{EmailSettings, Protocol, non_empty};
use crate::{Error, Result};

/// Chooses and validates the transport for a set of email settings.
///
/// Validation happens before any connection is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSelector {
    dev_mode: bool,
    sendmail_path: PathBuf,
}

impl TransportSelector {
    /// Creates a selector.
    #[must_use]
    pub fn new(dev_mode: bool, sendmail_path: impl Into<PathBuf>) -> Self {
        Self {
            dev_mode,
            sendmail_path: sendmail_path.into(),
        }
    }

    /// Creates a selector from the mailer configuration.
    #[must_use]
    pub fn from_config(config: &MailerConfig) -> Self {
        Self::new(config.dev_mode, config.sendmail_path.clone())
    }

    /// Builds the transport plan for `settings`.
    ///
    /// A blank protocol and unrecognized protocol names select native mail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the protocol is missing or the
    /// fields the protocol needs are missing.
    pub fn configure(&self, settings: &EmailSettings) -> Result<TransportPlan> {
        let Some(raw) = settings.protocol.as_deref() else {
            return Err(Error::configuration("cannot determine send method"));
        };

        let plan = match Protocol::parse(raw) {
            Protocol::Smtp | Protocol::Gmail => TransportPlan::Smtp(apply_smtp(settings)?),
            Protocol::Pop => {
                let pop = self.pop_options(settings)?;
                let smtp = apply_smtp(settings)?;
                TransportPlan::PopBeforeSmtp { pop, smtp }
            }
            Protocol::Sendmail => TransportPlan::Sendmail(SendmailOptions {
                path: self.sendmail_path.clone(),
            }),
            Protocol::NativeMail => TransportPlan::NativeMail,
            Protocol::Unknown(name) => {
                warn!(protocol = %name, "Unrecognized email protocol, using native mail");
                TransportPlan::NativeMail
            }
        };

        debug!(transport = plan.kind(), "Transport configured");
        Ok(plan)
    }

    fn pop_options(&self, settings: &EmailSettings) -> Result<PopOptions> {
        let required = || Error::configuration("host/port/username/password required");

        let host = non_empty(settings.host.as_ref()).ok_or_else(required)?;
        let port = settings.port.filter(|port| *port != 0).ok_or_else(required)?;
        let username = non_empty(settings.username.as_ref()).ok_or_else(required)?;
        let password = password(settings).ok_or_else(required)?;

        Ok(PopOptions {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: password.to_string(),
            timeout: settings.timeout(),
            debug: self.dev_mode,
        })
    }
}

/// Builds the SMTP options from `settings`.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if SMTP authentication is on without a
/// username and password, or if the host or port is missing.
pub fn apply_smtp(settings: &EmailSettings) -> Result<SmtpOptions> {
    let credentials = if settings.smtp_auth {
        match (non_empty(settings.username.as_ref()), password(settings)) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => return Err(Error::configuration("username and password required")),
        }
    } else {
        None
    };

    let security = parse_security(settings.smtp_secure_transport_type.as_deref());

    let host = non_empty(settings.host.as_ref())
        .ok_or_else(|| Error::configuration("host required"))?;
    let port = settings
        .port
        .filter(|port| *port != 0)
        .ok_or_else(|| Error::configuration("port required"))?;

    Ok(SmtpOptions {
        host: host.to_string(),
        port,
        credentials,
        keep_alive: settings.smtp_keep_alive,
        security,
        timeout: settings.timeout(),
    })
}

fn password(settings: &EmailSettings) -> Option<&str> {
    settings.password.as_deref().filter(|p| !p.is_empty())
}

/// `tls` is STARTTLS, `ssl` is implicit TLS.
fn parse_security(value: Option<&str>) -> Security {
    let value = value.map(str::trim).unwrap_or_default();
    match value.to_ascii_lowercase().as_str() {
        "" | "none" => Security::None,
        "tls" | "starttls" => Security::StartTls,
        "ssl" | "implicit" => Security::Implicit,
        _ => {
            warn!(value, "Unrecognized secure transport type, using none");
            Security::None
        }
    }
}
