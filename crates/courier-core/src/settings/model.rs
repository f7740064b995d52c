//! Persisted email settings.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Replacement shown wherever a password is echoed back.
pub const PASSWORD_MASK: &str = "••••••••";

/// Timeout applied when the settings leave it unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Email settings as stored under the `email` namespace.
///
/// Stores keep these loosely typed, so numbers and flags are accepted both
/// as JSON values and as strings (`"587"`, `"1"`).
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailSettings {
    /// Delivery protocol name, see [`Protocol`].
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Default From address.
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    /// Default From display name.
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Custom HTML layout template for keyed messages.
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Server hostname.
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Server port.
    #[serde(deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Login name for SMTP AUTH or POP.
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for SMTP AUTH or POP.
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Per-operation timeout in seconds.
    #[serde(deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Authenticate to the SMTP server.
    #[serde(deserialize_with = "lenient::flag")]
    pub smtp_auth: bool,
    /// Reuse the SMTP connection between sends.
    #[serde(deserialize_with = "lenient::flag")]
    pub smtp_keep_alive: bool,
    /// `none`, `tls` (STARTTLS) or `ssl` (implicit TLS).
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub smtp_secure_transport_type: Option<String>,
}

impl EmailSettings {
    /// Returns the configured protocol, or `None` when it is unset or blank.
    #[must_use]
    pub fn protocol(&self) -> Option<Protocol> {
        non_empty(self.protocol.as_ref()).map(Protocol::parse)
    }

    /// Returns the timeout, defaulting to ten seconds.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Returns a copy with the password replaced by [`PASSWORD_MASK`].
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if masked.password.is_some() {
            masked.password = Some(PASSWORD_MASK.to_string());
        }
        masked
    }
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("protocol", &self.protocol)
            .field("email_address", &self.email_address)
            .field("sender_name", &self.sender_name)
            .field("template", &self.template)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("smtp_auth", &self.smtp_auth)
            .field("smtp_keep_alive", &self.smtp_keep_alive)
            .field("smtp_secure_transport_type", &self.smtp_secure_transport_type)
            .finish()
    }
}

/// Returns the trimmed value if it is present and not blank.
pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Delivery protocol named by the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// SMTP relay.
    Smtp,
    /// Gmail's SMTP relay; configured exactly like SMTP.
    Gmail,
    /// POP3 login, then SMTP.
    Pop,
    /// Local sendmail binary.
    Sendmail,
    /// The local mail system.
    NativeMail,
    /// Anything else; delivered like [`Protocol::NativeMail`].
    Unknown(String),
}

impl Protocol {
    /// Parses a protocol name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "smtp" => Self::Smtp,
            "gmail" => Self::Gmail,
            "pop" | "pop3" => Self::Pop,
            "sendmail" => Self::Sendmail,
            "" | "php" | "mail" | "native" | "nativemail" => Self::NativeMail,
            _ => Self::Unknown(value.to_string()),
        }
    }
}

mod lenient {
    use serde::de::{Deserialize, Deserializer, Error};
    use serde_json::Value;

    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(D::Error::custom(format!("expected a string, got {other}"))),
        }
    }

    pub fn number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64> + std::str::FromStr,
    {
        let invalid = |v: &dyn std::fmt::Display| D::Error::custom(format!("invalid number: {v}"));
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| T::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| invalid(&n)),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid(&s)),
            Some(other) => Err(invalid(&other)),
        }
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
            Some(Value::String(s)) => Ok(matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )),
            Some(other) => Err(D::Error::custom(format!("expected a flag, got {other}"))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_stringly_values() {
        let settings: EmailSettings = serde_json::from_value(json!({
            "protocol": "smtp",
            "host": "smtp.example.com",
            "port": "587",
            "timeout": "30",
            "smtpAuth": "1",
            "smtpKeepAlive": "",
            "smtpSecureTransportType": "tls",
        }))
        .unwrap();

        assert_eq!(settings.protocol(), Some(Protocol::Smtp));
        assert_eq!(settings.port, Some(587));
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert!(settings.smtp_auth);
        assert!(!settings.smtp_keep_alive);
    }

    #[test]
    fn test_deserialize_typed_values() {
        let settings: EmailSettings = serde_json::from_value(json!({
            "port": 465,
            "smtpAuth": true,
            "smtpKeepAlive": 1,
            "username": 1234,
        }))
        .unwrap();

        assert_eq!(settings.port, Some(465));
        assert!(settings.smtp_auth);
        assert!(settings.smtp_keep_alive);
        assert_eq!(settings.username.as_deref(), Some("1234"));
    }

    #[test]
    fn test_deserialize_rejects_bad_port() {
        assert!(serde_json::from_value::<EmailSettings>(json!({"port": "abc"})).is_err());
        assert!(serde_json::from_value::<EmailSettings>(json!({"port": 70000})).is_err());
    }

    #[test]
    fn test_missing_protocol() {
        assert_eq!(EmailSettings::default().protocol(), None);
        let settings = EmailSettings {
            protocol: Some("  ".into()),
            ..EmailSettings::default()
        };
        assert_eq!(settings.protocol(), None);
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!(Protocol::parse("SMTP"), Protocol::Smtp);
        assert_eq!(Protocol::parse("Gmail"), Protocol::Gmail);
        assert_eq!(Protocol::parse("pop"), Protocol::Pop);
        assert_eq!(Protocol::parse("php"), Protocol::NativeMail);
        assert_eq!(Protocol::parse("carrier-pigeon"), Protocol::Unknown("carrier-pigeon".into()));
    }

    #[test]
    fn test_timeout_defaults() {
        assert_eq!(EmailSettings::default().timeout(), DEFAULT_TIMEOUT);
        let settings = EmailSettings {
            timeout: Some(0),
            ..EmailSettings::default()
        };
        assert_eq!(settings.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_masked_and_debug_hide_password() {
        let settings = EmailSettings {
            password: Some("secret".into()),
            ..EmailSettings::default()
        };
        assert_eq!(settings.masked().password.as_deref(), Some(PASSWORD_MASK));
        assert!(!format!("{settings:?}").contains("secret"));
        assert_eq!(EmailSettings::default().masked().password, None);
    }

    #[test]
    fn test_serialize_camel_case() {
        let settings = EmailSettings {
            email_address: Some("noreply@example.com".into()),
            smtp_auth: true,
            ..EmailSettings::default()
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["emailAddress"], "noreply@example.com");
        assert_eq!(value["smtpAuth"], true);
        assert!(value.get("password").is_none());
    }
}
