//! Mailer configuration from the environment.
//!
//! Transport settings live in the settings store; this covers the
//! process-level knobs that do not belong there.

use std::path::PathBuf;

/// Comma-separated addresses that replace every real recipient.
pub const ENV_TEST_TO_EMAIL_ADDRESS: &str = "COURIER_TEST_TO_EMAIL_ADDRESS";
/// Enables dev mode (`1` or `true`).
pub const ENV_DEV_MODE: &str = "COURIER_DEV_MODE";
/// Root directory of site templates.
pub const ENV_TEMPLATES_PATH: &str = "COURIER_TEMPLATES_PATH";
/// Path of the sendmail binary.
pub const ENV_SENDMAIL_PATH: &str = "COURIER_SENDMAIL_PATH";
/// Site name exposed to templates as `siteName`.
pub const ENV_SITE_NAME: &str = "COURIER_SITE_NAME";
/// Locale used when a recipient has no preference.
pub const ENV_LOCALE: &str = "COURIER_LOCALE";
/// Name announced in SMTP EHLO.
pub const ENV_HELLO_NAME: &str = "COURIER_HELLO_NAME";

const DEFAULT_TEMPLATES_ROOT: &str = "templates";
const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail";
const DEFAULT_SITE_NAME: &str = "Courier";
const DEFAULT_LOCALE: &str = "en";
const DEFAULT_HELLO_NAME: &str = "localhost";

/// Process-level mailer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailerConfig {
    /// Root directory that site templates are loaded from.
    pub templates_root: PathBuf,
    /// When non-empty, every message goes to these addresses instead.
    pub test_recipients: Vec<String>,
    /// Dev mode; makes the POP handshake log verbosely.
    pub dev_mode: bool,
    /// Sendmail binary used by the sendmail protocol.
    pub sendmail_path: PathBuf,
    /// Injected into template variables as `siteName` unless the caller set it.
    pub site_name: String,
    /// Locale for keyed messages when the recipient has none.
    pub default_locale: String,
    /// Name announced in SMTP EHLO.
    pub hello_name: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            templates_root: PathBuf::from(DEFAULT_TEMPLATES_ROOT),
            test_recipients: Vec::new(),
            dev_mode: false,
            sendmail_path: PathBuf::from(DEFAULT_SENDMAIL_PATH),
            site_name: DEFAULT_SITE_NAME.to_string(),
            default_locale: DEFAULT_LOCALE.to_string(),
            hello_name: DEFAULT_HELLO_NAME.to_string(),
        }
    }
}

impl MailerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> MailerConfigBuilder {
        MailerConfigBuilder::default()
    }

    /// Reads the configuration from `COURIER_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for unset or blank values.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_TEST_TO_EMAIL_ADDRESS) {
            config.test_recipients = parse_address_list(&value);
        }
        if let Some(value) = get(ENV_DEV_MODE) {
            config.dev_mode = parse_flag(&value);
        }
        if let Some(value) = get(ENV_TEMPLATES_PATH) {
            config.templates_root = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_SENDMAIL_PATH) {
            config.sendmail_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_SITE_NAME) {
            config.site_name = value;
        }
        if let Some(value) = get(ENV_LOCALE) {
            config.default_locale = value;
        }
        if let Some(value) = get(ENV_HELLO_NAME) {
            config.hello_name = value.trim().to_string();
        }

        config
    }
}

/// Builder for [`MailerConfig`].
#[derive(Debug, Clone, Default)]
pub struct MailerConfigBuilder {
    config: MailerConfig,
}

impl MailerConfigBuilder {
    /// Sets the site templates root.
    #[must_use]
    pub fn templates_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.templates_root = root.into();
        self
    }

    /// Sets the test-recipient override.
    #[must_use]
    pub fn test_recipients<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.test_recipients = recipients.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables dev mode.
    #[must_use]
    pub const fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    /// Sets the sendmail binary path.
    #[must_use]
    pub fn sendmail_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.sendmail_path = path.into();
        self
    }

    /// Sets the site name.
    #[must_use]
    pub fn site_name(mut self, name: impl Into<String>) -> Self {
        self.config.site_name = name.into();
        self
    }

    /// Sets the default locale.
    #[must_use]
    pub fn default_locale(mut self, locale: impl Into<String>) -> Self {
        self.config.default_locale = locale.into();
        self
    }

    /// Sets the EHLO name.
    #[must_use]
    pub fn hello_name(mut self, name: impl Into<String>) -> Self {
        self.config.hello_name = name.into();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> MailerConfig {
        self.config
    }
}

fn parse_address_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = MailerConfig::from_lookup(|_| None);
        assert_eq!(config, MailerConfig::default());
        assert!(config.test_recipients.is_empty());
        assert_eq!(config.default_locale, "en");
    }

    #[test]
    fn test_single_test_recipient() {
        let config = MailerConfig::from_lookup(lookup(&[(ENV_TEST_TO_EMAIL_ADDRESS, "qa@example.com")]));
        assert_eq!(config.test_recipients, vec!["qa@example.com"]);
    }

    #[test]
    fn test_test_recipient_list() {
        let config = MailerConfig::from_lookup(lookup(&[(
            ENV_TEST_TO_EMAIL_ADDRESS,
            " qa@example.com, ,ops@example.com ",
        )]));
        assert_eq!(config.test_recipients, vec!["qa@example.com", "ops@example.com"]);
    }

    #[test]
    fn test_dev_mode_flag() {
        assert!(MailerConfig::from_lookup(lookup(&[(ENV_DEV_MODE, "1")])).dev_mode);
        assert!(MailerConfig::from_lookup(lookup(&[(ENV_DEV_MODE, "TRUE")])).dev_mode);
        assert!(!MailerConfig::from_lookup(lookup(&[(ENV_DEV_MODE, "0")])).dev_mode);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = MailerConfig::from_lookup(lookup(&[(ENV_SITE_NAME, "  "), (ENV_LOCALE, "de")]));
        assert_eq!(config.site_name, "Courier");
        assert_eq!(config.default_locale, "de");
    }

    #[test]
    fn test_hello_name_from_env() {
        let config = MailerConfig::from_lookup(lookup(&[(ENV_HELLO_NAME, " mail.acme.test ")]));
        assert_eq!(config.hello_name, "mail.acme.test");
        assert_eq!(MailerConfig::from_lookup(|_| None).hello_name, "localhost");
    }

    #[test]
    fn test_builder() {
        let config = MailerConfig::builder()
            .templates_root("/srv/templates")
            .test_recipients(["qa@example.com"])
            .dev_mode(true)
            .site_name("Acme")
            .build();
        assert_eq!(config.templates_root, PathBuf::from("/srv/templates"));
        assert_eq!(config.test_recipients, vec!["qa@example.com"]);
        assert!(config.dev_mode);
        assert_eq!(config.site_name, "Acme");
        assert_eq!(config.hello_name, "localhost");
    }
}
