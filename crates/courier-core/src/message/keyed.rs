//! Localized messages identified by a key.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Key of the account activation email.
pub const ACCOUNT_ACTIVATION: &str = "account_activation";
/// Key of the email sent to confirm a changed address.
pub const VERIFY_NEW_EMAIL: &str = "verify_new_email";
/// Key of the password reset email.
pub const FORGOT_PASSWORD: &str = "forgot_password";
/// Key of the settings test email.
pub const TEST_EMAIL: &str = "test_email";

/// Locale every lookup eventually falls back to.
pub const FALLBACK_LOCALE: &str = "en";

/// Subject and body templates of a keyed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedMessage {
    /// Subject template.
    pub subject: String,
    /// Plain body template, also the Markdown source of the HTML part.
    pub body: String,
}

impl KeyedMessage {
    /// Creates a keyed message.
    #[must_use]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Source of keyed message templates.
pub trait KeyedMessageStore: Send + Sync {
    /// Returns the message for `key` in `locale`, or `None` if the key is
    /// unknown.
    fn get_message(&self, key: &str, locale: &str) -> Option<KeyedMessage>;
}

/// Built-in English messages plus registered extensions.
///
/// Lookups try the exact locale, then its language (`de` for `de-CH`),
/// then English.
#[derive(Debug)]
pub struct DefaultMessages {
    messages: RwLock<HashMap<String, HashMap<String, KeyedMessage>>>,
}

impl Default for DefaultMessages {
    fn default() -> Self {
        let store = Self {
            messages: RwLock::new(HashMap::new()),
        };
        store.register(
            ACCOUNT_ACTIVATION,
            FALLBACK_LOCALE,
            "Activate your account",
            "Hey {{ user.friendlyName }},\n\n\
             Thanks for creating an account with {{ siteName }}! \
             To activate your account, click the following link:\n\n\
             {{ link }}\n\n\
             If you were not expecting this email, just ignore it.",
        );
        store.register(
            VERIFY_NEW_EMAIL,
            FALLBACK_LOCALE,
            "Verify your new email address",
            "Hey {{ user.friendlyName }},\n\n\
             Please verify your new email address by clicking on the following link:\n\n\
             {{ link }}\n\n\
             If you were not expecting this email, just ignore it.",
        );
        store.register(
            FORGOT_PASSWORD,
            FALLBACK_LOCALE,
            "Reset your password",
            "Hey {{ user.friendlyName }},\n\n\
             To reset your {{ siteName }} password, click on this link:\n\n\
             {{ link }}\n\n\
             If you were not expecting this email, just ignore it.",
        );
        store.register(
            TEST_EMAIL,
            FALLBACK_LOCALE,
            "This is a test email from {{ siteName }}",
            "Congratulations! {{ siteName }} was successfully able to send an email.\n\n\
             Here are the settings you used:\n\n\
             {% for key, value in settings|items %}{{ key }}: {{ value }}\n{% endfor %}",
        );
        store
    }
}

impl DefaultMessages {
    /// Creates a store with the built-in messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the message for `key` in `locale`.
    pub fn register(
        &self,
        key: impl Into<String>,
        locale: &str,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.into())
            .or_default()
            .insert(normalize_locale(locale), KeyedMessage::new(subject, body));
    }
}

impl KeyedMessageStore for DefaultMessages {
    fn get_message(&self, key: &str, locale: &str) -> Option<KeyedMessage> {
        let messages = self.messages.read().unwrap_or_else(PoisonError::into_inner);
        let translations = messages.get(key)?;

        let locale = normalize_locale(locale);
        let language = locale.split('-').next().unwrap_or_default();

        [locale.as_str(), language, FALLBACK_LOCALE]
            .into_iter()
            .find_map(|candidate| translations.get(candidate))
            .or_else(|| translations.values().next())
            .cloned()
    }
}

fn normalize_locale(locale: &str) -> String {
    locale.trim().replace('_', "-").to_ascii_lowercase()
}
