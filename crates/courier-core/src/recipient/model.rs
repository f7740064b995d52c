//! Recipients and user lookup.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// Identifier of a stored user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// The person a message is sent to.
///
/// Either a stored user (with an id) or a placeholder built from a bare
/// address. Placeholders are plain values and are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// User id; `None` for placeholders.
    pub id: Option<UserId>,
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Preferred locale for keyed messages.
    pub preferred_locale: Option<String>,
}

impl Recipient {
    /// Creates a placeholder recipient for `email`.
    #[must_use]
    pub fn placeholder(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Creates a stored user.
    #[must_use]
    pub fn user(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::placeholder(email)
        }
    }

    /// Sets the first and last name.
    #[must_use]
    pub fn with_name(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the preferred locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.preferred_locale = Some(locale.into());
        self
    }

    /// Returns true if this recipient is not a stored user.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }

    /// First and last name joined, if either is set.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.first_name, &self.last_name]
            .into_iter()
            .filter_map(|part| part.as_deref().map(str::trim))
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// First name, else username, else email.
    #[must_use]
    pub fn friendly_name(&self) -> &str {
        [&self.first_name, &self.username]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .find(|value| !value.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Name for the `To` header: full name, else username.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        self.full_name().or_else(|| {
            self.username
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .map(ToString::to_string)
        })
    }

    /// Template value for `user`: the set fields plus `fullName` and
    /// `friendlyName`.
    #[must_use]
    pub fn to_template_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(id) = self.id {
            object.insert("id".into(), Value::from(id.0));
        }
        object.insert("email".into(), Value::from(self.email.clone()));
        let optional = [
            ("username", &self.username),
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("preferredLocale", &self.preferred_locale),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                object.insert(key.into(), Value::from(value.clone()));
            }
        }
        if let Some(full_name) = self.full_name() {
            object.insert("fullName".into(), Value::from(full_name));
        }
        object.insert("friendlyName".into(), Value::from(self.friendly_name()));
        Value::Object(object)
    }
}

/// Finds stored users by address.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Returns the user with this email address, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    async fn find_by_email(&self, email: &str) -> Result<Option<Recipient>>;
}

/// In-memory user directory, keyed case-insensitively by email.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, Recipient>>,
}

impl MemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: Recipient) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.email.to_lowercase(), user);
    }
}

#[async_trait]
impl UserLookup for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Recipient>> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(&email.trim().to_lowercase()).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names() {
        let ann = Recipient::placeholder("ann@x.com").with_name(Some("Ann".into()), Some("Lee".into()));
        assert_eq!(ann.full_name().as_deref(), Some("Ann Lee"));
        assert_eq!(ann.friendly_name(), "Ann");
        assert_eq!(ann.display_name().as_deref(), Some("Ann Lee"));

        let bare = Recipient::placeholder("bob@x.com");
        assert_eq!(bare.full_name(), None);
        assert_eq!(bare.friendly_name(), "bob@x.com");
        assert_eq!(bare.display_name(), None);

        let login = Recipient::placeholder("c@x.com").with_username("carol");
        assert_eq!(login.friendly_name(), "carol");
        assert_eq!(login.display_name().as_deref(), Some("carol"));
    }

    #[test]
    fn test_placeholder_has_no_id() {
        assert!(Recipient::placeholder("a@x.com").is_placeholder());
        assert!(!Recipient::user(UserId(7), "a@x.com").is_placeholder());
    }

    #[test]
    fn test_template_value() {
        let ann = Recipient::user(UserId(7), "ann@x.com").with_name(Some("Ann".into()), None);
        assert_eq!(
            ann.to_template_value(),
            json!({
                "id": 7,
                "email": "ann@x.com",
                "firstName": "Ann",
                "fullName": "Ann",
                "friendlyName": "Ann",
            })
        );
    }

    #[tokio::test]
    async fn test_directory_lookup_is_case_insensitive() {
        let directory = MemoryUserDirectory::new();
        directory.insert(Recipient::user(UserId(1), "Ann@Example.com"));

        let found = directory.find_by_email("ann@example.COM").await.unwrap();
        assert_eq!(found.unwrap().id, Some(UserId(1)));
        assert!(directory.find_by_email("bob@example.com").await.unwrap().is_none());
    }
}
