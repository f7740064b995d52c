//! Memoized access to the email settings, with scoped overrides.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::model::EmailSettings;
use super::store::{MemorySettingsStore, SettingsStore};
use crate::Result;

/// Namespace the email settings are stored under.
pub const EMAIL_NAMESPACE: &str = "email";

type Cache = Option<Arc<EmailSettings>>;

/// Overrides active in the current task, keyed by provider id.
type Overrides = Vec<(u64, Arc<EmailSettings>)>;

tokio::task_local! {
    static OVERRIDES: Overrides;
}

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// Loads the email settings once and hands out the cached copy.
///
/// [`with_temporary_settings`](Self::with_temporary_settings) overrides the
/// settings for one future only. Other tasks, and other futures polled by
/// the same task, keep seeing the cached settings.
pub struct SettingsProvider {
    id: u64,
    store: Arc<dyn SettingsStore>,
    cache: RwLock<Cache>,
}

impl SettingsProvider {
    /// Creates a provider reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            id: NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed),
            store,
            cache: RwLock::new(None),
        }
    }

    /// Creates a provider over an in-memory store holding `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized.
    pub fn from_settings(settings: &EmailSettings) -> Result<Self> {
        let value = serde_json::to_value(settings)?;
        Ok(Self::new(Arc::new(MemorySettingsStore::with(
            EMAIL_NAMESPACE,
            value,
        ))))
    }

    /// Returns the settings, loading them from the store on first use.
    ///
    /// Inside [`with_temporary_settings`](Self::with_temporary_settings)
    /// this returns the overrides instead. A missing namespace yields empty
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the stored value is malformed.
    pub async fn settings(&self) -> Result<Arc<EmailSettings>> {
        if let Some(overridden) = self.active_override() {
            return Ok(overridden);
        }
        if let Some(cached) = self.read_cache() {
            return Ok(cached);
        }

        let loaded = match self.store.load(EMAIL_NAMESPACE).await? {
            Some(value) => serde_json::from_value(value)?,
            None => {
                debug!("No stored email settings, using defaults");
                EmailSettings::default()
            }
        };

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.get_or_insert_with(|| Arc::new(loaded))))
    }

    /// Persists `settings` and drops the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store fails.
    pub async fn save(&self, settings: &EmailSettings) -> Result<()> {
        let value = serde_json::to_value(settings)?;
        self.store.save(EMAIL_NAMESPACE, &value).await?;
        self.invalidate();
        Ok(())
    }

    /// Drops the cached settings so the next read reloads them.
    pub fn invalidate(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Runs `f` with `overrides` in place of the stored settings.
    ///
    /// Only reads made while polling the future returned by `f` see the
    /// overrides. The shared cache is never touched, so concurrent sends,
    /// saves and invalidations are unaffected and nothing needs restoring
    /// when `f` fails, panics or is dropped.
    pub async fn with_temporary_settings<F, Fut, T>(&self, overrides: EmailSettings, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut active = OVERRIDES.try_with(Clone::clone).unwrap_or_default();
        active.retain(|(id, _)| *id != self.id);
        active.push((self.id, Arc::new(overrides)));

        debug!("Temporary email settings in effect");
        OVERRIDES.scope(active, f()).await
    }

    fn active_override(&self) -> Cache {
        OVERRIDES
            .try_with(|active| {
                active
                    .iter()
                    .find(|(id, _)| *id == self.id)
                    .map(|(_, settings)| Arc::clone(settings))
            })
            .ok()
            .flatten()
    }

    fn read_cache(&self) -> Cache {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl SettingsStore for CountingStore {
        async fn load(&self, _namespace: &str) -> Result<Option<Value>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Some(json!({"protocol": "smtp", "host": "stored.example.com"})))
        }

        async fn save(&self, _namespace: &str, _value: &Value) -> Result<()> {
            Ok(())
        }
    }

    fn overrides() -> EmailSettings {
        EmailSettings {
            host: Some("smtp.test".into()),
            password: Some("secret".into()),
            ..EmailSettings::default()
        }
    }

    #[tokio::test]
    async fn test_settings_loaded_once() {
        let store = Arc::new(CountingStore::default());
        let provider = SettingsProvider::new(store.clone());

        let first = provider.settings().await.unwrap();
        let second = provider.settings().await.unwrap();

        assert_eq!(first.host.as_deref(), Some("stored.example.com"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);

        provider.invalidate();
        provider.settings().await.unwrap();
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_namespace_yields_defaults() {
        let provider = SettingsProvider::new(Arc::new(MemorySettingsStore::new()));
        assert_eq!(*provider.settings().await.unwrap(), EmailSettings::default());
    }

    #[tokio::test]
    async fn test_temporary_settings_restored_after_success() {
        let provider = SettingsProvider::new(Arc::new(CountingStore::default()));
        let original = provider.settings().await.unwrap();

        let seen = provider
            .with_temporary_settings(overrides(), || async {
                provider.settings().await.unwrap().host.clone()
            })
            .await;

        assert_eq!(seen.as_deref(), Some("smtp.test"));
        assert!(Arc::ptr_eq(&provider.settings().await.unwrap(), &original));
    }

    #[tokio::test]
    async fn test_temporary_settings_restored_after_error() {
        let provider = SettingsProvider::new(Arc::new(CountingStore::default()));

        let result: std::result::Result<(), &str> = provider
            .with_temporary_settings(overrides(), || async { Err("boom") })
            .await;

        assert!(result.is_err());
        let restored = provider.settings().await.unwrap();
        assert_eq!(restored.host.as_deref(), Some("stored.example.com"));
    }

    #[tokio::test]
    async fn test_temporary_settings_restored_when_dropped() {
        let provider = SettingsProvider::new(Arc::new(CountingStore::default()));

        {
            let pending = provider.with_temporary_settings(overrides(), || async {
                std::future::pending::<()>().await;
            });
            let timed_out =
                tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
            assert!(timed_out.is_err());
        }

        let restored = provider.settings().await.unwrap();
        assert_eq!(restored.host.as_deref(), Some("stored.example.com"));
    }

    #[tokio::test]
    async fn test_temporary_settings_before_first_load() {
        let store = Arc::new(CountingStore::default());
        let provider = SettingsProvider::new(store.clone());

        provider
            .with_temporary_settings(overrides(), || async {})
            .await;

        assert_eq!(store.loads.load(Ordering::SeqCst), 0);
        let loaded = provider.settings().await.unwrap();
        assert_eq!(loaded.host.as_deref(), Some("stored.example.com"));
    }

    #[tokio::test]
    async fn test_concurrent_reader_sees_stored_settings() {
        let provider = SettingsProvider::new(Arc::new(CountingStore::default()));
        let entered = tokio::sync::Notify::new();
        let release = tokio::sync::Notify::new();

        let overridden = provider.with_temporary_settings(overrides(), || async {
            entered.notify_one();
            release.notified().await;
            provider.settings().await.unwrap().host.clone()
        });
        let reader = async {
            entered.notified().await;
            let host = provider.settings().await.unwrap().host.clone();
            release.notify_one();
            host
        };

        let (inside, outside) = tokio::join!(overridden, reader);
        assert_eq!(inside.as_deref(), Some("smtp.test"));
        assert_eq!(outside.as_deref(), Some("stored.example.com"));
    }

    #[tokio::test]
    async fn test_spawned_task_sees_stored_settings() {
        let provider = Arc::new(SettingsProvider::new(Arc::new(CountingStore::default())));

        let seen = provider
            .with_temporary_settings(overrides(), || {
                let provider = Arc::clone(&provider);
                async move {
                    tokio::spawn(async move { provider.settings().await.unwrap().host.clone() })
                        .await
                        .unwrap()
                }
            })
            .await;

        assert_eq!(seen.as_deref(), Some("stored.example.com"));
    }

    #[tokio::test]
    async fn test_override_is_per_provider() {
        let first = SettingsProvider::new(Arc::new(CountingStore::default()));
        let second = SettingsProvider::new(Arc::new(CountingStore::default()));

        let (first_host, second_host) = first
            .with_temporary_settings(overrides(), || async {
                (
                    first.settings().await.unwrap().host.clone(),
                    second.settings().await.unwrap().host.clone(),
                )
            })
            .await;

        assert_eq!(first_host.as_deref(), Some("smtp.test"));
        assert_eq!(second_host.as_deref(), Some("stored.example.com"));
    }

    #[tokio::test]
    async fn test_save_during_override_survives() {
        let stored = EmailSettings {
            host: Some("old.example.com".into()),
            ..EmailSettings::default()
        };
        let provider = SettingsProvider::from_settings(&stored).unwrap();
        provider.settings().await.unwrap();

        let saved = EmailSettings {
            host: Some("new.example.com".into()),
            ..EmailSettings::default()
        };
        provider
            .with_temporary_settings(overrides(), || async {
                provider.save(&saved).await.unwrap();
                assert_eq!(
                    provider.settings().await.unwrap().host.as_deref(),
                    Some("smtp.test")
                );
            })
            .await;

        let after = provider.settings().await.unwrap();
        assert_eq!(after.host.as_deref(), Some("new.example.com"));
    }

    #[tokio::test]
    async fn test_save_invalidates_cache() {
        let provider = SettingsProvider::new(Arc::new(MemorySettingsStore::new()));
        assert_eq!(provider.settings().await.unwrap().host, None);

        provider.save(&overrides()).await.unwrap();

        let reloaded = provider.settings().await.unwrap();
        assert_eq!(reloaded.host.as_deref(), Some("smtp.test"));
        assert_eq!(reloaded.password.as_deref(), Some("secret"));
    }
}
