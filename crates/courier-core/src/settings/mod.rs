//! Email settings: model, persistence and the memoizing provider.

mod model;
mod provider;
mod store;

pub(crate) use model::non_empty;
pub use model::{DEFAULT_TIMEOUT, EmailSettings, PASSWORD_MASK, Protocol};
pub use provider::{EMAIL_NAMESPACE, SettingsProvider};
pub use store::{MemorySettingsStore, SettingsStore, SqliteSettingsStore};
