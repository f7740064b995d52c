//! Messages: the model, keyed message templates and resolution.

pub mod keyed;
mod model;
mod resolver;

pub use keyed::{DefaultMessages, KeyedMessage, KeyedMessageStore};
pub use model::{Contact, FileAttachment, Message, StringAttachment};
pub use resolver::{MessageResolver, ResolvedMessage};
