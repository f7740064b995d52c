//! The dispatch pipeline, its hooks and the test-email flow.

mod event;
mod mailer;
mod test_email;

pub use event::{DispatchEvent, DispatchOutcome, DispatchState, HookVerdict, SendHook};
pub use mailer::{Mailer, MailerBuilder, RecipientRef};
pub use test_email::TestEmailReport;
