//! The "send test email" flow used by settings screens.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::event::DispatchOutcome;
use super::mailer::{Mailer, RecipientRef};
use crate::message::keyed::TEST_EMAIL;
use crate::render::Variables;
use crate::settings::EmailSettings;

/// Result of a test send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEmailReport {
    /// True if the message was delivered.
    pub success: bool,
    /// Error text when the send failed.
    pub error: Option<String>,
    /// The settings that were tried, with the password masked.
    pub settings: EmailSettings,
}

impl Mailer {
    /// Sends the `test_email` message to `recipient` using `overrides`
    /// instead of the stored settings.
    ///
    /// The stored settings are back in effect when this returns, whatever
    /// the outcome. Errors are reported in the returned report, never
    /// raised, and the echoed settings never contain the password.
    pub async fn send_test_email(
        &self,
        overrides: EmailSettings,
        recipient: impl Into<RecipientRef>,
    ) -> TestEmailReport {
        let masked = overrides.masked();
        let mut variables = Variables::new();
        variables.insert(
            "settings".into(),
            serde_json::to_value(&masked).unwrap_or(Value::Null),
        );

        let recipient = recipient.into();
        let result = self
            .settings
            .with_temporary_settings(overrides, || {
                self.send_by_key(recipient, TEST_EMAIL, variables)
            })
            .await;
        let outcome = DispatchOutcome::from_result(result);

        if outcome.success {
            info!("Test email sent");
        } else {
            warn!(error = ?outcome.error_detail, "Test email was not sent");
        }

        TestEmailReport {
            success: outcome.success,
            error: outcome.error_detail,
            settings: masked,
        }
    }
}
