//! Dispatch events, hooks and outcomes.

use async_trait::async_trait;
use serde::Serialize;

use crate::message::Message;
use crate::recipient::Recipient;
use crate::render::Variables;

/// What the hooks see of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    /// The resolved recipient.
    pub recipient: Recipient,
    /// The message as handed to the pipeline.
    pub message: Message,
    /// Template variables as supplied by the caller.
    pub variables: Variables,
}

/// A before-send hook's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookVerdict {
    /// Let the send go ahead.
    Proceed,
    /// Cancel the send. This is not an error.
    Cancel,
}

/// Observes sends and may veto them.
///
/// Hooks run in registration order. The first [`HookVerdict::Cancel`]
/// stops the dispatch; later hooks are not asked.
#[async_trait]
pub trait SendHook: Send + Sync {
    /// Runs before the transport is configured.
    async fn before_send(&self, _event: &DispatchEvent) -> HookVerdict {
        HookVerdict::Proceed
    }

    /// Runs after the transport accepted the message.
    async fn after_send(&self, _event: &DispatchEvent) {}
}

/// Terminal state of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchState {
    /// The transport accepted the message.
    Completed,
    /// A before-send hook cancelled the send.
    Cancelled,
    /// The dispatch failed; see the error detail.
    Failed,
}

/// Result of a dispatch that did not raise an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    /// True only when the message was delivered.
    pub success: bool,
    /// Error text for failed dispatches.
    pub error_detail: Option<String>,
    /// How the dispatch ended.
    pub state: DispatchState,
}

impl DispatchOutcome {
    /// The message was delivered.
    #[must_use]
    pub const fn completed() -> Self {
        Self {
            success: true,
            error_detail: None,
            state: DispatchState::Completed,
        }
    }

    /// A hook cancelled the send.
    #[must_use]
    pub const fn cancelled() -> Self {
        Self {
            success: false,
            error_detail: None,
            state: DispatchState::Cancelled,
        }
    }

    /// Folds an error into an outcome, for callers that report rather than
    /// propagate failures.
    #[must_use]
    pub fn from_result(result: crate::Result<Self>) -> Self {
        result.unwrap_or_else(|error| Self {
            success: false,
            error_detail: Some(error.to_string()),
            state: DispatchState::Failed,
        })
    }

    /// Returns true if a hook cancelled the send.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state == DispatchState::Cancelled
    }
}
