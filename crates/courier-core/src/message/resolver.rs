//! Turns keyed or explicit requests into messages ready to render.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::keyed::KeyedMessageStore;
use super::model::Message;
use crate::render::{BUILTIN_EMAIL_LAYOUT, MarkdownTransform, TemplateScope};
use crate::settings::{EmailSettings, non_empty};
use crate::{Error, Result};

/// A message together with the template root it renders against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMessage {
    /// The message.
    pub message: Message,
    /// Root for `{% extends %}` and includes in the message templates.
    pub scope: TemplateScope,
}

/// Resolves keyed messages into full messages.
pub struct MessageResolver {
    store: Arc<dyn KeyedMessageStore>,
    markdown: Arc<dyn MarkdownTransform>,
    templates_root: PathBuf,
}

impl MessageResolver {
    /// Creates a resolver. `templates_root` holds the custom HTML layout
    /// named by the settings.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyedMessageStore>,
        markdown: Arc<dyn MarkdownTransform>,
        templates_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            markdown,
            templates_root: templates_root.into(),
        }
    }

    /// Looks up `key` for `locale` and wraps its Markdown-rendered body in
    /// the HTML layout.
    ///
    /// The layout is the `template` setting, resolved under the site
    /// templates root, or the built-in layout when none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMessageKey`] if the store has no such key.
    pub fn resolve_by_key(
        &self,
        locale: &str,
        key: &str,
        settings: &EmailSettings,
    ) -> Result<ResolvedMessage> {
        let keyed = self
            .store
            .get_message(key, locale)
            .ok_or_else(|| Error::UnknownMessageKey(key.to_string()))?;

        let (layout, scope) = match non_empty(settings.template.as_ref()) {
            Some(template) => (
                template.to_string(),
                TemplateScope::Site(self.templates_root.clone()),
            ),
            None => (
                BUILTIN_EMAIL_LAYOUT.to_string(),
                TemplateScope::ControlPanel,
            ),
        };
        debug!(key, locale, layout = %layout, "Resolved keyed message");

        let html_body = wrap_in_layout(&layout, &self.markdown.to_html(&keyed.body));
        let message = Message::new(keyed.subject, keyed.body).html_body(html_body);

        Ok(ResolvedMessage { message, scope })
    }

    /// Returns an explicit message unchanged.
    #[must_use]
    pub fn resolve_explicit(&self, message: Message) -> Message {
        message
    }
}

fn wrap_in_layout(layout: &str, html: &str) -> String {
    let layout = layout.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{{% extends \"{layout}\" %}}{{% block body %}}{html}{{% endblock %}}")
}
