//! The dispatch pipeline.

use std::sync::Arc;

use courier_mime::MessageBuilder;
use serde_json::Value;
use tracing::{debug, info};

use super::event::{DispatchEvent, DispatchOutcome, HookVerdict, SendHook};
use crate::config::MailerConfig;
use crate::message::{DefaultMessages, KeyedMessageStore, Message, MessageResolver};
use crate::recipient::{MemoryUserDirectory, Recipient, RecipientAssembler, UserLookup};
use crate::render::{
    MarkdownTransform, MiniJinjaRenderer, PulldownMarkdown, TemplateRenderer, TemplateScope,
    Variables,
};
use crate::settings::{EmailSettings, SettingsProvider, non_empty};
use crate::transport::{NetworkTransports, TransportFactory, TransportSelector};
use crate::{Error, Result};

/// Who a keyed message goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientRef {
    /// An already resolved recipient.
    User(Recipient),
    /// A bare address, looked up in the user directory.
    Email(String),
}

impl From<Recipient> for RecipientRef {
    fn from(recipient: Recipient) -> Self {
        Self::User(recipient)
    }
}

impl From<&str> for RecipientRef {
    fn from(email: &str) -> Self {
        Self::Email(email.to_string())
    }
}

impl From<String> for RecipientRef {
    fn from(email: String) -> Self {
        Self::Email(email)
    }
}

/// Sends transactional email.
///
/// Every send follows the same pipeline: load settings, ask the
/// before-send hooks, configure the transport, address the message,
/// render it, deliver it, then notify the after-send hooks.
pub struct Mailer {
    pub(super) config: MailerConfig,
    pub(super) settings: Arc<SettingsProvider>,
    users: Arc<dyn UserLookup>,
    resolver: MessageResolver,
    renderer: Arc<dyn TemplateRenderer>,
    markdown: Arc<dyn MarkdownTransform>,
    selector: TransportSelector,
    assembler: RecipientAssembler,
    transports: Arc<dyn TransportFactory>,
    hooks: Vec<Arc<dyn SendHook>>,
}

impl Mailer {
    /// Creates a builder around a settings provider.
    #[must_use]
    pub fn builder(settings: Arc<SettingsProvider>) -> MailerBuilder {
        MailerBuilder::new(settings)
    }

    /// Returns the settings provider.
    #[must_use]
    pub fn settings(&self) -> &SettingsProvider {
        &self.settings
    }

    /// Returns the mailer configuration.
    #[must_use]
    pub const fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// Sends `message` to `recipient`, rendering against the site templates.
    ///
    /// Returns a non-success outcome without error when a hook cancels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for missing or invalid settings,
    /// [`Error::Render`] for template failures and [`Error::Delivery`] when
    /// the transport fails.
    pub async fn send(
        &self,
        recipient: &Recipient,
        message: &Message,
        variables: Variables,
    ) -> Result<DispatchOutcome> {
        let scope = TemplateScope::Site(self.config.templates_root.clone());
        self.dispatch(recipient, message, variables, &scope).await
    }

    /// Sends an explicit message to its `to_email`.
    ///
    /// The recipient is the user with that address, or a placeholder built
    /// from the message's to-fields.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send). User lookup failures are returned as is.
    pub async fn send_email(&self, message: &Message, variables: Variables) -> Result<DispatchOutcome> {
        let message = self.resolver.resolve_explicit(message.clone());
        let email = message.to_email.clone().unwrap_or_default();
        let recipient = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => Recipient::placeholder(email)
                .with_name(message.to_first_name.clone(), message.to_last_name.clone()),
        };
        self.send(&recipient, &message, variables).await
    }

    /// Sends the keyed message `key` to `recipient` in their locale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMessageKey`] for unregistered keys; otherwise
    /// see [`send`](Self::send).
    pub async fn send_by_key(
        &self,
        recipient: impl Into<RecipientRef>,
        key: &str,
        variables: Variables,
    ) -> Result<DispatchOutcome> {
        let recipient = match recipient.into() {
            RecipientRef::User(recipient) => recipient,
            RecipientRef::Email(email) => self
                .users
                .find_by_email(&email)
                .await?
                .unwrap_or_else(|| Recipient::placeholder(email)),
        };

        let settings = self.settings.settings().await?;
        let locale = recipient
            .preferred_locale
            .as_deref()
            .filter(|locale| !locale.trim().is_empty())
            .unwrap_or(&self.config.default_locale);
        let resolved = self.resolver.resolve_by_key(locale, key, &settings)?;

        let message = resolved
            .message
            .to(recipient.email.clone())
            .to_name(recipient.first_name.clone(), recipient.last_name.clone());
        self.dispatch(&recipient, &message, variables, &resolved.scope)
            .await
    }

    async fn dispatch(
        &self,
        recipient: &Recipient,
        message: &Message,
        variables: Variables,
        scope: &TemplateScope,
    ) -> Result<DispatchOutcome> {
        let settings = self.settings.settings().await?;
        if settings.protocol().is_none() {
            return Err(Error::configuration("cannot determine send method"));
        }
        debug!(to = %recipient.email, "Settings loaded");

        let event = DispatchEvent {
            recipient: recipient.clone(),
            message: message.clone(),
            variables,
        };
        for hook in &self.hooks {
            if hook.before_send(&event).await == HookVerdict::Cancel {
                info!(to = %recipient.email, "Email cancelled by before-send hook");
                return Ok(DispatchOutcome::cancelled());
            }
        }

        let mut builder = MessageBuilder::new();
        if let Some(reply_to) = non_empty(message.reply_to.as_ref()) {
            builder = builder.reply_to(reply_to);
        }
        let (from_email, from_name) = sender_identity(message, &settings)?;
        builder = builder.from(from_email, from_name);

        let plan = self.selector.configure(&settings)?;
        let transport = self.transports.build(&plan);
        transport.prepare().await?;

        builder = self.assembler.assemble(builder, recipient, message);

        let mut variables = event.variables.clone();
        variables.insert("user".into(), recipient.to_template_value());
        if !variables.contains_key("siteName") {
            variables.insert("siteName".into(), Value::from(self.config.site_name.clone()));
        }

        let render = |template: &str| self.renderer.render_string(template, &variables, scope);
        let subject = render(&message.subject)?;
        let html = match message.explicit_html_body() {
            Some(html) => render(html)?,
            None => render(&self.markdown.to_html(&message.body))?,
        };
        let text = render(&message.body)?;
        debug!(subject = %subject, "Email rendered");

        let composed = builder
            .subject(subject)
            .text_body(text)
            .html_body(html)
            .build()
            .map_err(Error::delivery)?;
        transport.deliver(&composed).await?;
        info!(to = %recipient.email, transport = plan.kind(), "Email sent");

        for hook in &self.hooks {
            hook.after_send(&event).await;
        }
        Ok(DispatchOutcome::completed())
    }
}

/// From address and name: the message's own, else the settings'.
fn sender_identity(message: &Message, settings: &EmailSettings) -> Result<(String, Option<String>)> {
    if let Some(email) = non_empty(message.from_email.as_ref()) {
        return Ok((email.to_string(), message.from_name.clone()));
    }
    let email = non_empty(settings.email_address.as_ref())
        .ok_or_else(|| Error::configuration("from address required"))?;
    Ok((
        email.to_string(),
        non_empty(settings.sender_name.as_ref()).map(ToString::to_string),
    ))
}

/// Builder for [`Mailer`].
pub struct MailerBuilder {
    settings: Arc<SettingsProvider>,
    config: MailerConfig,
    users: Option<Arc<dyn UserLookup>>,
    messages: Option<Arc<dyn KeyedMessageStore>>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    markdown: Option<Arc<dyn MarkdownTransform>>,
    transports: Option<Arc<dyn TransportFactory>>,
    hooks: Vec<Arc<dyn SendHook>>,
}

impl MailerBuilder {
    /// Creates a builder with default collaborators.
    #[must_use]
    pub fn new(settings: Arc<SettingsProvider>) -> Self {
        Self {
            settings,
            config: MailerConfig::default(),
            users: None,
            messages: None,
            renderer: None,
            markdown: None,
            transports: None,
            hooks: Vec::new(),
        }
    }

    /// Sets the mailer configuration.
    #[must_use]
    pub fn config(mut self, config: MailerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the user directory.
    #[must_use]
    pub fn users(mut self, users: Arc<dyn UserLookup>) -> Self {
        self.users = Some(users);
        self
    }

    /// Sets the keyed message store.
    #[must_use]
    pub fn messages(mut self, messages: Arc<dyn KeyedMessageStore>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Sets the template renderer.
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the Markdown transform.
    #[must_use]
    pub fn markdown(mut self, markdown: Arc<dyn MarkdownTransform>) -> Self {
        self.markdown = Some(markdown);
        self
    }

    /// Sets the transport factory.
    #[must_use]
    pub fn transports(mut self, transports: Arc<dyn TransportFactory>) -> Self {
        self.transports = Some(transports);
        self
    }

    /// Registers a hook. Hooks run in registration order.
    #[must_use]
    pub fn hook(mut self, hook: Arc<dyn SendHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Builds the mailer.
    #[must_use]
    pub fn build(self) -> Mailer {
        let config = self.config;
        let markdown = self
            .markdown
            .unwrap_or_else(|| Arc::new(PulldownMarkdown));
        let messages = self
            .messages
            .unwrap_or_else(|| Arc::new(DefaultMessages::new()));
        let transports = self
            .transports
            .unwrap_or_else(|| Arc::new(NetworkTransports::new(config.hello_name.clone())));

        Mailer {
            users: self
                .users
                .unwrap_or_else(|| Arc::new(MemoryUserDirectory::new())),
            resolver: MessageResolver::new(messages, Arc::clone(&markdown), config.templates_root.clone()),
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(MiniJinjaRenderer::new())),
            markdown,
            selector: TransportSelector::from_config(&config),
            assembler: RecipientAssembler::new(config.test_recipients.clone()),
            transports,
            hooks: self.hooks,
            settings: self.settings,
            config,
        }
    }
}
