//! Template rendering and the Markdown transform.

mod jinja;
mod markdown;

use std::path::PathBuf;

use serde_json::{Map, Value};

pub use jinja::{BUILTIN_EMAIL_LAYOUT, MiniJinjaRenderer};
pub use markdown::PulldownMarkdown;

/// Template variables.
pub type Variables = Map<String, Value>;

/// Template root that includes and `{% extends %}` resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateScope {
    /// Site templates under the given root.
    Site(PathBuf),
    /// Only the built-in templates.
    ControlPanel,
}

/// A template failed to parse or render.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Template error: {message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    /// Creates a render error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Renders template source strings.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template` with `variables`, resolving referenced templates
    /// in `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed templates or failed lookups.
    fn render_string(
        &self,
        template: &str,
        variables: &Variables,
        scope: &TemplateScope,
    ) -> Result<String, RenderError>;
}

/// Converts Markdown to HTML.
pub trait MarkdownTransform: Send + Sync {
    /// Returns the HTML rendering of `text`.
    fn to_html(&self, text: &str) -> String;
}
