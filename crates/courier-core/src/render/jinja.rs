//! `MiniJinja` template renderer.

use std::path::{Path, PathBuf};

use minijinja::{Environment, Error, ErrorKind, path_loader};

use super::{RenderError, TemplateRenderer, TemplateScope, Variables};

/// Name of the built-in HTML layout for keyed messages.
pub const BUILTIN_EMAIL_LAYOUT: &str = "_special/email";

const BUILTIN_EMAIL_LAYOUT_SOURCE: &str = include_str!("../../templates/_special/email.html");

/// Extensions tried when a template is referenced without one.
const TEMPLATE_EXTENSIONS: [&str; 2] = ["html", "twig"];

/// Renders templates with `MiniJinja`.
///
/// Built-in templates are always resolvable. In [`TemplateScope::Site`],
/// other names are loaded from files under the root, with `.html` or
/// `.twig` appended when the bare name does not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniJinjaRenderer;

impl MiniJinjaRenderer {
    /// Creates a renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn environment(scope: &TemplateScope) -> Environment<'static> {
        let root = match scope {
            TemplateScope::Site(root) => Some(root.clone()),
            TemplateScope::ControlPanel => None,
        };

        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_loader(move |name| {
            if let Some(source) = builtin(name) {
                return Ok(Some(source.to_string()));
            }
            root.as_deref().map_or(Ok(None), |root| load_from_root(root, name))
        });
        env
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render_string(
        &self,
        template: &str,
        variables: &Variables,
        scope: &TemplateScope,
    ) -> Result<String, RenderError> {
        Self::environment(scope)
            .render_str(template, variables)
            .map_err(RenderError::from)
    }
}

impl From<Error> for RenderError {
    fn from(error: Error) -> Self {
        Self::new(error.to_string())
    }
}

fn builtin(name: &str) -> Option<&'static str> {
    let name = name.strip_suffix(".html").unwrap_or(name);
    (name == BUILTIN_EMAIL_LAYOUT).then_some(BUILTIN_EMAIL_LAYOUT_SOURCE)
}

fn load_from_root(root: &Path, name: &str) -> Result<Option<String>, Error> {
    let loader = path_loader(PathBuf::from(root));
    if let Some(source) = loader(name)? {
        return Ok(Some(source));
    }
    if Path::new(name).extension().is_some() {
        return Ok(None);
    }
    for extension in TEMPLATE_EXTENSIONS {
        if let Some(source) = loader(&format!("{name}.{extension}"))? {
            return Ok(Some(source));
        }
    }
    Err(Error::new(
        ErrorKind::TemplateNotFound,
        format!("template {name:?} not found under {}", root.display()),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: serde_json::Value) -> Variables {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_render_variables() {
        let out = MiniJinjaRenderer
            .render_string(
                "Hi {{ user.firstName }}, see {{ link }}",
                &vars(json!({"user": {"firstName": "Ann"}, "link": "http://x/y"})),
                &TemplateScope::ControlPanel,
            )
            .unwrap();
        assert_eq!(out, "Hi Ann, see http://x/y");
    }

    #[test]
    fn test_keeps_trailing_newline() {
        let out = MiniJinjaRenderer
            .render_string("<p>x</p>\n", &Variables::new(), &TemplateScope::ControlPanel)
            .unwrap();
        assert_eq!(out, "<p>x</p>\n");
    }

    #[test]
    fn test_extends_builtin_layout() {
        let template = format!(
            "{{% extends \"{BUILTIN_EMAIL_LAYOUT}\" %}}{{% block body %}}<p>Hello</p>{{% endblock %}}"
        );
        let out = MiniJinjaRenderer
            .render_string(
                &template,
                &vars(json!({"siteName": "Acme"})),
                &TemplateScope::ControlPanel,
            )
            .unwrap();
        assert!(out.contains("<title>Acme</title>"));
        assert!(out.contains("<p>Hello</p>"));
    }

    #[test]
    fn test_extends_site_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("emails")).unwrap();
        std::fs::write(
            dir.path().join("emails/layout.html"),
            "<main>{% block body %}{% endblock %}</main>",
        )
        .unwrap();

        let out = MiniJinjaRenderer
            .render_string(
                "{% extends \"emails/layout\" %}{% block body %}<p>Hi</p>{% endblock %}",
                &Variables::new(),
                &TemplateScope::Site(dir.path().to_path_buf()),
            )
            .unwrap();
        assert_eq!(out, "<main><p>Hi</p></main>");
    }

    #[test]
    fn test_missing_site_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = MiniJinjaRenderer
            .render_string(
                "{% extends \"nope\" %}",
                &Variables::new(),
                &TemplateScope::Site(dir.path().to_path_buf()),
            )
            .unwrap_err();
        assert!(err.message().contains("nope"));
    }

    #[test]
    fn test_site_templates_not_visible_in_control_panel_scope() {
        let err = MiniJinjaRenderer
            .render_string(
                "{% include \"partials/footer\" %}",
                &Variables::new(),
                &TemplateScope::ControlPanel,
            )
            .unwrap_err();
        assert!(err.message().contains("partials/footer"));
    }

    #[test]
    fn test_syntax_error() {
        let err = MiniJinjaRenderer
            .render_string("{% if %}", &Variables::new(), &TemplateScope::ControlPanel)
            .unwrap_err();
        assert!(!err.message().is_empty());
    }
}
