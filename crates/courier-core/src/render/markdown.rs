//! Markdown transform backed by `pulldown-cmark`.

use pulldown_cmark::{Options, Parser, html};

use super::MarkdownTransform;

/// CommonMark with tables and strikethrough.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownMarkdown;

impl MarkdownTransform for PulldownMarkdown {
    fn to_html(&self, text: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(text, options);
        let mut output = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut output, parser);
        output
    }
}
