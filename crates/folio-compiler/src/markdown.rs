//! In-process Markdown compiler.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

use folio_book::header::split_front_matter;
use folio_book::DocumentHeader;

use crate::traits::{
    Attributes, CompileError, DocumentCompiler, DocumentMetadata, RenderedBody, SourceInput,
};

/// Renders Markdown with pulldown-cmark.
///
/// Root-relative link and image targets (`/img/a.png`) are prefixed with the `base_url`
/// attribute so pages work under a sub-path.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownCompiler {
    options: Options,
}

impl Default for MarkdownCompiler {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_HEADING_ATTRIBUTES,
        }
    }
}

impl MarkdownCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders Markdown content (front matter already removed).
    pub fn render(&self, content: &str, base_url: &str) -> String {
        let parser = Parser::new_ext(content, self.options).map(|event| match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: rebase(dest_url, base_url),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Image {
                link_type,
                dest_url: rebase(dest_url, base_url),
                title,
                id,
            }),
            other => other,
        });

        let mut out = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

impl DocumentCompiler for MarkdownCompiler {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extensions(&self) -> &[&'static str] {
        &["md", "markdown"]
    }

    fn convert(
        &self,
        input: &SourceInput,
        attrs: &Attributes,
    ) -> Result<RenderedBody, CompileError> {
        let text = input.read_text()?;
        let header = DocumentHeader::markdown(&text)?.with_fallback(attrs.option_attrs());
        let (_, content) = split_front_matter(&text)?;

        let html = self.render(content, attrs.get("base_url").unwrap_or(""));

        Ok(RenderedBody {
            html,
            metadata: DocumentMetadata::from_header(&header),
        })
    }
}

fn rebase<'a>(dest: CowStr<'a>, base_url: &str) -> CowStr<'a> {
    if base_url.is_empty() || !dest.starts_with('/') || dest.starts_with("//") {
        return dest;
    }
    if dest.starts_with(&format!("{base_url}/")) {
        return dest;
    }
    CowStr::from(format!("{base_url}{dest}"))
}
