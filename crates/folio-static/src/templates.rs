//! Page shell rendering.

use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{path_loader, Environment};
use serde::Serialize;

use crate::links::AssetRoots;
use crate::sidebar::SidebarView;

/// Everything a page shell sees.
#[derive(Debug, Clone, Serialize)]
pub struct ShellContext<'a> {
    /// Page title
    pub title: &'a str,
    /// Book title
    pub book_title: &'a str,
    pub author: Option<&'a str>,
    pub email: Option<&'a str>,
    pub revdate: Option<&'a str>,
    /// Section number of the page, e.g. "2.1"
    pub number: Option<&'a str>,
    pub base_url: &'a str,
    /// Rendered document body
    pub body: &'a str,
    pub sidebar: SidebarView<'a>,
    pub assets: &'a AssetRoots,
    pub use_default_theme: bool,
}

/// Errors that can occur while rendering a page shell.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Failed to read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Merges a rendered body into a complete HTML page.
pub trait PageShell: Send + Sync {
    fn render_shell(&self, ctx: &ShellContext<'_>) -> Result<String, ShellError>;
}

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Directory under the source root holding template overrides.
    pub const OVERRIDE_DIR: &'static str = "theme/templates";

    /// Create a new template engine with the built-in templates.
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_template_owned("page.html".to_string(), PAGE_TEMPLATE.to_string())
            .expect("Failed to add page template");

        env.add_template_owned("sidebar.html".to_string(), SIDEBAR_TEMPLATE.to_string())
            .expect("Failed to add sidebar template");

        Self { env }
    }

    /// Built-in templates, overridden by `page.html` / `sidebar.html` in `dir`.
    ///
    /// Other templates the overrides include are loaded from `dir` on demand.
    pub fn from_dir(dir: &Path) -> Result<Self, ShellError> {
        let mut engine = Self::new();
        if !dir.is_dir() {
            return Ok(engine);
        }

        for name in ["page.html", "sidebar.html"] {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let source =
                fs::read_to_string(&path).map_err(|source| ShellError::Read { path, source })?;
            engine.env.add_template_owned(name.to_string(), source)?;
            tracing::info!("Using template override {}", name);
        }

        engine.env.set_loader(path_loader(dir));
        Ok(engine)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PageShell for TemplateEngine {
    fn render_shell(&self, ctx: &ShellContext<'_>) -> Result<String, ShellError> {
        let tmpl = self.env.get_template("page.html")?;
        Ok(tmpl.render(ctx)?)
    }
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  {% if author %}<meta name="author" content="{{ author }}">
  {% endif %}<title>{% if title != book_title %}{{ title }} - {% endif %}{{ book_title }}</title>
  {% if use_default_theme %}<link rel="stylesheet" href="{{ assets.stylesheet | safe }}">
  <link rel="icon" type="image/svg+xml" href="{{ assets.favicon | safe }}">
  {% endif %}
</head>
<body>
  <div class="layout">
    <nav class="sidebar">
      <div class="sidebar-header">
        <a href="{{ base_url }}/" class="book-title">{{ book_title }}</a>
      </div>
      {% include "sidebar.html" %}
    </nav>
    <main class="main">
      <article class="doc">
        {{ body | safe }}
      </article>
      {% if author or revdate %}
      <footer class="doc-meta">
        {% if author %}<span class="author">{{ author }}</span>{% endif %}
        {% if revdate %}<span class="revdate">{{ revdate }}</span>{% endif %}
      </footer>
      {% endif %}
    </main>
  </div>
</body>
</html>"##;

const SIDEBAR_TEMPLATE: &str = r##"<ul class="toc">
{%- for item in sidebar.items recursive %}
  <li class="toc-item depth-{{ item.depth }}{% if item.active %} active{% endif %}">
    {%- if item.children %}
    <details{% if item.open %} open{% endif %}>
      <summary>
        <span class="number">{{ item.label }}</span>
        {% if item.url %}<a href="{{ item.url | safe }}"{% if item.active %} aria-current="page"{% endif %}>{{ item.title }}</a>{% else %}<span class="title">{{ item.title }}</span>{% endif %}
      </summary>
      <ul>{{ loop(item.children) }}</ul>
    </details>
    {%- else %}
    <span class="number">{{ item.label }}</span>
    {% if item.url %}<a href="{{ item.url | safe }}"{% if item.active %} aria-current="page"{% endif %}>{{ item.title }}</a>{% else %}<span class="title">{{ item.title }}</span>{% endif %}
    {%- endif %}
  </li>
{%- endfor %}
</ul>"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::LinkResolver;
    use crate::sidebar::Sidebar;
    use tempfile::tempdir;

    fn render(engine: &TemplateEngine, title: &str, body: &str) -> String {
        let links = LinkResolver::with_base("/book", PathBuf::from("src"), PathBuf::from("site"));
        let assets = links.assets();
        let sidebar = Sidebar::default();

        let ctx = ShellContext {
            title,
            book_title: "My Book",
            author: Some("Ada"),
            email: None,
            revdate: Some("2024-01-02"),
            number: None,
            base_url: links.base_url(),
            body,
            sidebar: sidebar.view(None),
            assets: &assets,
            use_default_theme: true,
        };

        engine.render_shell(&ctx).unwrap()
    }

    #[test]
    fn renders_basic_page() {
        let html = render(&TemplateEngine::new(), "Setup", "<p>Hello world</p>");

        assert!(html.contains("<title>Setup - My Book</title>"));
        assert!(html.contains("<p>Hello world</p>"));
        assert!(html.contains(r#"href="/book/theme/css/book.css""#));
        assert!(html.contains(r#"<span class="author">Ada</span>"#));
        assert!(html.contains("2024-01-02"));
    }

    #[test]
    fn escapes_titles() {
        let html = render(&TemplateEngine::new(), "A <b> & C", "");

        assert!(html.contains("A &lt;b&gt; &amp; C"));
    }

    #[test]
    fn loads_overrides_from_directory() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("page.html"),
            r#"{% include "header.html" %}<main>{{ body | safe }}</main>"#,
        )
        .unwrap();
        fs::write(temp.path().join("header.html"), "<h1>{{ book_title }}</h1>").unwrap();

        let engine = TemplateEngine::from_dir(temp.path()).unwrap();
        let html = render(&engine, "Setup", "<p>Body</p>");

        assert_eq!(html, "<h1>My Book</h1><main><p>Body</p></main>");
    }

    #[test]
    fn missing_override_directory_uses_builtins() {
        let engine = TemplateEngine::from_dir(Path::new("/nonexistent/templates")).unwrap();
        let html = render(&engine, "Setup", "");

        assert!(html.starts_with("<!DOCTYPE html>"));
    }
}
