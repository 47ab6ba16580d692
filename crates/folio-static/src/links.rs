//! Destination paths and base-URL-rooted links.
//!
//! Every link the site emits is rooted at the base URL, never relative to the page, so a page
//! three directories deep links its stylesheet exactly like the top-level page does.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use folio_book::{slash_path, Book, CompilerOption};

/// Site-relative location of the default stylesheet.
pub const STYLESHEET: &str = "theme/css/book.css";

/// Site-relative location of the default favicon.
pub const FAVICON: &str = "theme/favicon.svg";

/// Base-URL-rooted asset links handed to compilers and page shells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRoots {
    pub theme: String,
    pub stylesheet: String,
    pub stylesdir: String,
    pub imagesdir: String,
    pub favicon: String,
}

/// Maps source paths to site paths and URLs.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    base_url: String,
    src_dir: PathBuf,
    site_dir: PathBuf,
}

impl LinkResolver {
    pub fn new(book: &Book) -> Self {
        Self::with_base(&book.manifest.base_url, book.src_dir(), book.site_dir())
    }

    pub fn with_base(base_url: &str, src_dir: PathBuf, site_dir: PathBuf) -> Self {
        Self {
            base_url: normalize_base(base_url),
            src_dir,
            site_dir,
        }
    }

    /// Normalized base URL: empty, `/path`, or an absolute `scheme://` URL; never a trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    /// Link to a site-relative path.
    ///
    /// Characters that would break an HTML attribute or end the path early are
    /// percent-encoded, so links can be emitted without further escaping.
    pub fn url(&self, site_rel: &str) -> String {
        let mut url = format!("{}/", self.base_url);
        for c in site_rel.trim_start_matches('/').chars() {
            match c {
                ' ' => url.push_str("%20"),
                '"' => url.push_str("%22"),
                '#' => url.push_str("%23"),
                '%' => url.push_str("%25"),
                '&' => url.push_str("%26"),
                '\'' => url.push_str("%27"),
                '<' => url.push_str("%3C"),
                '>' => url.push_str("%3E"),
                '?' => url.push_str("%3F"),
                c => url.push(c),
            }
        }
        url
    }

    /// Site-relative output of a source document: same directories, `.html` extension.
    pub fn dest_rel(&self, src_rel: &Path) -> PathBuf {
        src_rel.with_extension("html")
    }

    /// Absolute output path of a site-relative path.
    pub fn site_path(&self, site_rel: &Path) -> PathBuf {
        self.site_dir.join(site_rel)
    }

    /// Link to the page rendered from a source document.
    pub fn page_url(&self, src_rel: &Path) -> String {
        self.url(&slash_path(&self.dest_rel(src_rel)))
    }

    pub fn assets(&self) -> AssetRoots {
        AssetRoots {
            theme: self.url("theme"),
            stylesheet: self.url(STYLESHEET),
            stylesdir: self.url("theme/css"),
            imagesdir: self.url("static/img"),
            favicon: self.url(FAVICON),
        }
    }

    /// Replaces `{base_url}`, `{src_dir}` and `{dst_dir}`.
    pub fn expand_placeholders(&self, value: &str) -> String {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"\{(base_url|src_dir|dst_dir)\}").expect("Invalid placeholder regex")
        });

        RE.replace_all(value, |caps: &Captures| match &caps[1] {
            "base_url" => self.base_url.clone(),
            "src_dir" => self.src_dir.display().to_string(),
            _ => self.site_dir.display().to_string(),
        })
        .into_owned()
    }

    /// Compiler options with placeholders expanded in every value.
    pub fn expand_options(&self, options: &[CompilerOption]) -> Vec<CompilerOption> {
        options
            .iter()
            .map(|o| CompilerOption {
                name: o.name.clone(),
                values: o.values.iter().map(|v| self.expand_placeholders(v)).collect(),
            })
            .collect()
    }
}

fn normalize_base(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() || base.contains("://") || base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{base}")
    }
}
