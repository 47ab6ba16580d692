//! The `book.toml` manifest.
//!
//! A folio project has this layout:
//!
//! ```text
//! .
//! ├── book.toml  # manifest, marks the book root
//! ├── site       # generated pages
//! └── src        # source documents
//! ```
//!
//! Every path in the manifest is relative: `includes`, `converts`, `[order]` and `[titles]` are
//! relative to the source directory, `copies.from` to the book root and `copies.to` to the site
//! directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name of the manifest at the book root.
pub const MANIFEST_FILE: &str = "book.toml";

/// Source directory holding theme files such as template overrides. Never part of the tree.
pub const THEME_DIR: &str = "theme";

/// Errors that can occur while locating or loading the manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("No book.toml found in {} or any parent directory", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse book.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid path in `{field}`: {path} (paths must be relative and stay inside the book)")]
    InvalidPath { field: &'static str, path: String },
}

/// What to do with directory entries that an `[order]` list does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlistedPolicy {
    /// Append them, sorted, after the listed entries and warn.
    #[default]
    Append,
    /// Refuse to build.
    Error,
}

/// An explicit file or directory copy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CopyPair {
    /// Relative to the book root
    pub from: PathBuf,
    /// Relative to the site directory
    pub to: PathBuf,
}

/// A compiler option passed through to the markup compiler.
///
/// `values` empty means a bare flag; otherwise the option is repeated once per value
/// (`-a linkcss -a sectnums`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompilerOption {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Deserialized `book.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BookManifest {
    /// Title of the book
    pub title: String,

    /// Authors of the book
    #[serde(default)]
    pub authors: Vec<String>,

    /// Prefix of every site link. Empty means links are rooted at `/`.
    #[serde(default)]
    pub base_url: String,

    /// Source directory
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,

    /// Destination directory of the generated site
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,

    /// Sidebar sections shallower than this depth start expanded. `None` expands everything.
    #[serde(default)]
    pub fold_level: Option<usize>,

    /// Write the built-in theme into the site directory
    #[serde(default = "default_true")]
    pub use_default_theme: bool,

    /// Generate `all.html` out of every navigable document
    #[serde(default)]
    pub generate_all: bool,

    /// Stop dispatching conversions after the first failure
    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub unlisted: UnlistedPolicy,

    /// Number of conversion workers. Defaults to the available parallelism.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Per-document limit for the external compiler
    #[serde(default)]
    pub compile_timeout_secs: Option<u64>,

    /// Files or directories copied verbatim from the source directory to the site
    #[serde(default)]
    pub includes: Vec<PathBuf>,

    /// Documents rendered to HTML but kept out of the sidebar (typically `404.adoc`)
    #[serde(default)]
    pub converts: Vec<PathBuf>,

    #[serde(default)]
    pub copies: Vec<CopyPair>,

    /// Explicit entry order per directory; `""` is the source root
    #[serde(default)]
    pub order: BTreeMap<String, Vec<String>>,

    /// Sidebar title overrides keyed by source-relative path
    #[serde(default)]
    pub titles: BTreeMap<String, String>,

    #[serde(default)]
    pub compiler_options: Vec<CompilerOption>,
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_site_dir() -> PathBuf {
    PathBuf::from("site")
}

fn default_true() -> bool {
    true
}

impl BookManifest {
    /// Parse and validate a manifest.
    pub fn from_toml_str(source: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(source)?;
        manifest.validate()
    }

    /// Read and validate a manifest file.
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let source = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Normalizes every path and rejects the ones escaping the book.
    fn validate(mut self) -> Result<Self, ManifestError> {
        self.base_url = self.base_url.trim_end_matches('/').to_string();

        self.src_dir = normalize_field("src_dir", &self.src_dir)?;
        // Builds empty the site directory, so it may never hold the sources.
        self.site_dir = non_empty_field("site_dir", &self.site_dir)?;
        if self.src_dir.starts_with(&self.site_dir) {
            return Err(ManifestError::InvalidPath {
                field: "site_dir",
                path: self.site_dir.display().to_string(),
            });
        }

        self.includes = self
            .includes
            .iter()
            .map(|p| non_empty_field("includes", p))
            .collect::<Result<_, _>>()?;
        self.converts = self
            .converts
            .iter()
            .map(|p| non_empty_field("converts", p))
            .collect::<Result<_, _>>()?;

        for pair in &mut self.copies {
            pair.from = non_empty_field("copies", &pair.from)?;
            pair.to = non_empty_field("copies", &pair.to)?;
        }

        let mut order = BTreeMap::new();
        for (dir, entries) in std::mem::take(&mut self.order) {
            let key = slash_path(&normalize_field("order", Path::new(&dir))?);
            if let Some(bad) = entries
                .iter()
                .find(|e| e.is_empty() || e.contains(['/', '\\']) || *e == "." || *e == "..")
            {
                return Err(ManifestError::InvalidPath {
                    field: "order",
                    path: format!("{dir}: {bad}"),
                });
            }
            order.insert(key, entries);
        }
        self.order = order;

        let mut titles = BTreeMap::new();
        for (path, title) in std::mem::take(&mut self.titles) {
            let key = slash_path(&non_empty_field("titles", Path::new(&path))?);
            titles.insert(key, title);
        }
        self.titles = titles;

        Ok(self)
    }

    /// Explicit entry order for a source-relative directory.
    pub fn order_for(&self, dir: &Path) -> Option<&[String]> {
        self.order.get(&slash_path(dir)).map(Vec::as_slice)
    }

    /// Non-empty title override for a source-relative path.
    pub fn title_for(&self, path: &Path) -> Option<&str> {
        self.titles
            .get(&slash_path(path))
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }
}

/// A manifest together with the directory it was found in.
#[derive(Debug, Clone)]
pub struct Book {
    /// Directory containing `book.toml`
    pub root: PathBuf,
    pub manifest: BookManifest,
}

impl Book {
    pub fn new(root: impl Into<PathBuf>, manifest: BookManifest) -> Self {
        Self {
            root: root.into(),
            manifest,
        }
    }

    /// Walks up from `dir` until a `book.toml` is found and loads it.
    pub fn locate(dir: &Path) -> Result<Self, ManifestError> {
        let dir = dir.canonicalize().map_err(|source| ManifestError::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        if !dir.is_dir() {
            return Err(ManifestError::NotADirectory(dir));
        }

        let manifest_path = dir
            .ancestors()
            .map(|d| d.join(MANIFEST_FILE))
            .find(|p| p.is_file())
            .ok_or_else(|| ManifestError::NotFound(dir.clone()))?;
        tracing::debug!("Found manifest at {}", manifest_path.display());

        let manifest = BookManifest::read(&manifest_path)?;
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(dir);

        Ok(Self::new(root, manifest))
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(&self.manifest.src_dir)
    }

    pub fn site_dir(&self) -> PathBuf {
        self.root.join(&self.manifest.site_dir)
    }

    pub fn theme_dir(&self) -> PathBuf {
        self.src_dir().join(THEME_DIR)
    }
}

/// Strips `.` components; `None` for absolute paths or `..`.
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Renders a relative path with `/` separators regardless of platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_field(field: &'static str, path: &Path) -> Result<PathBuf, ManifestError> {
    normalize_relative(path).ok_or_else(|| ManifestError::InvalidPath {
        field,
        path: path.display().to_string(),
    })
}

fn non_empty_field(field: &'static str, path: &Path) -> Result<PathBuf, ManifestError> {
    let normalized = normalize_field(field, path)?;
    if normalized.as_os_str().is_empty() {
        return Err(ManifestError::InvalidPath {
            field,
            path: path.display().to_string(),
        });
    }
    Ok(normalized)
}
