//! Trait definitions for document compilers.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_book::{CompilerOption, DocumentHeader, HeaderAttr, HeaderError, Syntax};
use serde::{Deserialize, Serialize};

/// A document handed to a compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    /// A document on disk
    File(PathBuf),

    /// A document synthesized in memory, such as the aggregate of all pages
    Virtual {
        /// File name used for syntax detection and diagnostics (e.g. "all.adoc")
        name: String,
        text: String,
        /// Directory relative includes are resolved against
        base_dir: PathBuf,
    },
}

impl SourceInput {
    /// Name used in logs and failure records.
    pub fn display_name(&self) -> Cow<'_, str> {
        match self {
            Self::File(path) => path.to_string_lossy(),
            Self::Virtual { name, .. } => Cow::Borrowed(name),
        }
    }

    pub fn syntax(&self) -> Option<Syntax> {
        match self {
            Self::File(path) => Syntax::from_path(path),
            Self::Virtual { name, .. } => Syntax::from_path(Path::new(name)),
        }
    }

    /// Directory the document's relative references resolve against.
    pub fn base_dir(&self) -> &Path {
        match self {
            Self::File(path) => path.parent().unwrap_or(Path::new(".")),
            Self::Virtual { base_dir, .. } => base_dir,
        }
    }

    pub fn read_text(&self) -> Result<Cow<'_, str>, CompileError> {
        match self {
            Self::File(path) => fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| CompileError::Read {
                    path: path.clone(),
                    source,
                }),
            Self::Virtual { text, .. } => Ok(Cow::Borrowed(text)),
        }
    }
}

/// Attributes passed to a compiler.
///
/// Computed attributes (base URL, asset roots, active node) come first, in insertion order. The
/// manifest's compiler options follow verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Attributes {
    computed: Vec<(String, String)>,
    options: Vec<CompilerOption>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a computed attribute, replacing an earlier value of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.computed.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.computed.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_options(mut self, options: Vec<CompilerOption>) -> Self {
        self.options = options;
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.computed
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Computed attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.computed.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn options(&self) -> &[CompilerOption] {
        &self.options
    }

    /// Attribute assignments among the compiler options (`-a` / `--attribute`).
    ///
    /// These fill metadata a document header leaves out.
    pub fn option_attrs(&self) -> Vec<HeaderAttr> {
        self.options
            .iter()
            .filter(|o| o.name == "-a" || o.name == "--attribute")
            .flat_map(|o| o.values.iter())
            .map(|v| HeaderAttr::from_assignment(v))
            .collect()
    }
}

/// Metadata extracted from a document header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub email: Option<String>,
    pub revdate: Option<String>,
}

impl DocumentMetadata {
    pub fn from_header(header: &DocumentHeader) -> Self {
        let value = |name: &str| header.value(name).map(str::to_string);
        Self {
            title: header.title.clone(),
            author: value("author"),
            email: value("email"),
            revdate: value("revdate"),
        }
    }
}

/// Output of a successful compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedBody {
    pub html: String,
    pub metadata: DocumentMetadata,
}

/// Errors that can occur while compiling one document.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Compilation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Compiler output is not valid UTF-8")]
    InvalidOutput,

    #[error("No compiler handles `{0}`")]
    Unsupported(String),

    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A compiler for one family of markup.
pub trait DocumentCompiler: Send + Sync {
    /// Compiler identifier (e.g., "asciidoctor")
    fn name(&self) -> &'static str;

    /// File extensions this compiler handles, lowercase, without the dot
    fn extensions(&self) -> &[&'static str];

    /// Render a document body.
    fn convert(&self, input: &SourceInput, attrs: &Attributes)
        -> Result<RenderedBody, CompileError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_replaces_in_place() {
        let mut attrs = Attributes::new().with("base_url", "/book").with("docname", "a");
        attrs.insert("base_url", "");

        let pairs: Vec<_> = attrs.iter().collect();
        assert_eq!(pairs, vec![("base_url", ""), ("docname", "a")]);
        assert_eq!(attrs.get("missing"), None);
    }

    #[test]
    fn option_attrs_only_reads_attribute_options() {
        let attrs = Attributes::new().with_options(vec![
            CompilerOption {
                name: "-a".to_string(),
                values: vec!["author=Ada".to_string(), "!toc".to_string()],
            },
            CompilerOption {
                name: "--safe-mode".to_string(),
                values: vec!["unsafe".to_string()],
            },
        ]);

        assert_eq!(
            attrs.option_attrs(),
            vec![HeaderAttr::set("author", "Ada"), HeaderAttr::unset("toc")]
        );
    }

    #[test]
    fn virtual_sources_detect_syntax_from_name() {
        let input = SourceInput::Virtual {
            name: "all.adoc".to_string(),
            text: "= All".to_string(),
            base_dir: PathBuf::from("/book/src"),
        };

        assert_eq!(input.syntax(), Some(Syntax::AsciiDoc));
        assert_eq!(input.base_dir(), Path::new("/book/src"));
        assert_eq!(input.read_text().unwrap(), "= All");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let input = SourceInput::File(PathBuf::from("/definitely/not/here.adoc"));

        assert!(matches!(input.read_text(), Err(CompileError::Read { .. })));
    }
}
