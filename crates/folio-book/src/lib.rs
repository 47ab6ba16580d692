//! Book model for folio.
//!
//! Loads the `book.toml` manifest, discovers the source documents and arranges them into an
//! ordered, numbered navigation tree.

pub mod header;
pub mod manifest;
pub mod numbering;
pub mod tree;

pub use header::{DocumentHeader, Frontmatter, HeaderAttr, HeaderError, Syntax};
pub use manifest::{
    slash_path, Book, BookManifest, CompilerOption, CopyPair, ManifestError, UnlistedPolicy,
    MANIFEST_FILE, THEME_DIR,
};
pub use numbering::{NumberPath, Numbering};
pub use tree::{
    slugify, BookLayout, BookTree, NodeId, NodeKind, StructuralWarning, TocNode, TreeBuilder,
    TreeError,
};
