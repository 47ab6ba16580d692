//! Navigation tree discovery.
//!
//! The source directory is walked recursively. Documents become leaves, directories become
//! sections, and a directory's `index.<ext>` document becomes the section's own page. Entries
//! are ordered documents-first, each group lexicographically, unless the manifest's `[order]`
//! table lists the directory.
//!
//! Symlinked directories are followed unless they lead back to a directory already being
//! scanned. The theme directory holds templates, not documents, and is skipped.
//!
//! The recursive walk produces transient drafts that are flattened into [`BookTree`], an arena
//! of nodes stored in preorder and addressed by [`NodeId`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::header::{DocumentHeader, Syntax};
use crate::manifest::{slash_path, Book, CopyPair, UnlistedPolicy};

/// Index of a node in a [`BookTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Document or section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    /// A directory; `index` is its `index.<ext>` document, if any
    Section { index: Option<PathBuf> },
}

/// A node of the navigation tree.
#[derive(Debug, Clone)]
pub struct TocNode {
    /// Source-relative path of the document or directory
    pub path: PathBuf,
    pub title: String,
    /// Slug of the title, unique among siblings
    pub id: String,
    pub kind: NodeKind,
    /// Top-level nodes have depth 0
    pub depth: usize,
    pub sibling_index: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TocNode {
    /// The document rendered for this node, if it has one.
    pub fn page(&self) -> Option<&Path> {
        match &self.kind {
            NodeKind::Document => Some(&self.path),
            NodeKind::Section { index } => index.as_deref(),
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self.kind, NodeKind::Section { .. })
    }
}

/// Non-fatal problems found while building the tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralWarning {
    #[error("Directory has no documents and was left out of the sidebar: {}", .0.display())]
    EmptyBranch(PathBuf),

    #[error("Entries of `{}` missing from [order] were appended: {}", .dir.display(), .entries.join(", "))]
    UnlistedEntries { dir: PathBuf, entries: Vec<String> },

    #[error("[order] of `{}` lists `{entry}`, which is not a document or directory", .dir.display())]
    MissingEntry { dir: PathBuf, entry: String },

    #[error("Duplicate sidebar id `{id}` renamed for {}", .path.display())]
    DuplicateId { path: PathBuf, id: String },

    #[error("Unable to read title of {}: {message}", .path.display())]
    UnreadableTitle { path: PathBuf, message: String },

    #[error("Directory links back to one of its parents and was skipped: {}", .0.display())]
    DirectoryLoop(PathBuf),
}

/// Fatal tree errors, reported before any conversion starts.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("Manifest conflict: `{}` is claimed by both `{first}` and `{second}`", .path.display())]
    ManifestConflict {
        path: PathBuf,
        first: &'static str,
        second: &'static str,
    },

    #[error("Entries of `{}` are missing from [order]: {}", .dir.display(), .entries.join(", "))]
    Unlisted { dir: PathBuf, entries: Vec<String> },

    #[error("Source directory not found: {}", .0.display())]
    MissingSourceDir(PathBuf),

    #[error("Failed to read directory {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to resolve {}: {source}", .path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Arena of navigation nodes in preorder.
#[derive(Debug, Clone, Default)]
pub struct BookTree {
    nodes: Vec<TocNode>,
    roots: Vec<NodeId>,
    by_path: HashMap<PathBuf, NodeId>,
}

impl BookTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &TocNode {
        &self.nodes[id.0]
    }

    /// Top-level nodes in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Every node in preorder.
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TocNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Nodes that render a page, with the page's source path, in preorder.
    pub fn pages(&self) -> impl Iterator<Item = (NodeId, &Path)> {
        self.iter().filter_map(|(id, n)| n.page().map(|p| (id, p)))
    }

    /// Looks up a node by its own path or by its section index document.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// Exclusive end of the preorder range holding `id` and its descendants.
    pub fn subtree_end(&self, id: NodeId) -> usize {
        let mut last = id;
        while let Some(&child) = self.nodes[last.0].children.last() {
            last = child;
        }
        last.0 + 1
    }

    fn from_drafts(drafts: Vec<Draft>) -> (Self, Vec<StructuralWarning>) {
        let mut tree = Self::default();
        let mut warnings = Vec::new();
        tree.roots = tree.push_level(drafts, None, 0, &mut warnings);
        (tree, warnings)
    }

    fn push_level(
        &mut self,
        drafts: Vec<Draft>,
        parent: Option<NodeId>,
        depth: usize,
        warnings: &mut Vec<StructuralWarning>,
    ) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(drafts.len());

        for (sibling_index, draft) in drafts.into_iter().enumerate() {
            let base = slugify(&draft.title);
            let base = if base.is_empty() {
                "untitled".to_string()
            } else {
                base
            };

            let mut slug = base.clone();
            let mut n = 1;
            while !seen.insert(slug.clone()) {
                n += 1;
                slug = format!("{base}-{n}");
            }
            if n > 1 {
                warnings.push(StructuralWarning::DuplicateId {
                    path: draft.path.clone(),
                    id: base,
                });
            }

            let id = NodeId(self.nodes.len());
            self.by_path.insert(draft.path.clone(), id);
            if let NodeKind::Section { index: Some(index) } = &draft.kind {
                self.by_path.insert(index.clone(), id);
            }

            self.nodes.push(TocNode {
                path: draft.path,
                title: draft.title,
                id: slug,
                kind: draft.kind,
                depth,
                sibling_index,
                parent,
                children: Vec::new(),
            });

            let children = self.push_level(draft.children, Some(id), depth + 1, warnings);
            self.nodes[id.0].children = children;
            ids.push(id);
        }

        ids
    }
}

/// Navigation tree plus the manifest's classified paths.
///
/// `includes`, `converts` and the tree's document paths are pairwise disjoint.
#[derive(Debug, Clone)]
pub struct BookLayout {
    pub tree: BookTree,
    pub includes: Vec<PathBuf>,
    pub converts: Vec<PathBuf>,
    pub copies: Vec<CopyPair>,
    pub warnings: Vec<StructuralWarning>,
}

/// Tree node before flattening.
#[derive(Debug)]
struct Draft {
    path: PathBuf,
    title: String,
    kind: NodeKind,
    children: Vec<Draft>,
}

/// A directory entry considered for the tree.
#[derive(Debug)]
struct Entry {
    name: String,
    rel: PathBuf,
    is_dir: bool,
}

/// Builds a [`BookLayout`] from a book's source directory.
pub struct TreeBuilder<'a> {
    book: &'a Book,
    extensions: Vec<String>,
    src_dir: PathBuf,
    site_dir: PathBuf,
    theme_dir: PathBuf,
    /// Canonical directories on the path currently being scanned
    visiting: Vec<PathBuf>,
    warnings: Vec<StructuralWarning>,
}

impl<'a> TreeBuilder<'a> {
    /// `extensions` decides which files are documents.
    pub fn new(book: &'a Book, extensions: &[&str]) -> Self {
        Self {
            book,
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            src_dir: book.src_dir(),
            site_dir: book.site_dir(),
            theme_dir: book.theme_dir(),
            visiting: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn build(mut self) -> Result<BookLayout, TreeError> {
        self.check_classifications()?;

        if !self.src_dir.is_dir() {
            return Err(TreeError::MissingSourceDir(self.src_dir.clone()));
        }

        let root = self.canonical(Path::new(""))?;
        self.visiting.push(root);
        let (drafts, _) = self.scan_dir(Path::new(""), true)?;
        let (tree, id_warnings) = BookTree::from_drafts(drafts);
        for warning in id_warnings {
            self.warn(warning);
        }
        tracing::debug!("Discovered {} navigation nodes", tree.len());

        let manifest = &self.book.manifest;
        Ok(BookLayout {
            tree,
            includes: manifest.includes.clone(),
            converts: manifest.converts.clone(),
            copies: manifest.copies.clone(),
            warnings: self.warnings,
        })
    }

    /// Fails on paths claimed by more than one classification.
    fn check_classifications(&self) -> Result<(), TreeError> {
        let manifest = &self.book.manifest;

        let mut seen = HashSet::new();
        for path in &manifest.converts {
            if !seen.insert(path) {
                return Err(conflict(path, "converts", "converts"));
            }
            if manifest.includes.iter().any(|i| path.starts_with(i)) {
                return Err(conflict(path, "includes", "converts"));
            }
        }

        for (dir, entries) in &manifest.order {
            let dir = Path::new(dir);
            if let Some(claimant) = self.claimed_by(dir) {
                return Err(conflict(dir, claimant, "order"));
            }
            for entry in entries {
                let path = dir.join(entry);
                if let Some(claimant) = self.claimed_by(&path) {
                    return Err(conflict(&path, claimant, "order"));
                }
            }
        }

        Ok(())
    }

    fn claimed_by(&self, rel: &Path) -> Option<&'static str> {
        let manifest = &self.book.manifest;
        if rel.as_os_str().is_empty() {
            return None;
        }
        if manifest.converts.iter().any(|c| c == rel) {
            return Some("converts");
        }
        if manifest.includes.iter().any(|i| rel.starts_with(i)) {
            return Some("includes");
        }
        None
    }

    /// Returns the drafts of a directory's children and its index document.
    fn scan_dir(
        &mut self,
        rel_dir: &Path,
        is_root: bool,
    ) -> Result<(Vec<Draft>, Option<PathBuf>), TreeError> {
        let mut entries = self.list_entries(rel_dir)?;

        let index = if is_root {
            None
        } else {
            entries
                .iter()
                .position(|e| !e.is_dir && is_index(&e.rel))
                .map(|i| entries.remove(i))
        };

        let entries = self.order_entries(rel_dir, entries, index.as_ref())?;

        let mut drafts = Vec::with_capacity(entries.len());
        for entry in entries {
            if !entry.is_dir {
                let title = self.document_title(&entry.rel);
                drafts.push(Draft {
                    path: entry.rel,
                    title,
                    kind: NodeKind::Document,
                    children: Vec::new(),
                });
                continue;
            }

            let real = self.canonical(&entry.rel)?;
            if self.visiting.contains(&real) {
                self.warn(StructuralWarning::DirectoryLoop(entry.rel));
                continue;
            }
            self.visiting.push(real);
            let scanned = self.scan_dir(&entry.rel, false);
            self.visiting.pop();

            let (children, index) = scanned?;
            if children.is_empty() && index.is_none() {
                self.warn(StructuralWarning::EmptyBranch(entry.rel));
                continue;
            }

            let book = self.book;
            let title = match (book.manifest.title_for(&entry.rel), &index) {
                (Some(title), _) => title.to_string(),
                (None, Some(index)) => self.document_title(index),
                (None, None) => entry.name.clone(),
            };

            drafts.push(Draft {
                path: entry.rel,
                title,
                kind: NodeKind::Section { index },
                children,
            });
        }

        Ok((drafts, index.map(|e| e.rel)))
    }

    /// Candidate entries of a directory: documents first, then directories, each sorted.
    fn list_entries(&self, rel_dir: &Path) -> Result<Vec<Entry>, TreeError> {
        let dir = self.src_dir.join(rel_dir);
        let mut entries = Vec::new();

        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| TreeError::Walk {
                path: dir.clone(),
                source,
            })?;

            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            let rel = rel_dir.join(&name);
            if self.claimed_by(&rel).is_some()
                || entry.path() == self.site_dir
                || entry.path() == self.theme_dir
            {
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            if !is_dir && !self.is_document(&rel) {
                continue;
            }

            entries.push(Entry { name, rel, is_dir });
        }

        entries.sort_by_key(|e| e.is_dir);
        Ok(entries)
    }

    /// Applies the `[order]` list of a directory, if any.
    fn order_entries(
        &mut self,
        rel_dir: &Path,
        entries: Vec<Entry>,
        index: Option<&Entry>,
    ) -> Result<Vec<Entry>, TreeError> {
        let book = self.book;
        let manifest = &book.manifest;
        let Some(listed) = manifest.order_for(rel_dir) else {
            return Ok(entries);
        };

        let mut remaining = entries;
        let mut ordered = Vec::with_capacity(remaining.len());
        let mut missing = Vec::new();

        for name in listed {
            if index.is_some_and(|i| &i.name == name) {
                continue;
            }
            match remaining.iter().position(|e| &e.name == name) {
                Some(i) => ordered.push(remaining.remove(i)),
                None => missing.push(name.clone()),
            }
        }

        let unlisted: Vec<String> = remaining.iter().map(|e| e.name.clone()).collect();
        let policy = manifest.unlisted;

        for entry in missing {
            self.warn(StructuralWarning::MissingEntry {
                dir: rel_dir.to_path_buf(),
                entry,
            });
        }

        if !unlisted.is_empty() {
            if policy == UnlistedPolicy::Error {
                return Err(TreeError::Unlisted {
                    dir: rel_dir.to_path_buf(),
                    entries: unlisted,
                });
            }
            self.warn(StructuralWarning::UnlistedEntries {
                dir: rel_dir.to_path_buf(),
                entries: unlisted,
            });
            ordered.extend(remaining);
        }

        Ok(ordered)
    }

    /// Title override, then the document's own title, then its file stem.
    fn document_title(&mut self, rel: &Path) -> String {
        let book = self.book;
        if let Some(title) = book.manifest.title_for(rel) {
            return title.to_string();
        }

        let from_header = match Syntax::from_path(rel) {
            Some(syntax) => match DocumentHeader::read(&self.src_dir.join(rel), syntax) {
                Ok(header) => header.title,
                Err(e) => {
                    self.warn(StructuralWarning::UnreadableTitle {
                        path: rel.to_path_buf(),
                        message: e.to_string(),
                    });
                    None
                }
            },
            None => None,
        };

        from_header.unwrap_or_else(|| {
            rel.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| slash_path(rel))
        })
    }

    fn canonical(&self, rel: &Path) -> Result<PathBuf, TreeError> {
        let path = self.src_dir.join(rel);
        fs::canonicalize(&path).map_err(|source| TreeError::Resolve { path, source })
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    fn warn(&mut self, warning: StructuralWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

fn is_index(path: &Path) -> bool {
    path.file_stem().is_some_and(|s| s == "index")
}

fn conflict(path: &Path, first: &'static str, second: &'static str) -> TreeError {
    TreeError::ManifestConflict {
        path: path.to_path_buf(),
        first,
        second,
    }
}

/// Lowercase, alphanumeric words joined by `-`.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BookManifest;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const EXTS: &[&str] = &["adoc", "md"];

    fn touch(temp: &TempDir, rel: &str, content: &str) {
        let path = temp.path().join("src").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn book(temp: &TempDir, extra: &str) -> Book {
        let manifest = BookManifest::from_toml_str(&format!("title = \"T\"\n{extra}")).unwrap();
        Book::new(temp.path(), manifest)
    }

    fn titles(layout: &BookLayout) -> Vec<(usize, String)> {
        layout
            .tree
            .iter()
            .map(|(_, n)| (n.depth, n.title.clone()))
            .collect()
    }

    fn chapter_book() -> TempDir {
        let temp = tempdir().unwrap();
        touch(&temp, "intro.adoc", "Plain text.\n");
        touch(&temp, "ch1/a.adoc", "");
        touch(&temp, "ch1/b.adoc", "");
        temp
    }

    #[test]
    fn mirrors_directory_nesting() {
        let temp = chapter_book();
        let book = book(&temp, "");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();

        assert_eq!(
            titles(&layout),
            vec![
                (0, "intro".to_string()),
                (0, "ch1".to_string()),
                (1, "a".to_string()),
                (1, "b".to_string()),
            ]
        );

        let tree = &layout.tree;
        let ch1 = tree.find(Path::new("ch1")).unwrap();
        assert!(tree.get(ch1).is_section());
        assert_eq!(tree.get(ch1).page(), None);
        assert_eq!(tree.children(ch1).len(), 2);
        assert_eq!(tree.subtree_end(ch1), 4);
        assert_eq!(tree.get(tree.children(ch1)[1]).sibling_index, 1);
        assert_eq!(tree.get(tree.children(ch1)[0]).parent, Some(ch1));
        assert!(layout.warnings.is_empty());
    }

    #[test]
    fn titles_come_from_overrides_then_headings() {
        let temp = tempdir().unwrap();
        touch(&temp, "a.adoc", "// comment\n= Getting Started\n:author: Ada\n");
        touch(&temp, "b.md", "---\ntitle: From Front Matter\n---\n# Heading\n");
        touch(&temp, "c.md", "# Markdown Heading\n");
        let book = book(&temp, "[titles]\n\"c.md\" = \"Overridden\"");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();

        assert_eq!(
            titles(&layout),
            vec![
                (0, "Getting Started".to_string()),
                (0, "From Front Matter".to_string()),
                (0, "Overridden".to_string()),
            ]
        );
        assert_eq!(layout.tree.get(layout.tree.roots()[0]).id, "getting-started");
    }

    #[test]
    fn index_document_becomes_section_page() {
        let temp = tempdir().unwrap();
        touch(&temp, "guide/index.adoc", "= The Guide\n");
        touch(&temp, "guide/setup.adoc", "= Setup\n");
        let book = book(&temp, "");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();
        let tree = &layout.tree;
        let guide = tree.roots()[0];

        assert_eq!(tree.get(guide).title, "The Guide");
        assert_eq!(
            tree.get(guide).page(),
            Some(Path::new("guide/index.adoc"))
        );
        assert_eq!(tree.children(guide).len(), 1);
        assert_eq!(tree.find(Path::new("guide/index.adoc")), Some(guide));
        assert_eq!(tree.pages().count(), 2);
    }

    #[test]
    fn explicit_order_wins_and_unlisted_entries_follow() {
        let temp = chapter_book();
        touch(&temp, "ch1/c.adoc", "");
        let book = book(
            &temp,
            "[order]\n\"\" = [\"ch1\", \"intro.adoc\"]\n\"ch1\" = [\"b.adoc\", \"gone.adoc\"]",
        );

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();

        assert_eq!(
            titles(&layout),
            vec![
                (0, "ch1".to_string()),
                (1, "b".to_string()),
                (1, "a".to_string()),
                (1, "c".to_string()),
                (0, "intro".to_string()),
            ]
        );
        assert_eq!(
            layout.warnings,
            vec![
                StructuralWarning::MissingEntry {
                    dir: PathBuf::from("ch1"),
                    entry: "gone.adoc".to_string(),
                },
                StructuralWarning::UnlistedEntries {
                    dir: PathBuf::from("ch1"),
                    entries: vec!["a.adoc".to_string(), "c.adoc".to_string()],
                },
            ]
        );
    }

    #[test]
    fn unlisted_entries_can_be_fatal() {
        let temp = chapter_book();
        let book = book(&temp, "unlisted = \"error\"\n[order]\n\"\" = [\"intro.adoc\"]");

        let err = TreeBuilder::new(&book, EXTS).build().unwrap_err();

        assert!(matches!(err, TreeError::Unlisted { ref entries, .. } if entries == &["ch1"]));
    }

    #[test]
    fn empty_directories_are_dropped_with_a_warning() {
        let temp = chapter_book();
        touch(&temp, "img/logo.png", "png");
        touch(&temp, ".hidden/secret.adoc", "");
        let book = book(&temp, "");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();

        assert_eq!(layout.tree.len(), 4);
        assert_eq!(
            layout.warnings,
            vec![StructuralWarning::EmptyBranch(PathBuf::from("img"))]
        );
    }

    #[test]
    fn classified_paths_stay_out_of_the_tree() {
        let temp = chapter_book();
        touch(&temp, "404.adoc", "= Not Found\n");
        touch(&temp, "static/notes.adoc", "");
        let book = book(&temp, "converts = [\"404.adoc\"]\nincludes = [\"static\"]");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();

        assert_eq!(layout.tree.find(Path::new("404.adoc")), None);
        assert_eq!(layout.tree.find(Path::new("static")), None);
        assert_eq!(layout.converts, vec![PathBuf::from("404.adoc")]);
        assert!(layout.warnings.is_empty());
    }

    #[test]
    fn ordering_a_classified_path_is_a_conflict() {
        let temp = chapter_book();
        touch(&temp, "404.adoc", "");
        let book = book(
            &temp,
            "converts = [\"404.adoc\"]\n[order]\n\"\" = [\"intro.adoc\", \"404.adoc\", \"ch1\"]",
        );

        let err = TreeBuilder::new(&book, EXTS).build().unwrap_err();

        assert!(matches!(
            err,
            TreeError::ManifestConflict {
                first: "converts",
                second: "order",
                ..
            }
        ));
    }

    #[test]
    fn converting_an_included_path_is_a_conflict() {
        let temp = chapter_book();
        let book = book(&temp, "includes = [\"ch1\"]\nconverts = [\"ch1/a.adoc\"]");

        let err = TreeBuilder::new(&book, EXTS).build().unwrap_err();

        assert!(matches!(
            err,
            TreeError::ManifestConflict { ref path, .. } if path == Path::new("ch1/a.adoc")
        ));
    }

    #[test]
    fn duplicate_sibling_ids_are_disambiguated() {
        let temp = tempdir().unwrap();
        touch(&temp, "a.adoc", "= Same\n");
        touch(&temp, "b.adoc", "= Same\n");
        let book = book(&temp, "");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();
        let ids: Vec<_> = layout.tree.iter().map(|(_, n)| n.id.clone()).collect();

        assert_eq!(ids, vec!["same", "same-2"]);
        assert_eq!(layout.warnings.len(), 1);
    }

    #[test]
    fn theme_directory_is_not_a_branch() {
        let temp = chapter_book();
        touch(&temp, "theme/templates/page.html", "{{ body }}");
        touch(&temp, "theme/notes.adoc", "");
        let book = book(&temp, "");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();

        assert_eq!(layout.tree.len(), 4);
        assert_eq!(layout.tree.find(Path::new("theme")), None);
        assert!(layout.warnings.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_back_to_a_parent_is_skipped() {
        let temp = chapter_book();
        std::os::unix::fs::symlink("..", temp.path().join("src/ch1/up")).unwrap();
        let book = book(&temp, "");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();

        assert_eq!(layout.tree.len(), 4);
        assert_eq!(
            layout.warnings,
            vec![StructuralWarning::DirectoryLoop(PathBuf::from("ch1/up"))]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_a_sibling_is_followed() {
        let temp = chapter_book();
        touch(&temp, "shared/s.adoc", "");
        std::os::unix::fs::symlink("../shared", temp.path().join("src/ch1/linked")).unwrap();
        let book = book(&temp, "");

        let layout = TreeBuilder::new(&book, EXTS).build().unwrap();

        assert!(layout.tree.find(Path::new("ch1/linked/s.adoc")).is_some());
        assert!(layout.tree.find(Path::new("shared/s.adoc")).is_some());
        assert!(layout.warnings.is_empty());
    }

    #[test]
    fn missing_source_directory_is_fatal() {
        let temp = tempdir().unwrap();
        let book = book(&temp, "");

        let err = TreeBuilder::new(&book, EXTS).build().unwrap_err();

        assert!(matches!(err, TreeError::MissingSourceDir(_)));
    }

    #[test]
    fn slugify_works() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Button (Primary)"), "button-primary");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
    }
}
