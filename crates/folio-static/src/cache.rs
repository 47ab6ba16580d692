//! Build cache.
//!
//! Compiled bodies are kept in `.folio-cache/index.json` at the book root, keyed by
//! source-relative path. A body is reused while the source's modification time and the
//! attributes it was compiled with are unchanged. Files pulled in by a document's own include
//! directives are not tracked; [`CacheMode::Refresh`] recompiles everything.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use folio_book::{slash_path, Book};
use folio_compiler::{Attributes, RenderedBody};

use crate::assets::write_file;

/// Cache directory at the book root.
pub const CACHE_DIR: &str = ".folio-cache";

const INDEX_FILE: &str = "index.json";

/// Bumped whenever the index layout changes.
const CACHE_VERSION: u32 = 1;

/// How a build uses the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Nothing is read or written
    #[default]
    Off,
    /// Reuse unchanged bodies, then save the new index
    Reuse,
    /// Compile everything, then save the new index
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheEntry {
    modified: SystemTime,
    /// Serialized attributes the body was compiled with
    attributes: String,
    body: RenderedBody,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    version: u32,
    entries: BTreeMap<String, CacheEntry>,
}

/// Compiled bodies of a book, keyed by source-relative path.
#[derive(Debug)]
pub struct BuildCache {
    path: PathBuf,
    index: CacheIndex,
}

impl BuildCache {
    /// Cache directory of a book.
    pub fn dir(book: &Book) -> PathBuf {
        book.root.join(CACHE_DIR)
    }

    /// An empty cache saved to `book`'s cache directory.
    pub fn empty(book: &Book) -> Self {
        Self {
            path: Self::dir(book).join(INDEX_FILE),
            index: CacheIndex {
                version: CACHE_VERSION,
                entries: BTreeMap::new(),
            },
        }
    }

    /// Loads the index of `book`. A missing, unreadable or outdated index gives an empty cache.
    pub fn load(book: &Book) -> Self {
        let mut cache = Self::empty(book);

        let text = match fs::read_to_string(&cache.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return cache,
            Err(e) => {
                tracing::warn!("Ignoring build cache {}: {}", cache.path.display(), e);
                return cache;
            }
        };

        match serde_json::from_str::<CacheIndex>(&text) {
            Ok(index) if index.version == CACHE_VERSION => {
                tracing::debug!("Loaded {} cached documents", index.entries.len());
                cache.index = index;
            }
            Ok(_) => tracing::info!("Build cache was written by another folio version, ignoring it"),
            Err(e) => tracing::warn!("Ignoring build cache {}: {}", cache.path.display(), e),
        }

        cache
    }

    /// Removes the cache directory of `book`. Returns whether there was one.
    pub fn clear(book: &Book) -> io::Result<bool> {
        let dir = Self::dir(book);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.index.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.entries.is_empty()
    }

    /// The body compiled from `rel`, unless the source or the attributes changed since.
    pub fn lookup(
        &self,
        rel: &Path,
        modified: SystemTime,
        attrs: &Attributes,
    ) -> Option<&RenderedBody> {
        let entry = self.index.entries.get(&slash_path(rel))?;
        if entry.modified != modified || entry.attributes != fingerprint(attrs)? {
            return None;
        }
        Some(&entry.body)
    }

    pub fn insert(
        &mut self,
        rel: &Path,
        modified: SystemTime,
        attrs: &Attributes,
        body: RenderedBody,
    ) {
        let Some(attributes) = fingerprint(attrs) else {
            return;
        };
        self.index.entries.insert(
            slash_path(rel),
            CacheEntry {
                modified,
                attributes,
                body,
            },
        );
    }

    pub fn save(&self) -> io::Result<()> {
        let json = serde_json::to_string(&self.index)?;
        write_file(&self.path, json)
    }
}

/// Modification time of a source file, when the platform reports one.
pub fn source_modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn fingerprint(attrs: &Attributes) -> Option<String> {
    serde_json::to_string(attrs).ok()
}
