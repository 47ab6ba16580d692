//! Removes the generated site and the build cache.

use std::path::Path;

use anyhow::{Context, Result};
use folio_book::Book;
use folio_static::assets::clear_directory_items;
use folio_static::BuildCache;

/// Run the clean command.
pub fn run(dir: &Path) -> Result<()> {
    let book = Book::locate(dir).context("Failed to load book")?;

    let cache_dir = BuildCache::dir(&book);
    if BuildCache::clear(&book)
        .with_context(|| format!("Failed to remove {}", cache_dir.display()))?
    {
        tracing::info!("Removed {}", cache_dir.display());
    }

    let site_dir = book.site_dir();
    if !site_dir.is_dir() {
        tracing::info!("Nothing to clean in {}", site_dir.display());
        return Ok(());
    }

    let removed = clear_directory_items(&site_dir)
        .with_context(|| format!("Failed to clean {}", site_dir.display()))?;
    tracing::info!("Removed {} items from {}", removed, site_dir.display());

    Ok(())
}
