//! Book scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use folio_book::manifest::MANIFEST_FILE;

/// Run the init command.
pub fn run(dir: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing book in {}...", dir.display());

    let img_dir = dir.join("src/static/img");
    fs::create_dir_all(&img_dir)
        .with_context(|| format!("Failed to create {}", img_dir.display()))?;

    let files = [
        (MANIFEST_FILE, DEFAULT_MANIFEST),
        ("src/index.adoc", DEFAULT_INDEX),
        ("src/article.adoc", DEFAULT_ARTICLE),
    ];

    let mut written = 0;
    for (rel, contents) in files {
        let path = dir.join(rel);
        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", rel);
            continue;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", rel))?;
        tracing::info!("Created {}", rel);
        written += 1;
    }

    if written > 0 {
        tracing::info!("Initialization complete!");
        tracing::info!("Run 'folio build' to generate the site.");
    }

    Ok(())
}

pub(crate) const DEFAULT_MANIFEST: &str = r#"# folio book

title = "My Book"
authors = []

# Prefix of every link in the site, e.g. "/my-book" when served from a subdirectory
base_url = ""

src_dir = "src"
site_dir = "site"

# Sidebar sections at this depth and below start collapsed
# fold_level = 1

# Copied verbatim into the site
includes = ["static"]

# Rendered, but kept out of the sidebar
converts = []

# Entry order per directory; "" is the source root
[order]
"" = ["index.adoc", "article.adoc"]
"#;

pub(crate) const DEFAULT_INDEX: &str = r#"= Welcome

This book is built with *folio*.

Every AsciiDoc or Markdown file under `src/` becomes a page. Directories
become numbered sections of the sidebar, and an `index.adoc` inside a
directory becomes that section's own page.

Run `folio build` and open `site/index.html`.
"#;

pub(crate) const DEFAULT_ARTICLE: &str = r#"= An Article
:author: Your Name
:revdate: 2024-01-01

== Writing

Images placed in `src/static/img/` are copied into the site:

[source,asciidoc]
----
image::{imagesdir}/diagram.png[]
----

== Ordering

List the entries of a directory under `[order]` in `book.toml` to choose
their order. Entries left out are appended after the listed ones.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use folio_book::BookManifest;
    use pretty_assertions::assert_eq;

    #[test]
    fn scaffolds_a_book() {
        let temp = tempfile::tempdir().unwrap();

        run(temp.path(), false).unwrap();

        assert!(temp.path().join("src/index.adoc").is_file());
        assert!(temp.path().join("src/article.adoc").is_file());
        assert!(temp.path().join("src/static/img").is_dir());

        let manifest = BookManifest::read(&temp.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.title, "My Book");
        assert_eq!(manifest.includes, vec![std::path::PathBuf::from("static")]);
    }

    #[test]
    fn keeps_existing_files_without_yes() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join(MANIFEST_FILE), "title = \"Mine\"\n").unwrap();

        run(temp.path(), false).unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap(),
            "title = \"Mine\"\n"
        );
        assert!(temp.path().join("src/index.adoc").is_file());
    }

    #[test]
    fn overwrites_with_yes() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join(MANIFEST_FILE), "title = \"Mine\"\n").unwrap();

        run(temp.path(), true).unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap(),
            DEFAULT_MANIFEST
        );
    }
}
