//! Default theme and file copying.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::links::{FAVICON, STYLESHEET};

/// The theme written into the site when `use_default_theme` is set.
pub struct DefaultTheme;

impl DefaultTheme {
    /// Site-relative paths and contents of every theme file, the stylesheet minified.
    pub fn files() -> Vec<(PathBuf, Vec<u8>)> {
        let css = minify_css(DEFAULT_CSS).unwrap_or_else(|e| {
            tracing::warn!("Serving unminified theme CSS: {}", e);
            DEFAULT_CSS.to_string()
        });

        vec![
            (PathBuf::from(STYLESHEET), css.into_bytes()),
            (PathBuf::from(FAVICON), DEFAULT_FAVICON.as_bytes().to_vec()),
        ]
    }

    pub fn paths() -> [&'static str; 2] {
        [STYLESHEET, FAVICON]
    }
}

/// Minify CSS using lightningcss.
pub fn minify_css(css: &str) -> Result<String, String> {
    use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

    let stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| format!("CSS parse error: {}", e))?;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| format!("CSS minify error: {}", e))?;

    Ok(minified.code)
}

/// Expands a file or directory copy into `(source file, destination)` pairs.
///
/// Directories are walked recursively; their files land under `to` with the same relative
/// layout. Hidden files are copied too.
pub fn expand_copy(from: &Path, to: &Path) -> io::Result<Vec<(PathBuf, PathBuf)>> {
    let meta = fs::metadata(from)?;
    if meta.is_file() {
        return Ok(vec![(from.to_path_buf(), to.to_path_buf())]);
    }

    let mut pairs = Vec::new();
    for entry in WalkDir::new(from).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
        pairs.push((entry.path().to_path_buf(), to.join(rel)));
    }
    Ok(pairs)
}

/// Copies one file, creating parent directories. Permission bits travel with `fs::copy`.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<u64> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)
}

/// Writes a file, creating parent directories.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Removes everything in `dir` except dot-files. Returns the number of removed items.
pub fn clear_directory_items(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }
    Ok(removed)
}

const DEFAULT_CSS: &str = r#"/* folio default book theme */

:root {
  --sidebar-width: 300px;
  --content-max-width: 820px;
  --background: #ffffff;
  --foreground: #1f2328;
  --muted: #f6f8fa;
  --muted-foreground: #59636e;
  --border: #d1d9e0;
  --accent: #0969da;
  --radius: 0.375rem;
}

* {
  box-sizing: border-box;
}

body {
  margin: 0;
  font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
  background: var(--background);
  color: var(--foreground);
  line-height: 1.6;
}

.layout {
  display: grid;
  grid-template-columns: var(--sidebar-width) 1fr;
  min-height: 100vh;
}

/* Sidebar */
.sidebar {
  position: sticky;
  top: 0;
  height: 100vh;
  overflow-y: auto;
  padding: 1.25rem 1rem;
  background: var(--muted);
  border-right: 1px solid var(--border);
  font-size: 0.925rem;
}

.sidebar-header {
  margin-bottom: 1rem;
}

.book-title {
  font-weight: 700;
  font-size: 1.1rem;
  color: var(--foreground);
  text-decoration: none;
}

.toc,
.toc ul {
  list-style: none;
  margin: 0;
  padding: 0;
}

.toc ul {
  padding-left: 1rem;
}

.toc-item {
  margin: 0.15rem 0;
}

.toc-item summary {
  cursor: pointer;
}

.toc-item .number {
  display: inline-block;
  min-width: 2.25rem;
  color: var(--muted-foreground);
  font-variant-numeric: tabular-nums;
}

.toc-item a {
  color: var(--foreground);
  text-decoration: none;
  border-radius: var(--radius);
}

.toc-item a:hover {
  color: var(--accent);
}

.toc-item.active > a,
.toc-item.active > details > summary > a {
  color: var(--accent);
  font-weight: 600;
}

.toc-item .title {
  color: var(--muted-foreground);
}

/* Content */
.main {
  padding: 2rem 3rem;
}

.doc {
  max-width: var(--content-max-width);
}

.doc h1,
.doc h2,
.doc h3 {
  line-height: 1.25;
}

.doc h2 {
  padding-bottom: 0.3rem;
  border-bottom: 1px solid var(--border);
}

.doc a {
  color: var(--accent);
}

.doc img {
  max-width: 100%;
}

.doc pre {
  padding: 1rem;
  overflow-x: auto;
  background: var(--muted);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  font-size: 0.875rem;
}

.doc code {
  font-family: ui-monospace, SFMono-Regular, Menlo, monospace;
}

.doc table {
  border-collapse: collapse;
}

.doc th,
.doc td {
  padding: 0.4rem 0.75rem;
  border: 1px solid var(--border);
}

.doc-meta {
  max-width: var(--content-max-width);
  margin-top: 3rem;
  padding-top: 1rem;
  border-top: 1px solid var(--border);
  color: var(--muted-foreground);
  font-size: 0.875rem;
}

.doc-meta .revdate {
  margin-left: 1rem;
}

@media (max-width: 900px) {
  .layout {
    grid-template-columns: 1fr;
  }

  .sidebar {
    position: static;
    height: auto;
    border-right: none;
    border-bottom: 1px solid var(--border);
  }

  .main {
    padding: 1.5rem;
  }
}
"#;

const DEFAULT_FAVICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 32 32"><rect x="5" y="3" width="22" height="26" rx="3" fill="#0969da"/><rect x="9" y="8" width="14" height="2" fill="#fff"/><rect x="9" y="13" width="14" height="2" fill="#fff"/><rect x="9" y="18" width="9" height="2" fill="#fff"/></svg>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn theme_files_are_minified() {
        let files = DefaultTheme::files();

        assert_eq!(files[0].0, PathBuf::from("theme/css/book.css"));
        let css = String::from_utf8(files[0].1.clone()).unwrap();
        assert!(css.contains(".toc-item"));
        assert!(!css.contains("/* folio"));
        assert_eq!(files[1].0, PathBuf::from("theme/favicon.svg"));
    }

    #[test]
    fn minifies_css() {
        let css = r#"
.button {
    background-color: blue;
    padding: 10px;
}
        "#;

        let minified = minify_css(css).unwrap();

        assert!(!minified.contains('\n'));
        assert!(minified.contains(".button"));
    }

    #[test]
    fn expands_directory_copies() {
        let temp = tempdir().unwrap();
        let from = temp.path().join("static");
        fs::create_dir_all(from.join("img")).unwrap();
        fs::write(from.join("img/logo.png"), "png").unwrap();
        fs::write(from.join("robots.txt"), "").unwrap();

        let pairs = expand_copy(&from, Path::new("assets")).unwrap();

        assert_eq!(
            pairs,
            vec![
                (from.join("img/logo.png"), PathBuf::from("assets/img/logo.png")),
                (from.join("robots.txt"), PathBuf::from("assets/robots.txt")),
            ]
        );
    }

    #[test]
    fn expands_single_file_copies() {
        let temp = tempdir().unwrap();
        let from = temp.path().join("CNAME");
        fs::write(&from, "example.com").unwrap();

        let pairs = expand_copy(&from, Path::new("CNAME")).unwrap();

        assert_eq!(pairs, vec![(from, PathBuf::from("CNAME"))]);
        assert!(expand_copy(&temp.path().join("missing"), Path::new("x")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn copies_preserve_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let from = temp.path().join("run.sh");
        fs::write(&from, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&from, fs::Permissions::from_mode(0o755)).unwrap();
        let to = temp.path().join("site/bin/run.sh");

        copy_file(&from, &to).unwrap();

        let mode = fs::metadata(&to).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(fs::read_to_string(&to).unwrap(), "#!/bin/sh\n");
    }

    #[test]
    fn clearing_keeps_dot_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("ch1")).unwrap();
        fs::write(temp.path().join("ch1/a.html"), "").unwrap();
        fs::write(temp.path().join("index.html"), "").unwrap();
        fs::write(temp.path().join(".git"), "").unwrap();

        let removed = clear_directory_items(temp.path()).unwrap();

        assert_eq!(removed, 2);
        assert!(temp.path().join(".git").exists());
        assert!(!temp.path().join("ch1").exists());
    }
}
