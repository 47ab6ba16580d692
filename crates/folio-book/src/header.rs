//! Document header extraction.
//!
//! The sidebar needs document titles before anything is compiled, and the page shell needs the
//! author and revision date after. Both come from the document header:
//!
//! - AsciiDoc: a `= Title` line followed by `:name: value` / `:!name:` attribute entries
//! - Markdown: optional YAML front matter, then the first `# Title` heading

use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Markup syntax of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    AsciiDoc,
    Markdown,
}

impl Syntax {
    /// Detect syntax from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "adoc" | "asciidoc" | "asc" => Some(Self::AsciiDoc),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::AsciiDoc => "adoc",
            Self::Markdown => "md",
        }
    }
}

/// A header attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderAttr {
    /// `:!name:`
    Unset(String),
    /// `:name: value`
    Set(String, String),
}

impl HeaderAttr {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set(name.into(), value.into())
    }

    pub fn unset(name: impl Into<String>) -> Self {
        Self::Unset(name.into())
    }

    /// Parses a command line attribute: `name`, `!name`, `name=value`.
    ///
    /// A trailing `@` (soft set) on either side is dropped; document headers always win.
    pub fn from_assignment(source: &str) -> Self {
        match source.split_once('=') {
            Some((name, value)) => Self::set(
                name.trim_end_matches('@'),
                value.trim_end_matches('@'),
            ),
            None => match source.strip_prefix('!').or_else(|| source.strip_suffix('!')) {
                Some(name) => Self::unset(name),
                None => Self::set(source, ""),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Unset(name) | Self::Set(name, _) => name,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Unset(_) => None,
            Self::Set(_, value) => Some(value),
        }
    }
}

/// Markdown front matter.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Revision date, kept verbatim
    #[serde(default)]
    pub date: Option<String>,
}

/// Errors that can occur when reading a header.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("Unclosed front matter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Title and attributes of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentHeader {
    pub title: Option<String>,
    attrs: Vec<HeaderAttr>,
    fallback: Vec<HeaderAttr>,
}

impl DocumentHeader {
    pub fn parse(source: &str, syntax: Syntax) -> Result<Self, HeaderError> {
        match syntax {
            Syntax::AsciiDoc => Ok(Self::asciidoc(source)),
            Syntax::Markdown => Self::markdown(source),
        }
    }

    /// Reads the header of a document on disk.
    pub fn read(path: &Path, syntax: Syntax) -> Result<Self, HeaderError> {
        let source = fs::read_to_string(path).map_err(|source| HeaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, syntax)
    }

    /// Extracts the AsciiDoc document header.
    ///
    /// Blank and comment lines are skipped. The header ends at the first line that is not an
    /// attribute entry.
    pub fn asciidoc(source: &str) -> Self {
        let mut lines = source
            .lines()
            .map(str::trim_end)
            .filter(|ln| {
                let ln = ln.trim_start();
                !ln.is_empty() && !ln.starts_with("//")
            })
            .peekable();

        let title = match lines.peek() {
            Some(ln) if ln.starts_with("= ") => {
                let title = ln[2..].trim().to_string();
                lines.next();
                Some(title)
            }
            _ => None,
        };

        let mut attrs = Vec::new();
        for line in lines {
            let Some(rest) = line.strip_prefix(':') else {
                break;
            };
            let Some((name, value)) = rest.split_once(':') else {
                break;
            };

            let name = name.trim();
            match name.strip_prefix('!') {
                Some(name) => attrs.push(HeaderAttr::unset(name)),
                None => match name.strip_suffix('!') {
                    Some(name) => attrs.push(HeaderAttr::unset(name)),
                    None => attrs.push(HeaderAttr::set(name, value.trim())),
                },
            }
        }

        Self {
            title,
            attrs,
            fallback: Vec::new(),
        }
    }

    /// Extracts the Markdown header: front matter fields, then the first level-one heading as
    /// title when the front matter has none.
    pub fn markdown(source: &str) -> Result<Self, HeaderError> {
        let (frontmatter, body) = split_front_matter(source)?;
        let frontmatter = frontmatter.unwrap_or_default();

        let title = frontmatter.title.or_else(|| {
            body.lines()
                .find_map(|ln| ln.strip_prefix("# "))
                .map(|t| t.trim().trim_end_matches('#').trim_end().to_string())
        });

        let attrs = [
            ("author", frontmatter.author),
            ("email", frontmatter.email),
            ("revdate", frontmatter.date),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| HeaderAttr::set(name, v)))
        .collect();

        Ok(Self {
            title,
            attrs,
            fallback: Vec::new(),
        })
    }

    /// Attributes consulted when the header itself does not mention a name.
    pub fn with_fallback(mut self, fallback: Vec<HeaderAttr>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Finds an attribute by name, the header first, then the fallback.
    pub fn attr(&self, name: &str) -> Option<&HeaderAttr> {
        self.attrs
            .iter()
            .chain(self.fallback.iter())
            .find(|a| a.name() == name)
    }

    /// Value of a set attribute. Unset attributes read as `None`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(HeaderAttr::value)
    }

    pub fn attrs(&self) -> &[HeaderAttr] {
        &self.attrs
    }
}

/// Splits YAML front matter from a Markdown document.
///
/// Returns the parsed front matter and the remaining content after the front matter block.
pub fn split_front_matter(source: &str) -> Result<(Option<Frontmatter>, &str), HeaderError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(HeaderError::Unclosed);
    };

    let yaml_content = after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    let frontmatter: Frontmatter = if yaml_content.is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml_content).map_err(|e| HeaderError::InvalidYaml(e.to_string()))?
    };

    Ok((Some(frontmatter), remaining.trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ARTICLE: &str = r#"
// leading comment

= Title here!

:revdate: Oct 23, 2020
// comment between attributes

:author: someone
:!sectnums:
:toc!:

First paragraph!
:not-an-attribute: body text
"#;

    #[test]
    fn extracts_asciidoc_header() {
        let header = DocumentHeader::asciidoc(ARTICLE);

        assert_eq!(header.title.as_deref(), Some("Title here!"));
        assert_eq!(
            header.attrs(),
            &[
                HeaderAttr::set("revdate", "Oct 23, 2020"),
                HeaderAttr::set("author", "someone"),
                HeaderAttr::unset("sectnums"),
                HeaderAttr::unset("toc"),
            ]
        );
        assert_eq!(header.value("not-an-attribute"), None);
    }

    #[test]
    fn asciidoc_without_title() {
        let header = DocumentHeader::asciidoc("Just a paragraph.\n");

        assert_eq!(header.title, None);
        assert!(header.attrs().is_empty());
    }

    #[test]
    fn fallback_attributes_fill_gaps_only() {
        let header = DocumentHeader::asciidoc(ARTICLE).with_fallback(vec![
            HeaderAttr::from_assignment("sectnums"),
            HeaderAttr::from_assignment("email=someone@mail.domain"),
            HeaderAttr::from_assignment("author=fallback@"),
        ]);

        assert_eq!(header.attr("sectnums"), Some(&HeaderAttr::unset("sectnums")));
        assert_eq!(header.value("email"), Some("someone@mail.domain"));
        assert_eq!(header.value("author"), Some("someone"));
    }

    #[test]
    fn parses_command_line_assignments() {
        assert_eq!(
            HeaderAttr::from_assignment("!sectnums"),
            HeaderAttr::unset("sectnums")
        );
        assert_eq!(
            HeaderAttr::from_assignment("imagesdir@=/img@"),
            HeaderAttr::set("imagesdir", "/img")
        );
        assert_eq!(
            HeaderAttr::from_assignment("linkcss"),
            HeaderAttr::set("linkcss", "")
        );
    }

    #[test]
    fn extracts_markdown_front_matter() {
        let source = r#"---
title: Button
author: Ada
date: 2024-01-02
---

# Ignored Heading
"#;

        let header = DocumentHeader::markdown(source).unwrap();

        assert_eq!(header.title.as_deref(), Some("Button"));
        assert_eq!(header.value("author"), Some("Ada"));
        assert_eq!(header.value("revdate"), Some("2024-01-02"));
    }

    #[test]
    fn markdown_title_from_first_heading() {
        let header = DocumentHeader::markdown("Intro text\n\n# Getting Started #\n").unwrap();

        assert_eq!(header.title.as_deref(), Some("Getting Started"));
    }

    #[test]
    fn handles_no_front_matter() {
        let source = "# Just Markdown\n\nNo front matter here.";

        let (fm, content) = split_front_matter(source).unwrap();

        assert!(fm.is_none());
        assert_eq!(content, source);
    }

    #[test]
    fn errors_on_unclosed_front_matter() {
        let result = split_front_matter("---\ntitle: Test\n# No closing");

        assert!(matches!(result, Err(HeaderError::Unclosed)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = split_front_matter("---\ntitle: [invalid yaml\n---\n");

        assert!(matches!(result, Err(HeaderError::InvalidYaml(_))));
    }

    #[test]
    fn detects_syntax() {
        assert_eq!(Syntax::from_path(Path::new("a/b.adoc")), Some(Syntax::AsciiDoc));
        assert_eq!(Syntax::from_path(Path::new("README.MD")), Some(Syntax::Markdown));
        assert_eq!(Syntax::from_path(Path::new("logo.png")), None);
    }
}
