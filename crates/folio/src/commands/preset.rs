//! Prints the files `folio init` writes.

use clap::ValueEnum;
use folio_book::manifest::MANIFEST_FILE;

use super::init::{DEFAULT_ARTICLE, DEFAULT_INDEX, DEFAULT_MANIFEST};

/// A scaffold file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetFile {
    /// The book manifest
    #[value(aliases = ["b", MANIFEST_FILE])]
    Book,
    /// The landing page
    #[value(aliases = ["i", "index.adoc"])]
    Index,
    /// An article showing headers, images and ordering
    #[value(aliases = ["a", "article.adoc"])]
    Article,
}

impl PresetFile {
    pub fn contents(self) -> &'static str {
        match self {
            Self::Book => DEFAULT_MANIFEST,
            Self::Index => DEFAULT_INDEX,
            Self::Article => DEFAULT_ARTICLE,
        }
    }
}

/// Run the preset command.
pub fn run(file: PresetFile) {
    print!("{}", file.contents());
}
