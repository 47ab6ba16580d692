//! Output planning.
//!
//! Every file the build will write is claimed here before anything touches the site
//! directory. Two different producers claiming one destination is a fatal collision.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use folio_book::{Book, BookLayout};

use crate::assets::{expand_copy, DefaultTheme};
use crate::builder::BuildError;
use crate::convert::{ConversionTask, TaskKind};
use crate::report::{FailureRecord, FailureStage};

/// Producer of one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputOrigin {
    /// Navigable page, with its source-relative document
    Page(PathBuf),
    /// `converts` entry
    Convert(PathBuf),
    /// Aggregate document
    Aggregate,
    /// File copied from an `includes` entry
    Include(PathBuf),
    /// File copied by a `[[copies]]` pair
    Copy(PathBuf),
    /// Default theme file
    Theme,
}

impl OutputOrigin {
    /// The same source file reached through includes and copies is one output, not two.
    fn same_output(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Include(a) | Self::Copy(a), Self::Include(b) | Self::Copy(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for OutputOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(p) => write!(f, "page {}", p.display()),
            Self::Convert(p) => write!(f, "converted document {}", p.display()),
            Self::Aggregate => f.write_str("aggregate document"),
            Self::Include(p) => write!(f, "include {}", p.display()),
            Self::Copy(p) => write!(f, "copy {}", p.display()),
            Self::Theme => f.write_str("default theme"),
        }
    }
}

/// A file copy to perform during assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    /// Absolute source file
    pub from: PathBuf,
    /// Site-relative destination
    pub to: PathBuf,
}

/// Every output of a build, keyed by site-relative destination.
#[derive(Debug, Clone, Default)]
pub struct SitePlan {
    outputs: BTreeMap<PathBuf, OutputOrigin>,
    copies: Vec<PlannedCopy>,
    missing: Vec<FailureRecord>,
}

impl SitePlan {
    /// Plans pages, includes, copies and theme files.
    pub fn build(
        book: &Book,
        layout: &BookLayout,
        tasks: &[ConversionTask],
        use_default_theme: bool,
    ) -> Result<Self, BuildError> {
        let mut plan = Self::default();

        for task in tasks {
            let origin = match task.kind {
                TaskKind::Page(_) => OutputOrigin::Page(task.rel_path.clone()),
                TaskKind::Convert => OutputOrigin::Convert(task.rel_path.clone()),
                TaskKind::Aggregate => OutputOrigin::Aggregate,
            };
            plan.claim(task.dest.clone(), origin)?;
        }

        let src_dir = book.src_dir();
        for include in &layout.includes {
            plan.add_copies(&src_dir.join(include), include, include, OutputOrigin::Include)?;
        }

        for pair in &layout.copies {
            plan.add_copies(
                &book.root.join(&pair.from),
                &pair.to,
                &pair.from,
                OutputOrigin::Copy,
            )?;
        }

        if use_default_theme {
            for path in DefaultTheme::paths() {
                plan.claim(PathBuf::from(path), OutputOrigin::Theme)?;
            }
        }

        Ok(plan)
    }

    /// Claims a destination. Returns `false` when the same producer already claimed it.
    pub fn claim(&mut self, dest: PathBuf, origin: OutputOrigin) -> Result<bool, BuildError> {
        match self.outputs.get(&dest) {
            Some(existing) if existing.same_output(&origin) => Ok(false),
            Some(existing) => Err(BuildError::PathCollision {
                dest,
                first: existing.to_string(),
                second: origin.to_string(),
            }),
            None => {
                self.outputs.insert(dest, origin);
                Ok(true)
            }
        }
    }

    /// Claims every file below `from`; a missing source becomes a failure record.
    fn add_copies(
        &mut self,
        from: &Path,
        to: &Path,
        label: &Path,
        origin: fn(PathBuf) -> OutputOrigin,
    ) -> Result<(), BuildError> {
        let pairs = match expand_copy(from, to) {
            Ok(pairs) => pairs,
            Err(e) => {
                self.missing
                    .push(FailureRecord::new(label, FailureStage::Copy, e));
                return Ok(());
            }
        };

        for (from, to) in pairs {
            if self.claim(to.clone(), origin(from.clone()))? {
                self.copies.push(PlannedCopy { from, to });
            }
        }
        Ok(())
    }

    pub fn copies(&self) -> &[PlannedCopy] {
        &self.copies
    }

    /// Include and copy sources that could not be read.
    pub fn missing(&self) -> &[FailureRecord] {
        &self.missing
    }

    /// Number of claimed destinations.
    pub(crate) fn len(&self) -> usize {
        self.outputs.len()
    }
}
