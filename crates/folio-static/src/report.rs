//! Build results.

use std::fmt;
use std::path::PathBuf;

use folio_book::StructuralWarning;

/// Where a per-file failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The document compiler failed or timed out
    Compile,
    /// The page shell failed
    Render,
    /// Writing a page or theme file failed
    Write,
    /// An include or copy source was missing or could not be copied
    Copy,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compile => "compile",
            Self::Render => "render",
            Self::Write => "write",
            Self::Copy => "copy",
        })
    }
}

/// One failed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Source path, relative to the source directory where possible
    pub path: PathBuf,
    pub stage: FailureStage,
    pub cause: String,
}

impl FailureRecord {
    pub fn new(path: impl Into<PathBuf>, stage: FailureStage, cause: impl ToString) -> Self {
        Self {
            path: path.into(),
            stage,
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.path.display(), self.stage, self.cause)
    }
}

/// Result of a build.
///
/// `succeeded` and `skipped` count conversion tasks; every failure record, whatever its stage,
/// counts as failed.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Tasks never dispatched after a fail-fast abort
    pub skipped: usize,
    /// Succeeded tasks whose body came from the build cache
    pub reused: usize,
    pub failures: Vec<FailureRecord>,
    pub warnings: Vec<StructuralWarning>,
    /// Number of files copied from includes and copies
    pub copied: usize,
    pub duration_ms: u64,
    pub output_dir: PathBuf,
}

impl BuildReport {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Default::default()
        }
    }

    /// No failures and nothing skipped.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn record_failure(&mut self, failure: FailureRecord) {
        tracing::error!("{}", failure);
        self.failed += 1;
        self.failures.push(failure);
    }
}
