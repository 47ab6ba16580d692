//! Book build command.

use std::path::Path;

use anyhow::{bail, Context, Result};
use folio_book::Book;
use folio_compiler::CompilerSet;
use folio_static::{BuildReport, CacheMode, StaticBuilder, TemplateEngine};

/// Run the build command.
pub fn run(dir: &Path, fail_fast: bool, jobs: Option<usize>, force: bool) -> Result<()> {
    let report = build(dir, fail_fast, jobs, force)?;

    for warning in &report.warnings {
        tracing::debug!("Structural warning: {}", warning);
    }

    if !report.failures.is_empty() {
        eprintln!("Failed documents:");
        for failure in &report.failures {
            eprintln!("  {failure}");
        }
        bail!(
            "{} of {} outputs failed ({} skipped)",
            report.failed,
            report.failed + report.succeeded,
            report.skipped
        );
    }

    tracing::info!("Output: {}", report.output_dir.display());
    Ok(())
}

/// Locates the book above `dir` and builds it. `force` recompiles every document.
pub fn build(
    dir: &Path,
    fail_fast: bool,
    jobs: Option<usize>,
    force: bool,
) -> Result<BuildReport> {
    let book = Book::locate(dir).context("Failed to load book")?;
    tracing::info!("Building {}...", book.manifest.title);

    let compiler = CompilerSet::for_manifest(&book.manifest);
    let templates = book.src_dir().join(TemplateEngine::OVERRIDE_DIR);
    let shell = TemplateEngine::from_dir(&templates)
        .with_context(|| format!("Failed to load templates from {}", templates.display()))?;

    let cache = if force {
        CacheMode::Refresh
    } else {
        CacheMode::Reuse
    };
    let mut builder = StaticBuilder::new(book, compiler, shell).cache(cache);
    if fail_fast {
        builder = builder.fail_fast(true);
    }
    if let Some(jobs) = jobs {
        builder = builder.jobs(jobs);
    }

    match builder.build() {
        Ok(report) => Ok(report),
        Err(e) if e.is_manifest_conflict() => {
            Err(anyhow::Error::new(e).context("Check `order` and `converts` in book.toml"))
        }
        Err(e) => Err(e.into()),
    }
}
