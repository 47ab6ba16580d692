//! Static site builder.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;

use folio_book::{Book, Numbering, TreeBuilder, TreeError};
use folio_compiler::DocumentCompiler;

use crate::assets::{clear_directory_items, copy_file, write_file, DefaultTheme};
use crate::cache::{BuildCache, CacheMode};
use crate::convert::{default_jobs, plan_tasks, Converted, Orchestrator, TaskKind, TaskOutcome};
use crate::links::{AssetRoots, LinkResolver};
use crate::plan::SitePlan;
use crate::report::{BuildReport, FailureRecord, FailureStage};
use crate::sidebar::Sidebar;
use crate::templates::{PageShell, ShellContext, ShellError};

/// Errors that abort a build before any page is written.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Path collision: `{}` would be written by both {first} and {second}", .dest.display())]
    PathCollision {
        dest: PathBuf,
        first: String,
        second: String,
    },

    #[error("Failed to prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start worker pool: {0}")]
    Pool(String),
}

impl BuildError {
    pub fn is_manifest_conflict(&self) -> bool {
        matches!(self, Self::Tree(TreeError::ManifestConflict { .. }))
    }
}

/// Static site builder.
pub struct StaticBuilder<C, S> {
    book: Book,
    compiler: C,
    shell: S,
    fail_fast: bool,
    jobs: usize,
    cache: CacheMode,
}

/// Per-build values shared by every page.
struct PageEnv<'a> {
    sidebar: &'a Sidebar,
    numbering: &'a Numbering,
    links: &'a LinkResolver,
    assets: &'a AssetRoots,
    authors: Option<String>,
}

impl<C: DocumentCompiler, S: PageShell> StaticBuilder<C, S> {
    /// Fail-fast and worker count start from the manifest.
    pub fn new(book: Book, compiler: C, shell: S) -> Self {
        let fail_fast = book.manifest.fail_fast;
        let jobs = book.manifest.jobs.unwrap_or_else(default_jobs);
        Self {
            book,
            compiler,
            shell,
            fail_fast,
            jobs,
            cache: CacheMode::Off,
        }
    }

    /// How compiled bodies are reused between builds. Off unless set.
    pub fn cache(mut self, mode: CacheMode) -> Self {
        self.cache = mode;
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Build the static site.
    ///
    /// Manifest conflicts and path collisions abort before the site directory is touched.
    /// Otherwise the site directory is emptied, dot-files aside, and rewritten; per-file
    /// failures are recorded in the report.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let manifest = &self.book.manifest;

        let layout = TreeBuilder::new(&self.book, self.compiler.extensions()).build()?;
        tracing::info!(
            "Found {} navigation entries in {}",
            layout.tree.len(),
            self.book.src_dir().display()
        );

        let numbering = Numbering::assign(&layout.tree);
        let links = LinkResolver::new(&self.book);
        let sidebar = Sidebar::render(&layout.tree, &numbering, &links, manifest.fold_level);

        let tasks = plan_tasks(&self.book, &layout, &numbering, &links);
        let plan = SitePlan::build(&self.book, &layout, &tasks, manifest.use_default_theme)?;

        tracing::debug!("Planned {} outputs", plan.len());

        let cache = match self.cache {
            CacheMode::Reuse => BuildCache::load(&self.book),
            CacheMode::Off | CacheMode::Refresh => BuildCache::empty(&self.book),
        };
        let mut orchestrator = Orchestrator::new(&self.compiler)
            .jobs(self.jobs)
            .fail_fast(self.fail_fast);
        if self.cache == CacheMode::Reuse {
            orchestrator = orchestrator.cache(&cache);
        }
        let outcomes = orchestrator.run(tasks)?;

        let site_dir = self.book.site_dir();
        let io_error = |source| BuildError::Io {
            path: site_dir.clone(),
            source,
        };
        fs::create_dir_all(&site_dir).map_err(io_error)?;
        let stale = clear_directory_items(&site_dir).map_err(io_error)?;
        tracing::debug!("Removed {} items from {}", stale, site_dir.display());

        let mut report = BuildReport::new(site_dir);
        report.warnings = layout.warnings.clone();

        let mut converted = Vec::new();
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Rendered(c) => {
                    if c.reused {
                        report.reused += 1;
                    }
                    converted.push(c)
                }
                TaskOutcome::Failed(failure) => report.record_failure(failure),
                TaskOutcome::Skipped(path) => {
                    tracing::debug!("Skipped {}", path.display());
                    report.skipped += 1;
                }
            }
        }

        let assets = links.assets();
        let env = PageEnv {
            sidebar: &sidebar,
            numbering: &numbering,
            links: &links,
            assets: &assets,
            authors: Some(manifest.authors.join(", ")).filter(|a| !a.is_empty()),
        };
        self.write_pages(&converted, &env, &mut report);

        if self.cache != CacheMode::Off {
            self.save_cache(&converted);
        }

        for failure in plan.missing() {
            report.record_failure(failure.clone());
        }
        for copy in plan.copies() {
            match copy_file(&copy.from, &links.site_path(&copy.to)) {
                Ok(_) => report.copied += 1,
                Err(e) => {
                    report.record_failure(FailureRecord::new(&copy.from, FailureStage::Copy, e))
                }
            }
        }

        if manifest.use_default_theme {
            for (path, contents) in DefaultTheme::files() {
                if let Err(e) = write_file(&links.site_path(&path), contents) {
                    report.record_failure(FailureRecord::new(path, FailureStage::Write, e));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Wrote {} pages ({} cached) and {} files to {} in {}ms ({} failed, {} skipped)",
            report.succeeded,
            report.reused,
            report.copied,
            report.output_dir.display(),
            report.duration_ms,
            report.failed,
            report.skipped
        );

        Ok(report)
    }

    /// Replaces the cache index with the bodies compiled from files in this build.
    fn save_cache(&self, converted: &[Converted]) {
        let mut next = BuildCache::empty(&self.book);
        for c in converted {
            if let Some(modified) = c.modified {
                next.insert(&c.task.rel_path, modified, &c.task.attributes, c.body.clone());
            }
        }

        match next.save() {
            Ok(()) => tracing::debug!("Cached {} documents", next.len()),
            Err(e) => tracing::warn!("Failed to save the build cache: {}", e),
        }
    }

    /// Merges bodies with the page shell and writes them, in parallel.
    fn write_pages(&self, converted: &[Converted], env: &PageEnv<'_>, report: &mut BuildReport) {
        let results: Vec<Result<(), FailureRecord>> = converted
            .par_iter()
            .map(|c| {
                let html = self.render_page(c, env).map_err(|e| {
                    FailureRecord::new(&c.task.rel_path, FailureStage::Render, e)
                })?;
                let dest = env.links.site_path(&c.task.dest);
                write_file(&dest, html)
                    .map_err(|e| FailureRecord::new(&c.task.rel_path, FailureStage::Write, e))
            })
            .collect();

        for result in results {
            match result {
                Ok(()) => report.succeeded += 1,
                Err(failure) => report.record_failure(failure),
            }
        }
    }

    fn render_page(&self, converted: &Converted, env: &PageEnv<'_>) -> Result<String, ShellError> {
        let task = &converted.task;
        let meta = &converted.body.metadata;

        let stem = task
            .rel_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let title = task
            .title
            .as_deref()
            .or(meta.title.as_deref())
            .unwrap_or(&stem);

        let active = match task.kind {
            TaskKind::Page(id) => Some(id),
            TaskKind::Convert | TaskKind::Aggregate => None,
        };
        let number = active.map(|id| env.numbering.get(id).to_string());

        let ctx = ShellContext {
            title,
            book_title: &self.book.manifest.title,
            author: meta.author.as_deref().or(env.authors.as_deref()),
            email: meta.email.as_deref(),
            revdate: meta.revdate.as_deref(),
            number: number.as_deref(),
            base_url: env.links.base_url(),
            body: &converted.body.html,
            sidebar: env.sidebar.view(active),
            assets: env.assets,
            use_default_theme: self.book.manifest.use_default_theme,
        };

        self.shell.render_shell(&ctx)
    }
}
