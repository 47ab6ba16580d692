//! Conversion tasks and their parallel execution.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use rayon::prelude::*;

use folio_book::header::split_front_matter;
use folio_book::{slash_path, Book, BookLayout, BookTree, NodeId, Numbering, Syntax};
use folio_compiler::{Attributes, CompileError, DocumentCompiler, RenderedBody, SourceInput};

use crate::builder::BuildError;
use crate::cache::{source_modified, BuildCache};
use crate::links::LinkResolver;
use crate::report::{FailureRecord, FailureStage};

/// What a task renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// A navigable document
    Page(NodeId),
    /// A `converts` entry, outside the navigation
    Convert,
    /// The aggregate of every navigable document
    Aggregate,
}

/// Where a task's source text comes from.
#[derive(Debug, Clone)]
pub enum TaskSource {
    File(PathBuf),
    Aggregate(AggregateSource),
}

/// One document to compile.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    pub kind: TaskKind,
    pub source: TaskSource,
    /// Source-relative path used in logs and failure records
    pub rel_path: PathBuf,
    /// Site-relative destination
    pub dest: PathBuf,
    /// Navigation title, when the page has one
    pub title: Option<String>,
    pub attributes: Attributes,
}

/// A compiled task, waiting for the page shell.
#[derive(Debug, Clone)]
pub struct Converted {
    pub task: ConversionTask,
    pub body: RenderedBody,
    /// Source modification time seen before compiling; `None` for the aggregate
    pub modified: Option<SystemTime>,
    /// Taken from the build cache instead of the compiler
    pub reused: bool,
}

#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Rendered(Converted),
    Failed(FailureRecord),
    /// Never dispatched because a fail-fast abort came first
    Skipped(PathBuf),
}

/// Builds every conversion task of a book.
///
/// Pages come first in preorder, then `converts`, then the aggregate document.
pub fn plan_tasks(
    book: &Book,
    layout: &BookLayout,
    numbering: &Numbering,
    links: &LinkResolver,
) -> Vec<ConversionTask> {
    let manifest = &book.manifest;
    let options = links.expand_options(&manifest.compiler_options);
    let src_dir = links.src_dir();

    let attributes = |rel: &Path, dest: &Path, node: Option<NodeId>| {
        let assets = links.assets();
        let outdir = links
            .site_path(dest)
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let mut attrs = Attributes::new()
            .with("base_url", links.base_url())
            .with("src_dir", src_dir.display().to_string())
            .with("dst_dir", links.site_dir().display().to_string())
            .with("outdir", outdir)
            .with("stylesdir", assets.stylesdir)
            .with("imagesdir", assets.imagesdir)
            .with(
                "docname",
                rel.file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );

        if let Some(id) = node {
            attrs.insert("folio-active", layout.tree.get(id).id.clone());
            attrs.insert("folio-number", numbering.get(id).to_string());
        }

        attrs.with_options(options.clone())
    };

    let mut tasks = Vec::new();

    for (id, page) in layout.tree.pages() {
        let dest = links.dest_rel(page);
        tasks.push(ConversionTask {
            kind: TaskKind::Page(id),
            source: TaskSource::File(src_dir.join(page)),
            rel_path: page.to_path_buf(),
            attributes: attributes(page, &dest, Some(id)),
            title: Some(layout.tree.get(id).title.clone()),
            dest,
        });
    }

    for convert in &layout.converts {
        let dest = links.dest_rel(convert);
        tasks.push(ConversionTask {
            kind: TaskKind::Convert,
            source: TaskSource::File(src_dir.join(convert)),
            rel_path: convert.clone(),
            attributes: attributes(convert, &dest, None),
            title: manifest.title_for(convert).map(str::to_string),
            dest,
        });
    }

    if manifest.generate_all {
        match AggregateSource::from_tree(&manifest.title, &layout.tree, src_dir) {
            Some(aggregate) => {
                let rel_path = PathBuf::from(aggregate.file_name());
                let dest = PathBuf::from("all.html");
                tasks.push(ConversionTask {
                    kind: TaskKind::Aggregate,
                    attributes: attributes(&rel_path, &dest, None),
                    source: TaskSource::Aggregate(aggregate),
                    title: Some(manifest.title.clone()),
                    rel_path,
                    dest,
                });
            }
            None => tracing::warn!("generate_all is set but the book has no documents"),
        }
    }

    tasks
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AggregatePart {
    Document { path: PathBuf, depth: usize },
    Heading { title: String, depth: usize },
}

/// A single document including every navigable document in numbered order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSource {
    syntax: Syntax,
    title: String,
    parts: Vec<AggregatePart>,
    base_dir: PathBuf,
}

impl AggregateSource {
    /// AsciiDoc when the book has any AsciiDoc page, Markdown otherwise; `None` without pages.
    ///
    /// Pages in the other syntax are left out with a warning.
    pub fn from_tree(title: &str, tree: &BookTree, src_dir: &Path) -> Option<Self> {
        let syntaxes: Vec<_> = tree
            .pages()
            .filter_map(|(_, p)| Syntax::from_path(p))
            .collect();
        let syntax = if syntaxes.contains(&Syntax::AsciiDoc) {
            Syntax::AsciiDoc
        } else if syntaxes.contains(&Syntax::Markdown) {
            Syntax::Markdown
        } else {
            return None;
        };

        let mut parts = Vec::new();
        for id in tree.preorder() {
            let node = tree.get(id);
            match node.page() {
                Some(page) if Syntax::from_path(page) == Some(syntax) => {
                    parts.push(AggregatePart::Document {
                        path: page.to_path_buf(),
                        depth: node.depth,
                    })
                }
                Some(page) => {
                    tracing::warn!(
                        "Leaving {} out of the aggregate document",
                        page.display()
                    );
                }
                None => parts.push(AggregatePart::Heading {
                    title: node.title.clone(),
                    depth: node.depth,
                }),
            }
        }

        Some(Self {
            syntax,
            title: title.to_string(),
            parts,
            base_dir: src_dir.to_path_buf(),
        })
    }

    pub fn file_name(&self) -> String {
        format!("all.{}", self.syntax.extension())
    }

    /// Generates the aggregate text.
    pub fn synthesize(&self) -> Result<SourceInput, CompileError> {
        let text = match self.syntax {
            Syntax::AsciiDoc => self.asciidoc(),
            Syntax::Markdown => self.markdown()?,
        };

        Ok(SourceInput::Virtual {
            name: self.file_name(),
            text,
            base_dir: self.base_dir.clone(),
        })
    }

    fn asciidoc(&self) -> String {
        let mut out = format!("= {}\n", self.title);
        for part in &self.parts {
            out.push('\n');
            match part {
                AggregatePart::Document { path, depth } => {
                    out.push_str(&format!(
                        "include::{}[leveloffset=+{}]\n",
                        slash_path(path),
                        depth + 1
                    ));
                }
                AggregatePart::Heading { title, depth } => {
                    out.push_str(&format!("{} {}\n", "=".repeat(depth + 2), title));
                }
            }
        }
        out
    }

    fn markdown(&self) -> Result<String, CompileError> {
        let mut out = format!("# {}\n", self.title);
        for part in &self.parts {
            out.push('\n');
            match part {
                AggregatePart::Document { path, depth } => {
                    let full = self.base_dir.join(path);
                    let text = fs::read_to_string(&full)
                        .map_err(|source| CompileError::Read { path: full, source })?;
                    let (_, content) = split_front_matter(&text)?;
                    out.push_str(&shift_headings(content, depth + 1));
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                AggregatePart::Heading { title, depth } => {
                    out.push_str(&format!("{} {}\n", "#".repeat((depth + 2).min(6)), title));
                }
            }
        }
        Ok(out)
    }
}

/// Pushes ATX headings `by` levels down, outside fenced code blocks. Levels stop at 6.
fn shift_headings(content: &str, by: usize) -> String {
    let mut out = String::with_capacity(content.len() + 16);
    let mut fence: Option<&str> = None;

    for line in content.lines() {
        let trimmed = line.trim_start();
        match fence {
            Some(marker) if trimmed.starts_with(marker) => fence = None,
            Some(_) => {}
            None if trimmed.starts_with("```") => fence = Some("```"),
            None if trimmed.starts_with("~~~") => fence = Some("~~~"),
            None => {
                let level = line.chars().take_while(|c| *c == '#').count();
                let rest = &line[level..];
                if (1..=6).contains(&level) && (rest.is_empty() || rest.starts_with(' ')) {
                    out.push_str(&"#".repeat((level + by).min(6)));
                    out.push_str(rest);
                    out.push('\n');
                    continue;
                }
            }
        }
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// Runs conversion tasks on a bounded worker pool.
pub struct Orchestrator<'a, C: ?Sized> {
    compiler: &'a C,
    jobs: usize,
    fail_fast: bool,
    cache: Option<&'a BuildCache>,
}

impl<'a, C: DocumentCompiler + ?Sized> Orchestrator<'a, C> {
    pub fn new(compiler: &'a C) -> Self {
        Self {
            compiler,
            jobs: default_jobs(),
            fail_fast: false,
            cache: None,
        }
    }

    /// Reuse bodies from `cache` for file sources that did not change.
    pub fn cache(mut self, cache: &'a BuildCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Stop dispatching new tasks after the first failure.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Executes every task; outcomes come back in task order.
    pub fn run(&self, tasks: Vec<ConversionTask>) -> Result<Vec<TaskOutcome>, BuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| BuildError::Pool(e.to_string()))?;

        tracing::info!("Converting {} documents on {} workers", tasks.len(), self.jobs);

        let abort = AtomicBool::new(false);
        let collected = Mutex::new(Vec::with_capacity(tasks.len()));

        pool.install(|| {
            tasks.into_par_iter().enumerate().for_each(|(seq, task)| {
                let outcome = if abort.load(Ordering::SeqCst) {
                    TaskOutcome::Skipped(task.rel_path)
                } else {
                    let outcome = self.execute(task);
                    if self.fail_fast && matches!(outcome, TaskOutcome::Failed(_)) {
                        tracing::warn!("Fail-fast: no new conversions will start");
                        abort.store(true, Ordering::SeqCst);
                    }
                    outcome
                };

                collected
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((seq, outcome));
            });
        });

        let mut outcomes = collected
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        outcomes.sort_by_key(|(seq, _)| *seq);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    fn execute(&self, task: ConversionTask) -> TaskOutcome {
        let modified = match &task.source {
            TaskSource::File(path) => source_modified(path),
            TaskSource::Aggregate(_) => None,
        };

        let cached = self
            .cache
            .zip(modified)
            .and_then(|(cache, modified)| cache.lookup(&task.rel_path, modified, &task.attributes));
        if let Some(body) = cached {
            tracing::debug!("Reusing {}", task.rel_path.display());
            return TaskOutcome::Rendered(Converted {
                body: body.clone(),
                task,
                modified,
                reused: true,
            });
        }

        tracing::debug!("Converting {}", task.rel_path.display());

        let input = match &task.source {
            TaskSource::File(path) => Ok(SourceInput::File(path.clone())),
            TaskSource::Aggregate(aggregate) => aggregate.synthesize(),
        };

        match input.and_then(|input| self.compiler.convert(&input, &task.attributes)) {
            Ok(body) => TaskOutcome::Rendered(Converted {
                task,
                body,
                modified,
                reused: false,
            }),
            Err(e) => TaskOutcome::Failed(FailureRecord::new(
                task.rel_path,
                FailureStage::Compile,
                e,
            )),
        }
    }
}

/// Available parallelism, or one worker when it cannot be determined.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_book::{BookManifest, TreeBuilder};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn book_with(files: &[(&str, &str)], manifest: &str) -> (TempDir, Book, BookLayout) {
        let temp = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = temp.path().join("src").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let manifest = BookManifest::from_toml_str(&format!("title = \"Book\"\n{manifest}"))
            .unwrap();
        let book = Book::new(temp.path(), manifest);
        let layout = TreeBuilder::new(&book, &["adoc", "md"]).build().unwrap();
        (temp, book, layout)
    }

    #[test]
    fn plans_pages_converts_and_aggregate() {
        let (_temp, book, layout) = book_with(
            &[
                ("intro.adoc", ""),
                ("ch1/a.adoc", ""),
                ("404.adoc", ""),
            ],
            "base_url = \"/book\"\ngenerate_all = true\nconverts = [\"404.adoc\"]\n\
             [[compiler_options]]\nname = \"-a\"\nvalues = [\"imagesdir={base_url}/img\"]",
        );
        let numbering = Numbering::assign(&layout.tree);
        let links = LinkResolver::new(&book);

        let tasks = plan_tasks(&book, &layout, &numbering, &links);
        let dests: Vec<_> = tasks.iter().map(|t| slash_path(&t.dest)).collect();

        assert_eq!(dests, vec!["intro.html", "ch1/a.html", "404.html", "all.html"]);
        assert_eq!(tasks[2].kind, TaskKind::Convert);
        assert_eq!(tasks[3].kind, TaskKind::Aggregate);

        let attrs = &tasks[1].attributes;
        assert_eq!(attrs.get("base_url"), Some("/book"));
        assert_eq!(attrs.get("imagesdir"), Some("/book/static/img"));
        assert_eq!(attrs.get("folio-number"), Some("2.1"));
        assert_eq!(attrs.get("docname"), Some("a"));
        assert_eq!(attrs.options()[0].values, vec!["imagesdir=/book/img"]);
        assert_eq!(tasks[2].attributes.get("folio-number"), None);
    }

    #[test]
    fn aggregate_includes_documents_in_numbered_order() {
        let (_temp, book, layout) = book_with(
            &[("intro.adoc", ""), ("ch1/a.adoc", ""), ("ch1/b.adoc", "")],
            "",
        );

        let aggregate =
            AggregateSource::from_tree("Book", &layout.tree, &book.src_dir()).unwrap();
        let SourceInput::Virtual { name, text, .. } = aggregate.synthesize().unwrap() else {
            panic!("aggregate should be virtual");
        };

        assert_eq!(name, "all.adoc");
        assert_eq!(
            text,
            "= Book\n\
             \ninclude::intro.adoc[leveloffset=+1]\n\
             \n== ch1\n\
             \ninclude::ch1/a.adoc[leveloffset=+2]\n\
             \ninclude::ch1/b.adoc[leveloffset=+2]\n"
        );
    }

    #[test]
    fn markdown_aggregate_concatenates_with_shifted_headings() {
        let (_temp, book, layout) = book_with(
            &[
                ("a.md", "---\ntitle: A\n---\n# A\n\nText.\n"),
                ("b/c.md", "# C\n\n```sh\n# not a heading\n```\n"),
            ],
            "",
        );

        let aggregate =
            AggregateSource::from_tree("Book", &layout.tree, &book.src_dir()).unwrap();
        let SourceInput::Virtual { name, text, .. } = aggregate.synthesize().unwrap() else {
            panic!("aggregate should be virtual");
        };

        assert_eq!(name, "all.md");
        assert_eq!(
            text,
            "# Book\n\n## A\n\nText.\n\n## b\n\n### C\n\n```sh\n# not a heading\n```\n"
        );
    }

    #[test]
    fn shifting_caps_heading_levels() {
        assert_eq!(shift_headings("##### Deep\n#hashtag\n", 3), "###### Deep\n#hashtag\n");
    }
}
