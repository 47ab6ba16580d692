//! Static site assembly for folio books.
//!
//! Resolves links, renders the sidebar once, converts every document on a worker pool and
//! writes the merged pages, copied files and default theme into the site directory.

pub mod assets;
pub mod builder;
pub mod cache;
pub mod convert;
pub mod links;
pub mod plan;
pub mod report;
pub mod sidebar;
pub mod templates;

pub use builder::{BuildError, StaticBuilder};
pub use cache::{BuildCache, CacheMode};
pub use convert::{ConversionTask, Orchestrator, TaskKind, TaskOutcome};
pub use links::{AssetRoots, LinkResolver};
pub use plan::{OutputOrigin, SitePlan};
pub use report::{BuildReport, FailureRecord, FailureStage};
pub use sidebar::{Sidebar, SidebarItem, SidebarView};
pub use templates::{PageShell, ShellContext, ShellError, TemplateEngine};
