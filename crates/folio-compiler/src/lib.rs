//! Document compilers for folio.
//!
//! A [`DocumentCompiler`] turns one source document and a set of computed attributes into an
//! HTML body plus the metadata the page shell needs. [`CompilerSet`] dispatches by file
//! extension.

pub mod asciidoctor;
pub mod markdown;
pub mod set;
pub mod traits;

pub use asciidoctor::AsciidoctorCompiler;
pub use markdown::MarkdownCompiler;
pub use set::CompilerSet;
pub use traits::{
    Attributes, CompileError, DocumentCompiler, DocumentMetadata, RenderedBody, SourceInput,
};
