//! Extension-based compiler dispatch.

use std::path::Path;
use std::time::Duration;

use folio_book::BookManifest;

use crate::asciidoctor::AsciidoctorCompiler;
use crate::markdown::MarkdownCompiler;
use crate::traits::{Attributes, CompileError, DocumentCompiler, RenderedBody, SourceInput};

/// A set of compilers, chosen per document by file extension.
///
/// The first compiler registered for an extension wins.
#[derive(Default)]
pub struct CompilerSet {
    compilers: Vec<Box<dyn DocumentCompiler>>,
    extensions: Vec<&'static str>,
}

impl CompilerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// asciidoctor for AsciiDoc, pulldown-cmark for Markdown.
    pub fn builtin(timeout: Option<Duration>) -> Self {
        Self::new()
            .with(AsciidoctorCompiler::new().with_timeout(timeout))
            .with(MarkdownCompiler::new())
    }

    pub fn for_manifest(manifest: &BookManifest) -> Self {
        Self::builtin(manifest.compile_timeout_secs.map(Duration::from_secs))
    }

    pub fn with(mut self, compiler: impl DocumentCompiler + 'static) -> Self {
        for ext in compiler.extensions() {
            if !self.extensions.contains(ext) {
                self.extensions.push(*ext);
            }
        }
        self.compilers.push(Box::new(compiler));
        self
    }

    /// The compiler handling `path`, if any.
    pub fn find(&self, path: &Path) -> Option<&dyn DocumentCompiler> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.compilers
            .iter()
            .find(|c| c.extensions().contains(&ext.as_str()))
            .map(|c| &**c)
    }

    fn source_path<'a>(input: &'a SourceInput) -> &'a Path {
        match input {
            SourceInput::File(path) => path,
            SourceInput::Virtual { name, .. } => Path::new(name),
        }
    }
}

impl DocumentCompiler for CompilerSet {
    fn name(&self) -> &'static str {
        "compiler-set"
    }

    fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    fn convert(
        &self,
        input: &SourceInput,
        attrs: &Attributes,
    ) -> Result<RenderedBody, CompileError> {
        let compiler = self
            .find(Self::source_path(input))
            .ok_or_else(|| CompileError::Unsupported(input.display_name().to_string()))?;
        compiler.convert(input, attrs)
    }
}
