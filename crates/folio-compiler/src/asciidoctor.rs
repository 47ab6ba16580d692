//! External `asciidoctor` compiler.
//!
//! Runs `asciidoctor --embedded -o - -B <base> [-a name=value]... [options]... <file>` and reads
//! the body from stdout. Virtual sources are piped through stdin with `-` as the file.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use folio_book::DocumentHeader;

use crate::traits::{
    Attributes, CompileError, DocumentCompiler, DocumentMetadata, RenderedBody, SourceInput,
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Compiles AsciiDoc by spawning `asciidoctor`.
#[derive(Debug, Clone)]
pub struct AsciidoctorCompiler {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for AsciidoctorCompiler {
    fn default() -> Self {
        Self {
            program: PathBuf::from("asciidoctor"),
            timeout: None,
        }
    }
}

impl AsciidoctorCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Kill the child and fail once a compilation runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command line arguments for one document.
    pub fn args(&self, input: &SourceInput, attrs: &Attributes) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--embedded".into(),
            "-o".into(),
            "-".into(),
            "-B".into(),
            input.base_dir().as_os_str().to_owned(),
        ];

        for (name, value) in attrs.iter() {
            args.push("-a".into());
            args.push(format!("{name}={value}").into());
        }

        for option in attrs.options() {
            if option.values.is_empty() {
                args.push(option.name.clone().into());
            }
            for value in &option.values {
                args.push(option.name.clone().into());
                args.push(value.into());
            }
        }

        match input {
            SourceInput::File(path) => args.push(path.as_os_str().to_owned()),
            SourceInput::Virtual { .. } => args.push("-".into()),
        }

        args
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn run(&self, args: Vec<OsString>, stdin: Option<String>) -> Result<String, CompileError> {
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompileError::Spawn {
                program: self.program_name(),
                source,
            })?;

        let writer = match (stdin, child.stdin.take()) {
            (Some(text), Some(mut pipe)) => {
                Some(thread::spawn(move || pipe.write_all(text.as_bytes())))
            }
            _ => None,
        };
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.timeout {
            Some(limit) => match wait_until(&mut child, limit)? {
                Some(status) => status,
                None => {
                    tracing::warn!("Killing {} after {:?}", self.program_name(), limit);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CompileError::Timeout(limit));
                }
            },
            None => child.wait()?,
        };

        if let Some(writer) = writer {
            // A compiler may exit without reading its whole input; that shows up in the status.
            let _ = writer.join();
        }
        let stdout = join(stdout)?;
        let stderr = String::from_utf8_lossy(&join(stderr)?).trim().to_string();

        if !status.success() {
            return Err(CompileError::Failed {
                program: self.program_name(),
                status: status.to_string(),
                stderr,
            });
        }

        if !stderr.is_empty() {
            tracing::warn!("{}: {}", self.program_name(), stderr);
        }

        String::from_utf8(stdout).map_err(|_| CompileError::InvalidOutput)
    }
}

impl DocumentCompiler for AsciidoctorCompiler {
    fn name(&self) -> &'static str {
        "asciidoctor"
    }

    fn extensions(&self) -> &[&'static str] {
        &["adoc", "asciidoc", "asc"]
    }

    fn convert(
        &self,
        input: &SourceInput,
        attrs: &Attributes,
    ) -> Result<RenderedBody, CompileError> {
        let text = input.read_text()?;
        let header = DocumentHeader::asciidoc(&text).with_fallback(attrs.option_attrs());

        let stdin = match input {
            SourceInput::File(_) => None,
            SourceInput::Virtual { text, .. } => Some(text.clone()),
        };

        tracing::debug!("Compiling {} with {}", input.display_name(), self.name());
        let html = self.run(self.args(input, attrs), stdin)?;

        Ok(RenderedBody {
            html,
            metadata: DocumentMetadata::from_header(&header),
        })
    }
}

type Drain = thread::JoinHandle<std::io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut reader: R) -> Drain {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map(|_| buf)
    })
}

fn join(handle: Option<Drain>) -> Result<Vec<u8>, CompileError> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| std::io::Error::other("output reader panicked"))?
            .map_err(CompileError::from),
        None => Ok(Vec::new()),
    }
}

/// Waits for the child to exit; `None` once `limit` has passed.
fn wait_until(child: &mut Child, limit: Duration) -> Result<Option<ExitStatus>, CompileError> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= limit {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_book::CompilerOption;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn builds_command_line() {
        let attrs = Attributes::new()
            .with("base_url", "/book")
            .with("stylesdir", "/book/theme/css")
            .with_options(vec![
                CompilerOption {
                    name: "-a".to_string(),
                    values: vec!["linkcss".to_string(), "sectnums".to_string()],
                },
                CompilerOption {
                    name: "--trace".to_string(),
                    values: vec![],
                },
            ]);
        let input = SourceInput::File(PathBuf::from("/book/src/ch1/a.adoc"));

        let args = strings(AsciidoctorCompiler::new().args(&input, &attrs));

        assert_eq!(
            args,
            vec![
                "--embedded",
                "-o",
                "-",
                "-B",
                "/book/src/ch1",
                "-a",
                "base_url=/book",
                "-a",
                "stylesdir=/book/theme/css",
                "-a",
                "linkcss",
                "-a",
                "sectnums",
                "--trace",
                "/book/src/ch1/a.adoc",
            ]
        );
    }

    #[test]
    fn virtual_sources_read_stdin() {
        let input = SourceInput::Virtual {
            name: "all.adoc".to_string(),
            text: String::new(),
            base_dir: PathBuf::from("/book/src"),
        };

        let args = strings(AsciidoctorCompiler::new().args(&input, &Attributes::new()));

        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let compiler = AsciidoctorCompiler::new().with_program("/nonexistent/asciidoctor");
        let input = SourceInput::Virtual {
            name: "a.adoc".to_string(),
            text: "= A\n".to_string(),
            base_dir: PathBuf::from("."),
        };

        let err = compiler.convert(&input, &Attributes::new()).unwrap_err();

        assert!(matches!(err, CompileError::Spawn { .. }));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
            let path = dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn virtual_doc(text: &str) -> SourceInput {
            SourceInput::Virtual {
                name: "all.adoc".to_string(),
                text: text.to_string(),
                base_dir: Path::new(".").to_path_buf(),
            }
        }

        #[test]
        fn pipes_virtual_documents_and_reads_metadata() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = AsciidoctorCompiler::new().with_program(script(&dir, "echo", "cat"));
            let attrs = Attributes::new().with_options(vec![CompilerOption {
                name: "-a".to_string(),
                values: vec!["author=Fallback".to_string(), "email=a@b.c".to_string()],
            }]);

            let body = compiler
                .convert(&virtual_doc("= All\n:author: Ada\n\nText\n"), &attrs)
                .unwrap();

            assert_eq!(body.html, "= All\n:author: Ada\n\nText\n");
            assert_eq!(body.metadata.title.as_deref(), Some("All"));
            assert_eq!(body.metadata.author.as_deref(), Some("Ada"));
            assert_eq!(body.metadata.email.as_deref(), Some("a@b.c"));
        }

        #[test]
        fn nonzero_exit_is_a_failure() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = AsciidoctorCompiler::new()
                .with_program(script(&dir, "fail", "echo broken >&2\nexit 3"));

            let err = compiler
                .convert(&virtual_doc("= A\n"), &Attributes::new())
                .unwrap_err();

            match err {
                CompileError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn hung_compiler_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = AsciidoctorCompiler::new()
                .with_program(script(&dir, "hang", "exec sleep 5"))
                .with_timeout(Some(Duration::from_millis(100)));

            let start = Instant::now();
            let err = compiler
                .convert(&virtual_doc("= A\n"), &Attributes::new())
                .unwrap_err();

            assert!(matches!(err, CompileError::Timeout(_)));
            assert!(start.elapsed() < Duration::from_secs(4));
        }
    }
}
