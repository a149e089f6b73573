//! Structured compiler invocations
//!
//! A [`Compilation`] is one compiler run from the trace, broken down into the
//! pieces that matter for rule synthesis. Compile-only runs (`-c`) produce
//! objects; everything else is a link producing a binary. Both share the same
//! flag grammar and therefore the same type.

mod classifier;
mod headers;

pub use classifier::{ClassifyError, Classifier};
pub use headers::{parse_dependency_output, CompilerScanner, DependencyScanner, ScanError};

use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilationKind {
    /// `-c` was given; the output is an object file
    Compile,
    /// The output is a linked binary
    Link,
}

/// One classified compiler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compilation {
    pub kind: CompilationKind,

    /// Compiler executable as recorded in the trace
    pub executable: String,

    /// Raw argument vector, kept for diagnostics
    pub arguments: Vec<String>,

    pub working_dir: String,

    pub output: String,
    pub inputs: Vec<String>,

    /// `-D` values without the flag, e.g. `CRAS_DBUS`
    pub defines: Vec<String>,

    /// `-I` values without the flag, e.g. `../src/common`
    pub include_dirs: Vec<String>,

    /// `-l` values without the flag, e.g. `asound`
    pub libraries: Vec<String>,

    /// `-Wl,...` tokens, verbatim
    pub link_args: Vec<String>,

    /// Flags with no dependency meaning (`-O2`, `-Wall`, `-L dir`, ...)
    pub extra_flags: Vec<String>,

    #[serde(skip)]
    headers: OnceLock<Vec<String>>,
}

impl Compilation {
    pub(crate) fn new(
        kind: CompilationKind,
        executable: &str,
        arguments: &[String],
        working_dir: &str,
    ) -> Self {
        Self {
            kind,
            executable: executable.to_string(),
            arguments: arguments.to_vec(),
            working_dir: working_dir.to_string(),
            output: String::new(),
            inputs: Vec::new(),
            defines: Vec::new(),
            include_dirs: Vec::new(),
            libraries: Vec::new(),
            link_args: Vec::new(),
            extra_flags: Vec::new(),
            headers: OnceLock::new(),
        }
    }

    pub fn is_link(&self) -> bool {
        self.kind == CompilationKind::Link
    }

    /// Flags needed to re-run the preprocessor the way the build did:
    /// include directories, then defines, then the pass-through flags.
    pub fn flags(&self) -> Vec<String> {
        self.include_dirs
            .iter()
            .map(|inc| format!("-I{}", inc))
            .chain(self.defines.iter().map(|def| format!("-D{}", def)))
            .chain(self.extra_flags.iter().cloned())
            .collect()
    }

    /// The single source of a compile step, if it has exactly one input.
    pub fn source(&self) -> Option<&str> {
        match self.inputs.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Header list of this translation unit, resolved through `scanner` on
    /// first use and reused afterwards.
    pub fn headers(&self, scanner: &dyn DependencyScanner) -> Result<&[String], ScanError> {
        if let Some(headers) = self.headers.get() {
            return Ok(headers);
        }
        let resolved = scanner.scan(self)?;
        // Another worker may have won the race; both results are identical.
        let _ = self.headers.set(resolved);
        Ok(self.headers.get().map(Vec::as_slice).unwrap_or_default())
    }
}
