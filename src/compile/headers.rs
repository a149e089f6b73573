//! Header discovery through the real compiler
//!
//! Rather than parsing `#include` directives, the compiler that built the
//! object is re-run in dependency-discovery mode with the recorded include and
//! define flags. It prints a single Makefile rule `target: dep dep ...` whose
//! prerequisites are exactly the files the translation unit reads.

use super::Compilation;
use crate::config::ScannerConfig;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Object {output} does not have exactly one source: {inputs:?}")]
    NoSingleSource { output: String, inputs: Vec<String> },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dependency scan `{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Dependency scan output of {program} is not valid UTF-8")]
    NonUtf8 { program: String },

    #[error("Expected a dependency line for {target:?}, got: {output:?}")]
    MissingTarget { target: String, output: String },
}

/// Resolves the files a compilation reads, excluding its own source.
pub trait DependencyScanner: Send + Sync {
    fn scan(&self, compilation: &Compilation) -> Result<Vec<String>, ScanError>;
}

/// Scanner that shells out to the compiler
#[derive(Debug, Clone, Default)]
pub struct CompilerScanner {
    compiler: Option<String>,
    working_dir: Option<PathBuf>,
}

impl CompilerScanner {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            compiler: config.compiler.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    fn arguments(compilation: &Compilation, source: &str) -> Vec<String> {
        let mut args = compilation.flags();
        args.extend([
            "-M".to_string(),
            "-MT".to_string(),
            compilation.output.clone(),
            source.to_string(),
        ]);
        args
    }
}

impl DependencyScanner for CompilerScanner {
    fn scan(&self, compilation: &Compilation) -> Result<Vec<String>, ScanError> {
        let source = compilation
            .source()
            .ok_or_else(|| ScanError::NoSingleSource {
                output: compilation.output.clone(),
                inputs: compilation.inputs.clone(),
            })?;
        let program = self
            .compiler
            .clone()
            .unwrap_or_else(|| compilation.executable.clone());
        let working_dir = self
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&compilation.working_dir));
        let args = Self::arguments(compilation, source);

        debug!(
            program = %program,
            source = %source,
            cwd = %working_dir.display(),
            "Scanning dependencies"
        );

        let output = Command::new(&program)
            .args(&args)
            .current_dir(&working_dir)
            .output()
            .map_err(|source| ScanError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ScanError::Failed {
                command: format!("{} {}", program, args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|_| ScanError::NonUtf8 { program })?;
        let deps = parse_dependency_output(&stdout, &compilation.output, source)?;
        trace!(source = %source, headers = deps.len(), "Dependencies resolved");
        Ok(deps)
    }
}

/// Parses the `target: dep dep \` rule printed by `-M`, dropping `source`.
pub fn parse_dependency_output(
    output: &str,
    target: &str,
    source: &str,
) -> Result<Vec<String>, ScanError> {
    let joined = output.replace("\\\r\n", " ").replace("\\\n", " ");
    let line = joined.lines().next().unwrap_or_default().trim();

    let Some(deps) = line.strip_prefix(&format!("{}:", target)) else {
        return Err(ScanError::MissingTarget {
            target: target.to_string(),
            output: output.to_string(),
        });
    };

    Ok(deps
        .split_whitespace()
        .filter(|dep| *dep != source && *dep != "\\")
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::CompilationKind;

    #[test]
    fn test_parse_single_line() {
        let deps = parse_dependency_output(
            "foo.o: src/common/foo.c src/common/foo.h /usr/include/stdio.h\n",
            "foo.o",
            "src/common/foo.c",
        )
        .unwrap();
        assert_eq!(deps, vec!["src/common/foo.h", "/usr/include/stdio.h"]);
    }

    #[test]
    fn test_parse_continuation_lines() {
        let output = "common/.libs/a.o: ../../src/common/a.c \\\n  \
                      ../../src/common/a.h \\\n  \
                      ../../src/common/b.h\n";
        let deps =
            parse_dependency_output(output, "common/.libs/a.o", "../../src/common/a.c").unwrap();
        assert_eq!(deps, vec!["../../src/common/a.h", "../../src/common/b.h"]);
    }

    #[test]
    fn test_parse_crlf_continuation() {
        let deps = parse_dependency_output("a.o: a.c \\\r\n b.h\r\n", "a.o", "a.c").unwrap();
        assert_eq!(deps, vec!["b.h"]);
    }

    #[test]
    fn test_parse_missing_target() {
        let err = parse_dependency_output("b.o: b.c\n", "a.o", "a.c").unwrap_err();
        assert!(matches!(err, ScanError::MissingTarget { ref target, .. } if target == "a.o"));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_dependency_output("", "a.o", "a.c").is_err());
    }

    fn compilation(inputs: &[&str]) -> Compilation {
        let mut c = Compilation::new(CompilationKind::Compile, "clang", &[], "/tmp");
        c.output = "x.o".to_string();
        c.include_dirs.push("src/common".to_string());
        c.defines.push("HAVE_X=1".to_string());
        c.inputs = inputs.iter().map(|s| s.to_string()).collect();
        c
    }

    #[test]
    fn test_scanner_arguments() {
        let c = compilation(&["x.c"]);
        assert_eq!(
            CompilerScanner::arguments(&c, "x.c"),
            vec!["-Isrc/common", "-DHAVE_X=1", "-M", "-MT", "x.o", "x.c"]
        );
    }

    #[test]
    fn test_scanner_rejects_multiple_sources() {
        let scanner = CompilerScanner::default();
        let err = scanner.scan(&compilation(&["x.c", "y.c"])).unwrap_err();
        assert!(matches!(err, ScanError::NoSingleSource { .. }));
    }

    #[test]
    fn test_scanner_missing_compiler() {
        let scanner = CompilerScanner::new(&ScannerConfig {
            compiler: Some("/nonexistent/clang".to_string()),
            working_dir: Some(std::env::temp_dir()),
        });
        let err = scanner.scan(&compilation(&["x.c"])).unwrap_err();
        assert!(matches!(err, ScanError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_scanner_reports_compiler_failure() {
        let scanner = CompilerScanner::new(&ScannerConfig {
            compiler: Some("false".to_string()),
            working_dir: Some(std::env::temp_dir()),
        });
        let err = scanner.scan(&compilation(&["x.c"])).unwrap_err();
        assert!(matches!(err, ScanError::Failed { .. }));
    }
}
