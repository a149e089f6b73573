//! Output formatting for generated rules and trace summaries

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::pipeline::Generation;
use crate::profile::ProfileSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// BUILD file text
    Bazel,
    /// Per-target facts (machine-readable)
    Json,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, generation: &Generation) -> Result<String> {
        match self.format {
            OutputFormat::Bazel => Ok(generation.to_bazel()),
            OutputFormat::Json => generation.to_json(),
        }
    }

    /// Profile summaries are always JSON.
    pub fn format_profile(&self, summary: &ProfileSummary) -> Result<String> {
        serde_json::to_string_pretty(summary).context("Failed to serialize profile summary to JSON")
    }
}

/// Writes `content` to `path`, or to stdout when no path is given.
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write output to {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write output to stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TargetFacts;
    use crate::pipeline::GeneratedRule;
    use tempfile::TempDir;

    fn generation() -> Generation {
        Generation {
            preamble: "cc_library(\n    name = \"test_support\",\n)\n".to_string(),
            rules: vec![GeneratedRule {
                name: "a_unittest".to_string(),
                facts: TargetFacts {
                    sources: vec!["src/tests/a_unittest.cc".to_string()],
                    ..Default::default()
                },
                text: "cc_test(\n    name = \"a_unittest\",\n)".to_string(),
            }],
        }
    }

    #[test]
    fn test_format_bazel() {
        let output = OutputFormatter::new(OutputFormat::Bazel)
            .format(&generation())
            .unwrap();
        assert_eq!(
            output,
            concat!(
                "cc_library(\n    name = \"test_support\",\n)\n",
                "cc_test(\n    name = \"a_unittest\",\n)\n",
            )
        );
    }

    #[test]
    fn test_format_json() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format(&generation())
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["name"], "a_unittest");
        assert_eq!(parsed[0]["facts"]["sources"][0], "src/tests/a_unittest.cc");
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BUILD.bazel");
        write_output("cc_test()\n", Some(&path)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "cc_test()\n");
    }

    #[test]
    fn test_write_output_to_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("BUILD.bazel");
        let err = write_output("x", Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to write output"));
    }
}
