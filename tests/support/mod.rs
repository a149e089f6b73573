//! Shared helpers for integration tests

#![allow(dead_code)]

use buildtrace::{Compilation, DependencyScanner, ScanError};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const WORKING_DIR: &str = "/build/cras/src";

/// Builds a JSON-lines trace one execution at a time.
#[derive(Default)]
pub struct TraceBuilder {
    lines: Vec<String>,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exec(mut self, args: &[&str]) -> Self {
        let line = json!({
            "started": {
                "execution": {
                    "executable": format!("/usr/bin/{}", args[0]),
                    "arguments": args,
                    "working_dir": WORKING_DIR,
                }
            }
        });
        self.lines.push(line.to_string());
        self
    }

    /// `clang -c <flags> -o <object> <source>`
    pub fn compile(self, object: &str, source: &str, flags: &[&str]) -> Self {
        let mut args = vec!["clang", "-c"];
        args.extend_from_slice(flags);
        args.extend(["-o", object, source]);
        self.exec(&args)
    }

    /// `clang -o <output> <inputs...>`
    pub fn link(self, output: &str, inputs: &[&str]) -> Self {
        let mut args = vec!["clang", "-o", output];
        args.extend_from_slice(inputs);
        self.exec(&args)
    }

    /// A line that is not a started execution.
    pub fn other_event(mut self) -> Self {
        self.lines.push(r#"{"finished": {"exit_code": 0}}"#.to_string());
        self
    }

    pub fn text(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join("events.json");
        fs::write(&path, self.text()).unwrap();
        path
    }
}

/// Answers header queries from a fixed source → headers table and counts
/// how often it was asked.
#[derive(Default)]
pub struct TableScanner {
    headers: HashMap<String, Vec<String>>,
    calls: Arc<AtomicUsize>,
}

impl TableScanner {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        Self {
            headers: entries
                .iter()
                .map(|(src, hdrs)| (src.to_string(), hdrs.iter().map(|h| h.to_string()).collect()))
                .collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter that stays readable after the scanner is boxed.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl DependencyScanner for TableScanner {
    fn scan(&self, compilation: &Compilation) -> Result<Vec<String>, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let source = compilation.source().ok_or_else(|| ScanError::NoSingleSource {
            output: compilation.output.clone(),
            inputs: compilation.inputs.clone(),
        })?;
        Ok(self.headers.get(source).cloned().unwrap_or_default())
    }
}
