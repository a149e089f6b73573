//! Recorded build traces
//!
//! A trace is a newline-delimited JSON log where every line describes one event
//! of the traced build. Only events carrying a started [`Execution`] matter to
//! the pipeline; everything else is ignored.

mod reader;

pub use reader::{read_trace, read_trace_from, TraceError};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One subprocess invocation recorded during the legacy build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Path of the executable that was started
    #[serde(default)]
    pub executable: String,

    /// Full argument vector, including `argv[0]`
    #[serde(default)]
    pub arguments: Vec<String>,

    /// Directory the process was started in
    #[serde(default)]
    pub working_dir: String,
}

impl Execution {
    pub fn new(
        executable: impl Into<String>,
        arguments: Vec<String>,
        working_dir: impl Into<String>,
    ) -> Self {
        Self {
            executable: executable.into(),
            arguments,
            working_dir: working_dir.into(),
        }
    }

    /// Base name of `argv[0]`, which is what the tool dispatch keys on.
    pub fn tool_name(&self) -> Option<&str> {
        let argv0 = self.arguments.first()?;
        Path::new(argv0).file_name().and_then(|n| n.to_str())
    }
}

#[derive(Debug, Deserialize)]
struct Started {
    execution: Execution,
}

/// A single trace line
#[derive(Debug, Deserialize)]
pub(crate) struct Event {
    #[serde(default)]
    started: Option<Started>,
}

impl Event {
    pub(crate) fn into_execution(self) -> Option<Execution> {
        self.started.map(|s| s.execution)
    }
}
