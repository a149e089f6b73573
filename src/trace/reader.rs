use super::{Event, Execution};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Failed to read trace {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed trace record at {path}:{line}: {source}")]
    Malformed {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads every started execution from a newline-delimited JSON trace file.
pub fn read_trace(path: &Path) -> Result<Vec<Execution>, TraceError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| TraceError::Io {
        path: display.clone(),
        source,
    })?;
    read_trace_from(BufReader::new(file), &display)
}

/// Same as [`read_trace`] over any buffered reader; `name` only labels errors.
pub fn read_trace_from<R: BufRead>(reader: R, name: &str) -> Result<Vec<Execution>, TraceError> {
    let mut executions = Vec::new();
    let mut ignored = 0usize;

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| TraceError::Io {
            path: name.to_string(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = serde_json::from_str(&line).map_err(|source| TraceError::Malformed {
            path: name.to_string(),
            line: i + 1,
            source,
        })?;
        match event.into_execution() {
            Some(execution) => executions.push(execution),
            None => ignored += 1,
        }
    }

    debug!(
        trace = %name,
        executions = executions.len(),
        ignored,
        "Trace loaded"
    );
    Ok(executions)
}
