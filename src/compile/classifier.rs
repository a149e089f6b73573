use super::{Compilation, CompilationKind};
use crate::config::FlagConfig;
use crate::trace::Execution;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    /// A flag outside the known grammar. Dropping it could silently change
    /// what the emitted rule builds, so it stops the run.
    #[error("Unhandled compiler flag {flag:?} (remaining arguments: {remaining:?})")]
    UnhandledFlag {
        flag: String,
        remaining: Vec<String>,
    },

    #[error("Flag {flag:?} is missing its value")]
    MissingValue { flag: String },
}

/// Turns compiler executions into [`Compilation`]s.
pub struct Classifier<'a> {
    flags: &'a FlagConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(flags: &'a FlagConfig) -> Self {
        Self { flags }
    }

    /// Classifies one compiler run. Every argument after `argv[0]` must be
    /// consumed by exactly one rule of the grammar.
    pub fn classify(&self, execution: &Execution) -> Result<Compilation, ClassifyError> {
        let kind = if execution.arguments.iter().any(|a| a == "-c") {
            CompilationKind::Compile
        } else {
            CompilationKind::Link
        };
        let mut compilation = Compilation::new(
            kind,
            &execution.executable,
            &execution.arguments,
            &execution.working_dir,
        );

        let mut p = ArgCursor::new(&execution.arguments);
        while !p.done() {
            if !p.get().starts_with('-') {
                compilation.inputs.push(p.consume());
            } else if let Some(define) = p.consume_short_flag("-D")? {
                compilation.defines.push(define);
            } else if let Some(include_dir) = p.consume_short_flag("-I")? {
                compilation.include_dirs.push(include_dir);
            } else if let Some(output) = p.consume_short_flag("-o")? {
                compilation.output = output;
            } else if let Some(lib) = p.consume_short_flag("-l")? {
                compilation.libraries.push(lib);
            } else if let Some(flags) = self.consume_extra(&mut p)? {
                compilation.extra_flags.extend(flags);
            } else if p.consume_dependency()? {
                // Dependency-file bookkeeping, meaningless downstream.
            } else if p.get().starts_with("-Wl,") {
                compilation.link_args.push(p.consume());
            } else {
                return Err(ClassifyError::UnhandledFlag {
                    flag: p.get().to_string(),
                    remaining: p.remaining(),
                });
            }
        }

        Ok(compilation)
    }

    /// Flags that are kept verbatim but carry no dependency information.
    fn consume_extra(&self, p: &mut ArgCursor<'_>) -> Result<Option<Vec<String>>, ClassifyError> {
        let arg = p.get();
        if self.flags.passthrough_with_value.iter().any(|f| f == arg) {
            let flag = p.consume();
            let value = p.consume_value(&flag)?;
            return Ok(Some(vec![flag, value]));
        }
        if self
            .flags
            .passthrough_prefixes
            .iter()
            .any(|prefix| arg.starts_with(prefix.as_str()))
        {
            return Ok(Some(vec![p.consume()]));
        }
        if arg.starts_with("-W") && !arg.starts_with("-Wl") {
            return Ok(Some(vec![p.consume()]));
        }
        Ok(None)
    }
}

/// Left-to-right cursor over an argument vector, starting after `argv[0]`.
struct ArgCursor<'a> {
    args: &'a [String],
    i: usize,
}

impl<'a> ArgCursor<'a> {
    fn new(args: &'a [String]) -> Self {
        Self { args, i: 1 }
    }

    fn done(&self) -> bool {
        self.i >= self.args.len()
    }

    fn get(&self) -> &'a str {
        &self.args[self.i]
    }

    fn consume(&mut self) -> String {
        self.i += 1;
        self.args[self.i - 1].clone()
    }

    fn consume_value(&mut self, flag: &str) -> Result<String, ClassifyError> {
        if self.done() {
            return Err(ClassifyError::MissingValue {
                flag: flag.to_string(),
            });
        }
        Ok(self.consume())
    }

    fn remaining(&self) -> Vec<String> {
        self.args[self.i..].to_vec()
    }

    /// Parses `-Isrc/common` as well as `-I src/common`.
    fn consume_short_flag(&mut self, prefix: &str) -> Result<Option<String>, ClassifyError> {
        let Some(value) = self.get().strip_prefix(prefix) else {
            return Ok(None);
        };
        let value = value.to_string();
        self.i += 1;
        if value.is_empty() {
            return self.consume_value(prefix).map(Some);
        }
        Ok(Some(value))
    }

    fn consume_dependency(&mut self) -> Result<bool, ClassifyError> {
        match self.get() {
            "-MD" | "-MP" | "-c" => {
                self.consume();
                Ok(true)
            }
            "-MT" | "-MF" => {
                let flag = self.consume();
                self.consume_value(&flag)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
