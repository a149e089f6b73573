//! Index of every compiler run in a trace
//!
//! The profile is built by folding trace executions one at a time and is
//! read-only afterwards, which makes it safe to share across analysis workers.

use crate::compile::{ClassifyError, Classifier, Compilation};
use crate::config::{FlagConfig, TraceConfig};
use crate::trace::Execution;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Trace execution of {executable} in {working_dir} has no arguments")]
    EmptyArguments {
        executable: String,
        working_dir: String,
    },

    /// A tool that is neither a compiler nor on the ignore list. It may
    /// produce build outputs the profile would then silently miss.
    #[error("Unrecognized build tool {tool:?}: {arguments:?} in {working_dir}")]
    UnknownTool {
        tool: String,
        arguments: Vec<String>,
        working_dir: String,
    },

    #[error("Failed to classify {arguments:?}: {source}")]
    Classify {
        arguments: Vec<String>,
        #[source]
        source: ClassifyError,
    },

    #[error("Compiler run {arguments:?} in {working_dir} names no output")]
    MissingOutput {
        arguments: Vec<String>,
        working_dir: String,
    },

    #[error("{output} is produced by two different compiler runs: {first:?} and {second:?}")]
    DuplicateOutput {
        output: String,
        first: Vec<String>,
        second: Vec<String>,
    },
}

/// Counters describing how a trace was folded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub executions: usize,
    pub ignored_tools: usize,
    pub version_probes: usize,
    pub foreign_working_dir: usize,
}

#[derive(Debug, Default)]
pub struct Profile {
    compilations: HashMap<String, Compilation>,
    links: HashMap<String, Compilation>,
    stats: ProfileStats,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds all executions of a trace into a profile.
    pub fn from_executions<'e>(
        executions: impl IntoIterator<Item = &'e Execution>,
        trace_config: &TraceConfig,
        flags: &FlagConfig,
    ) -> Result<Self, ProfileError> {
        let classifier = Classifier::new(flags);
        let mut profile = Self::new();
        for execution in executions {
            profile.handle(execution, trace_config, &classifier)?;
        }
        debug!(
            compilations = profile.compilations.len(),
            links = profile.links.len(),
            ignored = profile.stats.ignored_tools,
            "Profile built"
        );
        Ok(profile)
    }

    /// Routes one execution by tool name.
    pub fn handle(
        &mut self,
        execution: &Execution,
        trace_config: &TraceConfig,
        classifier: &Classifier<'_>,
    ) -> Result<(), ProfileError> {
        self.stats.executions += 1;
        let tool = execution
            .tool_name()
            .ok_or_else(|| ProfileError::EmptyArguments {
                executable: execution.executable.clone(),
                working_dir: execution.working_dir.clone(),
            })?;

        if trace_config.ignored_tools.iter().any(|t| t == tool) {
            self.stats.ignored_tools += 1;
            return Ok(());
        }
        if trace_config.compilers.iter().any(|c| c == tool) {
            return self.handle_compiler(execution, trace_config, classifier);
        }

        Err(ProfileError::UnknownTool {
            tool: tool.to_string(),
            arguments: execution.arguments.clone(),
            working_dir: execution.working_dir.clone(),
        })
    }

    fn handle_compiler(
        &mut self,
        execution: &Execution,
        trace_config: &TraceConfig,
        classifier: &Classifier<'_>,
    ) -> Result<(), ProfileError> {
        // `clang++ -V` version probes from configure
        if execution.arguments.len() == 2 && execution.arguments[1] == "-V" {
            self.stats.version_probes += 1;
            return Ok(());
        }
        if let Some(suffix) = &trace_config.working_dir_suffix {
            if !execution.working_dir.ends_with(suffix.as_str()) {
                trace!(
                    working_dir = %execution.working_dir,
                    "Skipping compiler run outside the build tree"
                );
                self.stats.foreign_working_dir += 1;
                return Ok(());
            }
        }

        let compilation = classifier.classify(execution).map_err(|source| {
            ProfileError::Classify {
                arguments: execution.arguments.clone(),
                source,
            }
        })?;
        if compilation.output.is_empty() {
            return Err(ProfileError::MissingOutput {
                arguments: compilation.arguments,
                working_dir: compilation.working_dir,
            });
        }
        self.insert(compilation)
    }

    fn insert(&mut self, compilation: Compilation) -> Result<(), ProfileError> {
        let index = if compilation.is_link() {
            &mut self.links
        } else {
            &mut self.compilations
        };

        if let Some(existing) = index.get(&compilation.output) {
            if existing.arguments == compilation.arguments {
                return Ok(());
            }
            return Err(ProfileError::DuplicateOutput {
                output: compilation.output.clone(),
                first: existing.arguments.clone(),
                second: compilation.arguments,
            });
        }
        index.insert(compilation.output.clone(), compilation);
        Ok(())
    }

    /// The compile step that produced `object`
    pub fn compilation(&self, object: &str) -> Option<&Compilation> {
        self.compilations.get(object)
    }

    pub fn link(&self, output: &str) -> Option<&Compilation> {
        self.links.get(output)
    }

    /// All link steps, ordered by output path
    pub fn links(&self) -> Vec<&Compilation> {
        let mut links: Vec<&Compilation> = self.links.values().collect();
        links.sort_by(|a, b| a.output.cmp(&b.output));
        links
    }

    pub fn compilation_count(&self) -> usize {
        self.compilations.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn stats(&self) -> ProfileStats {
        self.stats
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            stats: self.stats,
            compilations: self.compilations.len(),
            links: self
                .links()
                .into_iter()
                .map(|link| LinkSummary {
                    output: link.output.clone(),
                    inputs: link.inputs.clone(),
                    libraries: link.libraries.clone(),
                })
                .collect(),
        }
    }
}

/// Serializable overview printed by the `profile` command
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub stats: ProfileStats,
    pub compilations: usize,
    pub links: Vec<LinkSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkSummary {
    pub output: String,
    pub inputs: Vec<String>,
    pub libraries: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(args: &[&str]) -> Execution {
        Execution::new(
            format!("/usr/bin/{}", args[0]),
            args.iter().map(|s| s.to_string()).collect(),
            "/build/cras/src",
        )
    }

    fn fold(executions: &[Execution]) -> Result<Profile, ProfileError> {
        Profile::from_executions(executions, &TraceConfig::default(), &FlagConfig::default())
    }

    #[test]
    fn test_compile_and_link_are_indexed_separately() {
        let profile = fold(&[
            exec(&["clang", "-c", "-o", "foo.o", "foo.c"]),
            exec(&["clang", "-o", "foo_unittest", "foo.o", "-lgtest"]),
        ])
        .unwrap();

        assert_eq!(profile.compilation_count(), 1);
        assert_eq!(profile.link_count(), 1);
        assert_eq!(profile.compilation("foo.o").unwrap().inputs, vec!["foo.c"]);
        assert!(profile.link("foo_unittest").is_some());
        assert!(profile.compilation("foo_unittest").is_none());
    }

    #[test]
    fn test_compile_without_output_is_rejected() {
        let err = fold(&[
            exec(&["clang", "-c", "a.c"]),
            exec(&["clang", "-c", "b.c"]),
        ])
        .unwrap_err();

        assert!(matches!(
            err,
            ProfileError::MissingOutput { ref arguments, .. } if arguments[2] == "a.c"
        ));
    }

    #[test]
    fn test_ignored_tools_and_probes() {
        let profile = fold(&[
            exec(&["make", "all"]),
            exec(&["sh", "-c", "true"]),
            exec(&["clang++", "-V"]),
            exec(&["ar", "cru", "libx.a", "x.o"]),
        ])
        .unwrap();

        assert_eq!(profile.compilation_count(), 0);
        let stats = profile.stats();
        assert_eq!(stats.executions, 4);
        assert_eq!(stats.ignored_tools, 3);
        assert_eq!(stats.version_probes, 1);
    }

    #[test]
    fn test_unknown_tool_is_fatal() {
        let err = fold(&[exec(&["gcc", "-c", "x.c"])]).unwrap_err();
        assert!(matches!(err, ProfileError::UnknownTool { ref tool, .. } if tool == "gcc"));
    }

    #[test]
    fn test_empty_arguments_is_fatal() {
        let err = fold(&[Execution::new("/usr/bin/clang", vec![], "/b")]).unwrap_err();
        assert!(matches!(err, ProfileError::EmptyArguments { .. }));
    }

    #[test]
    fn test_classify_failure_carries_arguments() {
        let err = fold(&[exec(&["cc", "-pthread", "x.c"])]).unwrap_err();
        match err {
            ProfileError::Classify { arguments, .. } => {
                assert_eq!(arguments, vec!["cc", "-pthread", "x.c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_working_dir_filter() {
        let trace_config = TraceConfig {
            working_dir_suffix: Some("cras/src".to_string()),
            ..Default::default()
        };
        let mut foreign = exec(&["cc", "-c", "-o", "build.o", "build.c"]);
        foreign.working_dir = "/build/cras/src/server/rust/target".to_string();
        let executions = vec![foreign, exec(&["cc", "-c", "-o", "a.o", "a.c"])];

        let profile =
            Profile::from_executions(&executions, &trace_config, &FlagConfig::default()).unwrap();
        assert_eq!(profile.compilation_count(), 1);
        assert_eq!(profile.stats().foreign_working_dir, 1);
    }

    #[test]
    fn test_identical_rerun_tolerated() {
        let compile = exec(&["clang", "-c", "-o", "a.o", "a.c"]);
        let profile = fold(&[compile.clone(), compile]).unwrap();
        assert_eq!(profile.compilation_count(), 1);
    }

    #[test]
    fn test_conflicting_output_is_fatal() {
        let err = fold(&[
            exec(&["clang", "-c", "-o", "a.o", "a.c"]),
            exec(&["clang", "-c", "-o", "a.o", "b.c"]),
        ])
        .unwrap_err();
        assert!(matches!(err, ProfileError::DuplicateOutput { ref output, .. } if output == "a.o"));
    }

    #[test]
    fn test_links_sorted_and_summary() {
        let profile = fold(&[
            exec(&["clang", "-o", "b_unittest", "b.o"]),
            exec(&["clang", "-o", "a_unittest", "a.o", "-lm"]),
        ])
        .unwrap();
        let outputs: Vec<&str> = profile.links().iter().map(|l| l.output.as_str()).collect();
        assert_eq!(outputs, vec!["a_unittest", "b_unittest"]);

        let summary = profile.summary();
        assert_eq!(summary.links[0].libraries, vec!["m"]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["links"][1]["output"], "b_unittest");
    }
}
