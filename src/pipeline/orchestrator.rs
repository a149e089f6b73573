use super::executor::parallel_map;
use crate::analysis::{Analysis, Analyzer, SkipReason, TargetFacts};
use crate::compile::DependencyScanner;
use crate::config::Config;
use crate::profile::Profile;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::rules::RuleSynthesizer;
use crate::trace::{read_trace, Execution};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// One emitted test rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedRule {
    pub name: String,
    pub facts: TargetFacts,
    #[serde(skip)]
    pub text: String,
}

/// Everything produced for a trace, rules sorted by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub preamble: String,
    pub rules: Vec<GeneratedRule>,
}

impl Generation {
    /// BUILD file text: the preamble followed by one rule per target.
    pub fn to_bazel(&self) -> String {
        let mut out = self.preamble.clone();
        for rule in &self.rules {
            out.push_str(&rule.text);
            out.push('\n');
        }
        out
    }

    /// The per-target facts as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.rules).context("Failed to serialize rules")
    }
}

pub struct PipelineOrchestrator<'a> {
    config: &'a Config,
    scanner: Box<dyn DependencyScanner>,
    progress_handler: Option<Box<dyn ProgressHandler>>,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(
        config: &'a Config,
        scanner: Box<dyn DependencyScanner>,
        progress_handler: Option<Box<dyn ProgressHandler>>,
    ) -> Self {
        Self {
            config,
            scanner,
            progress_handler,
        }
    }

    fn report(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }

    fn phase<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.report(ProgressEvent::PhaseStarted {
            phase: name.to_string(),
        });
        let start = Instant::now();
        let result = f().with_context(|| format!("Phase {} failed", name))?;
        self.report(ProgressEvent::PhaseComplete {
            phase: name.to_string(),
            duration: start.elapsed(),
        });
        Ok(result)
    }

    /// Reads a trace file and folds it into a profile.
    pub fn load_profile(&self, trace_path: &Path) -> Result<Profile> {
        let executions = self.phase("Trace", || {
            read_trace(trace_path)
                .with_context(|| format!("Failed to load trace {}", trace_path.display()))
        })?;
        self.build_profile(&executions)
    }

    fn build_profile(&self, executions: &[Execution]) -> Result<Profile> {
        let profile = self.phase("Profile", || {
            Profile::from_executions(executions, &self.config.trace, &self.config.flags)
                .context("Trace does not match the known build tools and flags")
        })?;
        self.report(ProgressEvent::TraceLoaded {
            executions: executions.len(),
            compilations: profile.compilation_count(),
            links: profile.link_count(),
        });
        Ok(profile)
    }

    /// Runs the whole pipeline on a trace file.
    pub fn generate(&self, trace_path: &Path) -> Result<Generation> {
        let start = Instant::now();
        self.report(ProgressEvent::Started {
            trace_path: trace_path.display().to_string(),
        });

        let result = self
            .load_profile(trace_path)
            .and_then(|profile| self.generate_from_profile(&profile));
        self.finish(result, start)
    }

    /// Runs the pipeline on executions that are already in memory.
    pub fn generate_from_executions(&self, executions: &[Execution]) -> Result<Generation> {
        let start = Instant::now();
        let result = self
            .build_profile(executions)
            .and_then(|profile| self.generate_from_profile(&profile));
        self.finish(result, start)
    }

    fn finish(&self, result: Result<Generation>, start: Instant) -> Result<Generation> {
        match &result {
            Ok(generation) => {
                info!(rules = generation.rules.len(), "Generated rules");
                self.report(ProgressEvent::Completed {
                    rules: generation.rules.len(),
                    total_time: start.elapsed(),
                });
            }
            Err(e) => self.report(ProgressEvent::Failed {
                error: format!("{:#}", e),
            }),
        }
        result
    }

    /// Analyzes every link in parallel and renders the supported targets.
    pub fn generate_from_profile(&self, profile: &Profile) -> Result<Generation> {
        let targets = self.phase("Analyze", || self.analyze(profile))?;
        self.phase("Render", || Ok(self.render(targets)))
    }

    fn analyze(&self, profile: &Profile) -> Result<Vec<(String, TargetFacts)>> {
        let links = profile.links();
        let workers = self.config.worker_count();
        self.report(ProgressEvent::AnalysisStarted {
            targets: links.len(),
            workers,
        });

        let analyzer = Analyzer::new(
            profile,
            &self.config.paths,
            &self.config.mapping,
            self.scanner.as_ref(),
        );
        let results = parallel_map(&links, workers, |link| analyzer.analyze(link));

        let mut targets = Vec::new();
        for result in results {
            match result? {
                Analysis::Target { name, facts } => {
                    self.report(ProgressEvent::TargetAnalyzed {
                        target: name.clone(),
                        sources: facts.sources.len(),
                        dependencies: facts.dependencies.len(),
                    });
                    targets.push((name, facts));
                }
                Analysis::Skipped {
                    name,
                    reason: SkipReason::NotUnitTest,
                } => {
                    debug!(name = %name, "Not a unit test");
                }
                Analysis::Skipped { name, reason } => {
                    self.report(ProgressEvent::TargetSkipped {
                        target: name,
                        reason: reason.to_string(),
                    });
                }
            }
        }

        targets.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(targets)
    }

    fn render(&self, targets: Vec<(String, TargetFacts)>) -> Generation {
        let synthesizer = RuleSynthesizer::new(&self.config.paths, &self.config.support);
        let rules = targets
            .into_iter()
            .map(|(name, facts)| {
                let text = synthesizer.render_test(&name, &facts);
                GeneratedRule { name, facts, text }
            })
            .collect();

        Generation {
            preamble: synthesizer.preamble(),
            rules,
        }
    }
}
