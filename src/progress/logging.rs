//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { trace_path } => {
                info!(trace = %trace_path, "Starting rule generation");
            }
            ProgressEvent::PhaseStarted { phase } => {
                debug!(phase = %phase, "Starting phase");
            }
            ProgressEvent::PhaseComplete { phase, duration } => {
                info!(
                    phase = %phase,
                    duration_ms = duration.as_millis(),
                    "Phase complete"
                );
            }
            ProgressEvent::TraceLoaded {
                executions,
                compilations,
                links,
            } => {
                info!(executions, compilations, links, "Trace loaded");
            }
            ProgressEvent::AnalysisStarted { targets, workers } => {
                info!(targets, workers, "Analyzing link targets");
            }
            ProgressEvent::TargetAnalyzed {
                target,
                sources,
                dependencies,
            } => {
                debug!(name = %target, sources, dependencies, "Target analyzed");
            }
            ProgressEvent::TargetSkipped { target, reason } => {
                warn!(name = %target, "{} is unsupported: {}", target, reason);
            }
            ProgressEvent::Completed { rules, total_time } => {
                info!(
                    rules,
                    total_time_ms = total_time.as_millis(),
                    "Rule generation complete"
                );
            }
            ProgressEvent::Failed { error } => {
                error!(error = %error, "Rule generation failed");
            }
        }
    }
}
