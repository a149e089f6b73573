//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while turning a trace into rules
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Generation started
    Started { trace_path: String },

    /// A pipeline phase started
    PhaseStarted { phase: String },

    /// A pipeline phase finished
    PhaseComplete { phase: String, duration: Duration },

    /// The trace has been folded into a profile
    TraceLoaded {
        executions: usize,
        compilations: usize,
        links: usize,
    },

    /// Analysis fan-out started
    AnalysisStarted { targets: usize, workers: usize },

    /// A link target produced facts for a rule
    TargetAnalyzed {
        target: String,
        sources: usize,
        dependencies: usize,
    },

    /// A link target was left out of the output
    TargetSkipped { target: String, reason: String },

    /// Generation completed successfully
    Completed { rules: usize, total_time: Duration },

    /// Generation failed
    Failed { error: String },
}

/// Trait for handling progress events
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
