//! buildtrace - Bazel rules from a compiler invocation trace
//!
//! Reads the process executions recorded while a traditional build ran,
//! reconstructs every compile and link step, resolves the headers each source
//! includes and emits one `cc_test` rule per unit-test binary.
//!
//! # Pipeline
//!
//! - [`trace`]: JSON-lines trace reading
//! - [`compile`]: argument classification and header resolution
//! - [`profile`]: index of compile steps by object and link steps by output
//! - [`analysis`]: link-back aggregation into per-target facts
//! - [`rules`]: rule tree construction and rendering
//! - [`pipeline`]: the bounded worker pool and the end-to-end driver
//!
//! ```no_run
//! use buildtrace::{CompilerScanner, Config, PipelineOrchestrator};
//! use std::path::Path;
//!
//! let config = Config::default();
//! let scanner = CompilerScanner::new(&config.scanner);
//! let orchestrator = PipelineOrchestrator::new(&config, Box::new(scanner), None);
//! let generation = orchestrator.generate(Path::new("events.json"))?;
//! print!("{}", generation.to_bazel());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod compile;
pub mod config;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod rules;
pub mod trace;
pub mod util;

pub use analysis::{Analysis, AnalysisError, Analyzer, SkipReason, TargetFacts};
pub use compile::{
    ClassifyError, Classifier, Compilation, CompilationKind, CompilerScanner, DependencyScanner,
    ScanError,
};
pub use config::{Config, ConfigError};
pub use pipeline::{parallel_map, GeneratedRule, Generation, PipelineOrchestrator};
pub use profile::{Profile, ProfileError, ProfileSummary};
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use rules::{Call, Node, RuleKind, RuleSynthesizer};
pub use trace::{read_trace, Execution, TraceError};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
