//! End-to-end rule generation
//!
//! Trace reading and profile folding run up front on the calling thread, link
//! analysis fans out over [`executor::parallel_map`], and sorting and
//! rendering happen after fan-in.

pub mod executor;
mod orchestrator;

pub use executor::parallel_map;
pub use orchestrator::{GeneratedRule, Generation, PipelineOrchestrator};
