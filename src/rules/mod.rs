//! Bazel rule synthesis
//!
//! Turns [`TargetFacts`](crate::analysis::TargetFacts) into `cc_test` rules and
//! renders the shared support library that every test depends on.

mod node;
mod synthesizer;

pub use node::{quote, Call, Node};
pub use synthesizer::{RuleKind, RuleSynthesizer};
