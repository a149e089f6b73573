//! Link-back analysis
//!
//! Starting from a link step, walks each input object back through the
//! [`Profile`] to the compile step that produced it and aggregates sources,
//! headers, include directories and defines into [`TargetFacts`]. Archives,
//! include directories and libraries are mapped to dependency labels through
//! the configured tables.
//!
//! Two outcomes are expected and non-fatal: the link output is not a unit test,
//! or the target needs something that cannot be expressed yet (an archive with
//! no label, the native bridge). Those yield [`Analysis::Skipped`]. Anything
//! else that does not fit the tables is an error so the tables get extended
//! instead of a wrong rule being emitted.

mod facts;
pub mod paths;

pub use facts::TargetFacts;

use crate::compile::{Compilation, DependencyScanner, ScanError};
use crate::config::{MappingConfig, PathConfig};
use crate::profile::Profile;
use facts::sort_dedup;
use paths::{canon_path, parent};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{target} links {object}, which no compile step in the trace produced")]
    MissingObject { target: String, object: String },

    #[error("{object} was compiled from {inputs:?}; exactly one source is expected")]
    MultipleSources { object: String, inputs: Vec<String> },

    #[error("Failed to resolve headers of {object}: {source}")]
    Scan {
        object: String,
        #[source]
        source: ScanError,
    },

    #[error("{target} uses include directory {dir} which has no dependency mapping")]
    UnmappedIncludeDir { target: String, dir: String },

    #[error("{target} links library {library} which has no dependency mapping")]
    UnmappedLibrary { target: String, library: String },
}

/// Why a link target produced no rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotUnitTest,
    UnmappedArchive(String),
    NativeBridge(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotUnitTest => write!(f, "not a unit test"),
            SkipReason::UnmappedArchive(archive) => write!(f, "unmapped archive {}", archive),
            SkipReason::NativeBridge(dir) => write!(f, "depends on native bridge {}", dir),
        }
    }
}

/// Result of analyzing one link target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    Target { name: String, facts: TargetFacts },
    Skipped { name: String, reason: SkipReason },
}

impl Analysis {
    pub fn name(&self) -> &str {
        match self {
            Analysis::Target { name, .. } | Analysis::Skipped { name, .. } => name,
        }
    }
}

pub struct Analyzer<'a> {
    profile: &'a Profile,
    paths: &'a PathConfig,
    mapping: &'a MappingConfig,
    scanner: &'a dyn DependencyScanner,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        profile: &'a Profile,
        paths: &'a PathConfig,
        mapping: &'a MappingConfig,
        scanner: &'a dyn DependencyScanner,
    ) -> Self {
        Self {
            profile,
            paths,
            mapping,
            scanner,
        }
    }

    fn canon(&self, path: &str) -> String {
        canon_path(path, &self.paths.source_prefix)
    }

    /// Aggregates the facts of one link step.
    pub fn analyze(&self, link: &Compilation) -> Result<Analysis, AnalysisError> {
        let name = link.output.clone();
        if !name.ends_with(self.paths.unit_test_suffix.as_str()) {
            return Ok(Analysis::Skipped {
                name,
                reason: SkipReason::NotUnitTest,
            });
        }

        let (archives, objects): (Vec<&String>, Vec<&String>) =
            link.inputs.iter().partition(|input| input.ends_with(".a"));

        let mut facts = TargetFacts::default();
        let mut unmapped = None;
        for archive in archives {
            match self.mapping.archives.get(archive.as_str()) {
                Some(label) => facts.dependencies.push(label.clone()),
                None => {
                    unmapped.get_or_insert_with(|| archive.clone());
                }
            }
        }

        // Every object must trace back to a single-source compile step, even
        // for targets that end up skipped.
        let mut steps = Vec::with_capacity(objects.len());
        for object in objects {
            let compilation = self.profile.compilation(object).ok_or_else(|| {
                AnalysisError::MissingObject {
                    target: name.clone(),
                    object: object.clone(),
                }
            })?;
            let source = compilation
                .source()
                .ok_or_else(|| AnalysisError::MultipleSources {
                    object: compilation.output.clone(),
                    inputs: compilation.inputs.clone(),
                })?;
            steps.push((compilation, source));
        }

        if let Some(archive) = unmapped {
            return Ok(Analysis::Skipped {
                name,
                reason: SkipReason::UnmappedArchive(archive),
            });
        }

        for (compilation, source) in steps {
            self.collect(compilation, source, &mut facts)?;
        }
        facts.normalize();

        if let Some(bridge) = facts
            .include_dirs
            .iter()
            .find(|dir| self.paths.native_bridge_includes.contains(*dir))
        {
            return Ok(Analysis::Skipped {
                name,
                reason: SkipReason::NativeBridge(bridge.clone()),
            });
        }

        // Test-local headers live next to the test sources and are listed
        // with them.
        let test_headers: Vec<String> = facts
            .headers
            .iter()
            .filter(|hdr| parent(hdr) == self.paths.test_sources_dir)
            .cloned()
            .collect();
        facts.sources.extend(test_headers);
        facts
            .sources
            .retain(|src| !self.mapping.excluded_sources.contains(src));

        self.map_dependencies(&name, link, &mut facts)?;

        if self.mapping.section_targets.contains(&name) {
            facts.copts.extend(self.mapping.section_copts.iter().cloned());
        }
        if self.mapping.broken_tests.contains(&name) {
            facts.tags.push("broken".to_string());
        }
        facts.normalize();

        debug!(
            name = %name,
            sources = facts.sources.len(),
            headers = facts.headers.len(),
            deps = facts.dependencies.len(),
            "Target analyzed"
        );
        Ok(Analysis::Target { name, facts })
    }

    fn collect(
        &self,
        compilation: &Compilation,
        source: &str,
        facts: &mut TargetFacts,
    ) -> Result<(), AnalysisError> {
        facts.sources.push(self.canon(source));

        let headers = compilation
            .headers(self.scanner)
            .map_err(|source| AnalysisError::Scan {
                object: compilation.output.clone(),
                source,
            })?;
        facts.headers.extend(headers.iter().map(|hdr| self.canon(hdr)));

        facts.include_dirs.extend(
            compilation
                .include_dirs
                .iter()
                .filter(|inc| !inc.starts_with('/'))
                .map(|inc| self.canon(inc)),
        );
        facts.defines.extend(compilation.defines.iter().cloned());
        Ok(())
    }

    fn map_dependencies(
        &self,
        name: &str,
        link: &Compilation,
        facts: &mut TargetFacts,
    ) -> Result<(), AnalysisError> {
        let mut deps = Vec::new();

        for dir in &facts.include_dirs {
            if self.mapping.ignored_include_dirs.contains(dir) {
                continue;
            }
            let label = self.mapping.include_dirs.get(dir).ok_or_else(|| {
                AnalysisError::UnmappedIncludeDir {
                    target: name.to_string(),
                    dir: dir.clone(),
                }
            })?;
            deps.push(label.clone());
        }

        for lib in &link.libraries {
            if self.mapping.ignored_libraries.contains(lib) {
                continue;
            }
            let label = self.mapping.libraries.get(lib).ok_or_else(|| {
                AnalysisError::UnmappedLibrary {
                    target: name.to_string(),
                    library: lib.clone(),
                }
            })?;
            deps.push(label.clone());
        }

        for hdr in &facts.headers {
            for (suffix, label) in &self.mapping.header_libraries {
                if hdr == suffix || hdr.ends_with(&format!("/{}", suffix)) {
                    deps.push(label.clone());
                }
            }
            if let Some(label) = self.mapping.generated_headers.get(hdr) {
                deps.push(label.clone());
            }
        }

        facts.dependencies.extend(deps);
        sort_dedup(&mut facts.dependencies);
        Ok(())
    }
}
