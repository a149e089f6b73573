//! Configuration management for buildtrace
//!
//! Every lookup table the pipeline consults lives here as plain immutable data:
//! the trace tool allow-list, the pass-through flag grammar, the archive,
//! include-directory and library label maps, and the per-target synthesis
//! tables. Components receive the section they need by shared reference, so
//! nothing in the pipeline reads hidden global state.
//!
//! The defaults reproduce the tables used to migrate the CRAS audio server
//! unit tests. A TOML file can replace any section; unspecified sections keep
//! their defaults.
//!
//! # Environment Variables
//!
//! - `BUILDTRACE_CONFIG`: Path to a TOML configuration file
//! - `BUILDTRACE_JOBS`: Worker count for per-target analysis
//! - `BUILDTRACE_SOURCE_ROOT`: Directory the compiler is re-run in for header
//!   discovery
//!
//! # Example
//!
//! ```no_run
//! use buildtrace::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("cras.toml"))).unwrap();
//! config.validate().unwrap();
//! println!("{} workers", config.worker_count());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "BUILDTRACE_CONFIG";
pub const JOBS_ENV: &str = "BUILDTRACE_JOBS";
pub const SOURCE_ROOT_ENV: &str = "BUILDTRACE_SOURCE_ROOT";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub trace: TraceConfig,
    pub flags: FlagConfig,
    pub paths: PathConfig,
    pub mapping: MappingConfig,
    pub support: SupportConfig,
    pub scanner: ScannerConfig,

    /// Worker count; defaults to the available hardware parallelism
    pub jobs: Option<usize>,
}

/// Which trace executions are of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Tool names handed to the classifier
    pub compilers: Vec<String>,

    /// Tool names that are known and skipped; anything else is fatal
    pub ignored_tools: Vec<String>,

    /// When set, compiler runs whose working directory does not end with this
    /// suffix are skipped (they come from nested builds such as cargo)
    pub working_dir_suffix: Option<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            compilers: strings(&["clang", "clang++", "cc"]),
            ignored_tools: strings(&[
                "make",
                "sh",
                "sed",
                "cp",
                "basename",
                "xxd",
                "rm",
                "mv",
                "cargo",
                "rustc",
                "mkdir",
                "cat",
                "build-script-build",
                "grep",
                "git",
                "diff",
                "sort",
                "ar",
                "ranlib",
                "ln",
                "tr",
                "chmod",
                "collect2",
                "ld",
                "find",
                "wc",
                "expr",
                "gawk",
            ]),
            working_dir_suffix: None,
        }
    }
}

/// Compiler flags that carry no dependency information but are kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagConfig {
    /// Flags matched by prefix, one token each
    pub passthrough_prefixes: Vec<String>,

    /// Flags matched exactly that also swallow the following token
    pub passthrough_with_value: Vec<String>,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            passthrough_prefixes: strings(&[
                "-O",
                "-g",
                "-f",
                "-m",
                "-std=",
                "-pie",
                "-nodefaultlibs",
                "-shared",
                "-L",
            ]),
            passthrough_with_value: strings(&["-L"]),
        }
    }
}

/// Source-tree layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Prefix relative trace paths are rebased under
    pub source_prefix: String,

    /// Directory whose files are referenced by target-local labels
    pub test_sources_dir: String,

    /// Only link outputs with this suffix become rules
    pub unit_test_suffix: String,

    /// Include directories of the unported native bridge
    pub native_bridge_includes: Vec<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            source_prefix: String::new(),
            test_sources_dir: "src/tests".to_string(),
            unit_test_suffix: "_unittest".to_string(),
            native_bridge_includes: strings(&["src/server/rust/include"]),
        }
    }
}

/// Label tables and per-target synthesis adjustments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Link input archive → dependency label
    pub archives: BTreeMap<String, String>,

    /// Include directory → dependency label
    pub include_dirs: BTreeMap<String, String>,

    /// Include directories that contribute no dependency
    pub ignored_include_dirs: Vec<String>,

    /// `-l` library name → dependency label
    pub libraries: BTreeMap<String, String>,

    /// Libraries provided by the toolchain or already implied elsewhere
    pub ignored_libraries: Vec<String>,

    /// Header path suffix → library label the header implies
    pub header_libraries: BTreeMap<String, String>,

    /// Targets that need function/data section splitting
    pub section_targets: Vec<String>,

    /// Copts added to `section_targets`
    pub section_copts: Vec<String>,

    /// Targets tagged as broken
    pub broken_tests: Vec<String>,

    /// Sources owned by a library target and never listed directly
    pub excluded_sources: Vec<String>,

    /// Generated header → label that produces it
    pub generated_headers: BTreeMap<String, String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        let archives = [
            "./.libs/libcrasmix_fma.a",
            "./.libs/libcrasmix_avx2.a",
            "./.libs/libcrasmix_avx.a",
            "./.libs/libcrasmix_sse42.a",
            "./.libs/libcrasmix.a",
        ]
        .iter()
        .map(|a| (a.to_string(), "//src/server:cras_mix".to_string()))
        .collect();

        let include_dirs = [
            "src/common",
            "src/server",
            "src/dsp",
            "src/server/config",
            "src/libcras",
            "src/plc",
        ]
        .iter()
        .map(|d| (d.to_string(), format!("//{}:all_headers", d)))
        .collect();

        let mut libraries: BTreeMap<String, String> = ["gtest", "gtest_main", "speexdsp"]
            .iter()
            .map(|l| (l.to_string(), format!("@pkg_config//:{}", l)))
            .collect();
        libraries.insert("asound".to_string(), "@pkg_config//:alsa".to_string());

        let header_libraries = [
            ("iniparser.h", "@pkg_config//:iniparser"),
            ("dbus/dbus.h", "@pkg_config//:dbus-1"),
        ]
        .iter()
        .map(|(h, l)| (h.to_string(), l.to_string()))
        .collect();

        Self {
            archives,
            include_dirs,
            ignored_include_dirs: strings(&["src"]),
            libraries,
            ignored_libraries: strings(&["pthread", "m", "rt", "iniparser"]),
            header_libraries,
            section_targets: strings(&["ewma_power_unittest", "cras_client_unittest"]),
            section_copts: strings(&["-fdata-sections", "-ffunction-sections"]),
            broken_tests: Vec::new(),
            excluded_sources: Vec::new(),
            generated_headers: BTreeMap::new(),
        }
    }
}

/// The shared support library emitted ahead of every test rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    pub name: String,
    pub defines: Vec<String>,
    pub linkopts: Vec<String>,
    pub deps: Vec<String>,

    /// Comment block printed before any rule
    pub license_header: String,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            name: "test_support".to_string(),
            defines: strings(&[
                r#"CRAS_UT_TMPDIR=\"/tmp\""#,
                r#"CRAS_SOCKET_FILE_DIR=\"/run/cras\""#,
            ]),
            linkopts: strings(&["-Wl,--gc-sections", "-lm"]),
            deps: strings(&["//:build_config"]),
            license_header: concat!(
                "# Copyright 2022 The ChromiumOS Authors\n",
                "# Use of this source code is governed by a BSD-style license that can be\n",
                "# found in the LICENSE file.\n",
            )
            .to_string(),
        }
    }
}

impl SupportConfig {
    /// Label test rules use to depend on the support library
    pub fn label(&self) -> String {
        format!(":{}", self.name)
    }
}

/// How the real compiler is re-run for header discovery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Compiler used instead of the traced executable
    pub compiler: Option<String>,

    /// Directory to run in instead of the traced working directory
    pub working_dir: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from an optional TOML file and applies environment
    /// overrides. Without a file the built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    pub fn from_toml(content: &str, name: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: name.to_string(),
            source,
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(jobs) = env::var(JOBS_ENV) {
            let jobs = jobs.parse::<usize>().map_err(|e| ConfigError::ParseError {
                field: JOBS_ENV.to_string(),
                error: e.to_string(),
            })?;
            self.jobs = Some(jobs);
        }
        if let Ok(root) = env::var(SOURCE_ROOT_ENV) {
            self.scanner.working_dir = Some(PathBuf::from(root));
        }
        Ok(())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.trace.compilers.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "at least one compiler name is required".to_string(),
            ));
        }
        if let Some(tool) = self
            .trace
            .compilers
            .iter()
            .find(|c| self.trace.ignored_tools.contains(c))
        {
            return Err(ConfigError::ValidationFailed(format!(
                "{} is listed both as a compiler and as an ignored tool",
                tool
            )));
        }
        if self.support.name.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "support library name must not be empty".to_string(),
            ));
        }
        if self.paths.unit_test_suffix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "unit test suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of analysis workers to run
    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Buildtrace Configuration:")?;
        writeln!(f, "  Compilers: {}", self.trace.compilers.join(", "))?;
        writeln!(f, "  Ignored tools: {}", self.trace.ignored_tools.len())?;
        writeln!(f, "  Source prefix: {:?}", self.paths.source_prefix)?;
        writeln!(f, "  Archives mapped: {}", self.mapping.archives.len())?;
        writeln!(f, "  Include dirs mapped: {}", self.mapping.include_dirs.len())?;
        writeln!(f, "  Libraries mapped: {}", self.mapping.libraries.len())?;
        if let Some(dir) = &self.scanner.working_dir {
            writeln!(f, "  Scanner working dir: {}", dir.display())?;
        }
        writeln!(f, "  Workers: {}", self.worker_count())?;
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
