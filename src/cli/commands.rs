use clap::{Parser, Subcommand, ValueEnum};
use crate::config::CONFIG_ENV;
use std::path::PathBuf;

/// Generates Bazel test rules from a compiler invocation trace
#[derive(Parser, Debug)]
#[command(
    name = "buildtrace",
    about = "Generates Bazel test rules from a compiler invocation trace",
    version,
    author,
    long_about = "buildtrace reads a JSON-lines trace of the process executions of a \
                  traditional build, reconstructs every compile and link step, asks the \
                  compiler for each source's headers and prints one cc_test rule per \
                  unit-test binary."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate cc_test rules from a trace",
        long_about = "Folds the trace into compile and link steps, analyzes every unit-test \
                      link in parallel and prints the support library followed by one \
                      cc_test rule per supported target, sorted by name.\n\n\
                      Examples:\n  \
                      buildtrace generate events.json\n  \
                      buildtrace generate events.json --jobs 8 --output src/tests/BUILD.bazel\n  \
                      buildtrace generate events.json --format json"
    )]
    Generate(GenerateArgs),

    #[command(
        about = "Summarize the compile and link steps of a trace",
        long_about = "Reads and classifies the trace without running the compiler and prints \
                      a JSON summary of what was found.\n\n\
                      Examples:\n  \
                      buildtrace profile events.json"
    )]
    Profile(ProfileArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "TRACE", help = "Path to the JSON-lines execution trace")]
    pub trace: PathBuf,

    #[arg(
        short = 'c',
        long,
        value_name = "FILE",
        env = CONFIG_ENV,
        help = "TOML configuration file"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "bazel",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'j',
        long,
        value_name = "N",
        help = "Number of analysis workers (defaults to the number of CPUs)"
    )]
    pub jobs: Option<usize>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory to run the compiler in when resolving headers"
    )]
    pub source_root: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Compiler used for header resolution instead of the traced one"
    )]
    pub compiler: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(value_name = "TRACE", help = "Path to the JSON-lines execution trace")]
    pub trace: PathBuf,

    #[arg(
        short = 'c',
        long,
        value_name = "FILE",
        env = CONFIG_ENV,
        help = "TOML configuration file"
    )]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Bazel,
    Json,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Bazel => super::output::OutputFormat::Bazel,
            OutputFormatArg::Json => super::output::OutputFormat::Json,
        }
    }
}
