//! Subcommand handlers
//!
//! Each handler returns the process exit code. Errors are printed with their
//! full context chain to stderr.

use super::commands::{GenerateArgs, ProfileArgs};
use super::output::{write_output, OutputFormatter};
use crate::compile::CompilerScanner;
use crate::config::Config;
use crate::pipeline::PipelineOrchestrator;
use crate::progress::LoggingHandler;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

pub fn handle_generate(args: &GenerateArgs) -> i32 {
    exit_code(run_generate(args))
}

pub fn handle_profile(args: &ProfileArgs) -> i32 {
    exit_code(run_profile(args))
}

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path).context("Failed to load configuration")?;
    Ok(config)
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(jobs) = args.jobs {
        config.jobs = Some(jobs);
    }
    if let Some(root) = &args.source_root {
        config.scanner.working_dir = Some(root.clone());
    }
    if let Some(compiler) = &args.compiler {
        config.scanner.compiler = Some(compiler.clone());
    }
    config.validate().context("Invalid configuration")?;
    debug!("{}", config);

    let scanner = CompilerScanner::new(&config.scanner);
    let orchestrator =
        PipelineOrchestrator::new(&config, Box::new(scanner), Some(Box::new(LoggingHandler)));
    let generation = orchestrator.generate(&args.trace)?;

    let output = OutputFormatter::new(args.format.into()).format(&generation)?;
    write_output(&output, args.output.as_deref())
}

fn run_profile(args: &ProfileArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    config.validate().context("Invalid configuration")?;

    let scanner = CompilerScanner::new(&config.scanner);
    let orchestrator =
        PipelineOrchestrator::new(&config, Box::new(scanner), Some(Box::new(LoggingHandler)));
    let profile = orchestrator.load_profile(&args.trace)?;

    let formatter = OutputFormatter::new(super::output::OutputFormat::Json);
    let mut output = formatter.format_profile(&profile.summary())?;
    output.push('\n');
    write_output(&output, None)
}
