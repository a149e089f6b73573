pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, GenerateArgs, OutputFormatArg, ProfileArgs};
pub use output::{write_output, OutputFormat, OutputFormatter};
