//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

pub mod colors;
pub mod commands;
pub mod output;

pub use commands::Commands;
pub use output::OutputFormat;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "packmind",
    version,
    about = "Review change proposals and publish packages of standards and commands to git repositories"
)]
pub struct Cli {
    /// Machine-readable JSON on stdout (same as `--format json`)
    #[arg(long, global = true)]
    pub robot: bool,

    /// Output format: human or json
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable logging entirely
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Explicit config file; skips the global and project files
    #[arg(long, global = true, env = "PACKMIND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// `--robot` wins, then `--format`, then the configured format.
    #[must_use]
    pub fn output_format(&self, config: &Config) -> OutputFormat {
        if self.robot {
            return OutputFormat::Json;
        }
        self.format.unwrap_or(match config.output.format.as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Human,
        })
    }

    /// Whether errors should be printed as JSON before any config is loaded.
    #[must_use]
    pub fn robot_errors(&self) -> bool {
        self.robot || self.format == Some(OutputFormat::Json)
    }
}
