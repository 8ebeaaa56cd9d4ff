//! packmind config - Show configuration

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::config::Config;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the merged configuration
    Show,
    /// Print the path of the project config file
    Path,
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    path: String,
    exists: bool,
    config: &'a Config,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    let report = ConfigReport {
        path: ctx.config_path.display().to_string(),
        exists: ctx.config_path.exists(),
        config: &ctx.config,
    };
    match args.command {
        ConfigCommand::Show => {
            if ctx.robot() {
                return emit_robot(&robot_ok(&report));
            }
            print!("{}", ctx.config.to_toml()?);
            Ok(())
        }
        ConfigCommand::Path => {
            if ctx.robot() {
                return emit_robot(&robot_ok(&report));
            }
            println!("{}", report.path);
            Ok(())
        }
    }
}
