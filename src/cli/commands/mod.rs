//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use std::path::Path;

use clap::Subcommand;
use serde::de::DeserializeOwned;

pub mod artefact;
pub mod config;
pub mod conflicts;
pub mod deployments;
pub mod init;
pub mod outdated;
pub mod package;
pub mod publish;
pub mod review;

use crate::app::AppContext;
use crate::error::{PackmindError, Result};

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Init(args) => init::run(ctx, args),
        Commands::Package(args) => package::run(ctx, args),
        Commands::Publish(args) => publish::run(ctx, args),
        Commands::Deployments(args) => deployments::run(ctx, args),
        Commands::Artefact(args) => artefact::run(ctx, args),
        Commands::Outdated(args) => outdated::run(ctx, args),
        Commands::Conflicts(args) => conflicts::run(ctx, args),
        Commands::Review(args) => review::run(ctx, args),
        Commands::Config(args) => config::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the packmind root with config, catalog and database
    Init(init::InitArgs),

    /// Create, change, list, delete and install packages
    Package(package::PackageArgs),

    /// Publish packages to deployment targets
    Publish(publish::PublishArgs),

    /// Inspect deployment history
    Deployments(deployments::DeploymentsArgs),

    /// Manage catalog artefacts
    Artefact(artefact::ArtefactArgs),

    /// List change proposals whose snapshot no longer matches the artefact
    Outdated(outdated::OutdatedArgs),

    /// Show which pending proposals conflict with each other
    Conflicts(conflicts::ConflictsArgs),

    /// Batch accept/reject decisions over a set of proposals
    Review(review::ReviewArgs),

    /// Show configuration
    Config(config::ConfigArgs),
}

/// Read and parse a JSON input file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        PackmindError::ValidationFailed(format!("read {}: {err}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        PackmindError::ValidationFailed(format!("parse {}: {err}", path.display()))
    })
}
