//! packmind init - Create the packmind root

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::app::{DATABASE_FILE_NAME, ROOT_DIR_NAME};
use crate::cli::Cli;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::config::{CONFIG_FILE_NAME, Config};
use crate::error::Result;
use crate::storage::catalog::CATALOG_FILE_NAME;
use crate::storage::{Catalog, Database};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize in (defaults to `.packmind/` under the current directory)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing config file
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitReport {
    root: PathBuf,
    config_written: bool,
    catalog_written: bool,
    schema_version: u32,
}

/// `init` runs before any root exists, so it cannot use an [`AppContext`](crate::app::AppContext).
pub fn run_without_context(cli: &Cli, args: &InitArgs) -> Result<()> {
    let root = match &args.path {
        Some(path) => path.clone(),
        None => std::env::current_dir()?.join(ROOT_DIR_NAME),
    };
    let report = initialize(&root, args.force)?;

    if cli.robot_errors() {
        emit_robot(&robot_ok(&report))
    } else {
        let mut layout = HumanLayout::new();
        layout
            .title("Initialized packmind")
            .kv("Root", &report.root.display().to_string())
            .kv("Config", if report.config_written { "written" } else { "kept" })
            .kv("Catalog", if report.catalog_written { "written" } else { "kept" })
            .kv("Schema", &report.schema_version.to_string());
        emit_human(layout);
        Ok(())
    }
}

/// Reached only when a root already exists; re-initializes it in place.
pub fn run(ctx: &crate::app::AppContext, args: &InitArgs) -> Result<()> {
    let root = args.path.clone().unwrap_or_else(|| ctx.root.clone());
    let report = initialize(&root, args.force)?;
    if ctx.robot() {
        emit_robot(&robot_ok(&report))
    } else {
        println!("Initialized packmind in {}", report.root.display());
        Ok(())
    }
}

fn initialize(root: &Path, force: bool) -> Result<InitReport> {
    std::fs::create_dir_all(root)?;

    let config_path = root.join(CONFIG_FILE_NAME);
    let config_written = force || !config_path.exists();
    if config_written {
        std::fs::write(&config_path, Config::default().to_toml()?)?;
    }

    let catalog_path = root.join(CATALOG_FILE_NAME);
    let catalog_written = !catalog_path.exists();
    if catalog_written {
        Catalog::empty().save(&catalog_path)?;
    }

    let db = Database::open(root.join(DATABASE_FILE_NAME))?;
    info!(root = %root.display(), "Initialized packmind root");

    Ok(InitReport {
        root: root.to_path_buf(),
        config_written,
        catalog_written,
        schema_version: db.schema_version(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_is_idempotent_and_keeps_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join(ROOT_DIR_NAME);

        let first = initialize(&root, false).unwrap();
        assert!(first.config_written);
        assert!(first.catalog_written);
        assert!(root.join(DATABASE_FILE_NAME).exists());

        std::fs::write(root.join(CONFIG_FILE_NAME), "[workspace]\nuser_id = \"me\"\n").unwrap();
        let second = initialize(&root, false).unwrap();
        assert!(!second.config_written);
        assert!(!second.catalog_written);
        let config = std::fs::read_to_string(root.join(CONFIG_FILE_NAME)).unwrap();
        assert!(config.contains("\"me\""));

        assert!(initialize(&root, true).unwrap().config_written);
    }
}
