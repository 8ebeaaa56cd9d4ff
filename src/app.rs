use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::core::{OrganizationId, UserId};
use crate::deployments::{
    CatalogPorts, MarkdownRenderer, PackageCatalog, PackagePublisher, PublisherPorts,
};
use crate::error::{PackmindError, Result};
use crate::events::{EventBus, register_package_cleanup};
use crate::storage::catalog::CATALOG_FILE_NAME;
use crate::storage::{Catalog, Database, GitArchive};

pub const ROOT_DIR_NAME: &str = ".packmind";
pub const DATABASE_FILE_NAME: &str = "packmind.db";

/// Everything a command needs, opened once per invocation.
pub struct AppContext {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
    pub db: Arc<Database>,
    pub catalog: Arc<Catalog>,
    pub git: Arc<GitArchive>,
    pub events: Arc<EventBus>,
    pub output_format: OutputFormat,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = find_root()?;
        Self::open(&root, cli)
    }

    /// Open the stores under `root`.
    pub fn open(root: &Path, cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| default_config_path(root));
        let config = Config::load(cli.config.as_deref(), root)?;

        let catalog = Catalog::load(root.join(CATALOG_FILE_NAME))?
            .with_default_render_modes(config.render.modes()?);
        let git = GitArchive::new(catalog.repositories())
            .with_author(&config.publish.author_name, &config.publish.author_email);
        let db = Arc::new(Database::open(root.join(DATABASE_FILE_NAME))?);

        let events = Arc::new(EventBus::new());
        register_package_cleanup(&events, db.clone());

        Ok(Self {
            root: root.to_path_buf(),
            config_path,
            output_format: cli.output_format(&config),
            config,
            db,
            catalog: Arc::new(catalog),
            git: Arc::new(git),
            events,
            verbosity: cli.verbose,
        })
    }

    #[must_use]
    pub fn organization_id(&self) -> OrganizationId {
        OrganizationId::from(self.config.workspace.organization_id.as_str())
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::from(self.config.workspace.user_id.as_str())
    }

    #[must_use]
    pub fn robot(&self) -> bool {
        self.output_format == OutputFormat::Json
    }

    #[must_use]
    pub fn publisher(&self) -> PackagePublisher {
        PackagePublisher::new(PublisherPorts {
            packages: self.db.clone(),
            recipes: self.catalog.clone(),
            standards: self.catalog.clone(),
            active_versions: self.db.clone(),
            git: self.git.clone(),
            coding_agents: Arc::new(MarkdownRenderer::new()),
            targets: self.catalog.clone(),
            render_modes: self.catalog.clone(),
            deployments: self.db.clone(),
        })
        .with_events(self.events.clone())
        .with_commit_prefix(&self.config.publish.commit_prefix)
    }

    #[must_use]
    pub fn package_catalog(&self) -> PackageCatalog {
        PackageCatalog::new(CatalogPorts {
            packages: self.db.clone(),
            spaces: self.catalog.clone(),
            recipes: self.catalog.clone(),
            standards: self.catalog.clone(),
            skills: self.catalog.clone(),
        })
        .with_events(self.events.clone())
    }
}

/// `PACKMIND_ROOT`, else the nearest `.packmind/` upward, else the data dir.
pub fn find_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("PACKMIND_ROOT") {
        return Ok(PathBuf::from(root));
    }
    let cwd = std::env::current_dir()?;
    if let Some(found) = find_upwards(&cwd, ROOT_DIR_NAME) {
        return Ok(found);
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| PackmindError::MissingConfig("data directory not found".to_string()))?;
    Ok(data_dir.join("packmind"))
}

fn default_config_path(root: &Path) -> PathBuf {
    root.join(crate::config::CONFIG_FILE_NAME)
}

fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_dir())
}
