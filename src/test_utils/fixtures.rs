//! On-disk packmind roots for tests that exercise the real adapters.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::app::{DATABASE_FILE_NAME, ROOT_DIR_NAME};
use crate::config::CONFIG_FILE_NAME;
use crate::core::{ChangeProposal, GitRepo};
use crate::storage::catalog::CATALOG_FILE_NAME;
use crate::storage::git::open_or_init;
use crate::storage::{Catalog, CatalogData, Database};
use crate::test_utils::factories;

pub const REPO_ID: &str = "repo-1";

/// Temp directory holding a packmind root (`.packmind/`) and one git working
/// copy (`repo/`) registered in the catalog as [`REPO_ID`].
///
/// The catalog has space `space-1` in `org-1`, command `recipe-1` (v1, v2),
/// standard `standard-1` (v1), and two targets on the repository: `t-root`
/// at `/` and `t-api` at `/services/api`.
pub struct PackmindFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub repo_path: PathBuf,
}

impl Default for PackmindFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl PackmindFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join(ROOT_DIR_NAME);
        let repo_path = temp_dir.path().join("repo");
        std::fs::create_dir_all(&root).expect("Failed to create packmind root");
        open_or_init(&repo_path).expect("Failed to init git repository");

        let fixture = Self {
            temp_dir,
            root,
            repo_path,
        };
        fixture.write_config(&format!(
            "[workspace]\norganization_id = \"{}\"\nuser_id = \"{}\"\n\n[output]\ncolor = false\n",
            factories::ORGANIZATION,
            factories::USER
        ));
        fixture.write_catalog(&sample_catalog(&fixture.repo_path));
        println!("[FIXTURE] Created packmind root: {:?}", fixture.root);
        fixture
    }

    pub fn write_config(&self, content: &str) {
        std::fs::write(self.root.join(CONFIG_FILE_NAME), content).expect("Failed to write config");
    }

    pub fn write_catalog(&self, data: &CatalogData) {
        Catalog::new(data.clone())
            .save(self.catalog_path())
            .expect("Failed to write catalog");
    }

    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE_NAME)
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE_NAME)
    }

    #[must_use]
    pub fn open_db(&self) -> Database {
        Database::open(self.db_path()).expect("Failed to open database")
    }

    /// Write `proposals` as a JSON array under the temp dir.
    #[must_use]
    pub fn write_proposals(&self, name: &str, proposals: &[ChangeProposal]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let content = serde_json::to_string_pretty(proposals).expect("Failed to serialize");
        std::fs::write(&path, content).expect("Failed to write proposals");
        path
    }

    /// Read a file from the git working copy.
    #[must_use]
    pub fn repo_file(&self, relative: &str) -> Option<String> {
        std::fs::read_to_string(self.repo_path.join(relative)).ok()
    }
}

/// Catalog described on [`PackmindFixture`], with the repository at `repo_path`.
#[must_use]
pub fn sample_catalog(repo_path: &Path) -> CatalogData {
    let mut api = factories::target("t-api", "api", REPO_ID);
    api.path = "/services/api".to_string();
    CatalogData {
        spaces: vec![factories::space(factories::SPACE, factories::ORGANIZATION)],
        recipes: vec![factories::recipe(2)],
        recipe_versions: vec![
            factories::recipe_version("recipe-1", "My Command", 1),
            factories::recipe_version("recipe-1", "My Command", 2),
        ],
        standards: vec![factories::standard(1)],
        standard_versions: vec![factories::standard_version("standard-1", "My Standard", 1)],
        skills: vec![factories::skill(1)],
        targets: vec![factories::target("t-root", "root", REPO_ID), api],
        repositories: vec![GitRepo {
            local_path: Some(repo_path.to_path_buf()),
            ..factories::git_repo(REPO_ID)
        }],
        ..CatalogData::default()
    }
}
