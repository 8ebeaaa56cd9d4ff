//! JSON catalog of spaces, artefacts, targets and repositories
//!
//! The catalog is the read side the use cases resolve IDs against. It is a
//! single `catalog.json` file under the packmind root:
//!
//! ```json
//! {
//!   "spaces": [],
//!   "recipes": [], "recipeVersions": [],
//!   "standards": [], "standardVersions": [],
//!   "skills": [],
//!   "targets": [], "repositories": [],
//!   "renderModes": { "org-1": ["PACKMIND", "CLAUDE"] }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{
    GitRepo, OrganizationId, Recipe, RecipeId, RecipeVersion, RenderMode, Skill, SkillId, Space,
    SpaceId, Standard, StandardId, StandardVersion, Target, TargetId,
};
use crate::deployments::ports::{
    RecipesPort, RenderModeConfigurationService, SkillsPort, SpacesPort, StandardsPort,
    TargetService,
};
use crate::error::Result;

pub const CATALOG_FILE_NAME: &str = "catalog.json";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogData {
    #[serde(default)]
    pub spaces: Vec<Space>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub recipe_versions: Vec<RecipeVersion>,
    #[serde(default)]
    pub standards: Vec<Standard>,
    #[serde(default)]
    pub standard_versions: Vec<StandardVersion>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub repositories: Vec<GitRepo>,
    #[serde(default)]
    pub render_modes: BTreeMap<OrganizationId, Vec<RenderMode>>,
}

/// In-memory view of `catalog.json`.
pub struct Catalog {
    data: RwLock<CatalogData>,
    default_render_modes: Vec<RenderMode>,
}

impl Catalog {
    #[must_use]
    pub fn new(data: CatalogData) -> Self {
        Self {
            data: RwLock::new(data),
            default_render_modes: vec![RenderMode::Packmind, RenderMode::AgentsMd],
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(CatalogData::default())
    }

    /// Load from `path`; a missing file is an empty catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No catalog file, starting empty");
            return Ok(Self::empty());
        }
        let content = fs::read_to_string(path)?;
        let data: CatalogData = serde_json::from_str(&content)?;
        debug!(
            path = %path.display(),
            recipes = data.recipes.len(),
            standards = data.standards.len(),
            targets = data.targets.len(),
            "Loaded catalog"
        );
        Ok(Self::new(data))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(&*self.data.read())?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }

    /// Modes used for organizations without an explicit entry.
    #[must_use]
    pub fn with_default_render_modes(mut self, modes: Vec<RenderMode>) -> Self {
        self.default_render_modes = modes;
        self
    }

    #[must_use]
    pub fn repositories(&self) -> Vec<GitRepo> {
        self.data.read().repositories.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> CatalogData {
        self.data.read().clone()
    }

    /// Apply `f` to the underlying data.
    pub fn update<F: FnOnce(&mut CatalogData)>(&self, f: F) {
        f(&mut self.data.write());
    }
}

impl SpacesPort for Catalog {
    fn get_space_by_id(&self, id: &SpaceId) -> Result<Option<Space>> {
        Ok(self.data.read().spaces.iter().find(|s| &s.id == id).cloned())
    }
}

impl RecipesPort for Catalog {
    fn get_recipe_by_id(&self, id: &RecipeId) -> Result<Option<Recipe>> {
        Ok(self.data.read().recipes.iter().find(|r| &r.id == id).cloned())
    }

    fn list_recipe_versions(&self, id: &RecipeId) -> Result<Vec<RecipeVersion>> {
        Ok(self
            .data
            .read()
            .recipe_versions
            .iter()
            .filter(|v| &v.recipe_id == id)
            .cloned()
            .collect())
    }
}

impl StandardsPort for Catalog {
    fn get_standard_by_id(&self, id: &StandardId) -> Result<Option<Standard>> {
        Ok(self.data.read().standards.iter().find(|s| &s.id == id).cloned())
    }

    fn get_latest_standard_version(&self, id: &StandardId) -> Result<Option<StandardVersion>> {
        Ok(self
            .data
            .read()
            .standard_versions
            .iter()
            .filter(|v| &v.standard_id == id)
            .max_by_key(|v| v.version)
            .cloned())
    }
}

impl SkillsPort for Catalog {
    fn get_skill_by_id(&self, id: &SkillId) -> Result<Option<Skill>> {
        Ok(self.data.read().skills.iter().find(|s| &s.id == id).cloned())
    }
}

impl TargetService for Catalog {
    fn find_target_by_id(&self, id: &TargetId) -> Result<Option<Target>> {
        Ok(self.data.read().targets.iter().find(|t| &t.id == id).cloned())
    }
}

impl RenderModeConfigurationService for Catalog {
    fn get_active_render_modes(&self, organization_id: &OrganizationId) -> Result<Vec<RenderMode>> {
        Ok(self
            .data
            .read()
            .render_modes
            .get(organization_id)
            .cloned()
            .unwrap_or_else(|| self.default_render_modes.clone()))
    }
}
