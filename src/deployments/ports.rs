//! Collaborator interfaces consumed by the deployment use cases
//!
//! Every port is a blocking call. Adapters live in [`crate::storage`] and
//! [`crate::deployments::renderer`]; recording fakes live in
//! [`crate::test_utils::fakes`].

use crate::core::{
    CodingAgent, FileUpdates, GitCommit, GitRepo, GitRepoId, OrganizationId, Package, PackageId,
    PackagesDeployment, Recipe, RecipeId, RecipeVersion, RenderMode, Skill, SkillId, Space,
    SpaceId, Standard, StandardId, StandardVersion, Target, TargetId, UserId,
};
use crate::error::Result;

pub trait SpacesPort: Send + Sync {
    fn get_space_by_id(&self, id: &SpaceId) -> Result<Option<Space>>;
}

pub trait RecipesPort: Send + Sync {
    fn get_recipe_by_id(&self, id: &RecipeId) -> Result<Option<Recipe>>;

    /// Every stored version of a recipe, in no particular order.
    fn list_recipe_versions(&self, id: &RecipeId) -> Result<Vec<RecipeVersion>>;
}

pub trait StandardsPort: Send + Sync {
    fn get_standard_by_id(&self, id: &StandardId) -> Result<Option<Standard>>;

    fn get_latest_standard_version(&self, id: &StandardId) -> Result<Option<StandardVersion>>;
}

pub trait SkillsPort: Send + Sync {
    fn get_skill_by_id(&self, id: &SkillId) -> Result<Option<Skill>>;
}

/// Versions currently deployed on a target, read from deployment history.
pub trait ActiveVersionsRepository: Send + Sync {
    fn list_active_recipe_versions_by_target(
        &self,
        organization_id: &OrganizationId,
        target_id: &TargetId,
    ) -> Result<Vec<RecipeVersion>>;

    fn list_active_standard_versions_by_target(
        &self,
        organization_id: &OrganizationId,
        target_id: &TargetId,
    ) -> Result<Vec<StandardVersion>>;
}

pub trait GitPort: Send + Sync {
    fn get_repository_by_id(&self, id: &GitRepoId) -> Result<Option<GitRepo>>;

    /// Apply `updates` and commit them. Fails with
    /// [`PackmindError::NoChangesDetected`](crate::error::PackmindError::NoChangesDetected)
    /// when the tree would be unchanged.
    fn commit_to_git(&self, repo: &GitRepo, updates: &FileUpdates, message: &str)
    -> Result<GitCommit>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRecipesDeployment {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub recipe_versions: Vec<RecipeVersion>,
    pub git_repo: GitRepo,
    pub targets: Vec<Target>,
    pub coding_agents: Vec<CodingAgent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareStandardsDeployment {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub standard_versions: Vec<StandardVersion>,
    pub git_repo: GitRepo,
    pub targets: Vec<Target>,
    pub coding_agents: Vec<CodingAgent>,
}

/// Turns artefact versions into repository files.
pub trait CodingAgentPort: Send + Sync {
    fn prepare_standards_deployment(&self, command: &PrepareStandardsDeployment)
    -> Result<FileUpdates>;

    fn prepare_recipes_deployment(&self, command: &PrepareRecipesDeployment)
    -> Result<FileUpdates>;
}

pub trait TargetService: Send + Sync {
    fn find_target_by_id(&self, id: &TargetId) -> Result<Option<Target>>;
}

pub trait RenderModeConfigurationService: Send + Sync {
    fn get_active_render_modes(&self, organization_id: &OrganizationId) -> Result<Vec<RenderMode>>;
}

/// Package persistence. Deleted packages are invisible to every read.
pub trait PackageRepository: Send + Sync {
    fn find_package_by_id(&self, id: &PackageId) -> Result<Option<Package>>;

    fn list_packages_by_space(&self, space_id: &SpaceId) -> Result<Vec<Package>>;

    fn add_package(&self, package: &Package) -> Result<()>;

    /// Replace name, description and member lists.
    fn update_package(&self, package: &Package) -> Result<()>;

    fn add_recipes(&self, package_id: &PackageId, ids: &[RecipeId]) -> Result<()>;

    fn add_standards(&self, package_id: &PackageId, ids: &[StandardId]) -> Result<()>;

    fn add_skills(&self, package_id: &PackageId, ids: &[SkillId]) -> Result<()>;

    /// Soft delete.
    fn delete_packages(&self, ids: &[PackageId], deleted_by: &UserId) -> Result<()>;

    /// Drop `artefact_id` from the member lists of every package in the
    /// space. Returns the number of packages touched.
    fn remove_artefact_from_packages(
        &self,
        space_id: &SpaceId,
        artefact_id: &str,
    ) -> Result<usize>;
}

/// Append-only deployment history.
pub trait PackagesDeploymentRepository: Send + Sync {
    fn add_deployment(&self, deployment: &PackagesDeployment) -> Result<()>;

    /// Newest first.
    fn list_deployments(
        &self,
        organization_id: &OrganizationId,
        target_id: Option<&TargetId>,
    ) -> Result<Vec<PackagesDeployment>>;
}
