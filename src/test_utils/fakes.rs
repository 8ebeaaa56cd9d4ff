//! Recording in-memory implementations of every port.
//!
//! Each fake counts its calls by method name so tests can assert that a
//! collaborator was (or was not) reached. Failures are opt-in per fake.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{
    CodingAgent, FileModification, FileUpdates, GitCommit, GitCommitId, GitRepo, GitRepoId,
    OrganizationId, Package, PackageId, PackagesDeployment, Recipe, RecipeId, RecipeVersion,
    RenderMode, Skill, SkillId, Space, SpaceId, Standard, StandardId, StandardVersion, Target,
    TargetId, UserId,
};
use crate::deployments::packages::CatalogPorts;
use crate::deployments::ports::{
    ActiveVersionsRepository, CodingAgentPort, GitPort, PackageRepository,
    PackagesDeploymentRepository, PrepareRecipesDeployment, PrepareStandardsDeployment,
    RecipesPort, RenderModeConfigurationService, SkillsPort, SpacesPort, StandardsPort,
    TargetService,
};
use crate::deployments::publisher::PublisherPorts;
use crate::error::{PackmindError, Result};
use crate::storage::{Catalog, CatalogData};

/// Method-name call log.
#[derive(Debug, Default)]
pub struct Calls(Mutex<Vec<&'static str>>);

impl Calls {
    pub fn record(&self, method: &'static str) {
        self.0.lock().push(method);
    }

    #[must_use]
    pub fn count(&self, method: &str) -> usize {
        self.0.lock().iter().filter(|m| **m == method).count()
    }

    #[must_use]
    pub fn all(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}

// =============================================================================
// Read side
// =============================================================================

/// Read-only ports backed by a [`Catalog`], with call recording.
pub struct FakeCatalog {
    inner: Catalog,
    pub calls: Calls,
}

impl FakeCatalog {
    #[must_use]
    pub fn new(data: CatalogData) -> Self {
        Self {
            inner: Catalog::new(data),
            calls: Calls::default(),
        }
    }

    pub fn update<F: FnOnce(&mut CatalogData)>(&self, f: F) {
        self.inner.update(f);
    }
}

impl SpacesPort for FakeCatalog {
    fn get_space_by_id(&self, id: &SpaceId) -> Result<Option<Space>> {
        self.calls.record("get_space_by_id");
        self.inner.get_space_by_id(id)
    }
}

impl RecipesPort for FakeCatalog {
    fn get_recipe_by_id(&self, id: &RecipeId) -> Result<Option<Recipe>> {
        self.calls.record("get_recipe_by_id");
        self.inner.get_recipe_by_id(id)
    }

    fn list_recipe_versions(&self, id: &RecipeId) -> Result<Vec<RecipeVersion>> {
        self.calls.record("list_recipe_versions");
        self.inner.list_recipe_versions(id)
    }
}

impl StandardsPort for FakeCatalog {
    fn get_standard_by_id(&self, id: &StandardId) -> Result<Option<Standard>> {
        self.calls.record("get_standard_by_id");
        self.inner.get_standard_by_id(id)
    }

    fn get_latest_standard_version(&self, id: &StandardId) -> Result<Option<StandardVersion>> {
        self.calls.record("get_latest_standard_version");
        self.inner.get_latest_standard_version(id)
    }
}

impl SkillsPort for FakeCatalog {
    fn get_skill_by_id(&self, id: &SkillId) -> Result<Option<Skill>> {
        self.calls.record("get_skill_by_id");
        self.inner.get_skill_by_id(id)
    }
}

impl TargetService for FakeCatalog {
    fn find_target_by_id(&self, id: &TargetId) -> Result<Option<Target>> {
        self.calls.record("find_target_by_id");
        self.inner.find_target_by_id(id)
    }
}

impl RenderModeConfigurationService for FakeCatalog {
    fn get_active_render_modes(&self, organization_id: &OrganizationId) -> Result<Vec<RenderMode>> {
        self.calls.record("get_active_render_modes");
        self.inner.get_active_render_modes(organization_id)
    }
}

// =============================================================================
// Packages
// =============================================================================

#[derive(Default)]
pub struct FakePackageRepository {
    packages: Mutex<Vec<Package>>,
    deleted: Mutex<Vec<(PackageId, UserId)>>,
    pub calls: Calls,
}

impl FakePackageRepository {
    #[must_use]
    pub fn with_packages(packages: Vec<Package>) -> Self {
        Self {
            packages: Mutex::new(packages),
            ..Self::default()
        }
    }

    /// Live packages, in insertion order.
    #[must_use]
    pub fn packages(&self) -> Vec<Package> {
        let deleted = self.deleted.lock();
        self.packages
            .lock()
            .iter()
            .filter(|p| !deleted.iter().any(|(id, _)| id == &p.id))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn deleted(&self) -> Vec<(PackageId, UserId)> {
        self.deleted.lock().clone()
    }

    fn with_package<F: FnOnce(&mut Package)>(&self, id: &PackageId, f: F) {
        if let Some(package) = self.packages.lock().iter_mut().find(|p| &p.id == id) {
            f(package);
        }
    }
}

fn push_missing<T: Clone + PartialEq>(list: &mut Vec<T>, ids: &[T]) {
    for id in ids {
        if !list.contains(id) {
            list.push(id.clone());
        }
    }
}

impl PackageRepository for FakePackageRepository {
    fn find_package_by_id(&self, id: &PackageId) -> Result<Option<Package>> {
        self.calls.record("find_package_by_id");
        Ok(self.packages().into_iter().find(|p| &p.id == id))
    }

    fn list_packages_by_space(&self, space_id: &SpaceId) -> Result<Vec<Package>> {
        self.calls.record("list_packages_by_space");
        Ok(self
            .packages()
            .into_iter()
            .filter(|p| &p.space_id == space_id)
            .collect())
    }

    fn add_package(&self, package: &Package) -> Result<()> {
        self.calls.record("add_package");
        self.packages.lock().push(package.clone());
        Ok(())
    }

    fn update_package(&self, package: &Package) -> Result<()> {
        self.calls.record("update_package");
        let updated = package.clone();
        self.with_package(&package.id, move |p| *p = updated);
        Ok(())
    }

    fn add_recipes(&self, package_id: &PackageId, ids: &[RecipeId]) -> Result<()> {
        self.calls.record("add_recipes");
        self.with_package(package_id, |p| push_missing(&mut p.recipes, ids));
        Ok(())
    }

    fn add_standards(&self, package_id: &PackageId, ids: &[StandardId]) -> Result<()> {
        self.calls.record("add_standards");
        self.with_package(package_id, |p| push_missing(&mut p.standards, ids));
        Ok(())
    }

    fn add_skills(&self, package_id: &PackageId, ids: &[SkillId]) -> Result<()> {
        self.calls.record("add_skills");
        self.with_package(package_id, |p| push_missing(&mut p.skills, ids));
        Ok(())
    }

    fn delete_packages(&self, ids: &[PackageId], deleted_by: &UserId) -> Result<()> {
        self.calls.record("delete_packages");
        self.deleted
            .lock()
            .extend(ids.iter().map(|id| (id.clone(), deleted_by.clone())));
        Ok(())
    }

    fn remove_artefact_from_packages(&self, space_id: &SpaceId, artefact_id: &str) -> Result<usize> {
        self.calls.record("remove_artefact_from_packages");
        let mut touched = 0;
        for package in self.packages.lock().iter_mut() {
            if &package.space_id != space_id {
                continue;
            }
            let before = package.recipes.len() + package.standards.len() + package.skills.len();
            package.recipes.retain(|id| id.as_str() != artefact_id);
            package.standards.retain(|id| id.as_str() != artefact_id);
            package.skills.retain(|id| id.as_str() != artefact_id);
            if package.recipes.len() + package.standards.len() + package.skills.len() != before {
                touched += 1;
            }
        }
        Ok(touched)
    }
}

// =============================================================================
// Deployment history
// =============================================================================

#[derive(Default)]
pub struct FakeDeploymentRepository {
    records: Mutex<Vec<PackagesDeployment>>,
    pub calls: Calls,
}

impl FakeDeploymentRepository {
    /// Stored records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<PackagesDeployment> {
        self.records.lock().clone()
    }
}

impl PackagesDeploymentRepository for FakeDeploymentRepository {
    fn add_deployment(&self, deployment: &PackagesDeployment) -> Result<()> {
        self.calls.record("add_deployment");
        self.records.lock().push(deployment.clone());
        Ok(())
    }

    fn list_deployments(
        &self,
        organization_id: &OrganizationId,
        target_id: Option<&TargetId>,
    ) -> Result<Vec<PackagesDeployment>> {
        self.calls.record("list_deployments");
        Ok(self
            .records
            .lock()
            .iter()
            .rev()
            .filter(|d| &d.organization_id == organization_id)
            .filter(|d| target_id.is_none_or(|t| &d.target.id == t))
            .cloned()
            .collect())
    }
}

/// Versions already running on each target.
#[derive(Default)]
pub struct FakeActiveVersions {
    recipes: Mutex<HashMap<TargetId, Vec<RecipeVersion>>>,
    standards: Mutex<HashMap<TargetId, Vec<StandardVersion>>>,
    pub calls: Calls,
}

impl FakeActiveVersions {
    pub fn set_recipes(&self, target_id: &str, versions: Vec<RecipeVersion>) {
        self.recipes.lock().insert(target_id.into(), versions);
    }

    pub fn set_standards(&self, target_id: &str, versions: Vec<StandardVersion>) {
        self.standards.lock().insert(target_id.into(), versions);
    }
}

impl ActiveVersionsRepository for FakeActiveVersions {
    fn list_active_recipe_versions_by_target(
        &self,
        _organization_id: &OrganizationId,
        target_id: &TargetId,
    ) -> Result<Vec<RecipeVersion>> {
        self.calls.record("list_active_recipe_versions_by_target");
        Ok(self.recipes.lock().get(target_id).cloned().unwrap_or_default())
    }

    fn list_active_standard_versions_by_target(
        &self,
        _organization_id: &OrganizationId,
        target_id: &TargetId,
    ) -> Result<Vec<StandardVersion>> {
        self.calls.record("list_active_standard_versions_by_target");
        Ok(self.standards.lock().get(target_id).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Git and rendering
// =============================================================================

/// How [`FakeGit`] answers a commit for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitBehaviour {
    Commit,
    NoChanges,
    Fail(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub repo: GitRepo,
    pub updates: FileUpdates,
    pub message: String,
}

pub struct FakeGit {
    repositories: Vec<GitRepo>,
    behaviours: Mutex<HashMap<GitRepoId, GitBehaviour>>,
    commits: Mutex<Vec<RecordedCommit>>,
    pub calls: Calls,
}

impl FakeGit {
    #[must_use]
    pub fn new(repositories: Vec<GitRepo>) -> Self {
        Self {
            repositories,
            behaviours: Mutex::new(HashMap::new()),
            commits: Mutex::new(Vec::new()),
            calls: Calls::default(),
        }
    }

    pub fn set_behaviour(&self, repo_id: &str, behaviour: GitBehaviour) {
        self.behaviours.lock().insert(repo_id.into(), behaviour);
    }

    /// Every commit attempt, including failed ones.
    #[must_use]
    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.commits.lock().clone()
    }
}

impl GitPort for FakeGit {
    fn get_repository_by_id(&self, id: &GitRepoId) -> Result<Option<GitRepo>> {
        self.calls.record("get_repository_by_id");
        Ok(self.repositories.iter().find(|r| &r.id == id).cloned())
    }

    fn commit_to_git(
        &self,
        repo: &GitRepo,
        updates: &FileUpdates,
        message: &str,
    ) -> Result<GitCommit> {
        self.calls.record("commit_to_git");
        let attempt = {
            let mut commits = self.commits.lock();
            commits.push(RecordedCommit {
                repo: repo.clone(),
                updates: updates.clone(),
                message: message.to_string(),
            });
            commits.len()
        };
        let behaviour = self
            .behaviours
            .lock()
            .get(&repo.id)
            .cloned()
            .unwrap_or(GitBehaviour::Commit);
        match behaviour {
            GitBehaviour::Commit => Ok(GitCommit {
                id: GitCommitId::new(),
                sha: format!("{attempt:040x}"),
                message: message.to_string(),
                author: "Packmind <packmind@localhost>".to_string(),
                url: format!("https://git.example/{}/commit/{attempt}", repo.full_name()),
            }),
            GitBehaviour::NoChanges => Err(PackmindError::NoChangesDetected),
            GitBehaviour::Fail(message) => Err(PackmindError::Git(message)),
        }
    }
}

/// Renders one file per version per target and records every command.
#[derive(Default)]
pub struct FakeCodingAgent {
    recipe_commands: Mutex<Vec<PrepareRecipesDeployment>>,
    standard_commands: Mutex<Vec<PrepareStandardsDeployment>>,
    pub calls: Calls,
}

impl FakeCodingAgent {
    #[must_use]
    pub fn recipe_commands(&self) -> Vec<PrepareRecipesDeployment> {
        self.recipe_commands.lock().clone()
    }

    #[must_use]
    pub fn standard_commands(&self) -> Vec<PrepareStandardsDeployment> {
        self.standard_commands.lock().clone()
    }
}

fn rendered(
    kind: &str,
    targets: &[Target],
    agents: &[CodingAgent],
    slugs: impl Iterator<Item = String> + Clone,
) -> FileUpdates {
    let mut updates = FileUpdates::default();
    if agents.is_empty() {
        return updates;
    }
    for target in targets {
        let prefix = target.path.trim_matches('/');
        for slug in slugs.clone() {
            let path = if prefix.is_empty() {
                format!("{kind}/{slug}.md")
            } else {
                format!("{prefix}/{kind}/{slug}.md")
            };
            updates
                .create_or_update
                .push(FileModification::new(path, format!("{kind} {slug}\n")));
        }
    }
    updates
}

impl CodingAgentPort for FakeCodingAgent {
    fn prepare_standards_deployment(
        &self,
        command: &PrepareStandardsDeployment,
    ) -> Result<FileUpdates> {
        self.calls.record("prepare_standards_deployment");
        self.standard_commands.lock().push(command.clone());
        Ok(rendered(
            "standards",
            &command.targets,
            &command.coding_agents,
            command.standard_versions.iter().map(|v| v.slug.clone()),
        ))
    }

    fn prepare_recipes_deployment(&self, command: &PrepareRecipesDeployment) -> Result<FileUpdates> {
        self.calls.record("prepare_recipes_deployment");
        self.recipe_commands.lock().push(command.clone());
        Ok(rendered(
            "recipes",
            &command.targets,
            &command.coding_agents,
            command.recipe_versions.iter().map(|v| v.slug.clone()),
        ))
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// One of every fake, pre-wired into the use case port bundles.
pub struct FakePorts {
    pub catalog: Arc<FakeCatalog>,
    pub packages: Arc<FakePackageRepository>,
    pub deployments: Arc<FakeDeploymentRepository>,
    pub active_versions: Arc<FakeActiveVersions>,
    pub git: Arc<FakeGit>,
    pub coding_agents: Arc<FakeCodingAgent>,
}

impl FakePorts {
    #[must_use]
    pub fn new(data: CatalogData, packages: Vec<Package>) -> Self {
        let git = FakeGit::new(data.repositories.clone());
        Self {
            catalog: Arc::new(FakeCatalog::new(data)),
            packages: Arc::new(FakePackageRepository::with_packages(packages)),
            deployments: Arc::new(FakeDeploymentRepository::default()),
            active_versions: Arc::new(FakeActiveVersions::default()),
            git: Arc::new(git),
            coding_agents: Arc::new(FakeCodingAgent::default()),
        }
    }

    #[must_use]
    pub fn publisher_ports(&self) -> PublisherPorts {
        PublisherPorts {
            packages: self.packages.clone(),
            recipes: self.catalog.clone(),
            standards: self.catalog.clone(),
            active_versions: self.active_versions.clone(),
            git: self.git.clone(),
            coding_agents: self.coding_agents.clone(),
            targets: self.catalog.clone(),
            render_modes: self.catalog.clone(),
            deployments: self.deployments.clone(),
        }
    }

    #[must_use]
    pub fn catalog_ports(&self) -> CatalogPorts {
        CatalogPorts {
            packages: self.packages.clone(),
            spaces: self.catalog.clone(),
            recipes: self.catalog.clone(),
            standards: self.catalog.clone(),
            skills: self.catalog.clone(),
        }
    }
}
