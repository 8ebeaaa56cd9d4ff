//! Package publishing
//!
//! Resolves packages to the latest version of each artefact, merges them
//! with what every target already runs, and commits the rendered files once
//! per git repository. Every requested target gets exactly one
//! [`PackagesDeployment`] record.
//!
//! Failures are isolated per repository: a failing commit turns into
//! `failure` records for that repository's targets and publishing moves on.
//! Anything that fails before the repository loop (unknown package, target
//! or repository) aborts the whole call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use itertools::Itertools;
use tracing::{debug, error, info, warn};

use crate::core::{
    DeploymentId, DistributionStatus, FileUpdates, GitCommit, GitRepo, GitRepoId, OrganizationId,
    Package, PackageId, PackagesDeployment, RecipeId, RecipeVersion, RenderMode, StandardId,
    StandardVersion, Target, TargetId, UserId, coding_agents_for,
};
use crate::deployments::ports::{
    ActiveVersionsRepository, CodingAgentPort, GitPort, PackageRepository,
    PackagesDeploymentRepository, PrepareRecipesDeployment, PrepareStandardsDeployment,
    RecipesPort, RenderModeConfigurationService, StandardsPort, TargetService,
};
use crate::error::{PackmindError, Result};
use crate::events::{DomainEvent, EventPublisher, NoopPublisher};

/// First line of every publish commit.
pub const DEFAULT_COMMIT_PREFIX: &str = "[PACKMIND] Update packages files";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPackagesCommand {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub package_ids: Vec<PackageId>,
    pub target_ids: Vec<TargetId>,
}

/// Everything the publisher talks to.
#[derive(Clone)]
pub struct PublisherPorts {
    pub packages: Arc<dyn PackageRepository>,
    pub recipes: Arc<dyn RecipesPort>,
    pub standards: Arc<dyn StandardsPort>,
    pub active_versions: Arc<dyn ActiveVersionsRepository>,
    pub git: Arc<dyn GitPort>,
    pub coding_agents: Arc<dyn CodingAgentPort>,
    pub targets: Arc<dyn TargetService>,
    pub render_modes: Arc<dyn RenderModeConfigurationService>,
    pub deployments: Arc<dyn PackagesDeploymentRepository>,
}

/// Targets sharing one git repository.
#[derive(Debug, Clone)]
struct RepositoryGroup {
    repo: GitRepo,
    targets: Vec<Target>,
}

/// Result of deploying one repository group.
enum GroupOutcome {
    Committed {
        commit: GitCommit,
        recipe_versions: Vec<RecipeVersion>,
        standard_versions: Vec<StandardVersion>,
    },
    NoChanges {
        recipe_versions: Vec<RecipeVersion>,
        standard_versions: Vec<StandardVersion>,
    },
}

pub struct PackagePublisher {
    ports: PublisherPorts,
    events: Arc<dyn EventPublisher>,
    commit_prefix: String,
}

impl PackagePublisher {
    #[must_use]
    pub fn new(ports: PublisherPorts) -> Self {
        Self {
            ports,
            events: Arc::new(NoopPublisher),
            commit_prefix: DEFAULT_COMMIT_PREFIX.to_string(),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_commit_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.commit_prefix = prefix.into();
        self
    }

    pub fn publish(&self, command: &PublishPackagesCommand) -> Result<Vec<PackagesDeployment>> {
        if command.package_ids.is_empty() {
            return Err(PackmindError::Argument(
                "packageIds must be provided".to_string(),
            ));
        }
        if command.target_ids.is_empty() {
            return Err(PackmindError::Argument(
                "targetIds must be provided".to_string(),
            ));
        }

        info!(
            organization_id = %command.organization_id,
            packages = command.package_ids.len(),
            targets = command.target_ids.len(),
            "Publishing packages"
        );

        let render_modes = self
            .ports
            .render_modes
            .get_active_render_modes(&command.organization_id)?;

        let packages = self.fetch_packages(&command.package_ids)?;
        let recipe_versions = self.resolve_recipe_versions(&packages)?;
        let standard_versions = self.resolve_standard_versions(&packages)?;
        let groups = self.group_targets_by_repository(&command.target_ids)?;

        let mut deployments = Vec::with_capacity(command.target_ids.len());
        for group in &groups {
            let outcome = self.deploy_group(
                command,
                group,
                &render_modes,
                &packages,
                &recipe_versions,
                &standard_versions,
            );
            let records = self.record_group(command, group, &render_modes, &packages, outcome)?;
            deployments.extend(records);
        }

        self.events.publish(&DomainEvent::PackagesPublished {
            organization_id: command.organization_id.clone(),
            package_ids: packages.iter().map(|p| p.id.clone()).collect(),
            deployment_ids: deployments.iter().map(|d| d.id.clone()).collect(),
        });

        info!(
            deployments = deployments.len(),
            failed = deployments
                .iter()
                .filter(|d| d.status == DistributionStatus::Failure)
                .count(),
            "Publish finished"
        );
        Ok(deployments)
    }

    fn fetch_packages(&self, ids: &[PackageId]) -> Result<Vec<Package>> {
        ids.iter()
            .map(|id| {
                self.ports
                    .packages
                    .find_package_by_id(id)?
                    .ok_or_else(|| PackmindError::PackageNotFound(id.clone()))
            })
            .collect()
    }

    fn resolve_recipe_versions(&self, packages: &[Package]) -> Result<Vec<RecipeVersion>> {
        let ids: Vec<&RecipeId> = packages.iter().flat_map(|p| &p.recipes).unique().collect();
        let mut versions = Vec::with_capacity(ids.len());
        for id in ids {
            let latest = self
                .ports
                .recipes
                .list_recipe_versions(id)?
                .into_iter()
                .max_by_key(|v| v.version);
            match latest {
                Some(version) => versions.push(version),
                None => warn!(recipe_id = %id, "Recipe has no versions, skipping"),
            }
        }
        versions.sort_by(|a, b| compare_names(&a.name, &b.name));
        Ok(versions)
    }

    fn resolve_standard_versions(&self, packages: &[Package]) -> Result<Vec<StandardVersion>> {
        let ids: Vec<&StandardId> = packages
            .iter()
            .flat_map(|p| &p.standards)
            .unique()
            .collect();
        let mut versions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.ports.standards.get_latest_standard_version(id)? {
                Some(version) => versions.push(version),
                None => warn!(standard_id = %id, "Standard has no versions, skipping"),
            }
        }
        versions.sort_by(|a, b| compare_names(&a.name, &b.name));
        Ok(versions)
    }

    fn group_targets_by_repository(&self, target_ids: &[TargetId]) -> Result<Vec<RepositoryGroup>> {
        let mut groups: Vec<RepositoryGroup> = Vec::new();
        let mut index: HashMap<GitRepoId, usize> = HashMap::new();

        for target_id in target_ids {
            let target = self
                .ports
                .targets
                .find_target_by_id(target_id)?
                .ok_or_else(|| PackmindError::TargetNotFound(target_id.clone()))?;
            let repo = self
                .ports
                .git
                .get_repository_by_id(&target.git_repo_id)?
                .ok_or_else(|| PackmindError::RepositoryNotFound(target.git_repo_id.to_string()))?;

            match index.get(&repo.id) {
                Some(&i) => groups[i].targets.push(target),
                None => {
                    index.insert(repo.id.clone(), groups.len());
                    groups.push(RepositoryGroup {
                        repo,
                        targets: vec![target],
                    });
                }
            }
        }
        Ok(groups)
    }

    fn deploy_group(
        &self,
        command: &PublishPackagesCommand,
        group: &RepositoryGroup,
        render_modes: &[RenderMode],
        packages: &[Package],
        recipe_versions: &[RecipeVersion],
        standard_versions: &[StandardVersion],
    ) -> Result<GroupOutcome> {
        info!(
            repository = %group.repo.full_name(),
            targets = group.targets.len(),
            "Deploying to repository"
        );

        let mut previous_recipes: Vec<RecipeVersion> = Vec::new();
        let mut previous_standards: Vec<StandardVersion> = Vec::new();
        for target in &group.targets {
            previous_recipes.extend(
                self.ports
                    .active_versions
                    .list_active_recipe_versions_by_target(&command.organization_id, &target.id)?,
            );
            previous_standards.extend(
                self.ports
                    .active_versions
                    .list_active_standard_versions_by_target(
                        &command.organization_id,
                        &target.id,
                    )?,
            );
        }

        let all_recipes = combine_versions(
            keep_highest(previous_recipes, |v| v.recipe_id.as_str(), |v| v.version),
            recipe_versions,
            |v| v.recipe_id.as_str(),
            |v| v.name.as_str(),
        );
        let all_standards = combine_versions(
            keep_highest(previous_standards, |v| v.standard_id.as_str(), |v| v.version),
            standard_versions,
            |v| v.standard_id.as_str(),
            |v| v.name.as_str(),
        );
        debug!(
            recipes = all_recipes.len(),
            standards = all_standards.len(),
            "Combined with previously deployed versions"
        );

        let coding_agents = coding_agents_for(render_modes);

        let mut updates = if standard_versions.is_empty() {
            FileUpdates::default()
        } else {
            self.ports
                .coding_agents
                .prepare_standards_deployment(&PrepareStandardsDeployment {
                    organization_id: command.organization_id.clone(),
                    user_id: command.user_id.clone(),
                    standard_versions: all_standards.clone(),
                    git_repo: group.repo.clone(),
                    targets: group.targets.clone(),
                    coding_agents: coding_agents.clone(),
                })?
        };
        if !recipe_versions.is_empty() {
            updates.extend(self.ports.coding_agents.prepare_recipes_deployment(
                &PrepareRecipesDeployment {
                    organization_id: command.organization_id.clone(),
                    user_id: command.user_id.clone(),
                    recipe_versions: all_recipes.clone(),
                    git_repo: group.repo.clone(),
                    targets: group.targets.clone(),
                    coding_agents,
                },
            )?);
        }

        let message = build_commit_message(
            &self.commit_prefix,
            packages,
            recipe_versions,
            &all_recipes,
            standard_versions,
            &all_standards,
            &group.targets,
        );

        match self.ports.git.commit_to_git(&group.repo, &updates, &message) {
            Ok(commit) => Ok(GroupOutcome::Committed {
                commit,
                recipe_versions: all_recipes,
                standard_versions: all_standards,
            }),
            Err(e) if e.is_no_changes() => Ok(GroupOutcome::NoChanges {
                recipe_versions: all_recipes,
                standard_versions: all_standards,
            }),
            Err(e) => Err(e),
        }
    }

    fn record_group(
        &self,
        command: &PublishPackagesCommand,
        group: &RepositoryGroup,
        render_modes: &[RenderMode],
        packages: &[Package],
        outcome: Result<GroupOutcome>,
    ) -> Result<Vec<PackagesDeployment>> {
        let (status, commit, error, recipe_versions, standard_versions) = match outcome {
            Ok(GroupOutcome::Committed {
                commit,
                recipe_versions,
                standard_versions,
            }) => {
                info!(repository = %group.repo.full_name(), sha = %commit.sha, "Committed");
                (
                    DistributionStatus::Success,
                    Some(commit),
                    None,
                    recipe_versions,
                    standard_versions,
                )
            }
            Ok(GroupOutcome::NoChanges {
                recipe_versions,
                standard_versions,
            }) => {
                info!(repository = %group.repo.full_name(), "No changes detected");
                (
                    DistributionStatus::NoChanges,
                    None,
                    None,
                    recipe_versions,
                    standard_versions,
                )
            }
            Err(e) => {
                error!(
                    repository = %group.repo.full_name(),
                    error = %e,
                    "Repository deployment failed"
                );
                (
                    DistributionStatus::Failure,
                    None,
                    Some(e.to_string()),
                    Vec::new(),
                    Vec::new(),
                )
            }
        };

        let mut records = Vec::with_capacity(group.targets.len());
        for target in &group.targets {
            let deployment = PackagesDeployment {
                id: DeploymentId::new(),
                packages: packages.to_vec(),
                git_commit: commit.clone(),
                target: target.clone(),
                status,
                error: error.clone(),
                render_modes: render_modes.to_vec(),
                author_id: command.user_id.clone(),
                organization_id: command.organization_id.clone(),
                created_at: Utc::now(),
                recipe_versions: recipe_versions.clone(),
                standard_versions: standard_versions.clone(),
            };
            self.ports.deployments.add_deployment(&deployment)?;
            records.push(deployment);
        }
        Ok(records)
    }
}

fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// One entry per artefact, the highest version winning. First-seen order.
fn keep_highest<V>(
    versions: Vec<V>,
    artefact_id: impl Fn(&V) -> &str,
    version: impl Fn(&V) -> u32,
) -> Vec<V> {
    let mut kept: Vec<V> = Vec::with_capacity(versions.len());
    for candidate in versions {
        match kept
            .iter()
            .position(|v| artefact_id(v) == artefact_id(&candidate))
        {
            Some(i) if version(&candidate) > version(&kept[i]) => kept[i] = candidate,
            Some(_) => {}
            None => kept.push(candidate),
        }
    }
    kept
}

/// Previous versions overlaid with fresh ones (fresh always win), sorted by name.
fn combine_versions<V: Clone>(
    previous: Vec<V>,
    fresh: &[V],
    artefact_id: impl Fn(&V) -> &str,
    name: impl Fn(&V) -> &str,
) -> Vec<V> {
    let mut combined: Vec<V> = previous
        .into_iter()
        .filter(|p| !fresh.iter().any(|f| artefact_id(f) == artefact_id(p)))
        .collect();
    combined.extend(fresh.iter().cloned());
    combined.sort_by(|a, b| compare_names(name(a), name(b)));
    combined
}

/// Commit message for one repository group.
#[must_use]
pub fn build_commit_message(
    prefix: &str,
    packages: &[Package],
    recipe_versions: &[RecipeVersion],
    all_recipe_versions: &[RecipeVersion],
    standard_versions: &[StandardVersion],
    all_standard_versions: &[StandardVersion],
    targets: &[Target],
) -> String {
    let mut lines = vec![prefix.to_string(), String::new()];
    lines.push(format!(
        "- Packages: {}",
        packages.iter().map(|p| p.name.as_str()).join(", ")
    ));
    if !recipe_versions.is_empty() {
        lines.push(format!("- Updated {} recipe(s)", recipe_versions.len()));
        lines.push(format!(
            "- Total recipes in repository: {}",
            all_recipe_versions.len()
        ));
    }
    if !standard_versions.is_empty() {
        lines.push(format!("- Updated {} standard(s)", standard_versions.len()));
        lines.push(format!(
            "- Total standards in repository: {}",
            all_standard_versions.len()
        ));
    }
    lines.push(format!(
        "- Targets: {}",
        targets.iter().map(|t| t.name.as_str()).join(", ")
    ));

    if !recipe_versions.is_empty() {
        lines.push(String::new());
        lines.push("Recipes updated:".to_string());
        lines.extend(
            recipe_versions
                .iter()
                .map(|v| format!("- {} ({}) v{}", v.name, v.slug, v.version)),
        );
    }
    if !standard_versions.is_empty() {
        lines.push(String::new());
        lines.push("Standards updated:".to_string());
        lines.extend(
            standard_versions
                .iter()
                .map(|v| format!("- {} ({}) v{}", v.name, v.slug, v.version)),
        );
    }
    lines.join("\n")
}
