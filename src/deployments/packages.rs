//! Package use cases: create, extend, update and delete packages
//!
//! Every write validates first: the space exists and belongs to the caller's
//! organization, and every referenced artefact exists in that space. A kind's
//! lookup port is never called when no IDs of that kind were given.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::{
    ArtefactKind, OrganizationId, Package, PackageId, RecipeId, SkillId, Space, SpaceId,
    StandardId, UserId, slugify, unique_slug,
};
use crate::deployments::ports::{
    PackageRepository, RecipesPort, SkillsPort, SpacesPort, StandardsPort,
};
use crate::error::{PackmindError, Result};
use crate::events::{DomainEvent, EventPublisher, NoopPublisher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePackageCommand {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub space_id: SpaceId,
    pub name: String,
    pub description: String,
    pub recipe_ids: Vec<RecipeId>,
    pub standard_ids: Vec<StandardId>,
    pub skill_ids: Vec<SkillId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddArtefactsCommand {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub package_id: PackageId,
    pub recipe_ids: Vec<RecipeId>,
    pub standard_ids: Vec<StandardId>,
    pub skill_ids: Vec<SkillId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePackageCommand {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub package_id: PackageId,
    pub name: String,
    pub description: String,
    pub recipe_ids: Vec<RecipeId>,
    pub standard_ids: Vec<StandardId>,
    pub skill_ids: Vec<SkillId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePackagesCommand {
    pub space_id: SpaceId,
    pub package_ids: Vec<PackageId>,
    pub user_id: UserId,
}

#[derive(Clone)]
pub struct CatalogPorts {
    pub packages: Arc<dyn PackageRepository>,
    pub spaces: Arc<dyn SpacesPort>,
    pub recipes: Arc<dyn RecipesPort>,
    pub standards: Arc<dyn StandardsPort>,
    pub skills: Arc<dyn SkillsPort>,
}

pub struct PackageCatalog {
    ports: CatalogPorts,
    events: Arc<dyn EventPublisher>,
}

impl PackageCatalog {
    #[must_use]
    pub fn new(ports: CatalogPorts) -> Self {
        Self {
            ports,
            events: Arc::new(NoopPublisher),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    pub fn create_package(&self, command: &CreatePackageCommand) -> Result<Package> {
        let space = self.get_space(&command.space_id)?;
        if space.organization_id != command.organization_id {
            return Err(PackmindError::WrongOrganization {
                what: "Space",
                id: space.id.to_string(),
                organization_id: command.organization_id.to_string(),
            });
        }
        self.validate_artefacts(
            &space.id,
            &command.recipe_ids,
            &command.standard_ids,
            &command.skill_ids,
        )?;

        let taken: HashSet<String> = self
            .ports
            .packages
            .list_packages_by_space(&space.id)?
            .into_iter()
            .map(|p| p.slug)
            .collect();
        let slug = unique_slug(&slugify(&command.name), &taken);

        let package = Package {
            id: PackageId::new(),
            name: command.name.clone(),
            slug,
            description: command.description.clone(),
            space_id: space.id.clone(),
            created_by: command.user_id.clone(),
            recipes: command.recipe_ids.clone(),
            standards: command.standard_ids.clone(),
            skills: command.skill_ids.clone(),
        };
        self.ports.packages.add_package(&package)?;

        info!(
            package_id = %package.id,
            slug = %package.slug,
            space_id = %space.id,
            "Package created"
        );
        Ok(package)
    }

    pub fn add_artefacts_to_package(&self, command: &AddArtefactsCommand) -> Result<Package> {
        let package = self.get_owned_package(&command.package_id, &command.organization_id)?;

        let recipes = new_members(&package.recipes, &command.recipe_ids);
        let standards = new_members(&package.standards, &command.standard_ids);
        let skills = new_members(&package.skills, &command.skill_ids);

        if recipes.is_empty() && standards.is_empty() && skills.is_empty() {
            debug!(package_id = %package.id, "Nothing new to add");
            return Ok(package);
        }

        self.validate_artefacts(&package.space_id, &recipes, &standards, &skills)?;

        if !recipes.is_empty() {
            self.ports.packages.add_recipes(&package.id, &recipes)?;
        }
        if !standards.is_empty() {
            self.ports.packages.add_standards(&package.id, &standards)?;
        }
        if !skills.is_empty() {
            self.ports.packages.add_skills(&package.id, &skills)?;
        }

        info!(
            package_id = %package.id,
            recipes = recipes.len(),
            standards = standards.len(),
            skills = skills.len(),
            "Artefacts added to package"
        );

        self.ports
            .packages
            .find_package_by_id(&package.id)?
            .ok_or(PackmindError::UpdatedPackageMissing(package.id))
    }

    pub fn update_package(&self, command: &UpdatePackageCommand) -> Result<Package> {
        let existing = self.get_owned_package(&command.package_id, &command.organization_id)?;
        self.validate_artefacts(
            &existing.space_id,
            &command.recipe_ids,
            &command.standard_ids,
            &command.skill_ids,
        )?;

        let package = Package {
            name: command.name.clone(),
            description: command.description.clone(),
            recipes: command.recipe_ids.clone(),
            standards: command.standard_ids.clone(),
            skills: command.skill_ids.clone(),
            ..existing
        };
        self.ports.packages.update_package(&package)?;
        info!(package_id = %package.id, "Package updated");
        Ok(package)
    }

    /// Every package is checked before any is deleted.
    pub fn delete_packages_batch(&self, command: &DeletePackagesCommand) -> Result<()> {
        let found = command
            .package_ids
            .iter()
            .map(|id| Ok((id, self.ports.packages.find_package_by_id(id)?)))
            .collect::<Result<Vec<_>>>()?;

        for (id, package) in &found {
            let Some(package) = package else {
                return Err(PackmindError::PackageMissingFromBatch((*id).clone()));
            };
            if package.space_id != command.space_id {
                return Err(PackmindError::PackageWrongSpace {
                    package_id: package.id.clone(),
                    space_id: command.space_id.clone(),
                });
            }
        }

        self.ports
            .packages
            .delete_packages(&command.package_ids, &command.user_id)?;
        info!(
            count = command.package_ids.len(),
            space_id = %command.space_id,
            "Packages deleted"
        );
        self.events.publish(&DomainEvent::PackagesDeleted {
            package_ids: command.package_ids.clone(),
            space_id: command.space_id.clone(),
            deleted_by: command.user_id.clone(),
        });
        Ok(())
    }

    pub fn list_packages(&self, space_id: &SpaceId) -> Result<Vec<Package>> {
        self.ports.packages.list_packages_by_space(space_id)
    }

    fn get_space(&self, space_id: &SpaceId) -> Result<Space> {
        self.ports
            .spaces
            .get_space_by_id(space_id)?
            .ok_or_else(|| PackmindError::SpaceNotFound(space_id.clone()))
    }

    /// Load a package and check its space belongs to `organization_id`.
    fn get_owned_package(
        &self,
        package_id: &PackageId,
        organization_id: &OrganizationId,
    ) -> Result<Package> {
        let package = self
            .ports
            .packages
            .find_package_by_id(package_id)?
            .ok_or_else(|| PackmindError::PackageNotFound(package_id.clone()))?;
        let space = self.get_space(&package.space_id)?;
        if &space.organization_id != organization_id {
            return Err(PackmindError::WrongOrganization {
                what: "Package",
                id: package.id.to_string(),
                organization_id: organization_id.to_string(),
            });
        }
        Ok(package)
    }

    fn validate_artefacts(
        &self,
        space_id: &SpaceId,
        recipe_ids: &[RecipeId],
        standard_ids: &[StandardId],
        skill_ids: &[SkillId],
    ) -> Result<()> {
        for id in recipe_ids {
            let recipe = self
                .ports
                .recipes
                .get_recipe_by_id(id)?
                .ok_or_else(|| not_found(ArtefactKind::Recipe, id.as_str()))?;
            check_space(ArtefactKind::Recipe, id.as_str(), &recipe.space_id, space_id)?;
        }
        for id in standard_ids {
            let standard = self
                .ports
                .standards
                .get_standard_by_id(id)?
                .ok_or_else(|| not_found(ArtefactKind::Standard, id.as_str()))?;
            check_space(ArtefactKind::Standard, id.as_str(), &standard.space_id, space_id)?;
        }
        for id in skill_ids {
            let skill = self
                .ports
                .skills
                .get_skill_by_id(id)?
                .ok_or_else(|| not_found(ArtefactKind::Skill, id.as_str()))?;
            check_space(ArtefactKind::Skill, id.as_str(), &skill.space_id, space_id)?;
        }
        Ok(())
    }
}

fn new_members<T: Clone + PartialEq>(existing: &[T], requested: &[T]) -> Vec<T> {
    let mut fresh: Vec<T> = Vec::new();
    for id in requested {
        if !existing.contains(id) && !fresh.contains(id) {
            fresh.push(id.clone());
        }
    }
    fresh
}

fn not_found(kind: ArtefactKind, id: &str) -> PackmindError {
    PackmindError::ArtefactNotFound {
        kind,
        id: id.to_string(),
    }
}

fn check_space(kind: ArtefactKind, id: &str, actual: &SpaceId, expected: &SpaceId) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(PackmindError::WrongSpace {
            kind,
            id: id.to_string(),
            space_id: expected.clone(),
        })
    }
}
