//! Builders for domain values with predictable defaults.
//!
//! Everything lives in space `space-1` of organization `org-1` and is owned
//! by `user-1` unless a test overrides the field.

use chrono::Utc;

use crate::core::{
    DeploymentId, DistributionStatus, GitRepo, OrganizationId, Package, PackagesDeployment,
    Recipe, RecipeVersion, Rule, Skill, SkillFile, Space, Standard, StandardVersion, Target,
    slugify,
};

pub const ORGANIZATION: &str = "org-1";
pub const SPACE: &str = "space-1";
pub const USER: &str = "user-1";

#[must_use]
pub fn space(id: &str, organization_id: &str) -> Space {
    Space {
        id: id.into(),
        organization_id: organization_id.into(),
        name: id.to_string(),
        slug: slugify(id),
    }
}

#[must_use]
pub fn skill(version: u32) -> Skill {
    Skill {
        id: "skill-1".into(),
        space_id: SPACE.into(),
        user_id: USER.into(),
        name: "My Skill".to_string(),
        slug: "my-skill".to_string(),
        version,
        description: "A description".to_string(),
        prompt: "A prompt".to_string(),
        license: None,
        compatibility: None,
        allowed_tools: None,
        metadata: None,
    }
}

#[must_use]
pub fn skill_file(id: &str, content: &str, permissions: &str) -> SkillFile {
    SkillFile {
        id: id.into(),
        path: format!("files/{id}.md"),
        content: content.to_string(),
        permissions: permissions.to_string(),
        is_base64: false,
    }
}

#[must_use]
pub fn standard(version: u32) -> Standard {
    Standard {
        id: "standard-1".into(),
        space_id: SPACE.into(),
        user_id: USER.into(),
        name: "My Standard".to_string(),
        slug: "my-standard".to_string(),
        description: "Standard description".to_string(),
        version,
        scope: Some("**/*.rs".to_string()),
    }
}

#[must_use]
pub fn rule(id: &str, content: &str) -> Rule {
    Rule {
        id: id.into(),
        content: content.to_string(),
        standard_version_id: None,
    }
}

#[must_use]
pub fn recipe(version: u32) -> Recipe {
    Recipe {
        id: "recipe-1".into(),
        space_id: SPACE.into(),
        user_id: USER.into(),
        name: "My Command".to_string(),
        slug: "my-command".to_string(),
        content: "Command content".to_string(),
        version,
    }
}

#[must_use]
pub fn recipe_version(recipe_id: &str, name: &str, version: u32) -> RecipeVersion {
    RecipeVersion {
        id: format!("{recipe_id}-v{version}").into(),
        recipe_id: recipe_id.into(),
        name: name.to_string(),
        slug: slugify(name),
        content: format!("# {name}\n"),
        version,
        summary: None,
    }
}

#[must_use]
pub fn standard_version(standard_id: &str, name: &str, version: u32) -> StandardVersion {
    StandardVersion {
        id: format!("{standard_id}-v{version}").into(),
        standard_id: standard_id.into(),
        name: name.to_string(),
        slug: slugify(name),
        description: format!("{name} description"),
        version,
        scope: None,
        rules: Vec::new(),
    }
}

#[must_use]
pub fn package(id: &str, name: &str, recipes: &[&str], standards: &[&str]) -> Package {
    Package {
        id: id.into(),
        name: name.to_string(),
        slug: slugify(name),
        description: String::new(),
        space_id: SPACE.into(),
        created_by: USER.into(),
        recipes: recipes.iter().map(|&r| r.into()).collect(),
        standards: standards.iter().map(|&s| s.into()).collect(),
        skills: Vec::new(),
    }
}

#[must_use]
pub fn target(id: &str, name: &str, repo_id: &str) -> Target {
    Target {
        id: id.into(),
        name: name.to_string(),
        path: "/".to_string(),
        git_repo_id: repo_id.into(),
    }
}

#[must_use]
pub fn git_repo(id: &str) -> GitRepo {
    GitRepo {
        id: id.into(),
        owner: "acme".to_string(),
        repo: id.to_string(),
        branch: "main".to_string(),
        local_path: None,
    }
}

/// A deployment record with no packages and empty version snapshots.
#[must_use]
pub fn deployment(
    organization_id: &OrganizationId,
    target: &Target,
    status: DistributionStatus,
) -> PackagesDeployment {
    PackagesDeployment {
        id: DeploymentId::new(),
        packages: Vec::new(),
        git_commit: None,
        target: target.clone(),
        status,
        error: (status == DistributionStatus::Failure).then(|| "commit failed".to_string()),
        render_modes: Vec::new(),
        author_id: USER.into(),
        organization_id: organization_id.clone(),
        created_at: Utc::now(),
        recipe_versions: Vec::new(),
        standard_versions: Vec::new(),
    }
}
