//! packmind package - Manage packages and consumer manifests

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::colors;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::core::{Package, PackageId, RecipeId, SkillId, SpaceId, StandardId};
use crate::deployments::packmind_config::{
    CONFIG_FILE_NAME, create_config_file_modification, create_removal_config_file_modification,
};
use crate::deployments::{
    AddArtefactsCommand, CreatePackageCommand, DeletePackagesCommand, PackmindFileConfig,
    UpdatePackageCommand,
};
use crate::error::{PackmindError, Result};

#[derive(Args, Debug)]
pub struct PackageArgs {
    #[command(subcommand)]
    pub command: PackageCommand,
}

#[derive(Subcommand, Debug)]
pub enum PackageCommand {
    /// Create a package in a space
    Create(CreateArgs),
    /// Add artefacts to an existing package
    Add(AddArgs),
    /// Replace name, description and members of a package
    Update(UpdateArgs),
    /// List the packages of a space
    List(ListArgs),
    /// Delete packages (all-or-nothing)
    Delete(DeleteArgs),
    /// Add packages to a repository's packmind.json
    Install(InstallArgs),
    /// Remove a package from a repository's packmind.json
    Uninstall(UninstallArgs),
}

#[derive(Args, Debug, Default)]
pub struct MemberArgs {
    /// Command (recipe) ID, repeatable
    #[arg(long = "recipe")]
    pub recipes: Vec<String>,

    /// Standard ID, repeatable
    #[arg(long = "standard")]
    pub standards: Vec<String>,

    /// Skill ID, repeatable
    #[arg(long = "skill")]
    pub skills: Vec<String>,
}

impl MemberArgs {
    fn recipe_ids(&self) -> Vec<RecipeId> {
        self.recipes.iter().map(|id| RecipeId::from(id.as_str())).collect()
    }

    fn standard_ids(&self) -> Vec<StandardId> {
        self.standards
            .iter()
            .map(|id| StandardId::from(id.as_str()))
            .collect()
    }

    fn skill_ids(&self) -> Vec<SkillId> {
        self.skills.iter().map(|id| SkillId::from(id.as_str())).collect()
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub space: String,

    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[command(flatten)]
    pub members: MemberArgs,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Package ID
    pub package: String,

    #[command(flatten)]
    pub members: MemberArgs,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Package ID
    pub package: String,

    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[command(flatten)]
    pub members: MemberArgs,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub space: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(long)]
    pub space: String,

    /// Package IDs
    #[arg(required = true)]
    pub packages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Package slugs
    #[arg(required = true)]
    pub slugs: Vec<String>,

    /// Repository directory holding packmind.json
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Check the slugs exist in this space first
    #[arg(long)]
    pub space: Option<String>,
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Package slug
    pub slug: String,

    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

pub fn run(ctx: &AppContext, args: &PackageArgs) -> Result<()> {
    match &args.command {
        PackageCommand::Create(args) => run_create(ctx, args),
        PackageCommand::Add(args) => run_add(ctx, args),
        PackageCommand::Update(args) => run_update(ctx, args),
        PackageCommand::List(args) => run_list(ctx, args),
        PackageCommand::Delete(args) => run_delete(ctx, args),
        PackageCommand::Install(args) => run_install(ctx, args),
        PackageCommand::Uninstall(args) => run_uninstall(ctx, args),
    }
}

fn run_create(ctx: &AppContext, args: &CreateArgs) -> Result<()> {
    let package = ctx.package_catalog().create_package(&CreatePackageCommand {
        organization_id: ctx.organization_id(),
        user_id: ctx.user_id(),
        space_id: SpaceId::from(args.space.as_str()),
        name: args.name.clone(),
        description: args.description.clone(),
        recipe_ids: args.members.recipe_ids(),
        standard_ids: args.members.standard_ids(),
        skill_ids: args.members.skill_ids(),
    })?;
    emit_package(ctx, "Created package", &package)
}

fn run_add(ctx: &AppContext, args: &AddArgs) -> Result<()> {
    let package = ctx
        .package_catalog()
        .add_artefacts_to_package(&AddArtefactsCommand {
            organization_id: ctx.organization_id(),
            user_id: ctx.user_id(),
            package_id: PackageId::from(args.package.as_str()),
            recipe_ids: args.members.recipe_ids(),
            standard_ids: args.members.standard_ids(),
            skill_ids: args.members.skill_ids(),
        })?;
    emit_package(ctx, "Updated package", &package)
}

fn run_update(ctx: &AppContext, args: &UpdateArgs) -> Result<()> {
    let package = ctx.package_catalog().update_package(&UpdatePackageCommand {
        organization_id: ctx.organization_id(),
        user_id: ctx.user_id(),
        package_id: PackageId::from(args.package.as_str()),
        name: args.name.clone(),
        description: args.description.clone(),
        recipe_ids: args.members.recipe_ids(),
        standard_ids: args.members.standard_ids(),
        skill_ids: args.members.skill_ids(),
    })?;
    emit_package(ctx, "Updated package", &package)
}

fn run_list(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let packages = ctx
        .package_catalog()
        .list_packages(&SpaceId::from(args.space.as_str()))?;

    if ctx.robot() {
        return emit_robot(&robot_ok(&packages));
    }
    if packages.is_empty() {
        println!("No packages in space {}", args.space);
        return Ok(());
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("Packages in {}", args.space));
    for package in &packages {
        layout.bullet(&format!(
            "{} {} {}",
            package.slug,
            colors::dim(package.id.as_str()),
            member_summary(package)
        ));
    }
    emit_human(layout);
    Ok(())
}

fn run_delete(ctx: &AppContext, args: &DeleteArgs) -> Result<()> {
    let package_ids: Vec<PackageId> = args
        .packages
        .iter()
        .map(|id| PackageId::from(id.as_str()))
        .collect();
    ctx.package_catalog()
        .delete_packages_batch(&DeletePackagesCommand {
            space_id: SpaceId::from(args.space.as_str()),
            package_ids: package_ids.clone(),
            user_id: ctx.user_id(),
        })?;

    if ctx.robot() {
        emit_robot(&robot_ok(serde_json::json!({ "deleted": package_ids })))
    } else {
        println!("Deleted {} package(s)", package_ids.len());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ManifestReport {
    path: PathBuf,
    manifest: PackmindFileConfig,
}

fn run_install(ctx: &AppContext, args: &InstallArgs) -> Result<()> {
    if let Some(space) = &args.space {
        let known: Vec<String> = ctx
            .package_catalog()
            .list_packages(&SpaceId::from(space.as_str()))?
            .into_iter()
            .map(|p| p.slug)
            .collect();
        if let Some(missing) = args.slugs.iter().find(|slug| !known.contains(slug)) {
            return Err(PackmindError::ValidationFailed(format!(
                "no package with slug '{missing}' in space {space}"
            )));
        }
    }

    let slugs: Vec<&str> = args.slugs.iter().map(String::as_str).collect();
    let path = install_packages(&args.dir, &slugs)?;
    emit_manifest(ctx, path)
}

fn run_uninstall(ctx: &AppContext, args: &UninstallArgs) -> Result<()> {
    let path = uninstall_package(&args.dir, &args.slug)?;
    emit_manifest(ctx, path)
}

fn read_manifest(dir: &Path) -> Result<Option<PackmindFileConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    PackmindFileConfig::parse(&content).map(Some)
}

/// Merge `slugs` into `dir/packmind.json`, creating it when absent.
pub fn install_packages(dir: &Path, slugs: &[&str]) -> Result<PathBuf> {
    let existing = read_manifest(dir)?;
    let modification = create_config_file_modification(
        slugs,
        existing.as_ref().map(|c| &c.packages),
        existing.as_ref().and_then(|c| c.agents.as_deref()),
    )?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&modification.path);
    std::fs::write(&path, modification.content)?;
    Ok(path)
}

/// Drop `slug` from `dir/packmind.json`. A missing manifest is an error.
pub fn uninstall_package(dir: &Path, slug: &str) -> Result<PathBuf> {
    let existing = read_manifest(dir)?.ok_or_else(|| {
        PackmindError::ValidationFailed(format!(
            "{} not found in {}",
            CONFIG_FILE_NAME,
            dir.display()
        ))
    })?;
    let modification = create_removal_config_file_modification(
        slug,
        &existing.packages,
        existing.agents.as_deref(),
    )?;
    let path = dir.join(&modification.path);
    std::fs::write(&path, modification.content)?;
    Ok(path)
}

fn emit_manifest(ctx: &AppContext, path: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&path)?;
    if ctx.robot() {
        let manifest = PackmindFileConfig::parse(&content)?;
        emit_robot(&robot_ok(ManifestReport { path, manifest }))
    } else {
        println!("Wrote {}", path.display());
        print!("{content}");
        Ok(())
    }
}

fn emit_package(ctx: &AppContext, title: &str, package: &Package) -> Result<()> {
    if ctx.robot() {
        return emit_robot(&robot_ok(package));
    }
    let mut layout = HumanLayout::new();
    layout
        .title(title)
        .kv("ID", package.id.as_str())
        .kv("Name", &package.name)
        .kv("Slug", &package.slug)
        .kv("Space", package.space_id.as_str())
        .kv("Members", &member_summary(package));
    emit_human(layout);
    Ok(())
}

fn member_summary(package: &Package) -> String {
    format!(
        "{} command(s), {} standard(s), {} skill(s)",
        package.recipes.len(),
        package.standards.len(),
        package.skills.len()
    )
}
