//! packmind publish - Distribute packages to deployment targets

use clap::Args;

use crate::app::AppContext;
use crate::cli::colors;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_partial};
use crate::core::{DistributionStatus, PackageId, PackagesDeployment, TargetId};
use crate::deployments::PublishPackagesCommand;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Package ID, repeatable
    #[arg(long = "package", required = true)]
    pub packages: Vec<String>,

    /// Target ID, repeatable
    #[arg(long = "target", required = true)]
    pub targets: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &PublishArgs) -> Result<()> {
    let command = PublishPackagesCommand {
        organization_id: ctx.organization_id(),
        user_id: ctx.user_id(),
        package_ids: args
            .packages
            .iter()
            .map(|id| PackageId::from(id.as_str()))
            .collect(),
        target_ids: args
            .targets
            .iter()
            .map(|id| TargetId::from(id.as_str()))
            .collect(),
    };
    let deployments = ctx.publisher().publish(&command)?;

    let failed = deployments
        .iter()
        .filter(|d| d.status == DistributionStatus::Failure)
        .count();
    if ctx.robot() {
        return emit_robot(&robot_partial(
            &deployments,
            deployments.len() - failed,
            failed,
        ));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Published to {} target(s)", deployments.len()));
    for deployment in &deployments {
        layout.push_line(describe(deployment));
    }
    emit_human(layout);
    Ok(())
}

fn describe(deployment: &PackagesDeployment) -> String {
    let detail = match (&deployment.git_commit, &deployment.error) {
        (_, Some(error)) => error.clone(),
        (Some(commit), None) => commit.sha.chars().take(12).collect(),
        (None, None) => String::new(),
    };
    format!(
        "{:<24} {:<10} {}",
        deployment.target.name,
        colors::status(deployment.status),
        colors::dim(&detail)
    )
}
