//! packmind deployments - Deployment history

use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cli::colors;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::core::TargetId;
use crate::deployments::ports::PackagesDeploymentRepository;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct DeploymentsArgs {
    #[command(subcommand)]
    pub command: DeploymentsCommand,
}

#[derive(Subcommand, Debug)]
pub enum DeploymentsCommand {
    /// List deployments, newest first
    List {
        /// Only deployments to this target
        #[arg(long)]
        target: Option<String>,

        /// Show at most this many entries
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(ctx: &AppContext, args: &DeploymentsArgs) -> Result<()> {
    match &args.command {
        DeploymentsCommand::List { target, limit } => {
            let target = target.as_deref().map(TargetId::from);
            let mut deployments = ctx
                .db
                .list_deployments(&ctx.organization_id(), target.as_ref())?;
            deployments.truncate(*limit);

            if ctx.robot() {
                return emit_robot(&robot_ok(&deployments));
            }
            if deployments.is_empty() {
                println!("No deployments yet");
                return Ok(());
            }
            let mut layout = HumanLayout::new();
            layout.title("Deployments");
            for deployment in &deployments {
                let packages: Vec<&str> =
                    deployment.packages.iter().map(|p| p.slug.as_str()).collect();
                layout.push_line(format!(
                    "{} {:<20} {:<10} {}",
                    colors::dim(&deployment.created_at.format("%Y-%m-%d %H:%M").to_string()),
                    deployment.target.name,
                    colors::status(deployment.status),
                    packages.join(", ")
                ));
            }
            emit_human(layout);
            Ok(())
        }
    }
}
