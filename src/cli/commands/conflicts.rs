//! packmind conflicts - Pairwise conflicts between pending proposals

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::cli::commands::read_json;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::core::{ChangeProposal, ChangeProposalId};
use crate::error::Result;
use crate::proposals::annotate_conflicts;

#[derive(Args, Debug)]
pub struct ConflictsArgs {
    /// JSON array of change proposals
    #[arg(long)]
    pub proposals: PathBuf,

    /// Print the annotated proposals instead of the conflict map
    #[arg(long)]
    pub annotate: bool,
}

pub fn run(ctx: &AppContext, args: &ConflictsArgs) -> Result<()> {
    let mut proposals: Vec<ChangeProposal> = read_json::<Vec<ChangeProposal>>(&args.proposals)?
        .into_iter()
        .filter(ChangeProposal::is_pending)
        .collect();
    annotate_conflicts(&mut proposals);

    if ctx.robot() {
        if args.annotate {
            return emit_robot(&robot_ok(&proposals));
        }
        let map: BTreeMap<&ChangeProposalId, Vec<&ChangeProposalId>> = proposals
            .iter()
            .map(|p| (&p.id, p.conflicts_with.iter().collect()))
            .collect();
        return emit_robot(&robot_ok(map));
    }

    let conflicting: Vec<&ChangeProposal> = proposals
        .iter()
        .filter(|p| !p.conflicts_with.is_empty())
        .collect();
    if conflicting.is_empty() {
        println!("No conflicts among {} pending proposal(s)", proposals.len());
        return Ok(());
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("{} conflicting proposal(s)", conflicting.len()));
    for proposal in conflicting {
        let others: Vec<&str> = proposal.conflicts_with.iter().map(|id| id.as_str()).collect();
        layout.bullet(&format!(
            "{} {} conflicts with {}",
            proposal.id,
            proposal.change.type_name(),
            others.join(", ")
        ));
    }
    emit_human(layout);
    Ok(())
}
