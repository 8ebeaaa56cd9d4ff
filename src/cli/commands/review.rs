//! packmind review - Pool accept/reject decisions and submit them as one batch

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use crate::app::AppContext;
use crate::cli::commands::read_json;
use crate::cli::output::{HumanLayout, emit_human, emit_json, emit_robot, robot_ok};
use crate::core::{ChangeProposal, ChangeProposalId};
use crate::error::{PackmindError, Result};
use crate::proposals::{ChangeProposalPool, ReviewDecisions, annotate_conflicts};

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// JSON array of change proposals
    #[arg(long)]
    pub proposals: PathBuf,

    /// Proposal ID to accept, repeatable
    #[arg(long = "accept")]
    pub accept: Vec<String>,

    /// Proposal ID to reject, repeatable
    #[arg(long = "reject")]
    pub reject: Vec<String>,

    /// Write the decisions here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ReviewReport {
    decisions: ReviewDecisions,
    /// Pending proposals conflicting with an accepted one.
    blocked: Vec<ChangeProposalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<PathBuf>,
}

pub fn run(ctx: &AppContext, args: &ReviewArgs) -> Result<()> {
    let mut proposals: Vec<ChangeProposal> = read_json::<Vec<ChangeProposal>>(&args.proposals)?
        .into_iter()
        .filter(ChangeProposal::is_pending)
        .collect();
    annotate_conflicts(&mut proposals);

    let mut pool = ChangeProposalPool::new();
    apply_decisions(&mut pool, &proposals, &args.accept, &args.reject)?;

    let blocked: Vec<ChangeProposalId> = pool
        .blocked_by_conflict_ids(&proposals)
        .into_iter()
        .filter(|id| !pool.is_rejected(id))
        .collect();
    if !blocked.is_empty() {
        warn!(blocked = blocked.len(), "Accepted proposals conflict with pending ones");
    }

    let mut decisions = ReviewDecisions::default();
    pool.submit(|pooled| {
        if let Some(path) = &args.out {
            let mut content = serde_json::to_string_pretty(pooled)?;
            content.push('\n');
            std::fs::write(path, content)?;
        }
        decisions = pooled.clone();
        Ok(())
    })?;
    info!(
        accepted = decisions.accepted.len(),
        rejected = decisions.rejected.len(),
        "Review decisions submitted"
    );

    let report = ReviewReport {
        decisions,
        blocked,
        written_to: args.out.clone(),
    };
    if ctx.robot() {
        return emit_robot(&robot_ok(&report));
    }
    if report.written_to.is_none() {
        return emit_json(&report.decisions);
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Review submitted")
        .kv("Accepted", &report.decisions.accepted.len().to_string())
        .kv("Rejected", &report.decisions.rejected.len().to_string());
    if let Some(path) = &report.written_to {
        layout.kv("Written to", &path.display().to_string());
    }
    for id in &report.blocked {
        layout.bullet(&format!("{id} conflicts with an accepted proposal"));
    }
    emit_human(layout);
    Ok(())
}

/// Later flags win: an ID given to both `--accept` and `--reject` ends up rejected.
fn apply_decisions(
    pool: &mut ChangeProposalPool,
    proposals: &[ChangeProposal],
    accept: &[String],
    reject: &[String],
) -> Result<()> {
    let lookup = |raw: &str| -> Result<ChangeProposalId> {
        proposals
            .iter()
            .find(|p| p.id.as_str() == raw)
            .map(|p| p.id.clone())
            .ok_or_else(|| {
                PackmindError::ValidationFailed(format!("no pending proposal with id {raw}"))
            })
    };
    for raw in accept {
        pool.accept(&lookup(raw.as_str())?);
    }
    for raw in reject {
        pool.reject(&lookup(raw.as_str())?);
    }
    Ok(())
}
