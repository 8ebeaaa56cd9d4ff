//! packmind outdated - Flag proposals captured against a stale artefact

use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::read_json;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::core::{ChangeProposal, ChangeProposalId, RecipeId, Rule, SkillFile, SkillId, StandardId};
use crate::deployments::ports::{RecipesPort, SkillsPort, StandardsPort};
use crate::error::{PackmindError, Result};
use crate::proposals::{
    compute_command_outdated_ids, compute_skill_outdated_ids, compute_standard_outdated_ids,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutdatedKind {
    Skill,
    Standard,
    Command,
}

#[derive(Args, Debug)]
pub struct OutdatedArgs {
    #[arg(long, value_enum)]
    pub kind: OutdatedKind,

    /// Artefact ID the proposals edit
    #[arg(long)]
    pub artefact: String,

    /// JSON array of change proposals
    #[arg(long)]
    pub proposals: PathBuf,

    /// JSON array of the artefact's current skill files or rules.
    /// Required for skills. Rules default to those of the latest standard version.
    #[arg(long)]
    pub items: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct OutdatedReport {
    artefact_id: String,
    checked: usize,
    outdated: Vec<ChangeProposalId>,
}

pub fn run(ctx: &AppContext, args: &OutdatedArgs) -> Result<()> {
    let proposals: Vec<ChangeProposal> = read_json::<Vec<ChangeProposal>>(&args.proposals)?
        .into_iter()
        .filter(|p| p.artefact_id == args.artefact && p.is_pending())
        .collect();

    let outdated = match args.kind {
        OutdatedKind::Skill => {
            let skill = ctx
                .catalog
                .get_skill_by_id(&SkillId::from(args.artefact.as_str()))?;
            let Some(path) = &args.items else {
                return Err(PackmindError::ValidationFailed(
                    "--items is required for skills: pass the skill's current files".to_string(),
                ));
            };
            let files: Vec<SkillFile> = read_json(path)?;
            compute_skill_outdated_ids(&proposals, skill.as_ref(), &files)
        }
        OutdatedKind::Standard => {
            let id = StandardId::from(args.artefact.as_str());
            let standard = ctx.catalog.get_standard_by_id(&id)?;
            let rules: Vec<Rule> = match &args.items {
                Some(path) => read_json(path)?,
                None => ctx
                    .catalog
                    .get_latest_standard_version(&id)?
                    .map(|version| version.rules)
                    .unwrap_or_default(),
            };
            compute_standard_outdated_ids(&proposals, standard.as_ref(), &rules)
        }
        OutdatedKind::Command => {
            let recipe = ctx
                .catalog
                .get_recipe_by_id(&RecipeId::from(args.artefact.as_str()))?;
            compute_command_outdated_ids(&proposals, recipe.as_ref())
        }
    };

    let report = OutdatedReport {
        artefact_id: args.artefact.clone(),
        checked: proposals.len(),
        outdated: in_input_order(&proposals, &outdated),
    };

    if ctx.robot() {
        return emit_robot(&robot_ok(&report));
    }
    let mut layout = HumanLayout::new();
    layout
        .title(&format!("Outdated proposals for {}", report.artefact_id))
        .kv("Checked", &report.checked.to_string())
        .kv("Outdated", &report.outdated.len().to_string());
    if !report.outdated.is_empty() {
        layout.blank();
        for proposal in proposals.iter().filter(|p| outdated.contains(&p.id)) {
            layout.bullet(&format!("{} ({})", proposal.id, proposal.change.type_name()));
        }
    }
    emit_human(layout);
    Ok(())
}

fn in_input_order(
    proposals: &[ChangeProposal],
    outdated: &HashSet<ChangeProposalId>,
) -> Vec<ChangeProposalId> {
    proposals
        .iter()
        .filter(|p| outdated.contains(&p.id))
        .map(|p| p.id.clone())
        .collect()
}
