//! Outdated-proposal detection
//!
//! A pending proposal is outdated when the artefact moved on since the
//! proposal was captured and the part of it the proposal edits no longer
//! matches the snapshot in the payload.
//!
//! Proposals captured against the artefact's current version are never
//! outdated, whatever their payload says. Version equality is trusted as
//! "nothing changed"; content is not re-verified in that case.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::core::{
    ChangeProposal, ChangeProposalId, ProposalChange, Recipe, Rule, Skill, SkillFile,
    SkillMetadata, Standard,
};

/// Outdated proposals among `proposals` for a skill and its current files.
#[must_use]
pub fn compute_skill_outdated_ids(
    proposals: &[ChangeProposal],
    skill: Option<&Skill>,
    files: &[SkillFile],
) -> HashSet<ChangeProposalId> {
    let Some(skill) = skill else {
        return HashSet::new();
    };
    collect_outdated(proposals, skill.version, |change| {
        is_skill_change_outdated(change, skill, files)
    })
}

/// Outdated proposals among `proposals` for a standard and its current rules.
#[must_use]
pub fn compute_standard_outdated_ids(
    proposals: &[ChangeProposal],
    standard: Option<&Standard>,
    rules: &[Rule],
) -> HashSet<ChangeProposalId> {
    let Some(standard) = standard else {
        return HashSet::new();
    };
    collect_outdated(proposals, standard.version, |change| {
        is_standard_change_outdated(change, standard, rules)
    })
}

/// Outdated proposals among `proposals` for a command. Commands own no
/// collections, so only scalar fields are compared.
#[must_use]
pub fn compute_command_outdated_ids(
    proposals: &[ChangeProposal],
    recipe: Option<&Recipe>,
) -> HashSet<ChangeProposalId> {
    let Some(recipe) = recipe else {
        return HashSet::new();
    };
    collect_outdated(proposals, recipe.version, |change| {
        is_command_change_outdated(change, recipe)
    })
}

/// Skill metadata as compared by `updateSkillMetadata` proposals: top-level
/// keys sorted ascending, compact JSON, `{}` when absent.
#[must_use]
pub fn serialize_metadata(metadata: Option<&SkillMetadata>) -> String {
    let Some(metadata) = metadata else {
        return "{}".to_string();
    };
    let sorted: BTreeMap<&str, &serde_json::Value> =
        metadata.iter().map(|(k, v)| (k.as_str(), v)).collect();
    serde_json::to_string(&sorted).unwrap_or_else(|_| "{}".to_string())
}

fn collect_outdated(
    proposals: &[ChangeProposal],
    current_version: u32,
    is_outdated: impl Fn(&ProposalChange) -> bool,
) -> HashSet<ChangeProposalId> {
    let outdated: HashSet<ChangeProposalId> = proposals
        .iter()
        .filter(|p| p.artefact_version != current_version)
        .filter(|p| is_outdated(&p.change))
        .map(|p| p.id.clone())
        .collect();
    debug!(
        proposals = proposals.len(),
        outdated = outdated.len(),
        current_version,
        "Computed outdated proposals"
    );
    outdated
}

fn differs(old_value: &str, current: &str) -> bool {
    old_value != current
}

fn is_skill_change_outdated(change: &ProposalChange, skill: &Skill, files: &[SkillFile]) -> bool {
    let find_file = |id: &str| files.iter().find(|f| f.id.as_str() == id);
    match change {
        ProposalChange::UpdateSkillName(u) => differs(&u.old_value, &skill.name),
        ProposalChange::UpdateSkillDescription(u) => differs(&u.old_value, &skill.description),
        ProposalChange::UpdateSkillPrompt(u) => differs(&u.old_value, &skill.prompt),
        ProposalChange::UpdateSkillLicense(u) => {
            differs(&u.old_value, skill.license.as_deref().unwrap_or_default())
        }
        ProposalChange::UpdateSkillCompatibility(u) => {
            differs(&u.old_value, skill.compatibility.as_deref().unwrap_or_default())
        }
        ProposalChange::UpdateSkillAllowedTools(u) => {
            differs(&u.old_value, skill.allowed_tools.as_deref().unwrap_or_default())
        }
        ProposalChange::UpdateSkillMetadata(u) => {
            differs(&u.old_value, &serialize_metadata(skill.metadata.as_ref()))
        }
        ProposalChange::UpdateSkillFileContent(u) => find_file(u.target_id.as_str())
            .is_none_or(|file| differs(&u.old_value, &file.content)),
        ProposalChange::UpdateSkillFilePermissions(u) => find_file(u.target_id.as_str())
            .is_none_or(|file| differs(&u.old_value, &file.permissions)),
        ProposalChange::DeleteSkillFile(d) => find_file(d.target_id.as_str())
            .is_none_or(|file| differs(&d.item.content, &file.content)),
        // Adds have no current state to go stale against; other kinds are ignored.
        _ => false,
    }
}

fn is_standard_change_outdated(
    change: &ProposalChange,
    standard: &Standard,
    rules: &[Rule],
) -> bool {
    let find_rule = |id: &str| rules.iter().find(|r| r.id.as_str() == id);
    match change {
        ProposalChange::UpdateStandardName(u) => differs(&u.old_value, &standard.name),
        ProposalChange::UpdateStandardDescription(u) => {
            differs(&u.old_value, &standard.description)
        }
        ProposalChange::UpdateStandardScope(u) => {
            differs(&u.old_value, standard.scope.as_deref().unwrap_or_default())
        }
        ProposalChange::UpdateRule(u) => find_rule(u.target_id.as_str())
            .is_none_or(|rule| differs(&u.old_value, &rule.content)),
        ProposalChange::DeleteRule(d) => find_rule(d.target_id.as_str())
            .is_none_or(|rule| differs(&d.item.content, &rule.content)),
        _ => false,
    }
}

fn is_command_change_outdated(change: &ProposalChange, recipe: &Recipe) -> bool {
    match change {
        ProposalChange::UpdateCommandName(u) => differs(&u.old_value, &recipe.name),
        ProposalChange::UpdateCommandDescription(u) => differs(&u.old_value, &recipe.content),
        _ => false,
    }
}
