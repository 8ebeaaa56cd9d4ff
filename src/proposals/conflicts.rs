//! Pairwise conflict detection between pending proposals
//!
//! Fills `conflicts_with` so that reviewers cannot accept two proposals that
//! would overwrite each other. The relation is symmetric.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::core::{ChangeProposal, ChangeProposalId, ProposalChange};

/// Conflict sets keyed by proposal ID. Every input proposal gets an entry,
/// possibly empty.
#[must_use]
pub fn detect_conflicts(
    proposals: &[ChangeProposal],
) -> HashMap<ChangeProposalId, BTreeSet<ChangeProposalId>> {
    let mut conflicts: HashMap<ChangeProposalId, BTreeSet<ChangeProposalId>> = proposals
        .iter()
        .map(|p| (p.id.clone(), BTreeSet::new()))
        .collect();

    for (i, a) in proposals.iter().enumerate() {
        for b in &proposals[i + 1..] {
            if a.id == b.id || a.artefact_id != b.artefact_id {
                continue;
            }
            if changes_conflict(&a.change, &b.change) {
                if let Some(set) = conflicts.get_mut(&a.id) {
                    set.insert(b.id.clone());
                }
                if let Some(set) = conflicts.get_mut(&b.id) {
                    set.insert(a.id.clone());
                }
            }
        }
    }

    debug!(
        proposals = proposals.len(),
        conflicting = conflicts.values().filter(|s| !s.is_empty()).count(),
        "Detected proposal conflicts"
    );
    conflicts
}

/// Recompute `conflicts_with` in place.
pub fn annotate_conflicts(proposals: &mut [ChangeProposal]) {
    let mut conflicts = detect_conflicts(proposals);
    for proposal in proposals.iter_mut() {
        proposal.conflicts_with = conflicts.remove(&proposal.id).unwrap_or_default();
    }
}

fn is_name_update(change: &ProposalChange) -> bool {
    matches!(
        change,
        ProposalChange::UpdateSkillName(_)
            | ProposalChange::UpdateStandardName(_)
            | ProposalChange::UpdateCommandName(_)
    )
}

/// Whether two edits of the same base text cannot be merged line by line.
/// Checked in both directions so the answer does not depend on argument order.
#[must_use]
pub fn text_edits_collide(base: &str, ours: &str, theirs: &str) -> bool {
    ours != theirs
        && (diffy::merge(base, ours, theirs).is_err() || diffy::merge(base, theirs, ours).is_err())
}

/// An added rule whose content is exactly what an update turns another rule into.
fn rule_update_matches_add(a: &ProposalChange, b: &ProposalChange) -> bool {
    match (a, b) {
        (ProposalChange::UpdateRule(update), ProposalChange::AddRule(add))
        | (ProposalChange::AddRule(add), ProposalChange::UpdateRule(update)) => {
            update.new_value == add.item.content
        }
        _ => false,
    }
}

/// Whether two changes on the same artefact cannot both be applied.
#[must_use]
pub fn changes_conflict(a: &ProposalChange, b: &ProposalChange) -> bool {
    if a.artefact_kind() != b.artefact_kind() {
        return false;
    }
    if a.is_add() || b.is_add() {
        return rule_update_matches_add(a, b);
    }

    if let (Some(x), Some(y)) = (a.as_scalar(), b.as_scalar()) {
        if a.type_name() != b.type_name() {
            return false;
        }
        if is_name_update(a) {
            return true;
        }
        if x.old_value != y.old_value {
            return false;
        }
        if matches!(a, ProposalChange::UpdateCommandDescription(_)) {
            return text_edits_collide(&x.old_value, &x.new_value, &y.new_value);
        }
        return x.new_value != y.new_value;
    }

    let (Some(target_a), Some(target_b)) = (a.target_item_id(), b.target_item_id()) else {
        return false;
    };
    if target_a != target_b {
        return false;
    }
    if a.is_delete() || b.is_delete() {
        return true;
    }
    match (a, b) {
        (ProposalChange::UpdateSkillFileContent(x), ProposalChange::UpdateSkillFileContent(y)) => {
            x.is_base64
                || y.is_base64
                || x.old_value != y.old_value
                || text_edits_collide(&x.old_value, &x.new_value, &y.new_value)
        }
        (
            ProposalChange::UpdateSkillFilePermissions(x),
            ProposalChange::UpdateSkillFilePermissions(y),
        ) => x.new_value != y.new_value,
        (ProposalChange::UpdateRule(x), ProposalChange::UpdateRule(y)) => {
            x.new_value != y.new_value
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ItemAdd, ItemDelete, ItemUpdate, NewRule, ScalarUpdate, SpaceId, UserId};
    use crate::test_utils::factories;

    fn on(artefact: &str, change: ProposalChange) -> ChangeProposal {
        ChangeProposal::pending(
            artefact,
            1,
            SpaceId::from("space-1"),
            UserId::from("user-1"),
            change,
        )
    }

    fn scalar(old: &str, new: &str) -> ScalarUpdate {
        ScalarUpdate {
            old_value: old.into(),
            new_value: new.into(),
        }
    }

    fn rule_update(target: &str, new: &str) -> ProposalChange {
        ProposalChange::UpdateRule(ItemUpdate {
            target_id: target.into(),
            old_value: "old".into(),
            new_value: new.into(),
            is_base64: false,
        })
    }

    #[test]
    fn test_name_updates_always_conflict() {
        let p1 = on("cmd-1", ProposalChange::UpdateCommandName(scalar("a", "b")));
        let p2 = on("cmd-1", ProposalChange::UpdateCommandName(scalar("a", "b")));
        let p3 = on("cmd-1", ProposalChange::UpdateCommandName(scalar("x", "y")));
        let result = detect_conflicts(&[p1.clone(), p2.clone(), p3.clone()]);

        assert_eq!(
            result[&p1.id],
            [p2.id.clone(), p3.id.clone()].into_iter().collect()
        );
        assert!(result[&p2.id].contains(&p1.id));
        assert!(result[&p3.id].contains(&p2.id));
    }

    #[test]
    fn test_other_scalars_need_same_old_value() {
        let p1 = on("cmd-1", ProposalChange::UpdateCommandDescription(scalar("body", "v1")));
        let p2 = on("cmd-1", ProposalChange::UpdateCommandDescription(scalar("body", "v2")));
        let p3 = on("cmd-1", ProposalChange::UpdateCommandDescription(scalar("other", "v3")));
        let result = detect_conflicts(&[p1.clone(), p2.clone(), p3.clone()]);

        assert!(result[&p1.id].contains(&p2.id));
        assert!(result[&p3.id].is_empty());
    }

    #[test]
    fn test_mixed_types_and_artefacts_do_not_conflict() {
        let name = on("cmd-1", ProposalChange::UpdateCommandName(scalar("a", "b")));
        let description =
            on("cmd-1", ProposalChange::UpdateCommandDescription(scalar("a", "c")));
        let elsewhere = on("cmd-2", ProposalChange::UpdateCommandName(scalar("a", "z")));
        let result = detect_conflicts(&[name.clone(), description.clone(), elsewhere.clone()]);
        assert!(result.values().all(BTreeSet::is_empty));
    }

    #[test]
    fn test_rule_delete_conflicts_with_update_of_same_rule() {
        let delete = on(
            "std-1",
            ProposalChange::DeleteRule(ItemDelete {
                target_id: "rule-1".into(),
                item: factories::rule("rule-1", "content"),
            }),
        );
        let update = on("std-1", rule_update("rule-1", "new"));
        let unrelated = on("std-1", rule_update("rule-2", "new"));
        let add = on(
            "std-1",
            ProposalChange::AddRule(ItemAdd {
                item: NewRule {
                    content: "new rule".into(),
                },
            }),
        );

        let mut proposals = vec![delete.clone(), update.clone(), unrelated.clone(), add.clone()];
        annotate_conflicts(&mut proposals);

        assert_eq!(proposals[0].conflicts_with.len(), 1);
        assert!(proposals[0].conflicts_with.contains(&update.id));
        assert!(proposals[1].conflicts_with.contains(&delete.id));
        assert!(proposals[2].conflicts_with.is_empty());
        assert!(proposals[3].conflicts_with.is_empty());
    }

    #[test]
    fn test_identical_item_updates_are_compatible() {
        let a = on("std-1", rule_update("rule-1", "same"));
        let b = on("std-1", rule_update("rule-1", "same"));
        let c = on("std-1", rule_update("rule-1", "different"));
        let result = detect_conflicts(&[a.clone(), b.clone(), c.clone()]);
        assert!(!result[&a.id].contains(&b.id));
        assert!(result[&a.id].contains(&c.id));
    }

    fn file_content(old: &str, new: &str, is_base64: bool) -> ProposalChange {
        ProposalChange::UpdateSkillFileContent(ItemUpdate {
            target_id: "file-1".into(),
            old_value: old.into(),
            new_value: new.into(),
            is_base64,
        })
    }

    fn add_rule(content: &str) -> ProposalChange {
        ProposalChange::AddRule(ItemAdd {
            item: NewRule {
                content: content.into(),
            },
        })
    }

    const BASE: &str = "one\ntwo\nthree\nfour\nfive\n";

    #[test]
    fn test_rule_update_conflicts_with_add_of_same_content() {
        let update = on("std-1", rule_update("rule-1", "Use const"));
        let same = on("std-1", add_rule("Use const"));
        let other = on("std-1", add_rule("Use let"));
        let result = detect_conflicts(&[update.clone(), same.clone(), other.clone()]);

        assert!(result[&update.id].contains(&same.id));
        assert!(result[&same.id].contains(&update.id));
        assert!(result[&other.id].is_empty());
        assert!(changes_conflict(&same.change, &update.change));
    }

    #[test]
    fn test_description_edits_on_distinct_lines_merge() {
        let first = on(
            "cmd-1",
            ProposalChange::UpdateCommandDescription(scalar(
                BASE,
                "ONE\ntwo\nthree\nfour\nfive\n",
            )),
        );
        let last = on(
            "cmd-1",
            ProposalChange::UpdateCommandDescription(scalar(
                BASE,
                "one\ntwo\nthree\nfour\nFIVE\n",
            )),
        );
        let overlapping = on(
            "cmd-1",
            ProposalChange::UpdateCommandDescription(scalar(
                BASE,
                "uno\ntwo\nthree\nfour\nfive\n",
            )),
        );
        let result = detect_conflicts(&[first.clone(), last.clone(), overlapping.clone()]);

        assert!(!result[&first.id].contains(&last.id));
        assert!(result[&first.id].contains(&overlapping.id));
        assert!(result[&last.id].is_empty());
    }

    #[test]
    fn test_skill_file_content_uses_line_merge() {
        let top = file_content(BASE, "zero\none\ntwo\nthree\nfour\nfive\n", false);
        let bottom = file_content(BASE, "one\ntwo\nthree\nfour\nfive\nsix\n", false);
        let rewrite = file_content(BASE, "one\nTWO\nthree\nfour\nfive\n", false);
        let clash = file_content(BASE, "one\n2\nthree\nfour\nfive\n", false);
        let stale = file_content("something else\n", "one\n", false);

        assert!(!changes_conflict(&top, &bottom));
        assert!(!changes_conflict(&top, &rewrite));
        assert!(changes_conflict(&rewrite, &clash));
        assert!(changes_conflict(&top, &stale));
    }

    #[test]
    fn test_base64_file_content_always_conflicts() {
        let binary = file_content("aGVsbG8=", "d29ybGQ=", true);
        let text = file_content("aGVsbG8=", "aGVsbG8=\nbW9yZQ==", false);
        let same = file_content("aGVsbG8=", "d29ybGQ=", true);

        assert!(changes_conflict(&binary, &text));
        assert!(changes_conflict(&text, &binary));
        assert!(changes_conflict(&binary, &same));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(detect_conflicts(&[]).is_empty());
        let only = on("cmd-1", ProposalChange::UpdateCommandName(scalar("a", "b")));
        assert!(detect_conflicts(&[only.clone()])[&only.id].is_empty());
    }
}
