use proptest::prelude::*;

use packmind::core::{
    ChangeProposal, ItemAdd, NewRule, ProposalChange, ScalarUpdate, SkillMetadata, SpaceId,
    UserId,
};
use packmind::proposals::{
    changes_conflict, compute_command_outdated_ids, compute_standard_outdated_ids,
    detect_conflicts, serialize_metadata,
};
use packmind::test_utils::factories;

fn scalar(old: String, new: String) -> ScalarUpdate {
    ScalarUpdate {
        old_value: old,
        new_value: new,
    }
}

fn on_command(version: u32, change: ProposalChange) -> ChangeProposal {
    ChangeProposal::pending(
        "recipe-1",
        version,
        SpaceId::from(factories::SPACE),
        UserId::from(factories::USER),
        change,
    )
}

proptest! {
    #[test]
    fn test_current_version_is_never_outdated(old in ".*", new in ".*", version in 1u32..50) {
        let recipe = factories::recipe(version);
        let proposals = vec![
            on_command(version, ProposalChange::UpdateCommandName(scalar(old.clone(), new.clone()))),
            on_command(version, ProposalChange::UpdateCommandDescription(scalar(old, new))),
        ];
        prop_assert!(compute_command_outdated_ids(&proposals, Some(&recipe)).is_empty());
    }

    #[test]
    fn test_add_rule_is_never_outdated(content in ".*", captured in 1u32..50, current in 1u32..50) {
        let standard = factories::standard(current);
        let proposal = ChangeProposal::pending(
            "standard-1",
            captured,
            SpaceId::from(factories::SPACE),
            UserId::from(factories::USER),
            ProposalChange::AddRule(ItemAdd { item: NewRule { content } }),
        );
        prop_assert!(compute_standard_outdated_ids(&[proposal], Some(&standard), &[]).is_empty());
    }

    #[test]
    fn test_metadata_serialization_ignores_insertion_order(
        entries in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8)
    ) {
        let mut forward = SkillMetadata::new();
        for (key, value) in &entries {
            forward.insert(key.clone(), value.clone().into());
        }
        let mut backward = SkillMetadata::new();
        for (key, value) in entries.iter().rev() {
            backward.insert(key.clone(), value.clone().into());
        }
        prop_assert_eq!(
            serialize_metadata(Some(&forward)),
            serialize_metadata(Some(&backward))
        );
    }

    #[test]
    fn test_conflicts_are_symmetric(
        olds in prop::collection::vec("[ab]", 1..6),
        news in prop::collection::vec("[xy]", 1..6),
    ) {
        let proposals: Vec<ChangeProposal> = olds
            .iter()
            .zip(news.iter())
            .map(|(old, new)| {
                on_command(1, ProposalChange::UpdateCommandDescription(scalar(old.clone(), new.clone())))
            })
            .collect();
        let conflicts = detect_conflicts(&proposals);
        for proposal in &proposals {
            prop_assert!(!conflicts[&proposal.id].contains(&proposal.id));
            for other in &conflicts[&proposal.id] {
                prop_assert!(conflicts[other].contains(&proposal.id));
            }
        }
        for a in &proposals {
            for b in &proposals {
                prop_assert_eq!(
                    changes_conflict(&a.change, &b.change),
                    changes_conflict(&b.change, &a.change)
                );
            }
        }
    }
}
