//! Review session: outdated detection, conflicts and pooled decisions together.

use packmind::core::{
    ChangeProposal, ChangeProposalId, ItemDelete, ItemUpdate, ProposalChange, ScalarUpdate,
    SpaceId, UserId,
};
use packmind::proposals::{
    ChangeProposalPool, ReviewDecisions, annotate_conflicts, compute_standard_outdated_ids,
};
use packmind::test_utils::factories;

fn proposal(id: &str, version: u32, change: ProposalChange) -> ChangeProposal {
    let mut proposal = ChangeProposal::pending(
        "standard-1",
        version,
        SpaceId::from(factories::SPACE),
        UserId::from(factories::USER),
        change,
    );
    proposal.id = ChangeProposalId::from(id);
    proposal
}

fn rule_update(target: &str, old: &str, new: &str) -> ProposalChange {
    ProposalChange::UpdateRule(ItemUpdate {
        target_id: target.into(),
        old_value: old.to_string(),
        new_value: new.to_string(),
        is_base64: false,
    })
}

#[test]
fn test_review_session_over_a_moved_standard() {
    let standard = factories::standard(3);
    let rules = vec![
        factories::rule("rule-1", "Use tracing"),
        factories::rule("rule-2", "Prefer ? over match"),
    ];

    let mut proposals = vec![
        proposal("fresh", 2, rule_update("rule-1", "Use tracing", "Use tracing spans")),
        proposal("stale", 2, rule_update("rule-2", "Prefer unwrap", "Prefer ?")),
        proposal(
            "delete",
            2,
            ProposalChange::DeleteRule(ItemDelete {
                target_id: "rule-1".into(),
                item: factories::rule("rule-1", "Use tracing"),
            }),
        ),
        proposal(
            "rename",
            3,
            ProposalChange::UpdateStandardName(ScalarUpdate {
                old_value: "Outdated name".to_string(),
                new_value: "Rust".to_string(),
            }),
        ),
    ];

    let outdated = compute_standard_outdated_ids(&proposals, Some(&standard), &rules);
    assert_eq!(outdated.len(), 1);
    assert!(outdated.contains(&ChangeProposalId::from("stale")));

    annotate_conflicts(&mut proposals);
    assert!(proposals[0].conflicts_with.contains(&ChangeProposalId::from("delete")));
    assert!(proposals[2].conflicts_with.contains(&ChangeProposalId::from("fresh")));
    assert!(proposals[3].conflicts_with.is_empty());

    let mut pool = ChangeProposalPool::new();
    pool.accept(&ChangeProposalId::from("fresh"));
    pool.reject(&ChangeProposalId::from("stale"));
    let blocked = pool.blocked_by_conflict_ids(&proposals);
    assert_eq!(blocked.len(), 1);
    assert!(blocked.contains(&ChangeProposalId::from("delete")));

    let mut sent = ReviewDecisions::default();
    pool.submit(|decisions| {
        sent = decisions.clone();
        Ok(())
    })
    .unwrap();
    assert_eq!(sent.accepted, vec![ChangeProposalId::from("fresh")]);
    assert_eq!(sent.rejected, vec![ChangeProposalId::from("stale")]);
    assert!(!pool.has_decisions());
}
