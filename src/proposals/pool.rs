//! Review-session state for batching accept/reject decisions

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::{ChangeProposal, ChangeProposalId};
use crate::error::Result;

/// Decisions ready to be sent as one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewDecisions {
    pub accepted: Vec<ChangeProposalId>,
    pub rejected: Vec<ChangeProposalId>,
}

/// Pooled, unsent decisions for one review session.
///
/// `accepted` and `rejected` are always disjoint. The pool is cleared as a
/// whole, never partially.
#[derive(Debug, Clone, Default)]
pub struct ChangeProposalPool {
    reviewing: Option<ChangeProposalId>,
    accepted: BTreeSet<ChangeProposalId>,
    rejected: BTreeSet<ChangeProposalId>,
}

impl ChangeProposalPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `id` for detail view; selecting the open proposal again closes it.
    pub fn toggle_reviewing(&mut self, id: &ChangeProposalId) {
        if self.reviewing.as_ref() == Some(id) {
            self.reviewing = None;
        } else {
            self.reviewing = Some(id.clone());
        }
    }

    #[must_use]
    pub const fn reviewing(&self) -> Option<&ChangeProposalId> {
        self.reviewing.as_ref()
    }

    pub fn accept(&mut self, id: &ChangeProposalId) {
        self.rejected.remove(id);
        self.accepted.insert(id.clone());
    }

    pub fn reject(&mut self, id: &ChangeProposalId) {
        self.accepted.remove(id);
        self.rejected.insert(id.clone());
    }

    /// Forget any decision about `id`.
    pub fn undo(&mut self, id: &ChangeProposalId) {
        self.accepted.remove(id);
        self.rejected.remove(id);
    }

    #[must_use]
    pub fn is_accepted(&self, id: &ChangeProposalId) -> bool {
        self.accepted.contains(id)
    }

    #[must_use]
    pub fn is_rejected(&self, id: &ChangeProposalId) -> bool {
        self.rejected.contains(id)
    }

    #[must_use]
    pub const fn accepted(&self) -> &BTreeSet<ChangeProposalId> {
        &self.accepted
    }

    #[must_use]
    pub const fn rejected(&self) -> &BTreeSet<ChangeProposalId> {
        &self.rejected
    }

    #[must_use]
    pub fn has_decisions(&self) -> bool {
        !self.accepted.is_empty() || !self.rejected.is_empty()
    }

    /// Union of `conflicts_with` over accepted proposals. Advisory only:
    /// nothing here stops a blocked proposal from being accepted.
    #[must_use]
    pub fn blocked_by_conflict_ids(&self, proposals: &[ChangeProposal]) -> BTreeSet<ChangeProposalId> {
        proposals
            .iter()
            .filter(|p| self.accepted.contains(&p.id))
            .flat_map(|p| p.conflicts_with.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn decisions(&self) -> ReviewDecisions {
        ReviewDecisions {
            accepted: self.accepted.iter().cloned().collect(),
            rejected: self.rejected.iter().cloned().collect(),
        }
    }

    pub fn reset(&mut self) {
        self.reviewing = None;
        self.accepted.clear();
        self.rejected.clear();
    }

    /// Hand the pooled decisions to `save`. The pool is reset only when
    /// `save` succeeds; on error every decision is kept.
    pub fn submit<F>(&mut self, save: F) -> Result<()>
    where
        F: FnOnce(&ReviewDecisions) -> Result<()>,
    {
        save(&self.decisions())?;
        self.reset();
        Ok(())
    }
}
