//! Change-proposal review: staleness, conflicts and the decision pool

pub mod conflicts;
pub mod pool;
pub mod staleness;

pub use conflicts::{annotate_conflicts, changes_conflict, detect_conflicts};
pub use pool::{ChangeProposalPool, ReviewDecisions};
pub use staleness::{
    compute_command_outdated_ids, compute_skill_outdated_ids, compute_standard_outdated_ids,
    serialize_metadata,
};
