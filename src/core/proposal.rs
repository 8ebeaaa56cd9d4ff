//! Change proposals: reviewable, not-yet-applied edits to one artefact
//!
//! The payload shape depends on the proposal type, so the two travel together
//! as one sum type. On the wire a proposal looks like:
//!
//! ```json
//! { "id": "...", "artefactId": "...", "artefactVersion": 3,
//!   "type": "updateRule",
//!   "payload": { "targetId": "rule-1", "oldValue": "...", "newValue": "..." },
//!   "status": "pending", ... }
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artefact::{ArtefactKind, Rule, SkillFile};
use super::ids::{ChangeProposalId, RuleId, SkillFileId, SpaceId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeProposalStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Scalar field edit. `old_value` is the snapshot taken at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarUpdate {
    pub old_value: String,
    pub new_value: String,
}

/// Edit of one item of an owned collection, addressed by stable ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate<Id> {
    pub target_id: Id,
    pub old_value: String,
    pub new_value: String,
    /// Binary skill file content; such updates cannot be merged line by line.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_base64: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAdd<Item> {
    pub item: Item,
}

/// Deletion of one item; `item` is the snapshot the author saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDelete<Id, Item> {
    pub target_id: Id,
    pub item: Item,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSkillFile {
    pub path: String,
    pub content: String,
    pub permissions: String,
    #[serde(default)]
    pub is_base64: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub content: String,
}

/// The proposed edit, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ProposalChange {
    UpdateSkillName(ScalarUpdate),
    UpdateSkillDescription(ScalarUpdate),
    UpdateSkillPrompt(ScalarUpdate),
    UpdateSkillLicense(ScalarUpdate),
    UpdateSkillCompatibility(ScalarUpdate),
    UpdateSkillAllowedTools(ScalarUpdate),
    /// `old_value`/`new_value` hold sorted-key JSON of the metadata object.
    UpdateSkillMetadata(ScalarUpdate),
    UpdateSkillFileContent(ItemUpdate<SkillFileId>),
    UpdateSkillFilePermissions(ItemUpdate<SkillFileId>),
    AddSkillFile(ItemAdd<NewSkillFile>),
    DeleteSkillFile(ItemDelete<SkillFileId, SkillFile>),
    UpdateStandardName(ScalarUpdate),
    UpdateStandardDescription(ScalarUpdate),
    UpdateStandardScope(ScalarUpdate),
    UpdateRule(ItemUpdate<RuleId>),
    AddRule(ItemAdd<NewRule>),
    DeleteRule(ItemDelete<RuleId, Rule>),
    UpdateCommandName(ScalarUpdate),
    /// Edits the command body (`Recipe::content`).
    UpdateCommandDescription(ScalarUpdate),
}

impl ProposalChange {
    /// The artefact domain this change applies to.
    #[must_use]
    pub const fn artefact_kind(&self) -> ArtefactKind {
        match self {
            Self::UpdateSkillName(_)
            | Self::UpdateSkillDescription(_)
            | Self::UpdateSkillPrompt(_)
            | Self::UpdateSkillLicense(_)
            | Self::UpdateSkillCompatibility(_)
            | Self::UpdateSkillAllowedTools(_)
            | Self::UpdateSkillMetadata(_)
            | Self::UpdateSkillFileContent(_)
            | Self::UpdateSkillFilePermissions(_)
            | Self::AddSkillFile(_)
            | Self::DeleteSkillFile(_) => ArtefactKind::Skill,
            Self::UpdateStandardName(_)
            | Self::UpdateStandardDescription(_)
            | Self::UpdateStandardScope(_)
            | Self::UpdateRule(_)
            | Self::AddRule(_)
            | Self::DeleteRule(_) => ArtefactKind::Standard,
            Self::UpdateCommandName(_) | Self::UpdateCommandDescription(_) => {
                ArtefactKind::Recipe
            }
        }
    }

    /// Wire name of the proposal type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::UpdateSkillName(_) => "updateSkillName",
            Self::UpdateSkillDescription(_) => "updateSkillDescription",
            Self::UpdateSkillPrompt(_) => "updateSkillPrompt",
            Self::UpdateSkillLicense(_) => "updateSkillLicense",
            Self::UpdateSkillCompatibility(_) => "updateSkillCompatibility",
            Self::UpdateSkillAllowedTools(_) => "updateSkillAllowedTools",
            Self::UpdateSkillMetadata(_) => "updateSkillMetadata",
            Self::UpdateSkillFileContent(_) => "updateSkillFileContent",
            Self::UpdateSkillFilePermissions(_) => "updateSkillFilePermissions",
            Self::AddSkillFile(_) => "addSkillFile",
            Self::DeleteSkillFile(_) => "deleteSkillFile",
            Self::UpdateStandardName(_) => "updateStandardName",
            Self::UpdateStandardDescription(_) => "updateStandardDescription",
            Self::UpdateStandardScope(_) => "updateStandardScope",
            Self::UpdateRule(_) => "updateRule",
            Self::AddRule(_) => "addRule",
            Self::DeleteRule(_) => "deleteRule",
            Self::UpdateCommandName(_) => "updateCommandName",
            Self::UpdateCommandDescription(_) => "updateCommandDescription",
        }
    }

    /// Scalar payload, if this is a scalar-field update.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&ScalarUpdate> {
        match self {
            Self::UpdateSkillName(u)
            | Self::UpdateSkillDescription(u)
            | Self::UpdateSkillPrompt(u)
            | Self::UpdateSkillLicense(u)
            | Self::UpdateSkillCompatibility(u)
            | Self::UpdateSkillAllowedTools(u)
            | Self::UpdateSkillMetadata(u)
            | Self::UpdateStandardName(u)
            | Self::UpdateStandardDescription(u)
            | Self::UpdateStandardScope(u)
            | Self::UpdateCommandName(u)
            | Self::UpdateCommandDescription(u) => Some(u),
            _ => None,
        }
    }

    /// ID of the collection item this change targets, if any.
    #[must_use]
    pub fn target_item_id(&self) -> Option<&str> {
        match self {
            Self::UpdateSkillFileContent(u) | Self::UpdateSkillFilePermissions(u) => {
                Some(u.target_id.as_str())
            }
            Self::DeleteSkillFile(d) => Some(d.target_id.as_str()),
            Self::UpdateRule(u) => Some(u.target_id.as_str()),
            Self::DeleteRule(d) => Some(d.target_id.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_add(&self) -> bool {
        matches!(self, Self::AddSkillFile(_) | Self::AddRule(_))
    }

    #[must_use]
    pub const fn is_delete(&self) -> bool {
        matches!(self, Self::DeleteSkillFile(_) | Self::DeleteRule(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeProposal {
    pub id: ChangeProposalId,
    /// ID of the skill, standard or command being edited.
    pub artefact_id: String,
    /// Artefact version the proposal was captured against.
    pub artefact_version: u32,
    pub space_id: SpaceId,
    #[serde(flatten)]
    pub change: ProposalChange,
    #[serde(default)]
    pub status: ChangeProposalStatus,
    #[serde(default)]
    pub conflicts_with: BTreeSet<ChangeProposalId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChangeProposal {
    /// Build a pending proposal captured now.
    #[must_use]
    pub fn pending(
        artefact_id: impl Into<String>,
        artefact_version: u32,
        space_id: SpaceId,
        created_by: UserId,
        change: ProposalChange,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ChangeProposalId::new(),
            artefact_id: artefact_id.into(),
            artefact_version,
            space_id,
            change,
            status: ChangeProposalStatus::Pending,
            conflicts_with: BTreeSet::new(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ChangeProposalStatus::Pending
    }
}
