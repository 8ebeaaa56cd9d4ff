//! Artefacts: the versioned knowledge units (commands, standards, skills)

use serde::{Deserialize, Serialize};

use super::ids::{
    OrganizationId, RecipeId, RecipeVersionId, RuleId, SkillFileId, SkillId, SpaceId, StandardId,
    StandardVersionId, UserId,
};

/// Which artefact domain an ID belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtefactKind {
    /// A command (historically called recipe).
    Recipe,
    Standard,
    Skill,
}

impl ArtefactKind {
    /// Label used in user-facing messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Recipe => "Recipe",
            Self::Standard => "Standard",
            Self::Skill => "Skill",
        }
    }
}

impl std::fmt::Display for ArtefactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A space groups artefacts and packages inside an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: SpaceId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub slug: String,
}

/// A command. `content` is what the UI labels "description".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub name: String,
    pub slug: String,
    pub content: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeVersion {
    pub id: RecipeVersionId,
    pub recipe_id: RecipeId,
    pub name: String,
    pub slug: String,
    pub content: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standard {
    pub id: StandardId,
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub version: u32,
    #[serde(default)]
    pub scope: Option<String>,
}

/// A rule owned by a standard. Identity survives content edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_version_id: Option<StandardVersionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardVersion {
    pub id: StandardVersionId,
    pub standard_id: StandardId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub version: u32,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

pub type SkillMetadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub name: String,
    pub slug: String,
    pub version: u32,
    pub description: String,
    pub prompt: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub compatibility: Option<String>,
    #[serde(default)]
    pub allowed_tools: Option<String>,
    #[serde(default)]
    pub metadata: Option<SkillMetadata>,
}

/// A file owned by a skill. Identity survives content edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillFile {
    pub id: SkillFileId,
    pub path: String,
    pub content: String,
    pub permissions: String,
    #[serde(default)]
    pub is_base64: bool,
}
