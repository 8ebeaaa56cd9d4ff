//! Packages: named bundles of artefact references distributed together

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ids::{PackageId, RecipeId, SkillId, SpaceId, StandardId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    /// Unique within the space.
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub space_id: SpaceId,
    pub created_by: UserId,
    #[serde(default)]
    pub recipes: Vec<RecipeId>,
    #[serde(default)]
    pub standards: Vec<StandardId>,
    #[serde(default)]
    pub skills: Vec<SkillId>,
}

impl Package {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty() && self.standards.is_empty() && self.skills.is_empty()
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes. Accented and
/// non-Latin characters are transliterated first.
#[must_use]
pub fn slugify(name: &str) -> String {
    let slug = slug::slugify(name);
    if slug.is_empty() {
        "package".to_string()
    } else {
        slug
    }
}

/// First free slug: `base`, then `base-1`, `base-2`, ...
#[must_use]
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut suffix = 1u32;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
