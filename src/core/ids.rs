//! Strongly typed identifiers
//!
//! Every entity is keyed by an opaque string. Fresh IDs are UUID v4, but any
//! string is accepted so IDs coming from other systems round-trip untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(OrganizationId);
define_id!(UserId);
define_id!(SpaceId);
define_id!(PackageId);
define_id!(TargetId);
define_id!(GitRepoId);
define_id!(GitCommitId);
define_id!(DeploymentId);
define_id!(RecipeId);
define_id!(RecipeVersionId);
define_id!(StandardId);
define_id!(StandardVersionId);
define_id!(SkillId);
define_id!(
    /// Identity of a skill file; stable across content edits.
    SkillFileId
);
define_id!(
    /// Identity of a standard rule; stable across content edits.
    RuleId
);
define_id!(ChangeProposalId);
