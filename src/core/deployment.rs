//! Targets, repositories, commits and deployment records

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artefact::{RecipeVersion, StandardVersion};
use super::ids::{DeploymentId, GitCommitId, GitRepoId, OrganizationId, TargetId, UserId};
use super::package::Package;
use super::render_mode::RenderMode;

/// A (repository, path) deployment destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: TargetId,
    pub name: String,
    /// Path inside the repository, `/` for the root.
    pub path: String,
    pub git_repo_id: GitRepoId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepo {
    pub id: GitRepoId,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Working copy used by the local git adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl GitRepo {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommit {
    pub id: GitCommitId,
    pub sha: String,
    pub message: String,
    pub author: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileModification {
    pub path: String,
    pub content: String,
}

impl FileModification {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// File instructions produced by a coding agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdates {
    pub create_or_update: Vec<FileModification>,
    pub delete: Vec<FileModification>,
}

impl FileUpdates {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create_or_update.is_empty() && self.delete.is_empty()
    }

    /// Append `other` after `self`, keeping order.
    pub fn extend(&mut self, other: Self) {
        self.create_or_update.extend(other.create_or_update);
        self.delete.extend(other.delete);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    Success,
    Failure,
    NoChanges,
}

impl DistributionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::NoChanges => "no_changes",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "no_changes" => Some(Self::NoChanges),
            _ => None,
        }
    }
}

impl std::fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one publish operation for one target. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagesDeployment {
    pub id: DeploymentId,
    /// Package objects as they were at publish time.
    pub packages: Vec<Package>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<GitCommit>,
    pub target: Target,
    pub status: DistributionStatus,
    /// Present iff `status` is `Failure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub render_modes: Vec<RenderMode>,
    pub author_id: UserId,
    pub organization_id: OrganizationId,
    pub created_at: DateTime<Utc>,
    /// Versions shipped by this publish; feeds the "active versions" queries.
    #[serde(default)]
    pub recipe_versions: Vec<RecipeVersion>,
    #[serde(default)]
    pub standard_versions: Vec<StandardVersion>,
}
