//! Error types for packmind

use thiserror::Error;

use crate::core::{ArtefactKind, PackageId, SpaceId, TargetId};

/// Message carried by the git layer when a commit would not change the tree.
pub const NO_CHANGES_DETECTED: &str = "NO_CHANGES_DETECTED";

#[derive(Error, Debug)]
pub enum PackmindError {
    /// Malformed command (empty id lists and the like).
    #[error("{0}")]
    Argument(String),

    #[error("Package with id {0} not found")]
    PackageNotFound(PackageId),

    #[error("Package {0} not found")]
    PackageMissingFromBatch(PackageId),

    #[error("Target with id {0} not found")]
    TargetNotFound(TargetId),

    #[error("Repository with id {0} not found")]
    RepositoryNotFound(String),

    #[error("Space with id {0} not found")]
    SpaceNotFound(SpaceId),

    #[error("{} with id {id} not found", .kind.label())]
    ArtefactNotFound { kind: ArtefactKind, id: String },

    #[error("{} {id} does not belong to space {space_id}", .kind.label())]
    WrongSpace {
        kind: ArtefactKind,
        id: String,
        space_id: SpaceId,
    },

    #[error("Package {package_id} does not belong to space {space_id}")]
    PackageWrongSpace {
        package_id: PackageId,
        space_id: SpaceId,
    },

    #[error("{what} {id} does not belong to organization {organization_id}")]
    WrongOrganization {
        what: &'static str,
        id: String,
        organization_id: String,
    },

    #[error("Failed to retrieve updated package {0}")]
    UpdatedPackageMissing(PackageId),

    /// Sentinel raised by a git port when the commit would leave the tree unchanged.
    #[error("{}", NO_CHANGES_DETECTED)]
    NoChangesDetected,

    #[error("{0}")]
    Git(String),

    #[error("{0}")]
    CodingAgent(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl From<git2::Error> for PackmindError {
    fn from(err: git2::Error) -> Self {
        Self::Git(err.message().to_string())
    }
}

impl From<serde_json::Error> for PackmindError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl PackmindError {
    /// Whether this is the benign "nothing to commit" condition.
    #[must_use]
    pub const fn is_no_changes(&self) -> bool {
        matches!(self, Self::NoChangesDetected)
    }

    /// Stable machine-readable code for robot output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Argument(_) => "argument",
            Self::PackageNotFound(_)
            | Self::PackageMissingFromBatch(_)
            | Self::TargetNotFound(_)
            | Self::RepositoryNotFound(_)
            | Self::SpaceNotFound(_)
            | Self::ArtefactNotFound { .. }
            | Self::UpdatedPackageMissing(_) => "not_found",
            Self::WrongSpace { .. }
            | Self::PackageWrongSpace { .. }
            | Self::WrongOrganization { .. } => "forbidden",
            Self::NoChangesDetected => "no_changes",
            Self::Git(_) => "git",
            Self::CodingAgent(_) => "coding_agent",
            Self::Database(_) => "database",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Config(_) | Self::MissingConfig(_) => "config",
            Self::ValidationFailed(_) => "validation",
        }
    }
}

pub type Result<T> = std::result::Result<T, PackmindError>;
