//! Domain model shared by the proposal and deployment layers

pub mod artefact;
pub mod deployment;
pub mod ids;
pub mod package;
pub mod proposal;
pub mod render_mode;

pub use artefact::{
    ArtefactKind, Recipe, RecipeVersion, Rule, Skill, SkillFile, SkillMetadata, Space, Standard,
    StandardVersion,
};
pub use deployment::{
    DistributionStatus, FileModification, FileUpdates, GitCommit, GitRepo, PackagesDeployment,
    Target,
};
pub use ids::{
    ChangeProposalId, DeploymentId, GitCommitId, GitRepoId, OrganizationId, PackageId, RecipeId,
    RecipeVersionId, RuleId, SkillFileId, SkillId, SpaceId, StandardId, StandardVersionId,
    TargetId, UserId,
};
pub use package::{Package, slugify, unique_slug};
pub use proposal::{
    ChangeProposal, ChangeProposalStatus, ItemAdd, ItemDelete, ItemUpdate, NewRule,
    NewSkillFile, ProposalChange, ScalarUpdate,
};
pub use render_mode::{CodingAgent, RenderMode, coding_agents_for};
