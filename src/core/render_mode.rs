//! Render modes and the coding agents they produce files for.

use serde::{Deserialize, Serialize};

/// Output format an organization enables for its deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderMode {
    Packmind,
    AgentsMd,
    GhCopilot,
    Claude,
    Cursor,
    Continue,
    Junie,
}

impl RenderMode {
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Packmind,
            Self::AgentsMd,
            Self::GhCopilot,
            Self::Claude,
            Self::Cursor,
            Self::Continue,
            Self::Junie,
        ]
    }

    /// The coding agent that renders this mode.
    #[must_use]
    pub const fn coding_agent(&self) -> CodingAgent {
        match self {
            Self::Packmind => CodingAgent::Packmind,
            Self::AgentsMd => CodingAgent::AgentsMd,
            Self::GhCopilot => CodingAgent::Copilot,
            Self::Claude => CodingAgent::Claude,
            Self::Cursor => CodingAgent::Cursor,
            Self::Continue => CodingAgent::Continue,
            Self::Junie => CodingAgent::Junie,
        }
    }

    /// Parse the lowercase config spelling (`agents_md`, `gh_copilot`, ...).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "packmind" => Some(Self::Packmind),
            "agents_md" | "agents-md" => Some(Self::AgentsMd),
            "gh_copilot" | "copilot" => Some(Self::GhCopilot),
            "claude" => Some(Self::Claude),
            "cursor" => Some(Self::Cursor),
            "continue" => Some(Self::Continue),
            "junie" => Some(Self::Junie),
            _ => None,
        }
    }
}

/// Adapter that turns artefact versions into repository files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodingAgent {
    Packmind,
    AgentsMd,
    Copilot,
    Claude,
    Cursor,
    Continue,
    Junie,
}

impl CodingAgent {
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Packmind => "Packmind",
            Self::AgentsMd => "AGENTS.md",
            Self::Copilot => "GitHub Copilot",
            Self::Claude => "Claude",
            Self::Cursor => "Cursor",
            Self::Continue => "Continue",
            Self::Junie => "Junie",
        }
    }
}

impl std::fmt::Display for CodingAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Map render modes to coding agents, dropping duplicates but keeping order.
#[must_use]
pub fn coding_agents_for(modes: &[RenderMode]) -> Vec<CodingAgent> {
    let mut agents = Vec::with_capacity(modes.len());
    for mode in modes {
        let agent = mode.coding_agent();
        if !agents.contains(&agent) {
            agents.push(agent);
        }
    }
    agents
}
