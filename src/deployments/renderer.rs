//! Markdown rendering of artefact versions for each coding agent
//!
//! Agents with a dedicated directory get one file per artefact. Agents that
//! read a single instructions file (`AGENTS.md`, `CLAUDE.md`, ...) get a
//! delimited section instead, which [`merge_section`] splices into whatever
//! the file already contains.

use std::fmt::Write as _;

use tracing::debug;

use crate::core::{
    CodingAgent, FileModification, FileUpdates, RecipeVersion, StandardVersion, Target,
};
use crate::deployments::ports::{
    CodingAgentPort, PrepareRecipesDeployment, PrepareStandardsDeployment,
};
use crate::error::Result;

const RECIPES_SECTION: &str = "Packmind recipes";
const STANDARDS_SECTION: &str = "Packmind standards";

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CodingAgentPort for MarkdownRenderer {
    fn prepare_standards_deployment(
        &self,
        command: &PrepareStandardsDeployment,
    ) -> Result<FileUpdates> {
        let mut updates = FileUpdates::default();
        if command.standard_versions.is_empty() || command.coding_agents.is_empty() {
            return Ok(updates);
        }
        for target in &command.targets {
            let prefix = target_prefix(target);
            for agent in &command.coding_agents {
                updates
                    .create_or_update
                    .extend(render_standards(*agent, &prefix, &command.standard_versions));
            }
        }
        debug!(
            files = updates.create_or_update.len(),
            repository = %command.git_repo.full_name(),
            "Rendered standards"
        );
        Ok(updates)
    }

    fn prepare_recipes_deployment(&self, command: &PrepareRecipesDeployment) -> Result<FileUpdates> {
        let mut updates = FileUpdates::default();
        if command.recipe_versions.is_empty() || command.coding_agents.is_empty() {
            return Ok(updates);
        }
        for target in &command.targets {
            let prefix = target_prefix(target);
            for agent in &command.coding_agents {
                updates
                    .create_or_update
                    .extend(render_recipes(*agent, &prefix, &command.recipe_versions));
            }
        }
        debug!(
            files = updates.create_or_update.len(),
            repository = %command.git_repo.full_name(),
            "Rendered recipes"
        );
        Ok(updates)
    }
}

/// `""` for the repository root, `"dir/"` otherwise.
fn target_prefix(target: &Target) -> String {
    let trimmed = target.path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Instructions file read by agents that take a single file.
const fn instructions_file(agent: CodingAgent) -> Option<&'static str> {
    match agent {
        CodingAgent::AgentsMd => Some("AGENTS.md"),
        CodingAgent::Claude => Some("CLAUDE.md"),
        CodingAgent::Copilot => Some(".github/copilot-instructions.md"),
        CodingAgent::Junie => Some(".junie/guidelines.md"),
        CodingAgent::Packmind | CodingAgent::Cursor | CodingAgent::Continue => None,
    }
}

fn render_recipes(agent: CodingAgent, prefix: &str, versions: &[RecipeVersion]) -> Vec<FileModification> {
    if let Some(file) = instructions_file(agent) {
        return vec![FileModification::new(
            format!("{prefix}{file}"),
            section(RECIPES_SECTION, &recipes_index(versions)),
        )];
    }
    match agent {
        CodingAgent::Packmind => {
            let mut files: Vec<FileModification> = versions
                .iter()
                .map(|v| {
                    FileModification::new(
                        format!("{prefix}.packmind/recipes/{}.md", v.slug),
                        recipe_document(v),
                    )
                })
                .collect();
            files.push(FileModification::new(
                format!("{prefix}.packmind/recipes-index.md"),
                recipes_index(versions),
            ));
            files
        }
        CodingAgent::Cursor => vec![FileModification::new(
            format!("{prefix}.cursor/rules/packmind/recipes-index.mdc"),
            format!(
                "---\ndescription: Packmind recipes\nalwaysApply: true\n---\n\n{}",
                recipes_index(versions)
            ),
        )],
        CodingAgent::Continue => vec![FileModification::new(
            format!("{prefix}.continue/rules/packmind/recipes-index.md"),
            format!(
                "---\nname: Packmind recipes\nalwaysApply: true\n---\n\n{}",
                recipes_index(versions)
            ),
        )],
        _ => Vec::new(),
    }
}

fn render_standards(
    agent: CodingAgent,
    prefix: &str,
    versions: &[StandardVersion],
) -> Vec<FileModification> {
    if let Some(file) = instructions_file(agent) {
        return vec![FileModification::new(
            format!("{prefix}{file}"),
            section(STANDARDS_SECTION, &standards_summary(versions)),
        )];
    }
    match agent {
        CodingAgent::Packmind => {
            let mut files: Vec<FileModification> = versions
                .iter()
                .map(|v| {
                    FileModification::new(
                        format!("{prefix}.packmind/standards/{}.md", v.slug),
                        standard_document(v),
                    )
                })
                .collect();
            files.push(FileModification::new(
                format!("{prefix}.packmind/standards-index.md"),
                standards_summary(versions),
            ));
            files
        }
        CodingAgent::Cursor => versions
            .iter()
            .map(|v| {
                let header = match v.scope.as_deref().filter(|s| !s.is_empty()) {
                    Some(scope) => format!("globs: {scope}\nalwaysApply: false"),
                    None => "alwaysApply: true".to_string(),
                };
                FileModification::new(
                    format!("{prefix}.cursor/rules/packmind/standard-{}.mdc", v.slug),
                    format!("---\n{header}\n---\n\n{}", standard_document(v)),
                )
            })
            .collect(),
        CodingAgent::Continue => versions
            .iter()
            .map(|v| {
                FileModification::new(
                    format!("{prefix}.continue/rules/packmind/standard-{}.md", v.slug),
                    format!(
                        "---\nname: {}\nalwaysApply: true\n---\n\n{}",
                        v.name,
                        standard_document(v)
                    ),
                )
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn recipe_document(version: &RecipeVersion) -> String {
    let mut doc = format!("# {}\n\n", version.name);
    if let Some(summary) = version.summary.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(doc, "{summary}\n\n");
    }
    doc.push_str(version.content.trim_end());
    doc.push('\n');
    doc
}

fn standard_document(version: &StandardVersion) -> String {
    let mut doc = format!("# {}\n\n", version.name);
    if !version.description.is_empty() {
        let _ = write!(doc, "{}\n\n", version.description.trim_end());
    }
    if !version.rules.is_empty() {
        doc.push_str("## Rules\n\n");
        for rule in &version.rules {
            let _ = writeln!(doc, "* {}", rule.content);
        }
    }
    doc
}

fn recipes_index(versions: &[RecipeVersion]) -> String {
    let mut doc = String::from(
        "# Packmind Recipes\n\nWhen a task matches one of these recipes, follow it step by step.\n\n",
    );
    for v in versions {
        let _ = write!(doc, "- [{}](.packmind/recipes/{}.md)", v.name, v.slug);
        if let Some(summary) = v.summary.as_deref().filter(|s| !s.is_empty()) {
            let _ = write!(doc, ": {summary}");
        }
        doc.push('\n');
    }
    doc
}

fn standards_summary(versions: &[StandardVersion]) -> String {
    let mut doc = String::from("# Packmind Standards\n\nFollow these standards when writing code.\n");
    for v in versions {
        let _ = write!(doc, "\n## Standard: {}\n\n", v.name);
        if !v.description.is_empty() {
            let _ = write!(doc, "{}\n\n", v.description.trim_end());
        }
        for rule in &v.rules {
            let _ = writeln!(doc, "* {}", rule.content);
        }
        let _ = writeln!(
            doc,
            "\nFull standard is available here for further request: [{}](.packmind/standards/{}.md)",
            v.name, v.slug
        );
    }
    doc
}

fn start_marker(name: &str) -> String {
    format!("<!-- start: {name} -->")
}

fn end_marker(name: &str) -> String {
    format!("<!-- end: {name} -->")
}

/// Wrap `body` in start/end markers.
#[must_use]
pub fn section(name: &str, body: &str) -> String {
    format!("{}\n{}{}\n", start_marker(name), body, end_marker(name))
}

/// Name of the section if `content` is exactly one delimited section.
#[must_use]
pub fn section_name(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("<!-- start: ")?;
    let name = &rest[..rest.find(" -->")?];
    content
        .trim_end()
        .ends_with(&end_marker(name))
        .then_some(name)
}

/// Replace the section carried by `update` inside `existing`, or append it.
#[must_use]
pub fn merge_section(existing: &str, update: &str) -> String {
    let Some(name) = section_name(update) else {
        return update.to_string();
    };
    let start = start_marker(name);
    let end = end_marker(name);

    if let Some(begin) = existing.find(&start) {
        if let Some(offset) = existing[begin..].find(&end) {
            let mut finish = begin + offset + end.len();
            if existing[finish..].starts_with('\n') {
                finish += 1;
            }
            return format!("{}{}{}", &existing[..begin], update, &existing[finish..]);
        }
    }

    if existing.is_empty() {
        update.to_string()
    } else if existing.ends_with('\n') {
        format!("{existing}\n{update}")
    } else {
        format!("{existing}\n\n{update}")
    }
}
