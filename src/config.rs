//! Layered configuration
//!
//! Defaults, then the global file (`<config_dir>/packmind/config.toml`),
//! then the project file (`<root>/config.toml`). An explicit `--config` or
//! `PACKMIND_CONFIG` path replaces both files. `PACKMIND_*` environment
//! variables are applied last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::RenderMode;
use crate::deployments::publisher::DEFAULT_COMMIT_PREFIX;
use crate::error::{PackmindError, Result};
use crate::storage::git::{DEFAULT_AUTHOR_EMAIL, DEFAULT_AUTHOR_NAME};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let global = dirs::config_dir().map(|dir| dir.join("packmind").join(CONFIG_FILE_NAME));
        Self::load_with(explicit_path, root, global.as_deref(), |key| {
            std::env::var(key).ok()
        })
    }

    /// [`Config::load`] with the global path and environment supplied.
    pub fn load_with(
        explicit_path: Option<&Path>,
        root: &Path,
        global_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env("PACKMIND_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = global_path {
                if let Some(patch) = Self::load_patch(global)? {
                    config.merge_patch(patch);
                }
            }
            if let Some(patch) = Self::load_patch(&root.join(CONFIG_FILE_NAME))? {
                config.merge_patch(patch);
            }
        }

        config.apply_env_overrides(&env)?;
        config.render.modes()?;
        Ok(config)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path).map_err(|err| {
            PackmindError::Config(format!("read config {}: {err}", path.display()))
        })?;
        let patch = toml::from_str(&raw).map_err(|err| {
            PackmindError::Config(format!("parse config {}: {err}", path.display()))
        })?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.workspace {
            self.workspace.merge(patch);
        }
        if let Some(patch) = patch.publish {
            self.publish.merge(patch);
        }
        if let Some(patch) = patch.render {
            self.render.merge(patch);
        }
        if let Some(patch) = patch.output {
            self.output.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = env("PACKMIND_ORGANIZATION_ID") {
            self.workspace.organization_id = value;
        }
        if let Some(value) = env("PACKMIND_USER_ID") {
            self.workspace.user_id = value;
        }

        if let Some(value) = env("PACKMIND_COMMIT_PREFIX") {
            self.publish.commit_prefix = value;
        }
        if let Some(value) = env("PACKMIND_AUTHOR_NAME") {
            self.publish.author_name = value;
        }
        if let Some(value) = env("PACKMIND_AUTHOR_EMAIL") {
            self.publish.author_email = value;
        }

        if let Some(value) = env("PACKMIND_RENDER_MODES") {
            self.render.default_modes = split_list(&value);
        }

        if env_bool(env, "PACKMIND_ROBOT").unwrap_or(false) {
            self.output.format = "json".to_string();
        }
        if let Some(value) = env("PACKMIND_OUTPUT_FORMAT") {
            self.output.format = value;
        }
        if let Some(value) = env_bool(env, "PACKMIND_COLOR") {
            self.output.color = value;
        }
        if env("NO_COLOR").is_some() {
            self.output.color = false;
        }

        match self.output.format.as_str() {
            "human" | "json" => Ok(()),
            other => Err(PackmindError::Config(format!(
                "invalid output format {other} (expected human|json)"
            ))),
        }
    }

    /// Serialize as TOML, the format written by `packmind init`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|err| PackmindError::Serialization(format!("serialize config: {err}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub user_id: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            organization_id: "default".to_string(),
            user_id: "local".to_string(),
        }
    }
}

impl WorkspaceConfig {
    fn merge(&mut self, patch: WorkspacePatch) {
        if let Some(value) = patch.organization_id {
            self.organization_id = value;
        }
        if let Some(value) = patch.user_id {
            self.user_id = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub commit_prefix: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            commit_prefix: DEFAULT_COMMIT_PREFIX.to_string(),
            author_name: DEFAULT_AUTHOR_NAME.to_string(),
            author_email: DEFAULT_AUTHOR_EMAIL.to_string(),
        }
    }
}

impl PublishConfig {
    fn merge(&mut self, patch: PublishPatch) {
        if let Some(value) = patch.commit_prefix {
            self.commit_prefix = value;
        }
        if let Some(value) = patch.author_name {
            self.author_name = value;
        }
        if let Some(value) = patch.author_email {
            self.author_email = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Used for organizations without explicit render modes.
    #[serde(default)]
    pub default_modes: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_modes: vec!["packmind".to_string(), "agents_md".to_string()],
        }
    }
}

impl RenderConfig {
    fn merge(&mut self, patch: RenderPatch) {
        if let Some(values) = patch.default_modes {
            self.default_modes = values;
        }
    }

    /// Parsed `default_modes`, duplicates dropped.
    pub fn modes(&self) -> Result<Vec<RenderMode>> {
        let mut modes = Vec::with_capacity(self.default_modes.len());
        for value in &self.default_modes {
            let mode = RenderMode::parse(value).ok_or_else(|| {
                PackmindError::Config(format!("unknown render mode {value}"))
            })?;
            if !modes.contains(&mode) {
                modes.push(mode);
            }
        }
        Ok(modes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "human".to_string(),
            color: true,
        }
    }
}

impl OutputConfig {
    fn merge(&mut self, patch: OutputPatch) {
        if let Some(value) = patch.format {
            self.format = value;
        }
        if let Some(value) = patch.color {
            self.color = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub workspace: Option<WorkspacePatch>,
    pub publish: Option<PublishPatch>,
    pub render: Option<RenderPatch>,
    pub output: Option<OutputPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WorkspacePatch {
    pub organization_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PublishPatch {
    pub commit_prefix: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RenderPatch {
    pub default_modes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OutputPatch {
    pub format: Option<String>,
    pub color: Option<bool>,
}

fn env_bool(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    env(key).map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_with(None, dir.path(), None, no_env).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.publish.commit_prefix, "[PACKMIND] Update packages files");
        assert_eq!(
            config.render.modes().unwrap(),
            vec![RenderMode::Packmind, RenderMode::AgentsMd]
        );
    }

    #[test]
    fn test_project_file_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        std::fs::write(
            &global,
            "[workspace]\norganization_id = \"org-global\"\nuser_id = \"alice\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[workspace]\norganization_id = \"org-project\"\n[render]\ndefault_modes = [\"claude\"]\n",
        )
        .unwrap();

        let config = Config::load_with(None, dir.path(), Some(&global), no_env).unwrap();
        assert_eq!(config.workspace.organization_id, "org-project");
        assert_eq!(config.workspace.user_id, "alice");
        assert_eq!(config.render.modes().unwrap(), vec![RenderMode::Claude]);
    }

    #[test]
    fn test_explicit_file_skips_layers() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[workspace]\nuser_id = \"project-user\"\n",
        )
        .unwrap();
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&explicit, "[publish]\ncommit_prefix = \"[CI]\"\n").unwrap();

        let config = Config::load_with(Some(&explicit), dir.path(), None, no_env).unwrap();
        assert_eq!(config.publish.commit_prefix, "[CI]");
        assert_eq!(config.workspace.user_id, "local");
    }

    #[test]
    fn test_env_overrides_win() {
        let dir = TempDir::new().unwrap();
        let env = env_from(&[
            ("PACKMIND_ORGANIZATION_ID", "org-env"),
            ("PACKMIND_RENDER_MODES", "cursor, junie,cursor"),
            ("PACKMIND_ROBOT", "1"),
            ("NO_COLOR", ""),
        ]);
        let config = Config::load_with(None, dir.path(), None, env).unwrap();
        assert_eq!(config.workspace.organization_id, "org-env");
        assert_eq!(
            config.render.modes().unwrap(),
            vec![RenderMode::Cursor, RenderMode::Junie]
        );
        assert_eq!(config.output.format, "json");
        assert!(!config.output.color);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_with(
            None,
            dir.path(),
            None,
            env_from(&[("PACKMIND_RENDER_MODES", "emacs")]),
        )
        .unwrap_err();
        assert!(matches!(err, PackmindError::Config(_)));

        let err = Config::load_with(
            None,
            dir.path(),
            None,
            env_from(&[("PACKMIND_OUTPUT_FORMAT", "yaml")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("yaml"));

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[workspace\n").unwrap();
        let err = Config::load_with(None, dir.path(), None, no_env).unwrap_err();
        assert!(err.to_string().contains("parse config"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let raw = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, config);
    }
}
