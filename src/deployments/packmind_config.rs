//! `packmind.json`: the package manifest written into consumer repositories
//!
//! ```json
//! {
//!   "packages": {
//!     "backend": "*"
//!   },
//!   "agents": ["claude"]
//! }
//! ```
//!
//! Key order is insertion order. `agents` is only written when known.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{CodingAgent, FileModification};
use crate::error::Result;

pub const CONFIG_FILE_NAME: &str = "packmind.json";

/// Version requirement written for every package.
pub const ANY_VERSION: &str = "*";

/// Package slug to version requirement.
pub type PackageVersions = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackmindFileConfig {
    #[serde(default)]
    pub packages: PackageVersions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<CodingAgent>>,
}

impl PackmindFileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Two-space pretty JSON with a trailing newline.
    pub fn render(&self) -> Result<String> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        Ok(content)
    }
}

/// Existing packages plus `slugs`, every new slug pinned to `*`.
#[must_use]
pub fn generate_config_content(
    slugs: &[&str],
    existing_packages: Option<&PackageVersions>,
    existing_agents: Option<&[CodingAgent]>,
) -> PackmindFileConfig {
    let mut packages = existing_packages.cloned().unwrap_or_default();
    for slug in slugs {
        packages.insert((*slug).to_string(), Value::String(ANY_VERSION.to_string()));
    }
    PackmindFileConfig {
        packages,
        agents: existing_agents.map(<[CodingAgent]>::to_vec),
    }
}

pub fn create_config_file_modification(
    slugs: &[&str],
    existing_packages: Option<&PackageVersions>,
    existing_agents: Option<&[CodingAgent]>,
) -> Result<FileModification> {
    let config = generate_config_content(slugs, existing_packages, existing_agents);
    Ok(FileModification::new(CONFIG_FILE_NAME, config.render()?))
}

/// Copy of the config without `slug`. Unknown slugs are not an error.
#[must_use]
pub fn remove_package_from_config(
    slug: &str,
    existing_packages: &PackageVersions,
    existing_agents: Option<&[CodingAgent]>,
) -> PackmindFileConfig {
    let packages = existing_packages
        .iter()
        .filter(|(key, _)| key.as_str() != slug)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    PackmindFileConfig {
        packages,
        agents: existing_agents.map(<[CodingAgent]>::to_vec),
    }
}

pub fn create_removal_config_file_modification(
    slug: &str,
    existing_packages: &PackageVersions,
    existing_agents: Option<&[CodingAgent]>,
) -> Result<FileModification> {
    let config = remove_package_from_config(slug, existing_packages, existing_agents);
    Ok(FileModification::new(CONFIG_FILE_NAME, config.render()?))
}
