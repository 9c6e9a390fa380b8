use crate::DriverError;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "liable.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiableToml {
    #[serde(default)]
    pub project: LiableTomlProject,
    #[serde(default)]
    pub generation: LiableTomlGeneration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiableTomlProject {
    /// Reflected-modules manifest, relative to the config file.
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiableTomlGeneration {
    #[serde(default = "default_commons_module")]
    pub commons_module: String,
    #[serde(default = "default_include_utilities")]
    pub include_utilities: bool,
}

impl Default for LiableTomlProject {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
        }
    }
}

impl Default for LiableTomlGeneration {
    fn default() -> Self {
        Self {
            commons_module: default_commons_module(),
            include_utilities: default_include_utilities(),
        }
    }
}

fn default_manifest() -> String {
    "reflected.toml".to_string()
}

fn default_commons_module() -> String {
    liable_core::COMMONS_MODULE.to_string()
}

fn default_include_utilities() -> bool {
    true
}

pub fn read_liable_toml(path: &Path) -> Result<LiableToml, DriverError> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text)
        .map_err(|err| DriverError::Config(format!("failed to parse {}: {err}", path.display())))
}
