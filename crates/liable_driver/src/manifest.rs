use std::path::{Path, PathBuf};

use liable_core::{ImportStatement, ParameterKind};
use serde::{Deserialize, Serialize};

use crate::DriverError;

/// Reflected modules, listed in any order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub exports: Option<Vec<String>>,
    #[serde(default)]
    pub imports: Vec<ImportSpec>,
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
    #[serde(default)]
    pub values: Vec<ValueSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Source module of a `from` import; absent for `import a, b`.
    #[serde(default)]
    pub from: Option<String>,
    pub names: Vec<String>,
    #[serde(default)]
    pub level: usize,
}

impl ImportSpec {
    pub fn to_statement(&self) -> ImportStatement {
        if self.from.is_none() && self.level == 0 {
            ImportStatement::Import {
                modules: self.names.clone(),
            }
        } else {
            ImportStatement::ImportFrom {
                module: self.from.clone(),
                names: self.names.clone(),
                level: self.level,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub name: String,
    #[serde(default)]
    pub bases: Vec<String>,
    /// Constructor parameters, receiver included.
    #[serde(default)]
    pub initializer: Option<Vec<ParameterSpec>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub returns: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub kind: ParameterKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub name: String,
}

/// Reads a manifest, as JSON when the file says so and as TOML otherwise.
pub fn read_manifest(path: &Path) -> Result<Manifest, DriverError> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(&text).map_err(|err| err.to_string())
    } else {
        toml::from_str(&text).map_err(|err| err.to_string())
    };
    parsed.map_err(|err| {
        DriverError::Manifest(format!("failed to parse {}: {err}", path.display()))
    })
}
