//! Project schema documents
//!
//! One JSON document per project, stored in the projects directory:
//!
//! ```json
//! {
//!   "jenkins_base": "https://ci.example.com",
//!   "display_name": "Demo",
//!   "targets": [
//!     { "identifier": "linux",
//!       "types": [
//!         { "identifier": "release", "job_name": "demo-job",
//!           "versions": [
//!             { "identifier": "jar", "artifact_pattern": "demo-(.*)\\.jar" }
//!           ] } ] } ]
//! }
//! ```
//!
//! `targets`, `types` and `versions` are required at their levels; a missing
//! list fails deserialization and with it the whole project.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SchemaError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSchema {
    /// Base URL of the CI server the project's jobs live on
    pub jenkins_base: String,

    #[serde(default)]
    pub display_name: Option<String>,

    pub targets: Vec<TargetSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSchema {
    pub identifier: String,

    #[serde(default)]
    pub display_name: Option<String>,

    pub types: Vec<TypeSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSchema {
    pub identifier: String,

    /// CI job backing this type; `/` separates folder segments
    pub job_name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Matching rules, in priority order
    pub versions: Vec<VersionSchemaDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSchemaDef {
    pub identifier: String,

    /// Regular expression matched against the whole artifact file name
    pub artifact_pattern: String,

    #[serde(default)]
    pub display_name: Option<String>,
}

impl ProjectSchema {
    pub fn from_json(content: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }
}

/// Project identifier for a schema file: the file name up to its first
/// `.`, lowercased (`PlotSquared.json` -> `plotsquared`)
pub fn project_identifier(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.split('.').next()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_lowercase())
}

/// Whether a directory entry looks like a project schema
pub fn is_schema_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_ascii_lowercase().ends_with(".json"))
            .unwrap_or(false)
}
