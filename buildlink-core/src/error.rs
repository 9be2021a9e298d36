//! Error types for schema loading, upstream access and refresh

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Construction-time failures for a single project schema
///
/// A `SchemaError` is fatal to the one project being built; the registry
/// loader logs it and moves on to the next file.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read project schema {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON, or a required field (`jenkins_base`, `targets`,
    /// `types`, `versions`, ...) is missing
    #[error("Invalid project schema: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Project file name {0} does not yield a project identifier")]
    InvalidFileName(PathBuf),

    #[error("Empty identifier for {kind} in {parent}")]
    EmptyIdentifier { kind: &'static str, parent: String },

    #[error("Duplicate {kind} identifier '{identifier}' in {parent}")]
    DuplicateIdentifier {
        kind: &'static str,
        identifier: String,
        parent: String,
    },

    #[error("Invalid jenkins_base for project {project}")]
    InvalidBase {
        project: String,
        #[source]
        source: UpstreamError,
    },

    #[error("Invalid artifact pattern for version '{version}' in {parent}")]
    Pattern {
        version: String,
        parent: String,
        #[source]
        source: regex::Error,
    },
}

/// Failures talking to the CI server
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to create HTTP client")]
    Client(#[source] reqwest::Error),
}

/// A failed refresh of one type, carrying its full catalog path
#[derive(Error, Debug)]
#[error("Failed to populate builds for type {type_id} in target {target} for project {project}")]
pub struct RefreshError {
    pub project: String,
    pub target: String,
    pub type_id: String,
    #[source]
    pub source: UpstreamError,
}

/// Service configuration problems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
