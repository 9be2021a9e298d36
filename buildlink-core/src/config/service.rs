//! Service configuration
//!
//! Loaded from `buildlink.json` (or the path given with `--config`). Every
//! field has a default, so a missing file or a partial document is fine:
//!
//! ```json
//! {
//!   "server":   {"bind_address": "0.0.0.0", "port": 8080, "api_prefix": "/api"},
//!   "download": {"projects_dir": "./projects", "refetch_time": 300, "build_limit": 10},
//!   "upstream": {"timeout_seconds": 30}
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::catalog::{RefreshSettings, RetentionPolicy};
use crate::error::ConfigError;
use crate::scheduler::RefreshSchedule;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "buildlink.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix every API route lives under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            api_prefix: default_api_prefix(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory holding one schema file per project
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,

    /// Seconds between refreshes; `-1` (or any value <= 0) disables the
    /// scheduler so only the startup refresh runs
    #[serde(default = "default_refetch_time")]
    pub refetch_time: i64,

    /// Most recent builds fetched per type on each refresh
    #[serde(default = "default_build_limit")]
    pub build_limit: usize,

    #[serde(default)]
    pub retention: RetentionPolicy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            projects_dir: default_projects_dir(),
            refetch_time: default_refetch_time(),
            build_limit: default_build_limit(),
            retention: RetentionPolicy::default(),
        }
    }
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from("./projects")
}

fn default_refetch_time() -> i64 {
    300
}

fn default_build_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Applies to the HTTP client and to every individual upstream call
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("buildlink/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ServiceConfig {
    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(
                "No config file at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.download.build_limit == 0 {
            return Err(ConfigError::Invalid(
                "download.build_limit must be at least 1".to_string(),
            ));
        }
        if !self.server.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.api_prefix must start with '/' (got '{}')",
                self.server.api_prefix
            )));
        }
        if self.upstream.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "upstream.timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// API prefix without a trailing slash
    pub fn api_prefix(&self) -> &str {
        let trimmed = self.server.api_prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            "/"
        } else {
            trimmed
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_seconds)
    }

    pub fn schedule(&self) -> RefreshSchedule {
        RefreshSchedule::from_refetch_time(self.download.refetch_time)
    }

    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            build_limit: self.download.build_limit,
            call_timeout: self.upstream_timeout(),
            retention: self.download.retention,
        }
    }
}
