//! Configuration: the service config file and per-project schema documents

pub mod schema;
pub mod service;

pub use schema::{ProjectSchema, TargetSchema, TypeSchema, VersionSchemaDef};
pub use service::{
    DownloadConfig, ServerConfig, ServiceConfig, UpstreamConfig, DEFAULT_CONFIG_FILE,
};
