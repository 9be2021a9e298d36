//! Buildlink core library
//!
//! Mirrors a CI server's build catalog in memory and serves stable,
//! human-readable paths to build artifacts:
//!
//! ```text
//! /api/{project}/{target}/{type}/{build}/{version}/download  ->  307 to the artifact
//! ```
//!
//! Projects are described by JSON schema files. A refresh pulls the newest
//! builds of each type's CI job and matches their artifacts against the
//! type's version patterns; the scheduler repeats it periodically.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod service;
pub mod upstream;

pub use catalog::{Registry, Resolution};
pub use config::{ProjectSchema, ServiceConfig};
pub use error::{ConfigError, RefreshError, SchemaError, UpstreamError};
pub use scheduler::{RefreshSchedule, Scheduler};
