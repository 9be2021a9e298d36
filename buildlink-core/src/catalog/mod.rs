//! Build catalog - an in-memory mirror of the CI server's builds
//!
//! # Architecture
//!
//! ```text
//! projects/*.json ──► Registry
//!                       └── Project (one per file, owns an UpstreamClient)
//!                             └── Target
//!                                   └── Type ──── build map (swapped on refresh)
//!                                                   └── Build ("latest" | "<number>")
//!                                                         └── Version (file name + URL)
//! ```
//!
//! Projects, targets and types are built once from configuration. Builds
//! and versions are immutable values recreated on every refresh and
//! published per type with a single atomic swap, so request handlers never
//! wait on the refresh path.

mod build;
mod matcher;
mod node;
mod project;
mod refresh;
mod registry;

pub use build::{build_key, Build, Version, LATEST};
pub use matcher::{match_versions, VersionSchema};
pub use node::{
    resolve, CatalogNode, Envelope, Resolution, SegmentKind, Status, Summary, SummaryBody,
    UnknownSegment, UnknownValue,
};
pub use project::{BuildMap, BuildType, Project, Target};
pub use refresh::{RefreshOutcome, RefreshSettings, RetentionPolicy};
pub use registry::{load_project, LoadReport, Registry};
