//! Catalog tree nodes and path resolution
//!
//! ```text
//! Registry ─ Project ─ Target ─ Type ─ Build ─ Version
//! ```
//!
//! Registry, project, target and type are borrowed from the registry; builds
//! and versions are `Arc`s taken from a type's current build snapshot, so a
//! resolved node stays valid while a refresh swaps the map underneath it.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::build::{Build, Version};
use super::project::{BuildType, Project, Target};
use super::registry::Registry;

/// Kind of a path segment, reported when resolution stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Project,
    Target,
    Type,
    Build,
    Version,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Project => "project",
            SegmentKind::Target => "target",
            SegmentKind::Type => "type",
            SegmentKind::Build => "build",
            SegmentKind::Version => "version",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub enum CatalogNode<'a> {
    Registry(&'a Registry),
    Project(&'a Project),
    Target(&'a Target),
    Type(&'a BuildType),
    Build(Arc<Build>),
    Version(Arc<Version>),
}

/// Outcome of resolving a path
pub enum Resolution<'a> {
    Found(CatalogNode<'a>),
    /// The first segment without a matching child
    NotFound { kind: SegmentKind, value: String },
    /// More segments than the tree has levels
    TooDeep,
}

impl<'a> CatalogNode<'a> {
    pub fn identifier(&self) -> &str {
        match self {
            CatalogNode::Registry(_) => "projects",
            CatalogNode::Project(p) => &p.identifier,
            CatalogNode::Target(t) => &t.identifier,
            CatalogNode::Type(t) => &t.identifier,
            CatalogNode::Build(b) => &b.identifier,
            CatalogNode::Version(v) => &v.identifier,
        }
    }

    /// Display name, falling back to the identifier
    pub fn display_name(&self) -> &str {
        let explicit = match self {
            CatalogNode::Registry(_) | CatalogNode::Build(_) => None,
            CatalogNode::Project(p) => p.display_name.as_deref(),
            CatalogNode::Target(t) => t.display_name.as_deref(),
            CatalogNode::Type(t) => t.display_name.as_deref(),
            CatalogNode::Version(v) => v.display_name.as_deref(),
        };
        explicit.unwrap_or_else(|| self.identifier())
    }

    /// Kind of this node's children; `None` for versions
    pub fn child_kind(&self) -> Option<SegmentKind> {
        match self {
            CatalogNode::Registry(_) => Some(SegmentKind::Project),
            CatalogNode::Project(_) => Some(SegmentKind::Target),
            CatalogNode::Target(_) => Some(SegmentKind::Type),
            CatalogNode::Type(_) => Some(SegmentKind::Build),
            CatalogNode::Build(_) => Some(SegmentKind::Version),
            CatalogNode::Version(_) => None,
        }
    }

    pub fn child(&self, key: &str) -> Option<CatalogNode<'a>> {
        match self {
            CatalogNode::Registry(r) => r.project(key).map(CatalogNode::Project),
            CatalogNode::Project(p) => p.target(key).map(CatalogNode::Target),
            CatalogNode::Target(t) => t.build_type(key).map(CatalogNode::Type),
            CatalogNode::Type(t) => t.build(key).map(CatalogNode::Build),
            CatalogNode::Build(b) => b.version(key).map(CatalogNode::Version),
            CatalogNode::Version(_) => None,
        }
    }

    /// Serializable view of this node
    pub fn summary(&self) -> Summary {
        let body = match self {
            CatalogNode::Registry(r) => SummaryBody::Registry {
                projects: r.project_ids(),
            },
            CatalogNode::Project(p) => SummaryBody::Project {
                targets: sorted(p.targets().iter().map(|t| t.identifier.clone())),
            },
            CatalogNode::Target(t) => SummaryBody::Target {
                types: sorted(t.types().iter().map(|t| t.identifier.clone())),
            },
            CatalogNode::Type(t) => SummaryBody::Type {
                builds: t.build_keys(),
                description: t.description.clone().unwrap_or_default(),
            },
            CatalogNode::Build(b) => SummaryBody::Build {
                versions: b.versions.keys().cloned().collect(),
            },
            CatalogNode::Version(v) => SummaryBody::Version {
                file_name: v.file_name.clone(),
                download: v.download_url.clone(),
            },
        };

        Summary {
            identifier: self.identifier().to_string(),
            display_name: self.display_name().to_string(),
            body,
        }
    }
}

fn sorted(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut ids: Vec<String> = ids.collect();
    ids.sort();
    ids
}

/// Resolve `segments` left to right starting at `root`
///
/// Stops at the first segment with no matching child and reports its kind.
pub fn resolve<'a, S: AsRef<str>>(root: CatalogNode<'a>, segments: &[S]) -> Resolution<'a> {
    let mut node = root;
    for segment in segments {
        let segment = segment.as_ref();
        let Some(kind) = node.child_kind() else {
            return Resolution::TooDeep;
        };
        match node.child(segment) {
            Some(child) => node = child,
            None => {
                return Resolution::NotFound {
                    kind,
                    value: segment.to_string(),
                }
            }
        }
    }
    Resolution::Found(node)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub identifier: String,
    pub display_name: String,
    #[serde(flatten)]
    pub body: SummaryBody,
}

/// Variant-specific part of a summary; child listings are sorted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SummaryBody {
    Registry {
        projects: Vec<String>,
    },
    Project {
        targets: Vec<String>,
    },
    Target {
        types: Vec<String>,
    },
    Type {
        builds: Vec<String>,
        description: String,
    },
    Build {
        versions: Vec<String>,
    },
    Version {
        #[serde(rename = "fileName")]
        file_name: String,
        download: String,
    },
}

/// Status marker carried by every JSON response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    UnknownValue,
    NotFound,
}

/// `{"status": "success", ...summary}`
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: Status,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(body: T) -> Self {
        Self {
            status: Status::Success,
            body,
        }
    }
}

/// `{"status": "unknown_value", "unknown": {"type": ..., "value": ...}}`
#[derive(Debug, Clone, Serialize)]
pub struct UnknownValue {
    pub status: Status,
    pub unknown: UnknownSegment,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnknownSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub value: String,
}

impl UnknownValue {
    pub fn new(kind: SegmentKind, value: impl Into<String>) -> Self {
        Self {
            status: Status::UnknownValue,
            unknown: UnknownSegment {
                kind,
                value: value.into(),
            },
        }
    }
}
