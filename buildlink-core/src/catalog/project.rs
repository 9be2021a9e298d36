//! Projects, targets and types built from a project schema
//!
//! The structure is fixed after construction. The only mutable state is
//! each type's build map, which is swapped atomically by the refresh engine.

use arc_swap::ArcSwap;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::build::Build;
use super::matcher::VersionSchema;
use super::refresh::RefreshSettings;
use crate::config::{ProjectSchema, TargetSchema, TypeSchema};
use crate::error::SchemaError;
use crate::upstream::UpstreamClient;

/// Build key -> build, sorted by key
pub type BuildMap = BTreeMap<String, Arc<Build>>;

pub struct Project {
    pub identifier: String,
    pub display_name: Option<String>,
    pub jenkins_base: String,
    targets: Vec<Target>,
    pub(crate) upstream: Arc<dyn UpstreamClient>,
    pub(crate) settings: RefreshSettings,
    pub(crate) refresh_lock: tokio::sync::Mutex<()>,
}

pub struct Target {
    pub identifier: String,
    pub display_name: Option<String>,
    types: Vec<BuildType>,
}

/// A release channel backed by one CI job
pub struct BuildType {
    pub identifier: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub job_name: String,
    /// Matching rules in priority order
    pub versions: Vec<VersionSchema>,
    builds: ArcSwap<BuildMap>,
}

impl Project {
    /// Build a project from its schema
    ///
    /// No upstream calls happen here; the project starts with empty build
    /// maps until its first refresh.
    pub fn from_schema(
        identifier: impl Into<String>,
        schema: ProjectSchema,
        upstream: Arc<dyn UpstreamClient>,
        settings: RefreshSettings,
    ) -> Result<Self, SchemaError> {
        let identifier = identifier.into();
        require_identifier(&identifier, "project", "registry")?;

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(schema.targets.len());
        for target_schema in schema.targets {
            let target = Target::from_schema(target_schema, &identifier)?;
            ensure_unique(&mut seen, &target.identifier, "target", &identifier)?;
            targets.push(target);
        }

        Ok(Self {
            identifier,
            display_name: schema.display_name,
            jenkins_base: schema.jenkins_base,
            targets,
            upstream,
            settings,
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Targets in declared order
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, identifier: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.identifier == identifier)
    }
}

impl Target {
    fn from_schema(schema: TargetSchema, project: &str) -> Result<Self, SchemaError> {
        require_identifier(&schema.identifier, "target", project)?;
        let path = format!("{project}/{}", schema.identifier);

        let mut seen = HashSet::new();
        let mut types = Vec::with_capacity(schema.types.len());
        for type_schema in schema.types {
            let ty = BuildType::from_schema(type_schema, &path)?;
            ensure_unique(&mut seen, &ty.identifier, "type", &path)?;
            types.push(ty);
        }

        Ok(Self {
            identifier: schema.identifier,
            display_name: schema.display_name,
            types,
        })
    }

    /// Types in declared order
    pub fn types(&self) -> &[BuildType] {
        &self.types
    }

    pub fn build_type(&self, identifier: &str) -> Option<&BuildType> {
        self.types.iter().find(|t| t.identifier == identifier)
    }
}

impl BuildType {
    fn from_schema(schema: TypeSchema, parent: &str) -> Result<Self, SchemaError> {
        require_identifier(&schema.identifier, "type", parent)?;
        let path = format!("{parent}/{}", schema.identifier);

        let mut seen = HashSet::new();
        let mut versions = Vec::with_capacity(schema.versions.len());
        for def in schema.versions {
            require_identifier(&def.identifier, "version", &path)?;
            ensure_unique(&mut seen, &def.identifier, "version", &path)?;
            versions.push(VersionSchema::new(
                def.identifier,
                &def.artifact_pattern,
                def.display_name,
                &path,
            )?);
        }

        Ok(Self::new(
            schema.identifier,
            schema.job_name,
            schema.display_name,
            schema.description,
            versions,
        ))
    }

    pub fn new(
        identifier: impl Into<String>,
        job_name: impl Into<String>,
        display_name: Option<String>,
        description: Option<String>,
        versions: Vec<VersionSchema>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name,
            description,
            job_name: job_name.into(),
            versions,
            builds: ArcSwap::from_pointee(BuildMap::new()),
        }
    }

    /// Current build under `key`
    pub fn build(&self, key: &str) -> Option<Arc<Build>> {
        self.builds.load().get(key).cloned()
    }

    /// Snapshot of the whole build map
    pub fn builds(&self) -> Arc<BuildMap> {
        self.builds.load_full()
    }

    /// Build keys, sorted
    pub fn build_keys(&self) -> Vec<String> {
        self.builds.load().keys().cloned().collect()
    }

    /// Replace the build map; readers see the old map or the new one
    pub(crate) fn publish(&self, builds: BuildMap) {
        self.builds.store(Arc::new(builds));
    }
}

fn require_identifier(identifier: &str, kind: &'static str, parent: &str) -> Result<(), SchemaError> {
    if identifier.trim().is_empty() {
        return Err(SchemaError::EmptyIdentifier {
            kind,
            parent: parent.to_string(),
        });
    }
    Ok(())
}

fn ensure_unique(
    seen: &mut HashSet<String>,
    identifier: &str,
    kind: &'static str,
    parent: &str,
) -> Result<(), SchemaError> {
    if !seen.insert(identifier.to_string()) {
        return Err(SchemaError::DuplicateIdentifier {
            kind,
            identifier: identifier.to_string(),
            parent: parent.to_string(),
        });
    }
    Ok(())
}
