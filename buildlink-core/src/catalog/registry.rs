//! Registry of projects, the root of path resolution
//!
//! The set of projects is fixed once loading finishes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::node::{resolve, CatalogNode, Resolution};
use super::project::Project;
use super::refresh::RefreshSettings;
use crate::config::schema::{is_schema_file, project_identifier};
use crate::config::ProjectSchema;
use crate::error::SchemaError;
use crate::upstream::UpstreamConnector;

#[derive(Default)]
pub struct Registry {
    projects: BTreeMap<String, Project>,
}

/// Per-file results of a directory scan
#[derive(Debug, Default)]
pub struct LoadReport {
    /// (file, project identifier)
    pub loaded: Vec<(PathBuf, String)>,
    /// (file, reason)
    pub skipped: Vec<(PathBuf, String)>,
}

impl LoadReport {
    pub fn has_failures(&self) -> bool {
        !self.skipped.is_empty()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project; returns it back if the identifier is taken
    pub fn insert(&mut self, project: Project) -> Result<(), Project> {
        if self.projects.contains_key(&project.identifier) {
            return Err(project);
        }
        self.projects.insert(project.identifier.clone(), project);
        Ok(())
    }

    /// Load every `*.json` schema in `dir`, in file-name order
    ///
    /// A file that fails to load is logged and skipped; the remaining files
    /// still load. Only failing to list the directory is an error.
    pub fn load_dir(
        dir: &Path,
        settings: &RefreshSettings,
        connector: &dyn UpstreamConnector,
    ) -> std::io::Result<(Self, LoadReport)> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        let mut registry = Self::new();
        let mut report = LoadReport::default();

        for path in paths {
            if !is_schema_file(&path) {
                debug!("Skipping non-project file: {}", path.display());
                continue;
            }
            info!("Found project schema file: {}", path.display());

            let project = match load_project(&path, settings, connector) {
                Ok(project) => project,
                Err(e) => {
                    let e = anyhow::Error::new(e);
                    error!("Failed to read project schema {}: {:#}", path.display(), e);
                    report.skipped.push((path, format!("{e:#}")));
                    continue;
                }
            };

            let identifier = project.identifier.clone();
            match registry.insert(project) {
                Ok(()) => {
                    info!("Read project {}", identifier);
                    report.loaded.push((path, identifier));
                }
                Err(_) => {
                    warn!(
                        "Project {} from {} is already defined, skipping",
                        identifier,
                        path.display()
                    );
                    report
                        .skipped
                        .push((path, format!("duplicate project identifier '{identifier}'")));
                }
            }
        }

        Ok((registry, report))
    }

    pub fn project(&self, identifier: &str) -> Option<&Project> {
        self.projects.get(identifier)
    }

    /// Projects sorted by identifier
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn project_ids(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn root(&self) -> CatalogNode<'_> {
        CatalogNode::Registry(self)
    }

    /// Resolve `[project, target, type, build, version]` or any prefix
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Resolution<'_> {
        resolve(self.root(), segments)
    }

    /// Refresh all projects concurrently
    pub async fn refresh_all(&self) {
        futures::future::join_all(self.projects.values().map(|p| p.load_builds())).await;
    }
}

/// Parse, validate and connect one project file
pub fn load_project(
    path: &Path,
    settings: &RefreshSettings,
    connector: &dyn UpstreamConnector,
) -> Result<Project, SchemaError> {
    let identifier =
        project_identifier(path).ok_or_else(|| SchemaError::InvalidFileName(path.to_path_buf()))?;
    let schema = ProjectSchema::from_path(path)?;
    let upstream = connector
        .connect(&schema.jenkins_base)
        .map_err(|source| SchemaError::InvalidBase {
            project: identifier.clone(),
            source,
        })?;
    Project::from_schema(identifier, schema, upstream, settings.clone())
}
