//! Refresh engine
//!
//! A type refresh fetches the job's build list, keeps the newest
//! `build_limit` builds, matches each build's artifacts against the type's
//! version rules and publishes the whole batch in one swap. Any failed call
//! aborts the refresh before anything is published, so a type either moves
//! to the new batch or keeps its previous builds.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::build::{build_key, Build, LATEST};
use super::project::{BuildMap, BuildType, Project, Target};
use crate::error::{RefreshError, UpstreamError};
use crate::upstream::UpstreamClient;

/// What happens to builds that drop out of the upstream response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Keep them; a refresh only adds or replaces keys
    #[default]
    Retain,
    /// Drop them; the map becomes exactly the refreshed batch
    Reconcile,
}

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Newest builds fetched per refresh, at least 1
    pub build_limit: usize,
    /// Upper bound for each individual upstream call
    pub call_timeout: Duration,
    pub retention: RetentionPolicy,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            build_limit: 10,
            call_timeout: Duration::from_secs(30),
            retention: RetentionPolicy::Retain,
        }
    }
}

/// Result of a successful type refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Builds written by this refresh
    pub written: usize,
    /// Builds in the published map
    pub total: usize,
    /// Last completed build number reported upstream
    pub latest: Option<u64>,
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, UpstreamError>>,
) -> Result<T, UpstreamError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| UpstreamError::Timeout(limit))?
}

impl BuildType {
    /// Bring this type's build map up to date with the CI server
    pub async fn populate_builds(
        &self,
        upstream: &dyn UpstreamClient,
        settings: &RefreshSettings,
    ) -> Result<RefreshOutcome, UpstreamError> {
        let job = bounded(settings.call_timeout, upstream.job_info(&self.job_name)).await?;

        let mut refs = job.builds;
        refs.sort_by(|a, b| b.number.cmp(&a.number));
        refs.dedup_by_key(|b| b.number);
        refs.truncate(settings.build_limit.max(1));

        let mut batch = Vec::with_capacity(refs.len());
        for build_ref in &refs {
            let artifacts = bounded(
                settings.call_timeout,
                upstream.build_artifacts(&self.job_name, build_ref),
            )
            .await?;
            let key = build_key(build_ref.number, job.last_completed_build);
            let build = Build::from_artifacts(key, build_ref.number, &artifacts, &self.versions);
            batch.push(Arc::new(build));
        }

        let written = batch.len();
        let mut next = match settings.retention {
            RetentionPolicy::Retain => BuildMap::clone(&self.builds()),
            RetentionPolicy::Reconcile => BuildMap::new(),
        };
        let previous_latest = next.get(LATEST).cloned();
        for build in batch {
            if build.is_latest() {
                // the last completed build lives only under "latest"
                next.remove(&build.number.to_string());
            }
            next.insert(build.identifier.clone(), build);
        }
        if let Some(previous) = previous_latest {
            demote_previous_latest(&mut next, &previous);
        }
        let total = next.len();
        self.publish(next);

        Ok(RefreshOutcome {
            written,
            total,
            latest: job.last_completed_build,
        })
    }
}

/// Keep a superseded "latest" reachable under its build number
///
/// Only reachable in retain mode, where `next` started as a copy of the old
/// map. A build the batch already wrote under its number is left alone.
fn demote_previous_latest(next: &mut BuildMap, previous: &Arc<Build>) {
    let still_latest = next
        .get(LATEST)
        .is_some_and(|current| current.number == previous.number);
    let key = previous.number.to_string();
    if still_latest || next.contains_key(&key) {
        return;
    }
    let demoted = Build {
        identifier: key.clone(),
        ..Build::clone(previous)
    };
    next.insert(key, Arc::new(demoted));
}

impl Project {
    /// Refresh every type of every target
    ///
    /// Failures are logged per type and never stop sibling types. A call
    /// made while another refresh of this project is running is skipped.
    pub async fn load_builds(&self) {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            warn!(
                project = %self.identifier,
                "Refresh already in progress, skipping"
            );
            return;
        };

        info!(project = %self.identifier, "Loading builds...");
        let mut failed = 0usize;
        for target in self.targets() {
            for ty in target.types() {
                if let Err(e) = self.refresh_type(target, ty).await {
                    failed += 1;
                    let e = anyhow::Error::new(e);
                    error!(
                        project = %self.identifier,
                        target = %target.identifier,
                        type_id = %ty.identifier,
                        upstream = %self.upstream.base_url(),
                        "{:#}",
                        e
                    );
                }
            }
        }

        if failed > 0 {
            warn!(
                project = %self.identifier,
                failed,
                "Builds loaded with failures"
            );
        } else {
            debug!(project = %self.identifier, "Builds loaded");
        }
    }

    /// Refresh one type, attaching its catalog path to any failure
    pub async fn refresh_type(
        &self,
        target: &Target,
        ty: &BuildType,
    ) -> Result<RefreshOutcome, RefreshError> {
        let outcome = ty
            .populate_builds(self.upstream.as_ref(), &self.settings)
            .await
            .map_err(|source| RefreshError {
                project: self.identifier.clone(),
                target: target.identifier.clone(),
                type_id: ty.identifier.clone(),
                source,
            })?;

        debug!(
            project = %self.identifier,
            target = %target.identifier,
            type_id = %ty.identifier,
            job = %ty.job_name,
            written = outcome.written,
            total = outcome.total,
            "Populated builds"
        );
        Ok(outcome)
    }
}
