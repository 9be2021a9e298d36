//! Upstream CI server access
//!
//! The refresh engine only needs two calls: job metadata (the build list and
//! the last completed build) and the artifact list of one build. The trait
//! keeps the engine independent of the Jenkins wire format and lets tests
//! substitute an in-memory server.

pub mod jenkins;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::UpstreamError;

pub use jenkins::JenkinsClient;

/// Reference to one build of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRef {
    pub number: u64,

    /// Build page URL as reported upstream, if any
    #[serde(default)]
    pub url: Option<String>,
}

/// Job metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobInfo {
    /// Builds in the order the server reported them
    pub builds: Vec<BuildRef>,

    /// `None` when the job has never completed a build
    pub last_completed_build: Option<u64>,
}

/// A downloadable file produced by a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub url: String,
}

/// Client for a CI server
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Fetch the build list and last completed build of a job
    async fn job_info(&self, job_name: &str) -> Result<JobInfo, UpstreamError>;

    /// Fetch the artifacts of one build of a job
    async fn build_artifacts(
        &self,
        job_name: &str,
        build: &BuildRef,
    ) -> Result<Vec<Artifact>, UpstreamError>;

    /// Base URL for logging
    fn base_url(&self) -> &str;
}

/// Creates the upstream client for a project's `jenkins_base`
pub trait UpstreamConnector: Send + Sync {
    fn connect(&self, base_url: &str) -> Result<Arc<dyn UpstreamClient>, UpstreamError>;
}

impl<F> UpstreamConnector for F
where
    F: Fn(&str) -> Result<Arc<dyn UpstreamClient>, UpstreamError> + Send + Sync,
{
    fn connect(&self, base_url: &str) -> Result<Arc<dyn UpstreamClient>, UpstreamError> {
        self(base_url)
    }
}

/// Connects every project to a [`JenkinsClient`]
#[derive(Debug, Clone)]
pub struct JenkinsConnector {
    pub timeout: Duration,
    pub user_agent: String,
}

impl UpstreamConnector for JenkinsConnector {
    fn connect(&self, base_url: &str) -> Result<Arc<dyn UpstreamClient>, UpstreamError> {
        Ok(Arc::new(JenkinsClient::new(
            base_url,
            self.timeout,
            &self.user_agent,
        )?))
    }
}

/// In-memory upstream for tests
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    pub struct MockUpstream {
        jobs: Mutex<HashMap<String, JobInfo>>,
        artifacts: Mutex<HashMap<(String, u64), Vec<Artifact>>>,
        failing_jobs: Mutex<HashSet<String>>,
        failing_builds: Mutex<HashSet<(String, u64)>>,
        delay: Mutex<Option<Duration>>,
        pub job_calls: AtomicUsize,
        pub artifact_calls: AtomicUsize,
    }

    impl MockUpstream {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a job whose builds are `numbers`, newest completed
        /// build `last`
        pub fn with_job(self, job: &str, numbers: &[u64], last: Option<u64>) -> Self {
            self.set_job(job, numbers, last);
            self
        }

        pub fn set_job(&self, job: &str, numbers: &[u64], last: Option<u64>) {
            let builds = numbers
                .iter()
                .map(|&number| BuildRef { number, url: None })
                .collect();
            self.jobs.lock().unwrap().insert(
                job.to_string(),
                JobInfo {
                    builds,
                    last_completed_build: last,
                },
            );
        }

        pub fn with_artifacts(self, job: &str, number: u64, files: &[&str]) -> Self {
            self.set_artifacts(job, number, files);
            self
        }

        pub fn set_artifacts(&self, job: &str, number: u64, files: &[&str]) {
            let artifacts = files
                .iter()
                .map(|f| Artifact {
                    file_name: f.to_string(),
                    url: format!("https://ci.test/job/{job}/{number}/artifact/{f}"),
                })
                .collect();
            self.artifacts
                .lock()
                .unwrap()
                .insert((job.to_string(), number), artifacts);
        }

        pub fn fail_job(&self, job: &str, failing: bool) {
            let mut set = self.failing_jobs.lock().unwrap();
            if failing {
                set.insert(job.to_string());
            } else {
                set.remove(job);
            }
        }

        pub fn fail_build(&self, job: &str, number: u64) {
            self.failing_builds
                .lock()
                .unwrap()
                .insert((job.to_string(), number));
        }

        pub fn set_delay(&self, delay: Option<Duration>) {
            *self.delay.lock().unwrap() = delay;
        }

        async fn maybe_delay(&self) {
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl UpstreamClient for MockUpstream {
        async fn job_info(&self, job_name: &str) -> Result<JobInfo, UpstreamError> {
            self.job_calls.fetch_add(1, Ordering::SeqCst);
            self.maybe_delay().await;
            if self.failing_jobs.lock().unwrap().contains(job_name) {
                return Err(UpstreamError::Status {
                    url: format!("mock://{job_name}"),
                    status: 503,
                });
            }
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .get(job_name)
                .cloned()
                .unwrap_or_default())
        }

        async fn build_artifacts(
            &self,
            job_name: &str,
            build: &BuildRef,
        ) -> Result<Vec<Artifact>, UpstreamError> {
            self.artifact_calls.fetch_add(1, Ordering::SeqCst);
            let key = (job_name.to_string(), build.number);
            if self.failing_builds.lock().unwrap().contains(&key) {
                return Err(UpstreamError::Status {
                    url: format!("mock://{job_name}/{}", build.number),
                    status: 500,
                });
            }
            Ok(self
                .artifacts
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or_default())
        }

        fn base_url(&self) -> &str {
            "mock://"
        }
    }
}
