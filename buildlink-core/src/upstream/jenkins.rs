//! Jenkins JSON API client
//!
//! Uses the `tree` query parameter so Jenkins only serializes the fields the
//! refresh engine reads.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{Artifact, BuildRef, JobInfo, UpstreamClient};
use crate::error::UpstreamError;

const JOB_TREE: &str = "builds[number,url],lastCompletedBuild[number]";
const BUILD_TREE: &str = "artifacts[fileName,relativePath]";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    #[serde(default)]
    builds: Vec<BuildRef>,
    #[serde(default)]
    last_completed_build: Option<BuildNumber>,
}

#[derive(Debug, Deserialize)]
struct BuildNumber {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    #[serde(default)]
    artifacts: Vec<ArtifactResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactResponse {
    file_name: String,
    relative_path: String,
}

/// Client for one Jenkins instance
pub struct JenkinsClient {
    client: reqwest::Client,
    base: Url,
    base_str: String,
}

impl JenkinsClient {
    pub fn new(base: &str, timeout: Duration, user_agent: &str) -> Result<Self, UpstreamError> {
        let base_url =
            Url::parse(base).map_err(|e| UpstreamError::InvalidUrl(format!("{base}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidUrl(base.to_string()));
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self {
            client,
            base: base_url,
            base_str: base.to_string(),
        })
    }

    /// `{base}/job/a/job/b/` for a job named `a/b`
    fn job_url(&self, job_name: &str) -> Result<Url, UpstreamError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| UpstreamError::InvalidUrl(self.base_str.clone()))?;
            segments.pop_if_empty();
            for part in job_name.split('/').filter(|p| !p.is_empty()) {
                segments.push("job").push(part);
            }
            // trailing slash
            segments.push("");
        }
        Ok(url)
    }

    fn build_url(&self, job_name: &str, build: &BuildRef) -> Result<Url, UpstreamError> {
        if let Some(reported) = &build.url {
            let with_slash = if reported.ends_with('/') {
                reported.clone()
            } else {
                format!("{reported}/")
            };
            return Url::parse(&with_slash)
                .map_err(|e| UpstreamError::InvalidUrl(format!("{reported}: {e}")));
        }

        self.job_url(job_name)?
            .join(&format!("{}/", build.number))
            .map_err(|e| UpstreamError::InvalidUrl(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        mut url: Url,
        tree: &str,
    ) -> Result<T, UpstreamError> {
        let api_path = format!("{}api/json", url.path());
        url.set_path(&api_path);
        url.query_pairs_mut().append_pair("tree", tree);
        let url_str = url.to_string();
        debug!("Fetching {}", url_str);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| UpstreamError::Request {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| UpstreamError::Request {
                url: url_str.clone(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| UpstreamError::Decode {
            url: url_str,
            source,
        })
    }
}

/// `{build url}artifact/{relative path}`, each path segment percent-encoded
fn artifact_url(build_url: &Url, relative_path: &str) -> Result<Url, UpstreamError> {
    let mut url = build_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(build_url.to_string()))?;
        segments.pop_if_empty().push("artifact");
        for part in relative_path.split('/').filter(|p| !p.is_empty()) {
            segments.push(part);
        }
    }
    Ok(url)
}

#[async_trait]
impl UpstreamClient for JenkinsClient {
    async fn job_info(&self, job_name: &str) -> Result<JobInfo, UpstreamError> {
        let url = self.job_url(job_name)?;
        let response: JobResponse = self.get_json(url, JOB_TREE).await?;
        Ok(JobInfo {
            builds: response.builds,
            last_completed_build: response.last_completed_build.map(|b| b.number),
        })
    }

    async fn build_artifacts(
        &self,
        job_name: &str,
        build: &BuildRef,
    ) -> Result<Vec<Artifact>, UpstreamError> {
        let build_url = self.build_url(job_name, build)?;
        let response: BuildResponse = self.get_json(build_url.clone(), BUILD_TREE).await?;

        response
            .artifacts
            .into_iter()
            .map(|a| {
                Ok(Artifact {
                    url: artifact_url(&build_url, &a.relative_path)?.to_string(),
                    file_name: a.file_name,
                })
            })
            .collect()
    }

    fn base_url(&self) -> &str {
        &self.base_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> JenkinsClient {
        JenkinsClient::new(base, Duration::from_secs(5), "buildlink-test").unwrap()
    }

    #[test]
    fn test_job_url_plain_and_folder() {
        let c = client("https://ci.example.com");
        assert_eq!(
            c.job_url("demo-job").unwrap().as_str(),
            "https://ci.example.com/job/demo-job/"
        );

        let c = client("https://ci.example.com/jenkins/");
        assert_eq!(
            c.job_url("team/demo job").unwrap().as_str(),
            "https://ci.example.com/jenkins/job/team/job/demo%20job/"
        );
    }

    #[test]
    fn test_build_url_prefers_reported_url() {
        let c = client("https://ci.example.com");
        let reported = BuildRef {
            number: 7,
            url: Some("https://mirror.example.com/job/demo/7".to_string()),
        };
        assert_eq!(
            c.build_url("demo", &reported).unwrap().as_str(),
            "https://mirror.example.com/job/demo/7/"
        );

        let bare = BuildRef { number: 7, url: None };
        assert_eq!(
            c.build_url("demo", &bare).unwrap().as_str(),
            "https://ci.example.com/job/demo/7/"
        );
    }

    #[test]
    fn test_artifact_url_encodes_segments() {
        let build = Url::parse("https://ci.example.com/job/demo/7/").unwrap();
        assert_eq!(
            artifact_url(&build, "target/demo-1.0.jar").unwrap().as_str(),
            "https://ci.example.com/job/demo/7/artifact/target/demo-1.0.jar"
        );
        assert_eq!(
            artifact_url(&build, "out/demo-1.0 final.jar").unwrap().as_str(),
            "https://ci.example.com/job/demo/7/artifact/out/demo-1.0%20final.jar"
        );
        assert_eq!(
            artifact_url(&build, "demo-1.0-é.jar").unwrap().as_str(),
            "https://ci.example.com/job/demo/7/artifact/demo-1.0-%C3%A9.jar"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(matches!(
            JenkinsClient::new("not a url", Duration::from_secs(1), "ua"),
            Err(UpstreamError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_job_response_decoding() {
        let json = r#"{
            "_class": "hudson.model.FreeStyleProject",
            "builds": [{"number": 10, "url": "https://ci/job/x/10/"}, {"number": 9, "url": "https://ci/job/x/9/"}],
            "lastCompletedBuild": {"number": 10}
        }"#;
        let parsed: JobResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.builds.len(), 2);
        assert_eq!(parsed.last_completed_build.unwrap().number, 10);

        let never_built: JobResponse =
            serde_json::from_str(r#"{"builds": [], "lastCompletedBuild": null}"#).unwrap();
        assert!(never_built.last_completed_build.is_none());
    }
}
