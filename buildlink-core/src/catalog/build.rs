//! Builds and their versions
//!
//! Both are immutable once constructed. A refresh creates fresh values and
//! publishes them; readers holding an `Arc` keep the old value alive.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::matcher::{match_versions, VersionSchema};
use crate::upstream::Artifact;

/// Registry key of the most recently completed build
pub const LATEST: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub identifier: String,
    pub display_name: Option<String>,
    pub file_name: String,
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    /// Numeric build id, or [`LATEST`]
    pub identifier: String,
    /// Upstream build number the data came from
    pub number: u64,
    pub versions: BTreeMap<String, Arc<Version>>,
}

impl Build {
    /// Build the version map for one upstream build
    pub fn from_artifacts(
        identifier: impl Into<String>,
        number: u64,
        artifacts: &[Artifact],
        rules: &[VersionSchema],
    ) -> Self {
        let display_names: BTreeMap<&str, &Option<String>> = rules
            .iter()
            .map(|r| (r.identifier.as_str(), &r.display_name))
            .collect();

        let versions = match_versions(artifacts, rules)
            .into_iter()
            .map(|(id, artifact)| {
                let version = Version {
                    display_name: display_names.get(id.as_str()).and_then(|d| (*d).clone()),
                    identifier: id.clone(),
                    file_name: artifact.file_name.clone(),
                    download_url: artifact.url.clone(),
                };
                (id, Arc::new(version))
            })
            .collect();

        Self {
            identifier: identifier.into(),
            number,
            versions,
        }
    }

    pub fn is_latest(&self) -> bool {
        self.identifier == LATEST
    }

    pub fn version(&self, id: &str) -> Option<Arc<Version>> {
        self.versions.get(id).cloned()
    }
}

/// Registry key for a build: `latest` for the last completed build,
/// otherwise the build number
pub fn build_key(number: u64, last_completed: Option<u64>) -> String {
    if Some(number) == last_completed {
        LATEST.to_string()
    } else {
        number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key() {
        assert_eq!(build_key(10, Some(10)), "latest");
        assert_eq!(build_key(9, Some(10)), "9");
        assert_eq!(build_key(9, None), "9");
    }

    #[test]
    fn test_versions_carry_rule_display_name() {
        let rules = vec![
            VersionSchema::new("jar", r".*\.jar", Some("Plugin jar".to_string()), "t").unwrap(),
            VersionSchema::new("zip", r".*\.zip", None, "t").unwrap(),
        ];
        let artifacts = vec![
            Artifact {
                file_name: "demo.jar".to_string(),
                url: "https://ci/demo.jar".to_string(),
            },
            Artifact {
                file_name: "demo.zip".to_string(),
                url: "https://ci/demo.zip".to_string(),
            },
        ];

        let build = Build::from_artifacts("latest", 4, &artifacts, &rules);
        assert!(build.is_latest());
        assert_eq!(
            build.version("jar").unwrap().display_name.as_deref(),
            Some("Plugin jar")
        );
        assert!(build.version("zip").unwrap().display_name.is_none());
        assert_eq!(build.version("zip").unwrap().download_url, "https://ci/demo.zip");
    }

    #[test]
    fn test_no_matching_artifact_gives_empty_build() {
        let rules = vec![VersionSchema::new("jar", r".*\.jar", None, "t").unwrap()];
        let build = Build::from_artifacts("8", 8, &[], &rules);
        assert!(build.versions.is_empty());
    }
}
