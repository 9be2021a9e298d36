//! Artifact-to-version matching
//!
//! Each version rule binds the first artifact whose file name matches its
//! pattern. Rules are independent: one artifact may satisfy several rules.

use regex::Regex;
use std::collections::BTreeMap;

use crate::error::SchemaError;
use crate::upstream::Artifact;

/// A compiled version rule
#[derive(Debug, Clone)]
pub struct VersionSchema {
    pub identifier: String,
    pub display_name: Option<String>,
    pattern: Regex,
}

impl VersionSchema {
    /// Compile a rule; the pattern must match the entire file name
    pub fn new(
        identifier: impl Into<String>,
        pattern: &str,
        display_name: Option<String>,
        parent: &str,
    ) -> Result<Self, SchemaError> {
        let identifier = identifier.into();
        let anchored = format!("^(?:{pattern})$");
        let compiled = Regex::new(&anchored).map_err(|source| SchemaError::Pattern {
            version: identifier.clone(),
            parent: parent.to_string(),
            source,
        })?;
        Ok(Self {
            identifier,
            display_name,
            pattern: compiled,
        })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }
}

/// Map version identifiers to the artifact each rule binds
///
/// Rules are tried in declared order; artifacts are scanned in upstream
/// order and the first match wins. Rules without a match are absent from
/// the result.
pub fn match_versions<'a>(
    artifacts: &'a [Artifact],
    rules: &[VersionSchema],
) -> BTreeMap<String, &'a Artifact> {
    let mut matched = BTreeMap::new();
    for rule in rules {
        if let Some(artifact) = artifacts.iter().find(|a| rule.matches(&a.file_name)) {
            matched.insert(rule.identifier.clone(), artifact);
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn artifact(name: &str) -> Artifact {
        Artifact {
            file_name: name.to_string(),
            url: format!("https://ci/artifact/{name}"),
        }
    }

    fn rule(id: &str, pattern: &str) -> VersionSchema {
        VersionSchema::new(id, pattern, None, "test").unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let artifacts = vec![artifact("demo-1.0.jar"), artifact("demo-1.1.jar")];
        let rules = vec![rule("jar", r"demo-(.*)\.jar")];

        let matched = match_versions(&artifacts, &rules);
        assert_eq!(matched["jar"].file_name, "demo-1.0.jar");
    }

    #[test]
    fn test_pattern_must_match_whole_name() {
        let artifacts = vec![artifact("demo-1.0.jar.sha1"), artifact("xdemo-1.0.jar")];
        let rules = vec![rule("jar", r"demo-(.*)\.jar")];

        assert!(match_versions(&artifacts, &rules).is_empty());
    }

    #[test]
    fn test_artifact_can_satisfy_several_rules() {
        let artifacts = vec![artifact("demo-all-1.0.jar")];
        let rules = vec![rule("all", r"demo-all-.*\.jar"), rule("any", r".*\.jar")];

        let matched = match_versions(&artifacts, &rules);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched["all"].file_name, "demo-all-1.0.jar");
        assert_eq!(matched["any"].file_name, "demo-all-1.0.jar");
    }

    #[test]
    fn test_unmatched_rule_is_absent() {
        let artifacts = vec![artifact("demo-1.0.zip")];
        let rules = vec![rule("jar", r".*\.jar"), rule("zip", r".*\.zip")];

        let matched = match_versions(&artifacts, &rules);
        assert!(!matched.contains_key("jar"));
        assert!(matched.contains_key("zip"));
    }

    #[test]
    fn test_repeated_matching_is_stable() {
        let artifacts = vec![
            artifact("demo-api-2.0.jar"),
            artifact("demo-2.0.jar"),
            artifact("demo-2.0-sources.jar"),
        ];
        let rules = vec![rule("jar", r"demo-[0-9.]+\.jar"), rule("api", r"demo-api-.*\.jar")];

        let first: Vec<_> = match_versions(&artifacts, &rules)
            .into_iter()
            .map(|(k, a)| (k, a.file_name.clone()))
            .collect();
        let second: Vec<_> = match_versions(&artifacts, &rules)
            .into_iter()
            .map(|(k, a)| (k, a.file_name.clone()))
            .collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                ("api".to_string(), "demo-api-2.0.jar".to_string()),
                ("jar".to_string(), "demo-2.0.jar".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_pattern_is_schema_error() {
        let err = VersionSchema::new("broken", "demo-(", None, "demo/linux/release").unwrap_err();
        assert!(matches!(err, SchemaError::Pattern { .. }));
        assert!(err.to_string().contains("broken"));
    }
}
