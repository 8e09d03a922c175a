//
// pairing/config.rs
//
// Conventions the partner resolver follows
//

use serde::{Deserialize, Serialize};

/// Directory fragments that mark where project-relative structure begins.
///
/// Order matters only for anchors that start at the same segment; the first
/// listed wins.
pub const DEFAULT_ANCHORS: &[&str] = &[
    "test/unit",
    "test/functional",
    "test/integration",
    "test/models",
    "test/controllers",
    "app/concerns",
    "app/controllers",
    "app/decorators",
    "app/helpers",
    "app/mailers",
    "app/models",
    "app/services",
    "app/jobs",
    "lib",
];

/// Directory names that are never descended into while scanning.
pub const DEFAULT_PRUNED_DIRS: &[&str] = &[
    "tmp",
    "script",
    "views",
    "fixtures",
    "helpers",
    "assets",
    ".git",
    ".svn",
    ".hg",
    "db",
    "config",
    "node_modules",
    "log",
];

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Extension (without the dot) of files the toggle and run commands act on
    pub source_extension: String,
    /// Suffix marking a test file for exactly one source file
    pub test_suffix: String,
    /// Suffix marking one of several grouped test files for a source file
    pub grouped_test_suffix: String,
    /// Roots searched when looking for a source file's test
    pub test_roots: Vec<String>,
    /// Roots searched when looking for a test file's source
    pub source_roots: Vec<String>,
    /// Anchor directories, see [`DEFAULT_ANCHORS`]
    pub anchors: Vec<String>,
    /// Pruned directory names, see [`DEFAULT_PRUNED_DIRS`]
    pub pruned_dirs: Vec<String>,
    /// Prefix Rails gives test method names
    pub test_method_prefix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            source_extension: "rb".to_string(),
            test_suffix: "_test".to_string(),
            grouped_test_suffix: "_tests".to_string(),
            test_roots: vec!["test".to_string()],
            source_roots: vec!["app".to_string(), "lib".to_string()],
            anchors: DEFAULT_ANCHORS.iter().map(|s| s.to_string()).collect(),
            pruned_dirs: DEFAULT_PRUNED_DIRS.iter().map(|s| s.to_string()).collect(),
            test_method_prefix: "test_".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Whether a directory with this name is skipped during scans
    pub fn is_pruned(&self, dir_name: &str) -> bool {
        self.pruned_dirs.iter().any(|d| d == dir_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = ResolverConfig::default();
        assert_eq!(config.source_extension, "rb");
        assert_eq!(config.test_roots, vec!["test"]);
        assert_eq!(config.source_roots, vec!["app", "lib"]);
        assert_eq!(config.test_method_prefix, "test_");
        assert!(config.anchors.iter().any(|a| a == "app/models"));
    }

    #[test]
    fn test_is_pruned() {
        let config = ResolverConfig::default();
        for name in ["tmp", "fixtures", "views", ".git", "db", "config"] {
            assert!(config.is_pruned(name), "{} should be pruned", name);
        }
        assert!(!config.is_pruned("models"));
        assert!(!config.is_pruned("billing"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"source_extension": "rake"}"#).unwrap();
        assert_eq!(config.source_extension, "rake");
        assert_eq!(config.test_suffix, "_test");
        assert_eq!(config.pruned_dirs, ResolverConfig::default().pruned_dirs);
    }
}
