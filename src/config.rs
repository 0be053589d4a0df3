//! Configuration for the kubefix scanner and fixer.
//!
//! Loaded from `.kubefix.yaml` when present, with builder-style helpers
//! for programmatic use.

use crate::error::ConfigError;
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level scan/fix configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    /// Rule ids to run. Empty means the whole catalogue.
    pub include: Vec<String>,

    /// Rule ids to skip.
    pub exclude: Vec<String>,

    /// Glob patterns for source paths to ignore.
    pub ignore_paths: Vec<String>,

    /// Findings at or above this severity fail the scan.
    pub failure_threshold: Severity,

    /// If true, never return a non-zero exit code for findings.
    pub no_fail: bool,

    /// Defaults used by the deterministic fixer.
    pub fix: FixDefaults,

    /// Settings for the optional enrichment collaborator.
    pub enrichment: EnrichmentSettings,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            ignore_paths: Vec::new(),
            failure_threshold: Severity::Low,
            no_fail: false,
            fix: FixDefaults::default(),
            enrichment: EnrichmentSettings::default(),
        }
    }
}

impl ScanConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the run to a rule (can be chained).
    pub fn include(mut self, rule: impl Into<String>) -> Self {
        self.include.push(rule.into());
        self
    }

    /// Skip a rule.
    pub fn exclude(mut self, rule: impl Into<String>) -> Self {
        self.exclude.push(rule.into());
        self
    }

    /// Add a path pattern to ignore.
    pub fn ignore_path(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_paths.push(pattern.into());
        self
    }

    /// Set the failure threshold.
    pub fn with_threshold(mut self, threshold: Severity) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Whether a rule should run under this configuration.
    pub fn rule_enabled(&self, rule: &str) -> bool {
        if self.exclude.iter().any(|r| r == rule) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|r| r == rule)
    }

    /// Whether a source path is excluded by `ignore_paths`.
    pub fn should_ignore_path(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        for pattern in &self.ignore_paths {
            if let Ok(glob) = glob::Pattern::new(pattern) {
                if glob.matches(&path_str) {
                    return true;
                }
            }
            if path_str.contains(pattern.as_str()) {
                return true;
            }
        }
        false
    }

    /// Load configuration from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::load_from_str(&content)
    }

    /// Load configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Try the default config locations (.kubefix.yaml, .kubefix.yml).
    pub fn load_from_default() -> Option<Self> {
        for filename in &[".kubefix.yaml", ".kubefix.yml"] {
            let path = Path::new(filename);
            if path.exists() {
                if let Ok(config) = Self::load_from_file(path) {
                    return Some(config);
                }
            }
        }
        None
    }
}

/// Conservative defaults inserted by the deterministic fixer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixDefaults {
    /// Default CPU request for containers missing one.
    pub cpu_request: String,
    /// Default memory request.
    pub memory_request: String,
    /// Default CPU limit.
    pub cpu_limit: String,
    /// Default memory limit.
    pub memory_limit: String,
    /// Non-zero uid assigned when a container may run as root.
    pub run_as_user: i64,
    /// Placeholder tag replacing `latest`/untagged image references.
    pub pinned_tag: String,
    /// Namespace inserted when one is missing.
    pub default_namespace: String,
}

impl Default for FixDefaults {
    fn default() -> Self {
        Self {
            cpu_request: "100m".to_string(),
            memory_request: "128Mi".to_string(),
            cpu_limit: "500m".to_string(),
            memory_limit: "256Mi".to_string(),
            run_as_user: 10001,
            pinned_tag: "1.0.0".to_string(),
            default_namespace: "default".to_string(),
        }
    }
}

/// Settings for the network-backed enrichment client.
///
/// Disabled by default; the fixer then runs with its deterministic
/// defaults only. There is no global model state: these settings are
/// passed explicitly into the client at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentSettings {
    /// Whether the HTTP enrichment client is used at all.
    pub enabled: bool,
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(config.include.is_empty());
        assert!(config.exclude.is_empty());
        assert_eq!(config.failure_threshold, Severity::Low);
        assert!(!config.no_fail);
        assert!(!config.enrichment.enabled);
    }

    #[test]
    fn test_rule_enabled_semantics() {
        let config = ScanConfig::default();
        assert!(config.rule_enabled("privileged-container"));

        let config = ScanConfig::default().exclude("latest-image-tag");
        assert!(!config.rule_enabled("latest-image-tag"));
        assert!(config.rule_enabled("privileged-container"));

        let config = ScanConfig::default().include("rbac-wildcard");
        assert!(config.rule_enabled("rbac-wildcard"));
        assert!(!config.rule_enabled("privileged-container"));
    }

    #[test]
    fn test_path_ignoring() {
        let config = ScanConfig::default().ignore_path("vendor/");
        assert!(config.should_ignore_path(Path::new("vendor/k8s/deploy.yaml")));
        assert!(!config.should_ignore_path(Path::new("k8s/deploy.yaml")));
    }

    #[test]
    fn test_load_from_str() {
        let yaml = r#"
exclude:
  - latest-image-tag
failureThreshold: high
noFail: true
fix:
  defaultNamespace: staging
enrichment:
  enabled: true
  model: llama-3.3-70b-versatile
"#;
        let config = ScanConfig::load_from_str(yaml).unwrap();
        assert!(!config.rule_enabled("latest-image-tag"));
        assert_eq!(config.failure_threshold, Severity::High);
        assert!(config.no_fail);
        assert_eq!(config.fix.default_namespace, "staging");
        assert!(config.enrichment.enabled);
        assert_eq!(config.enrichment.model, "llama-3.3-70b-versatile");
        // Unspecified fields keep their defaults.
        assert_eq!(config.fix.cpu_request, "100m");
    }

    #[test]
    fn test_load_malformed_config_fails() {
        assert!(ScanConfig::load_from_str("exclude: 3\n").is_err());
    }
}
