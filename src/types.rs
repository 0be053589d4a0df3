//! Core types for the kubefix scanner:
//! - `Severity` - finding severity tiers
//! - `RuleId` - stable rule identifiers (e.g., "privileged-container")
//! - `Diagnostic` - raw output of a rule check
//! - `Finding` - an enriched diagnostic bound to a document

use crate::manifest::FieldPath;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Severity tiers for findings.
///
/// Ordered from most severe to least severe:
/// `High > Medium > Low`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Security-relevant issues that should be fixed before deploying.
    High,
    /// Operational issues that should be addressed.
    Medium,
    /// Hygiene suggestions.
    #[default]
    Low,
}

impl Severity {
    /// Parse a severity from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Look up the fixed severity for a rule id.
    ///
    /// Returns `None` for rule ids outside the catalogue; the engine
    /// verifies totality over the catalogue at construction time.
    pub fn of(rule: &RuleId) -> Option<Severity> {
        SEVERITIES
            .iter()
            .find(|(id, _)| *id == rule.as_str())
            .map(|(_, sev)| *sev)
    }
}

/// The static severity table. One entry per catalogued rule; severity is a
/// pure function of the rule id and never varies per instance.
const SEVERITIES: &[(&str, Severity)] = &[
    ("missing-resource-limits", Severity::Medium),
    ("privileged-container", Severity::High),
    ("run-as-root", Severity::High),
    ("latest-image-tag", Severity::Low),
    ("exposed-service-type", Severity::High),
    ("rbac-wildcard", Severity::High),
    ("missing-namespace", Severity::Low),
];

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher severity = lower numeric value for Ord
        let rank = |s: &Self| match s {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        };
        // Reverse so High > Medium > Low
        rank(other).cmp(&rank(self))
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A rule identifier (e.g., "privileged-container", "latest-image-tag").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl RuleId {
    /// Create a new rule id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RuleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for RuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Raw output of a rule check, before it is bound to a document and
/// assigned a severity.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Human-readable description of the issue.
    pub message: String,
    /// Logical path of the offending value within the document.
    pub location: FieldPath,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(message: impl Into<String>, location: FieldPath) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Identifies one document within one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// The source file the document came from.
    pub source: PathBuf,
    /// Zero-based index of the document within the source.
    pub index: usize,
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source.display(), self.index)
    }
}

/// One detected misconfiguration instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// The rule that fired.
    pub rule: RuleId,
    /// Severity, derived from the rule id.
    pub severity: Severity,
    /// Human-readable message bound to the offending path.
    pub message: String,
    /// Logical path of the offending value (e.g.
    /// `spec.template.spec.containers[1].resources`).
    pub location: FieldPath,
    /// The document the finding belongs to.
    pub document: DocumentRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("high"), Some(Severity::High));
        assert_eq!(Severity::parse("MEDIUM"), Some(Severity::Medium));
        assert_eq!(Severity::parse("Low"), Some(Severity::Low));
        assert_eq!(Severity::parse("critical"), None);
    }

    #[test]
    fn test_severity_table_covers_catalogue() {
        for rule in crate::rules::catalogue() {
            assert!(
                Severity::of(&RuleId::new(rule.id)).is_some(),
                "rule '{}' is missing a severity entry",
                rule.id
            );
        }
    }

    #[test]
    fn test_severity_is_constant_per_rule() {
        let id = RuleId::new("privileged-container");
        let first = Severity::of(&id);
        for _ in 0..3 {
            assert_eq!(Severity::of(&id), first);
        }
        assert_eq!(first, Some(Severity::High));
    }
}
