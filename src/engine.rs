//! Rule engine: runs the catalogue over documents.

use crate::config::ScanConfig;
use crate::error::ConfigError;
use crate::manifest::ManifestDocument;
use crate::rules::{self, RuleSpec};
use crate::types::{Finding, RuleId, Severity};

/// Evaluates the rule catalogue against documents.
///
/// Construction verifies the severity table covers every catalogued rule;
/// an incomplete table is a configuration error that aborts before any
/// document is processed.
pub struct RuleEngine {
    rules: Vec<(&'static RuleSpec, Severity)>,
}

impl RuleEngine {
    /// Build an engine from a scan configuration.
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();
        for rule in rules::catalogue() {
            let severity = Severity::of(&RuleId::new(rule.id))
                .ok_or_else(|| ConfigError::MissingSeverity(rule.id.to_string()))?;
            if config.rule_enabled(rule.id) {
                rules.push((rule, severity));
            }
        }
        Ok(Self { rules })
    }

    /// Evaluate all applicable rules against one document.
    ///
    /// Deterministic: rule-definition order, then traversal order within a
    /// rule. Rules whose kind class does not match the document are
    /// skipped; a document with no recognizable kind only sees the
    /// kind-agnostic rules.
    pub fn evaluate(&self, doc: &ManifestDocument) -> Vec<Finding> {
        let mut findings = Vec::new();
        let document = doc.document_ref();

        for (rule, severity) in &self.rules {
            if !rule.applies_to.matches(doc.kind()) {
                continue;
            }
            for diagnostic in (rule.check)(doc) {
                findings.push(Finding {
                    rule: RuleId::new(rule.id),
                    severity: *severity,
                    message: diagnostic.message,
                    location: diagnostic.location,
                    document: document.clone(),
                });
            }
        }

        findings
    }

    /// The number of rules this engine will run.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
