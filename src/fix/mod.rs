//! The fixer: deterministic remediation of findings.
//!
//! For every finding the fixer applies a canonical structural patch to a
//! clone of the document; the parsed original is never touched. Where a
//! deterministic patch would be a guess (RBAC narrowing, real image
//! versions), it consults the enrichment collaborator and falls back to a
//! safe default or a manual-review marker when that collaborator is
//! unavailable.

pub mod enrichment;
pub mod patch;

pub use enrichment::{Enrichment, EnrichmentConfig, HttpEnrichment, OfflineEnrichment, PatchProposal};
pub use patch::FixPatch;

use crate::config::FixDefaults;
use crate::error::{EnrichmentUnavailable, FixValidationError};
use crate::manifest::{FieldPath, ManifestDocument};
use crate::rules::pod_spec_path;
use crate::types::Finding;
use serde_yaml::{Mapping, Value};

/// What happened to one finding during a fix pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    /// A patch was applied.
    Patched,
    /// A patch was applied but changes runtime behavior; a human should
    /// review it (e.g. Service type downgrade).
    BehaviorChanging,
    /// No safe patch exists without an accepted enrichment proposal.
    ManualReviewRequired,
    /// Nothing was changed (patch failed or rule has no remediation).
    Skipped,
}

impl FixOutcome {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patched => "patched",
            Self::BehaviorChanging => "behavior-changing",
            Self::ManualReviewRequired => "manual-review-required",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for FixOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fix record for one finding.
#[derive(Debug, Clone)]
pub struct FixRecord {
    /// The finding that was remediated.
    pub finding: Finding,
    /// What happened.
    pub outcome: FixOutcome,
    /// Informational note (enrichment fallbacks, review reasons).
    pub note: Option<String>,
}

/// Result of validating a patched document.
#[derive(Debug, Clone)]
pub struct FixValidation {
    /// Whether the patched document round-trips through the serializer.
    pub round_trips: bool,
    /// Warnings accumulated during the pass. The document is emitted
    /// regardless.
    pub warnings: Vec<String>,
}

/// A patched document plus its validation verdict.
#[derive(Debug, Clone)]
pub struct FixedDocument {
    /// The patched derivative of the input document.
    pub document: ManifestDocument,
    /// Per-finding outcomes, in finding order.
    pub records: Vec<FixRecord>,
    /// Validation verdict for the patched document.
    pub validation: FixValidation,
}

impl FixedDocument {
    /// Findings that still need a human decision.
    pub fn manual_review_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    FixOutcome::ManualReviewRequired | FixOutcome::BehaviorChanging
                )
            })
            .count()
    }

    /// Findings that were patched (including behavior-changing ones).
    pub fn patched_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| {
                matches!(r.outcome, FixOutcome::Patched | FixOutcome::BehaviorChanging)
            })
            .count()
    }
}

/// Applies canonical remediations for findings.
pub struct Fixer {
    defaults: FixDefaults,
    enrichment: Box<dyn Enrichment>,
}

impl Fixer {
    /// A fixer with the offline enrichment default.
    pub fn new(defaults: FixDefaults) -> Self {
        Self {
            defaults,
            enrichment: Box::new(OfflineEnrichment),
        }
    }

    /// A fixer with an injected enrichment collaborator.
    pub fn with_enrichment(defaults: FixDefaults, enrichment: Box<dyn Enrichment>) -> Self {
        Self {
            defaults,
            enrichment,
        }
    }

    /// Remediate all findings against a clone of the document.
    ///
    /// Idempotent: fixing an already-fixed document changes nothing
    /// further. Always yields an output document, degraded or not.
    pub fn fix(&self, doc: &ManifestDocument, findings: &[Finding]) -> FixedDocument {
        let mut patched = doc.clone();
        let mut warnings = Vec::new();
        let mut records = Vec::new();

        for finding in findings {
            let (outcome, mut note) = self.remediate(&mut patched, finding, &mut warnings);

            // Manual-review findings get a phrased suggestion when the
            // collaborator can provide one.
            if outcome == FixOutcome::ManualReviewRequired {
                match self.enrichment.suggest(finding, &patched) {
                    Ok(suggestion) => {
                        note = Some(match note {
                            Some(n) => format!("{} | {}", n, suggestion),
                            None => suggestion,
                        });
                    }
                    Err(EnrichmentUnavailable::Disabled) => {}
                    Err(e) => log::debug!("suggestion unavailable for {}: {}", finding.rule, e),
                }
            }

            records.push(FixRecord {
                finding: finding.clone(),
                outcome,
                note,
            });
        }

        let round_trips = match validate(&patched) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{}: {}", patched.source_path().display(), e);
                warnings.push(e.to_string());
                false
            }
        };

        FixedDocument {
            document: patched,
            records,
            validation: FixValidation {
                round_trips,
                warnings,
            },
        }
    }

    fn remediate(
        &self,
        doc: &mut ManifestDocument,
        finding: &Finding,
        warnings: &mut Vec<String>,
    ) -> (FixOutcome, Option<String>) {
        match finding.rule.as_str() {
            "missing-resource-limits" => {
                let patch = FixPatch::Merge {
                    path: finding.location.clone(),
                    value: self.resources_defaults(),
                };
                (self.apply_or_skip(doc, &patch, warnings), None)
            }
            "privileged-container" => {
                let patch = FixPatch::Set {
                    path: finding.location.clone(),
                    value: Value::Bool(false),
                };
                (self.apply_or_skip(doc, &patch, warnings), None)
            }
            "run-as-root" => self.fix_run_as_root(doc, finding, warnings),
            "latest-image-tag" => self.fix_image_tag(doc, finding, warnings),
            "exposed-service-type" => {
                let patch = FixPatch::Set {
                    path: finding.location.clone(),
                    value: Value::String("ClusterIP".to_string()),
                };
                match self.apply_or_skip(doc, &patch, warnings) {
                    FixOutcome::Patched => (
                        FixOutcome::BehaviorChanging,
                        Some(
                            "service type downgraded to ClusterIP; review external traffic routing"
                                .to_string(),
                        ),
                    ),
                    other => (other, None),
                }
            }
            "rbac-wildcard" => self.fix_rbac_wildcard(doc, finding, warnings),
            "missing-namespace" => {
                let patch = FixPatch::Set {
                    path: finding.location.clone(),
                    value: Value::String(self.defaults.default_namespace.clone()),
                };
                (self.apply_or_skip(doc, &patch, warnings), None)
            }
            other => {
                log::debug!("no remediation implemented for rule '{}'", other);
                (FixOutcome::Skipped, None)
            }
        }
    }

    fn fix_run_as_root(
        &self,
        doc: &mut ManifestDocument,
        finding: &Finding,
        warnings: &mut Vec<String>,
    ) -> (FixOutcome, Option<String>) {
        // Most specific applicable scope: the container's securityContext
        // when it already exists, otherwise the pod-level one.
        let container_scope = doc
            .get(&finding.location)
            .map(Value::is_mapping)
            .unwrap_or(false);
        let target = if container_scope {
            finding.location.clone()
        } else {
            match doc.kind().and_then(pod_spec_path) {
                Some(base) => FieldPath::parse(base).key("securityContext"),
                None => finding.location.clone(),
            }
        };

        let non_root = FixPatch::Set {
            path: target.clone().key("runAsNonRoot"),
            value: Value::Bool(true),
        };
        let mut outcome = self.apply_or_skip(doc, &non_root, warnings);

        let user_path = target.key("runAsUser");
        let user = doc.get_i64(&user_path);
        if user.is_none() || user == Some(0) {
            let patch = FixPatch::Set {
                path: user_path,
                value: Value::Number(self.defaults.run_as_user.into()),
            };
            if self.apply_or_skip(doc, &patch, warnings) == FixOutcome::Skipped {
                outcome = FixOutcome::Skipped;
            }
        }

        (outcome, None)
    }

    fn fix_image_tag(
        &self,
        doc: &mut ManifestDocument,
        finding: &Finding,
        warnings: &mut Vec<String>,
    ) -> (FixOutcome, Option<String>) {
        let current = doc.get_str(&finding.location).unwrap_or_default().to_string();
        let base = current.strip_suffix(":latest").unwrap_or(&current);
        let mut replacement = format!("{}:{}", base, self.defaults.pinned_tag);
        let mut note = None;

        match self.enrichment.propose_fix(finding, doc) {
            Ok(PatchProposal::Image(reference)) => {
                if valid_image_ref(&reference) {
                    note = Some(format!("image pinned to '{}' via enrichment", reference));
                    replacement = reference;
                } else {
                    note = Some(format!(
                        "enrichment proposed invalid image reference '{}'; used pinned default",
                        reference
                    ));
                }
            }
            Ok(_) => {
                note = Some("enrichment proposed a mismatched patch; used pinned default".to_string());
            }
            Err(EnrichmentUnavailable::Disabled) => {
                log::debug!("enrichment disabled; pinning '{}' deterministically", current);
            }
            Err(e) => {
                note = Some(format!("enrichment unavailable ({}); used pinned default", e));
            }
        }

        let patch = FixPatch::Set {
            path: finding.location.clone(),
            value: Value::String(replacement),
        };
        (self.apply_or_skip(doc, &patch, warnings), note)
    }

    fn fix_rbac_wildcard(
        &self,
        doc: &mut ManifestDocument,
        finding: &Finding,
        warnings: &mut Vec<String>,
    ) -> (FixOutcome, Option<String>) {
        let Some(entry_path) = finding.location.parent() else {
            return (FixOutcome::Skipped, None);
        };

        // Sibling wildcard findings share one rule entry; an accepted
        // proposal for one of them already replaced the whole entry.
        let still_wildcard = doc
            .get(&finding.location)
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().any(|v| v.as_str() == Some("*")))
            .unwrap_or(false);
        if !still_wildcard {
            return (
                FixOutcome::Patched,
                Some("resolved together with sibling wildcard fields".to_string()),
            );
        }

        match self.enrichment.propose_fix(finding, doc) {
            Ok(PatchProposal::PolicyRule {
                api_groups,
                resources,
                verbs,
            }) => match validate_policy_rule(&api_groups, &resources, &verbs) {
                Ok(()) => {
                    let patch = FixPatch::Set {
                        path: entry_path,
                        value: policy_rule_value(&api_groups, &resources, &verbs),
                    };
                    match self.apply_or_skip(doc, &patch, warnings) {
                        FixOutcome::Patched => (
                            FixOutcome::Patched,
                            Some("rule narrowed via enrichment proposal".to_string()),
                        ),
                        other => (other, None),
                    }
                }
                Err(reason) => (
                    FixOutcome::ManualReviewRequired,
                    Some(format!("enrichment proposal rejected ({})", reason)),
                ),
            },
            Ok(_) => (
                FixOutcome::ManualReviewRequired,
                Some("enrichment proposed a mismatched patch".to_string()),
            ),
            Err(EnrichmentUnavailable::Disabled) => (
                FixOutcome::ManualReviewRequired,
                Some("wildcard narrowing is not mechanically guessable".to_string()),
            ),
            Err(e) => (
                FixOutcome::ManualReviewRequired,
                Some(format!("enrichment unavailable ({})", e)),
            ),
        }
    }

    fn apply_or_skip(
        &self,
        doc: &mut ManifestDocument,
        patch: &FixPatch,
        warnings: &mut Vec<String>,
    ) -> FixOutcome {
        match patch::apply(doc, patch) {
            Ok(()) => FixOutcome::Patched,
            Err(e) => {
                warnings.push(format!("patch failed: {}", e));
                FixOutcome::Skipped
            }
        }
    }

    fn resources_defaults(&self) -> Value {
        let mut requests = Mapping::new();
        requests.insert("cpu".into(), self.defaults.cpu_request.clone().into());
        requests.insert("memory".into(), self.defaults.memory_request.clone().into());
        let mut limits = Mapping::new();
        limits.insert("cpu".into(), self.defaults.cpu_limit.clone().into());
        limits.insert("memory".into(), self.defaults.memory_limit.clone().into());
        let mut resources = Mapping::new();
        resources.insert("requests".into(), Value::Mapping(requests));
        resources.insert("limits".into(), Value::Mapping(limits));
        Value::Mapping(resources)
    }
}

fn validate(doc: &ManifestDocument) -> Result<(), FixValidationError> {
    let yaml = doc
        .to_yaml()
        .map_err(|e| FixValidationError(e.to_string()))?;
    let reparsed = ManifestDocument::parse_str(&yaml, doc.source_path())
        .map_err(|e| FixValidationError(e.to_string()))?;
    match reparsed.first() {
        Some(first) if reparsed.len() == 1 && doc.same_structure(first) => Ok(()),
        _ => Err(FixValidationError(
            "patched document does not round-trip through the serializer".to_string(),
        )),
    }
}

fn validate_policy_rule(
    api_groups: &[String],
    resources: &[String],
    verbs: &[String],
) -> Result<(), String> {
    for (name, list) in [
        ("apiGroups", api_groups),
        ("resources", resources),
        ("verbs", verbs),
    ] {
        if list.is_empty() {
            return Err(format!("{} is empty", name));
        }
        if list.iter().any(|v| v.contains('*')) {
            return Err(format!("{} still contains a wildcard", name));
        }
    }
    Ok(())
}

fn policy_rule_value(api_groups: &[String], resources: &[String], verbs: &[String]) -> Value {
    let seq = |items: &[String]| {
        Value::Sequence(items.iter().map(|s| Value::String(s.clone())).collect())
    };
    let mut entry = Mapping::new();
    entry.insert("apiGroups".into(), seq(api_groups));
    entry.insert("resources".into(), seq(resources));
    entry.insert("verbs".into(), seq(verbs));
    Value::Mapping(entry)
}

/// Syntactic sanity check for a proposed image reference.
fn valid_image_ref(reference: &str) -> bool {
    if reference.is_empty() || reference.chars().any(char::is_whitespace) {
        return false;
    }
    if reference.contains('@') {
        return true;
    }
    let name_and_tag = reference.rsplit('/').next().unwrap_or(reference);
    match name_and_tag.split_once(':') {
        Some((_, tag)) => !tag.is_empty() && tag != "latest",
        None => false,
    }
}
