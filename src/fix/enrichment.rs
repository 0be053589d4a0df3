//! The optional enrichment collaborator.
//!
//! Enrichment supplies natural-language suggestions and free-form patch
//! proposals for findings the deterministic fixer cannot resolve well on
//! its own (pinning a real image version, narrowing an RBAC wildcard).
//! `EnrichmentUnavailable` is a first-class outcome, not an error path:
//! the fixer always has a deterministic fallback, and tests run entirely
//! against the offline implementation.

use crate::error::EnrichmentUnavailable;
use crate::manifest::ManifestDocument;
use crate::types::Finding;
use std::time::Duration;

/// A patch proposal from the collaborator, validated before acceptance.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchProposal {
    /// A replacement image reference for a `latest-image-tag` finding.
    Image(String),
    /// A replacement RBAC rule entry for an `rbac-wildcard` finding.
    PolicyRule {
        api_groups: Vec<String>,
        resources: Vec<String>,
        verbs: Vec<String>,
    },
}

/// Contract for the enrichment collaborator.
pub trait Enrichment: Send + Sync {
    /// Phrase a remediation suggestion for a finding.
    fn suggest(
        &self,
        finding: &Finding,
        doc: &ManifestDocument,
    ) -> Result<String, EnrichmentUnavailable>;

    /// Propose a concrete patch for a finding.
    fn propose_fix(
        &self,
        finding: &Finding,
        doc: &ManifestDocument,
    ) -> Result<PatchProposal, EnrichmentUnavailable>;
}

/// The offline default: always unavailable, so the fixer uses its
/// deterministic patches. Used in tests and whenever enrichment is not
/// configured.
pub struct OfflineEnrichment;

impl Enrichment for OfflineEnrichment {
    fn suggest(
        &self,
        _finding: &Finding,
        _doc: &ManifestDocument,
    ) -> Result<String, EnrichmentUnavailable> {
        Err(EnrichmentUnavailable::Disabled)
    }

    fn propose_fix(
        &self,
        _finding: &Finding,
        _doc: &ManifestDocument,
    ) -> Result<PatchProposal, EnrichmentUnavailable> {
        Err(EnrichmentUnavailable::Disabled)
    }
}

/// Explicit configuration for the network-backed client. No global model
/// state: callers construct this and inject it.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    /// Model identifier (default `llama-3.1-70b-versatile`).
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl From<&crate::config::EnrichmentSettings> for EnrichmentConfig {
    fn from(settings: &crate::config::EnrichmentSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key_env: settings.api_key_env.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

/// Network-backed enrichment against an OpenAI-compatible endpoint.
pub struct HttpEnrichment {
    config: EnrichmentConfig,
    client: reqwest::blocking::Client,
}

impl HttpEnrichment {
    /// Build a client with the configured timeout.
    pub fn new(config: EnrichmentConfig) -> Result<Self, EnrichmentUnavailable> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EnrichmentUnavailable::Http(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn complete(&self, prompt: &str) -> Result<String, EnrichmentUnavailable> {
        let api_key = std::env::var(&self.config.api_key_env)
            .map_err(|_| EnrichmentUnavailable::Disabled)?;

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    EnrichmentUnavailable::Timeout
                } else {
                    EnrichmentUnavailable::Http(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(EnrichmentUnavailable::Http(format!(
                "status {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| EnrichmentUnavailable::InvalidResponse(e.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                EnrichmentUnavailable::InvalidResponse("missing message content".to_string())
            })
    }
}

impl Enrichment for HttpEnrichment {
    fn suggest(
        &self,
        finding: &Finding,
        doc: &ManifestDocument,
    ) -> Result<String, EnrichmentUnavailable> {
        let prompt = format!(
            "You are reviewing a Kubernetes manifest of kind {kind}. The issue is: {message} \
             (at {location}). In two sentences, explain how to remediate it.",
            kind = doc.kind().unwrap_or("Unknown"),
            message = finding.message,
            location = finding.location,
        );
        self.complete(&prompt)
    }

    fn propose_fix(
        &self,
        finding: &Finding,
        doc: &ManifestDocument,
    ) -> Result<PatchProposal, EnrichmentUnavailable> {
        match finding.rule.as_str() {
            "latest-image-tag" => {
                let image = doc.get_str(&finding.location).unwrap_or_default();
                let prompt = format!(
                    "Suggest a pinned, production-ready version for the container image '{image}'. \
                     Answer with the full image reference only, no prose."
                );
                let answer = self.complete(&prompt)?;
                let reference = answer
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if reference.is_empty() {
                    return Err(EnrichmentUnavailable::InvalidResponse(
                        "empty image reference".to_string(),
                    ));
                }
                Ok(PatchProposal::Image(reference))
            }
            "rbac-wildcard" => {
                let entry = finding
                    .location
                    .parent()
                    .and_then(|p| doc.get(&p))
                    .and_then(|v| serde_yaml::to_string(v).ok())
                    .unwrap_or_default();
                let prompt = format!(
                    "This RBAC rule uses wildcards:\n{entry}\nPropose a narrowed replacement as a \
                     JSON object with keys apiGroups, resources, and verbs (arrays of strings, no \
                     wildcards). Answer with the JSON only."
                );
                let answer = self.complete(&prompt)?;
                parse_policy_rule(&answer)
            }
            other => {
                log::debug!("no patch proposal contract for rule '{}'", other);
                Err(EnrichmentUnavailable::Disabled)
            }
        }
    }
}

fn parse_policy_rule(answer: &str) -> Result<PatchProposal, EnrichmentUnavailable> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Proposal {
        api_groups: Vec<String>,
        resources: Vec<String>,
        verbs: Vec<String>,
    }

    let parsed: Proposal = serde_json::from_str(answer.trim())
        .map_err(|e| EnrichmentUnavailable::InvalidResponse(e.to_string()))?;
    Ok(PatchProposal::PolicyRule {
        api_groups: parsed.api_groups,
        resources: parsed.resources,
        verbs: parsed.verbs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::FieldPath;
    use crate::types::{DocumentRef, RuleId, Severity};

    fn dummy_finding() -> Finding {
        Finding {
            rule: RuleId::new("latest-image-tag"),
            severity: Severity::Low,
            message: "test".to_string(),
            location: FieldPath::parse("spec.containers[0].image"),
            document: DocumentRef {
                source: "test.yaml".into(),
                index: 0,
            },
        }
    }

    #[test]
    fn test_offline_enrichment_is_always_unavailable() {
        let docs =
            ManifestDocument::parse_str("kind: Pod\nmetadata:\n  name: p\n", "t.yaml").unwrap();
        let finding = dummy_finding();
        assert!(matches!(
            OfflineEnrichment.suggest(&finding, &docs[0]),
            Err(EnrichmentUnavailable::Disabled)
        ));
        assert!(matches!(
            OfflineEnrichment.propose_fix(&finding, &docs[0]),
            Err(EnrichmentUnavailable::Disabled)
        ));
    }

    #[test]
    fn test_parse_policy_rule() {
        let answer = r#"{"apiGroups": [""], "resources": ["pods"], "verbs": ["get", "list"]}"#;
        let proposal = parse_policy_rule(answer).unwrap();
        assert_eq!(
            proposal,
            PatchProposal::PolicyRule {
                api_groups: vec!["".to_string()],
                resources: vec!["pods".to_string()],
                verbs: vec!["get".to_string(), "list".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_policy_rule_rejects_prose() {
        assert!(matches!(
            parse_policy_rule("Sure! Here is the narrowed rule: ..."),
            Err(EnrichmentUnavailable::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = EnrichmentConfig::default();
        assert_eq!(config.model, "llama-3.1-70b-versatile");
        assert_eq!(config.timeout, Duration::from_secs(20));
    }
}
