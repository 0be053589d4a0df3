//! The rule catalogue.
//!
//! Each rule is a small pure function over a [`ManifestDocument`],
//! registered in an ordered table keyed by the kinds it applies to. Rules
//! are stateless and independent: a rule's findings never depend on another
//! rule's output, and report order is rule-definition order followed by
//! traversal order within a rule.

pub mod checks;

use crate::manifest::{FieldPath, ManifestDocument};
use crate::types::Diagnostic;

/// Workload kinds that carry a pod spec.
pub const WORKLOAD_KINDS: &[&str] = &[
    "Deployment",
    "StatefulSet",
    "DaemonSet",
    "ReplicaSet",
    "Pod",
    "Job",
    "CronJob",
];

/// Kinds that exist outside any namespace.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "ClusterRole",
    "ClusterRoleBinding",
    "Namespace",
    "PersistentVolume",
    "CustomResourceDefinition",
    "StorageClass",
];

/// Which manifest kinds a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindClass {
    /// Kinds with a pod spec (see [`WORKLOAD_KINDS`]).
    Workload,
    /// Service manifests only.
    Service,
    /// Role and ClusterRole manifests.
    Rbac,
    /// Any namespaced kind, including unknown kinds. This is the
    /// kind-agnostic class: it is the only one matched when a document has
    /// no recognizable `kind`.
    Namespaced,
}

impl KindClass {
    /// Whether a document of the given kind falls under this class.
    /// `None` means the kind is absent or unknown.
    pub fn matches(&self, kind: Option<&str>) -> bool {
        match self {
            Self::Workload => kind.is_some_and(|k| WORKLOAD_KINDS.contains(&k)),
            Self::Service => kind == Some("Service"),
            Self::Rbac => matches!(kind, Some("Role") | Some("ClusterRole")),
            Self::Namespaced => match kind {
                Some(k) => !CLUSTER_SCOPED_KINDS.contains(&k),
                None => true,
            },
        }
    }
}

/// One entry of the rule catalogue.
pub struct RuleSpec {
    /// Stable identifier (e.g. "privileged-container").
    pub id: &'static str,
    /// What the rule detects.
    pub description: &'static str,
    /// How to remediate a violation by hand.
    pub remediation: &'static str,
    /// Which kinds the rule applies to.
    pub applies_to: KindClass,
    /// The check itself. Must tolerate absent optional fields: absence is
    /// diagnostic input, not an error condition.
    pub check: fn(&ManifestDocument) -> Vec<Diagnostic>,
}

/// The ordered rule catalogue. Order here is report order.
pub fn catalogue() -> &'static [RuleSpec] {
    CATALOGUE
}

static CATALOGUE: &[RuleSpec] = &[
    RuleSpec {
        id: "missing-resource-limits",
        description: "Indicates when containers lack CPU or memory requests/limits.",
        remediation: "Set resources.requests and resources.limits for cpu and memory.",
        applies_to: KindClass::Workload,
        check: checks::check_resource_limits,
    },
    RuleSpec {
        id: "privileged-container",
        description: "Indicates when containers run in privileged mode.",
        remediation: "Set securityContext.privileged to false unless it is required.",
        applies_to: KindClass::Workload,
        check: checks::check_privileged,
    },
    RuleSpec {
        id: "run-as-root",
        description: "Indicates when containers may run as the root user.",
        remediation: "Set securityContext.runAsNonRoot to true and runAsUser to a non-zero uid.",
        applies_to: KindClass::Workload,
        check: checks::check_run_as_root,
    },
    RuleSpec {
        id: "latest-image-tag",
        description: "Indicates when container images are untagged or use the 'latest' tag.",
        remediation: "Pin images to a specific tag or digest for reproducible deployments.",
        applies_to: KindClass::Workload,
        check: checks::check_latest_image_tag,
    },
    RuleSpec {
        id: "exposed-service-type",
        description: "Indicates when Services are exposed via LoadBalancer or NodePort.",
        remediation: "Use ClusterIP and route external traffic through an ingress.",
        applies_to: KindClass::Service,
        check: checks::check_service_type,
    },
    RuleSpec {
        id: "rbac-wildcard",
        description: "Indicates when RBAC rules grant wildcard access.",
        remediation: "List the required apiGroups, resources, and verbs explicitly.",
        applies_to: KindClass::Rbac,
        check: checks::check_rbac_wildcard,
    },
    RuleSpec {
        id: "missing-namespace",
        description: "Indicates when namespaced manifests do not declare a namespace.",
        remediation: "Set metadata.namespace explicitly to avoid accidental default placement.",
        applies_to: KindClass::Namespaced,
        check: checks::check_missing_namespace,
    },
];

/// Where a kind keeps its pod spec, if it has one.
pub fn pod_spec_path(kind: &str) -> Option<&'static str> {
    match kind {
        "Pod" => Some("spec"),
        "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "Job" => {
            Some("spec.template.spec")
        }
        "CronJob" => Some("spec.jobTemplate.spec.template.spec"),
        _ => None,
    }
}

/// All containers of a workload document: regular containers first, then
/// init containers, each with its concrete path.
pub fn containers<'a>(
    doc: &'a ManifestDocument,
) -> Vec<(FieldPath, &'a serde_yaml::Value)> {
    let Some(base) = doc.kind().and_then(pod_spec_path) else {
        return Vec::new();
    };
    let base = FieldPath::parse(base);
    let mut out = doc.entries(&base.clone().key("containers").wildcard());
    out.extend(doc.entries(&base.key("initContainers").wildcard()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_class_matching() {
        assert!(KindClass::Workload.matches(Some("Deployment")));
        assert!(KindClass::Workload.matches(Some("CronJob")));
        assert!(!KindClass::Workload.matches(Some("Service")));
        assert!(!KindClass::Workload.matches(None));

        assert!(KindClass::Rbac.matches(Some("Role")));
        assert!(KindClass::Rbac.matches(Some("ClusterRole")));
        assert!(!KindClass::Rbac.matches(Some("RoleBinding")));

        assert!(KindClass::Namespaced.matches(Some("Deployment")));
        assert!(KindClass::Namespaced.matches(Some("SomeCustomKind")));
        assert!(KindClass::Namespaced.matches(None));
        assert!(!KindClass::Namespaced.matches(Some("ClusterRole")));
    }

    #[test]
    fn test_catalogue_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for rule in catalogue() {
            assert!(seen.insert(rule.id), "duplicate rule id '{}'", rule.id);
        }
    }

    #[test]
    fn test_pod_spec_paths() {
        assert_eq!(pod_spec_path("Pod"), Some("spec"));
        assert_eq!(pod_spec_path("Deployment"), Some("spec.template.spec"));
        assert_eq!(
            pod_spec_path("CronJob"),
            Some("spec.jobTemplate.spec.template.spec")
        );
        assert_eq!(pod_spec_path("Service"), None);
    }

    #[test]
    fn test_containers_includes_init_containers() {
        let yaml = r#"
kind: Pod
metadata:
  name: p
spec:
  initContainers:
  - name: setup
    image: busybox:1.36
  containers:
  - name: app
    image: app:1.0
"#;
        let docs = ManifestDocument::parse_str(yaml, "p.yaml").unwrap();
        let found = containers(&docs[0]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0.to_string(), "spec.containers[0]");
        assert_eq!(found[1].0.to_string(), "spec.initContainers[0]");
    }
}
