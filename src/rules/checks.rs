//! The built-in check functions.
//!
//! Every check fires once per offending instance (container, RBAC rule
//! entry, ...) and never raises on absent optional fields.

use crate::manifest::{FieldPath, ManifestDocument};
use crate::rules::{containers, pod_spec_path};
use crate::types::Diagnostic;
use serde_yaml::Value;

fn container_name(container: &Value) -> &str {
    container
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
}

/// Containers missing any of the four resource requirement values.
pub fn check_resource_limits(doc: &ManifestDocument) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (path, container) in containers(doc) {
        let resources = container.get("resources");
        let has = |section: &str, key: &str| {
            resources
                .and_then(|r| r.get(section))
                .and_then(|s| s.get(key))
                .is_some()
        };

        let mut missing = Vec::new();
        for (section, key) in [
            ("requests", "cpu"),
            ("requests", "memory"),
            ("limits", "cpu"),
            ("limits", "memory"),
        ] {
            if !has(section, key) {
                missing.push(format!("{}.{}", section, key));
            }
        }

        if !missing.is_empty() {
            diagnostics.push(Diagnostic::new(
                format!(
                    "Container '{}' is missing resource requirements: {}",
                    container_name(container),
                    missing.join(", ")
                ),
                path.key("resources"),
            ));
        }
    }

    diagnostics
}

/// Containers with `securityContext.privileged: true`.
pub fn check_privileged(doc: &ManifestDocument) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (path, container) in containers(doc) {
        let privileged = container
            .get("securityContext")
            .and_then(|sc| sc.get("privileged"))
            .and_then(Value::as_bool);

        if privileged == Some(true) {
            diagnostics.push(Diagnostic::new(
                format!(
                    "Container '{}' is running in privileged mode",
                    container_name(container)
                ),
                path.key("securityContext").key("privileged"),
            ));
        }
    }

    diagnostics
}

/// Containers that may run as root: effective runAsUser is 0, or root is
/// implied because neither runAsNonRoot nor runAsUser pins a non-root
/// identity. Container-level securityContext overrides pod-level.
pub fn check_run_as_root(doc: &ManifestDocument) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let pod_sc = doc
        .kind()
        .and_then(pod_spec_path)
        .map(|base| FieldPath::parse(base).key("securityContext"));
    let pod_non_root = pod_sc
        .as_ref()
        .and_then(|p| doc.get_bool(&p.clone().key("runAsNonRoot")));
    let pod_user = pod_sc
        .as_ref()
        .and_then(|p| doc.get_i64(&p.clone().key("runAsUser")));

    for (path, container) in containers(doc) {
        let sc = container.get("securityContext");
        let non_root = sc
            .and_then(|v| v.get("runAsNonRoot"))
            .and_then(Value::as_bool)
            .or(pod_non_root);
        let user = sc
            .and_then(|v| v.get("runAsUser"))
            .and_then(Value::as_i64)
            .or(pod_user);

        let message = if user == Some(0) {
            Some(format!(
                "Container '{}' runs as uid 0",
                container_name(container)
            ))
        } else if user.is_none() && non_root != Some(true) {
            Some(format!(
                "Container '{}' is not configured to run as non-root",
                container_name(container)
            ))
        } else {
            None
        };

        if let Some(message) = message {
            diagnostics.push(Diagnostic::new(message, path.key("securityContext")));
        }
    }

    diagnostics
}

/// Container images that are untagged or pinned to `latest`.
pub fn check_latest_image_tag(doc: &ManifestDocument) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (path, container) in containers(doc) {
        if let Some(image) = container.get("image").and_then(Value::as_str) {
            let unpinned =
                image.ends_with(":latest") || (!image.contains(':') && !image.contains('@'));

            if unpinned {
                diagnostics.push(Diagnostic::new(
                    format!(
                        "Container '{}' uses image '{}' with the latest tag or no tag",
                        container_name(container),
                        image
                    ),
                    path.key("image"),
                ));
            }
        }
    }

    diagnostics
}

/// Services exposed via LoadBalancer or NodePort.
pub fn check_service_type(doc: &ManifestDocument) -> Vec<Diagnostic> {
    let path = FieldPath::parse("spec.type");
    match doc.get_str(&path) {
        Some(t @ ("LoadBalancer" | "NodePort")) => vec![Diagnostic::new(
            format!("Service is externally exposed via type '{}'", t),
            path,
        )],
        _ => Vec::new(),
    }
}

/// RBAC rule entries with a wildcard in apiGroups, resources, or verbs.
/// Fires once per wildcard field group per rule entry.
pub fn check_rbac_wildcard(doc: &ManifestDocument) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (path, rule) in doc.entries(&FieldPath::parse("rules[*]")) {
        for field in ["apiGroups", "resources", "verbs"] {
            let has_wildcard = rule
                .get(field)
                .and_then(Value::as_sequence)
                .is_some_and(|seq| seq.iter().any(|v| v.as_str() == Some("*")));

            if has_wildcard {
                diagnostics.push(Diagnostic::new(
                    format!("RBAC rule uses wildcard (*) in {}", field),
                    path.clone().key(field),
                ));
            }
        }
    }

    diagnostics
}

/// Namespaced manifests without an explicit `metadata.namespace`.
pub fn check_missing_namespace(doc: &ManifestDocument) -> Vec<Diagnostic> {
    if doc.namespace().is_some() {
        return Vec::new();
    }
    let subject = doc.name().unwrap_or("<unnamed>");
    vec![Diagnostic::new(
        format!("Manifest '{}' does not declare a namespace", subject),
        FieldPath::parse("metadata.namespace"),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(yaml: &str) -> ManifestDocument {
        let mut docs = ManifestDocument::parse_str(yaml, "test.yaml").unwrap();
        assert_eq!(docs.len(), 1);
        docs.remove(0)
    }

    #[test]
    fn test_resource_limits_fires_per_container() {
        let doc = parse_one(
            r#"
kind: Deployment
metadata:
  name: d
spec:
  template:
    spec:
      containers:
      - name: a
        image: a:1
      - name: b
        image: b:1
      - name: c
        image: c:1
"#,
        );
        let diagnostics = check_resource_limits(&doc);
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics[0].message.contains("'a'"));
        assert_eq!(
            diagnostics[2].location.to_string(),
            "spec.template.spec.containers[2].resources"
        );
    }

    #[test]
    fn test_resource_limits_reports_partial_values() {
        let doc = parse_one(
            r#"
kind: Pod
metadata:
  name: p
spec:
  containers:
  - name: app
    image: app:1
    resources:
      requests:
        cpu: 100m
"#,
        );
        let diagnostics = check_resource_limits(&doc);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("requests.memory"));
        assert!(diagnostics[0].message.contains("limits.cpu"));
        assert!(!diagnostics[0].message.contains("requests.cpu,"));
    }

    #[test]
    fn test_resource_limits_satisfied() {
        let doc = parse_one(
            r#"
kind: Pod
metadata:
  name: p
spec:
  containers:
  - name: app
    image: app:1
    resources:
      requests:
        cpu: 100m
        memory: 128Mi
      limits:
        cpu: 500m
        memory: 256Mi
"#,
        );
        assert!(check_resource_limits(&doc).is_empty());
    }

    #[test]
    fn test_privileged_detected() {
        let doc = parse_one(
            r#"
kind: Pod
metadata:
  name: p
spec:
  containers:
  - name: bad
    image: bad:1
    securityContext:
      privileged: true
"#,
        );
        let diagnostics = check_privileged(&doc);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].location.to_string(),
            "spec.containers[0].securityContext.privileged"
        );
    }

    #[test]
    fn test_privileged_false_or_absent_ok() {
        let doc = parse_one(
            r#"
kind: Pod
metadata:
  name: p
spec:
  containers:
  - name: a
    image: a:1
    securityContext:
      privileged: false
  - name: b
    image: b:1
"#,
        );
        assert!(check_privileged(&doc).is_empty());
    }

    #[test]
    fn test_run_as_root_variants() {
        // uid 0 fires even with runAsNonRoot unset
        let doc = parse_one(
            r#"
kind: Pod
metadata:
  name: p
spec:
  containers:
  - name: root
    image: r:1
    securityContext:
      runAsUser: 0
"#,
        );
        let diagnostics = check_run_as_root(&doc);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("uid 0"));

        // nothing configured anywhere implies root
        let doc = parse_one(
            "kind: Pod\nmetadata:\n  name: p\nspec:\n  containers:\n  - name: a\n    image: a:1\n",
        );
        assert_eq!(check_run_as_root(&doc).len(), 1);

        // a non-zero uid pins a non-root identity
        let doc = parse_one(
            r#"
kind: Pod
metadata:
  name: p
spec:
  containers:
  - name: a
    image: a:1
    securityContext:
      runAsUser: 1000
"#,
        );
        assert!(check_run_as_root(&doc).is_empty());
    }

    #[test]
    fn test_run_as_root_pod_level_inherited() {
        let doc = parse_one(
            r#"
kind: Deployment
metadata:
  name: d
spec:
  template:
    spec:
      securityContext:
        runAsNonRoot: true
      containers:
      - name: a
        image: a:1
"#,
        );
        assert!(check_run_as_root(&doc).is_empty());
    }

    #[test]
    fn test_latest_tag_variants() {
        let doc = parse_one(
            r#"
kind: Pod
metadata:
  name: p
spec:
  containers:
  - name: a
    image: nginx:latest
  - name: b
    image: nginx
  - name: c
    image: nginx:1.21.0
  - name: d
    image: nginx@sha256:abc123
"#,
        );
        let diagnostics = check_latest_image_tag(&doc);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].message.contains("'a'"));
        assert!(diagnostics[1].message.contains("'b'"));
    }

    #[test]
    fn test_service_type() {
        let doc = parse_one("kind: Service\nmetadata:\n  name: s\nspec:\n  type: NodePort\n");
        let diagnostics = check_service_type(&doc);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("NodePort"));

        let doc = parse_one("kind: Service\nmetadata:\n  name: s\nspec:\n  type: ClusterIP\n");
        assert!(check_service_type(&doc).is_empty());

        // type absent defaults to ClusterIP; absence is not an error
        let doc = parse_one("kind: Service\nmetadata:\n  name: s\nspec: {}\n");
        assert!(check_service_type(&doc).is_empty());
    }

    #[test]
    fn test_rbac_wildcard_one_finding_per_field_group() {
        let doc = parse_one(
            r#"
kind: ClusterRole
metadata:
  name: too-broad
rules:
- apiGroups: ["*"]
  resources: ["*"]
  verbs: ["*"]
"#,
        );
        let diagnostics = check_rbac_wildcard(&doc);
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].location.to_string(), "rules[0].apiGroups");
        assert_eq!(diagnostics[1].location.to_string(), "rules[0].resources");
        assert_eq!(diagnostics[2].location.to_string(), "rules[0].verbs");
    }

    #[test]
    fn test_rbac_explicit_rules_ok() {
        let doc = parse_one(
            r#"
kind: Role
metadata:
  name: narrow
  namespace: app
rules:
- apiGroups: [""]
  resources: ["pods"]
  verbs: ["get", "list"]
"#,
        );
        assert!(check_rbac_wildcard(&doc).is_empty());
    }

    #[test]
    fn test_missing_namespace() {
        let doc = parse_one("kind: Pod\nmetadata:\n  name: p\nspec: {}\n");
        assert_eq!(check_missing_namespace(&doc).len(), 1);

        let doc = parse_one("kind: Pod\nmetadata:\n  name: p\n  namespace: prod\nspec: {}\n");
        assert!(check_missing_namespace(&doc).is_empty());
    }
}
