//! Targeted structural edits addressed by the same path vocabulary as
//! finding locations.

use crate::manifest::{FieldPath, ManifestDocument};
use serde_yaml::Value;

/// One structural edit to a document.
#[derive(Debug, Clone, PartialEq)]
pub enum FixPatch {
    /// Set the value at a path, creating intermediate mappings.
    Set { path: FieldPath, value: Value },
    /// Recursively insert mapping entries that are absent at a path.
    /// Existing values are never overwritten.
    Merge { path: FieldPath, value: Value },
    /// Remove the mapping key at a path.
    Remove { path: FieldPath },
}

/// Apply a patch to a document.
pub fn apply(doc: &mut ManifestDocument, patch: &FixPatch) -> Result<(), String> {
    match patch {
        FixPatch::Set { path, value } => doc.set(path, value.clone()),
        FixPatch::Merge { path, value } => {
            let merged = match doc.get(path) {
                Some(existing) => {
                    let mut out = existing.clone();
                    merge_into(&mut out, value);
                    out
                }
                None => value.clone(),
            };
            doc.set(path, merged)
        }
        FixPatch::Remove { path } => doc.remove(path),
    }
}

/// Recursively insert entries from `incoming` that are absent in `target`.
/// Matching keys that are both mappings merge deeper; any other existing
/// value wins over the incoming one.
fn merge_into(target: &mut Value, incoming: &Value) {
    let Some(incoming_map) = incoming.as_mapping() else {
        return;
    };
    let Some(target_map) = target.as_mapping_mut() else {
        return;
    };

    for (key, value) in incoming_map {
        match target_map.get_mut(key) {
            Some(existing) => {
                if existing.is_mapping() && value.is_mapping() {
                    merge_into(existing, value);
                }
            }
            None => {
                target_map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(yaml: &str) -> ManifestDocument {
        let mut docs = ManifestDocument::parse_str(yaml, "test.yaml").unwrap();
        docs.remove(0)
    }

    fn resources_defaults() -> Value {
        serde_yaml::from_str(
            "requests:\n  cpu: 100m\n  memory: 128Mi\nlimits:\n  cpu: 500m\n  memory: 256Mi\n",
        )
        .unwrap()
    }

    #[test]
    fn test_merge_into_empty_resources() {
        let mut doc = parse_one(
            "kind: Pod\nmetadata:\n  name: p\nspec:\n  containers:\n  - name: a\n    image: a:1\n    resources: {}\n",
        );
        let path = FieldPath::parse("spec.containers[0].resources");
        apply(
            &mut doc,
            &FixPatch::Merge {
                path: path.clone(),
                value: resources_defaults(),
            },
        )
        .unwrap();

        assert_eq!(
            doc.get_str(&path.clone().key("requests").key("cpu")),
            Some("100m")
        );
        assert_eq!(
            doc.get_str(&path.key("limits").key("memory")),
            Some("256Mi")
        );
    }

    #[test]
    fn test_merge_never_overwrites_existing_values() {
        let mut doc = parse_one(
            r#"
kind: Pod
metadata:
  name: p
spec:
  containers:
  - name: a
    image: a:1
    resources:
      requests:
        cpu: 250m
"#,
        );
        let path = FieldPath::parse("spec.containers[0].resources");
        apply(
            &mut doc,
            &FixPatch::Merge {
                path: path.clone(),
                value: resources_defaults(),
            },
        )
        .unwrap();

        // Existing partial value preserved, missing siblings filled in.
        assert_eq!(
            doc.get_str(&path.clone().key("requests").key("cpu")),
            Some("250m")
        );
        assert_eq!(
            doc.get_str(&path.key("requests").key("memory")),
            Some("128Mi")
        );
    }

    #[test]
    fn test_set_and_remove() {
        let mut doc = parse_one("kind: Service\nmetadata:\n  name: s\nspec:\n  type: NodePort\n");
        apply(
            &mut doc,
            &FixPatch::Set {
                path: FieldPath::parse("spec.type"),
                value: Value::String("ClusterIP".to_string()),
            },
        )
        .unwrap();
        assert_eq!(doc.get_str(&FieldPath::parse("spec.type")), Some("ClusterIP"));

        apply(
            &mut doc,
            &FixPatch::Remove {
                path: FieldPath::parse("spec.type"),
            },
        )
        .unwrap();
        assert!(doc.get(&FieldPath::parse("spec.type")).is_none());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut doc = parse_one(
            "kind: Pod\nmetadata:\n  name: p\nspec:\n  containers:\n  - name: a\n    image: a:1\n",
        );
        let patch = FixPatch::Merge {
            path: FieldPath::parse("spec.containers[0].resources"),
            value: resources_defaults(),
        };
        apply(&mut doc, &patch).unwrap();
        let once = doc.clone();
        apply(&mut doc, &patch).unwrap();
        assert!(doc.same_structure(&once));
    }
}
