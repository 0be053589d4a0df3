//! The normalized in-memory representation of one parsed manifest.
//!
//! A document is a recursive tagged value tree (mapping / sequence / scalar)
//! addressed through [`FieldPath`]s. Rules read it, the fixer clones and
//! patches it; the parsed original is never mutated in place.

use crate::error::ParseError;
use crate::manifest::path::{FieldPath, Segment};
use crate::types::DocumentRef;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// One parsed manifest document.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    source_path: PathBuf,
    index: usize,
    root: Value,
}

impl ManifestDocument {
    /// Parse a source string into zero or more documents.
    ///
    /// Multi-document sources are split on the YAML document separator;
    /// each document becomes an independent `ManifestDocument`. Empty and
    /// comment-only documents are skipped. A document whose top level is
    /// not a mapping fails the whole source with
    /// [`ParseError::MalformedStructure`].
    pub fn parse_str(
        content: &str,
        source: impl Into<PathBuf>,
    ) -> Result<Vec<ManifestDocument>, ParseError> {
        let source = source.into();
        let mut documents = Vec::new();

        for raw in split_documents(content) {
            let value: Value =
                serde_yaml::from_str(raw).map_err(|e| ParseError::Syntax(e.to_string()))?;
            match value {
                Value::Null => continue,
                Value::Mapping(_) => {
                    documents.push(ManifestDocument {
                        source_path: source.clone(),
                        index: documents.len(),
                        root: value,
                    });
                }
                other => {
                    return Err(ParseError::MalformedStructure(format!(
                        "document {} has {} at the top level, expected a mapping",
                        documents.len(),
                        value_kind(&other)
                    )));
                }
            }
        }

        Ok(documents)
    }

    /// Parse a file into zero or more documents.
    pub fn parse_file(path: &Path) -> Result<Vec<ManifestDocument>, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParseError::Io(e.to_string()))?;
        Self::parse_str(&content, path)
    }

    /// Serialize the document back to YAML.
    pub fn to_yaml(&self) -> Result<String, ParseError> {
        serde_yaml::to_string(&self.root).map_err(|e| ParseError::Syntax(e.to_string()))
    }

    /// The file the document was parsed from.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Zero-based position of the document within its source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// A reference identifying this document in findings and reports.
    pub fn document_ref(&self) -> DocumentRef {
        DocumentRef {
            source: self.source_path.clone(),
            index: self.index,
        }
    }

    /// The manifest `kind`, if present. Absent kind means the document is
    /// treated as unknown and only kind-agnostic rules apply.
    pub fn kind(&self) -> Option<&str> {
        self.root.get("kind").and_then(Value::as_str)
    }

    /// The `metadata.name`, if present.
    pub fn name(&self) -> Option<&str> {
        self.root
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
    }

    /// The `metadata.namespace`, if present.
    pub fn namespace(&self) -> Option<&str> {
        self.root
            .get("metadata")
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
    }

    /// The root value tree.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Whether two documents carry the same value tree, ignoring where
    /// they were parsed from.
    pub fn same_structure(&self, other: &ManifestDocument) -> bool {
        self.root == other.root
    }

    /// Navigate to a value. Absent segments yield `None`, never an error.
    /// Wildcard paths are not addressable here; use [`Self::entries`].
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = match segment {
                Segment::Key(k) => current.get(k.as_str())?,
                Segment::Index(n) => current.as_sequence()?.get(*n)?,
                Segment::Wildcard => return None,
            };
        }
        Some(current)
    }

    /// Navigate to a string value.
    pub fn get_str(&self, path: &FieldPath) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Navigate to a boolean value.
    pub fn get_bool(&self, path: &FieldPath) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    /// Navigate to an integer value.
    pub fn get_i64(&self, path: &FieldPath) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Resolve a path, expanding wildcards over sequences.
    ///
    /// Returns the concrete path and value of every match, in traversal
    /// order. This is the uniform iteration contract shared by rules and
    /// fixes: `spec.containers[*]` yields one entry per container.
    pub fn entries<'a>(&'a self, path: &FieldPath) -> Vec<(FieldPath, &'a Value)> {
        let mut out = Vec::new();
        collect_entries(&self.root, path.segments(), FieldPath::root(), &mut out);
        out
    }

    /// Set the value at a path, creating intermediate mappings as needed.
    ///
    /// Sequence indices must already exist; wildcard paths are rejected.
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), String> {
        let segments = path.segments();
        if segments.is_empty() {
            return Err("cannot set the document root".to_string());
        }

        let mut current = &mut self.root;
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            match segment {
                Segment::Key(k) => {
                    let map = current
                        .as_mapping_mut()
                        .ok_or_else(|| format!("'{}' is not a mapping", partial(path, i)))?;
                    let key = Value::String(k.clone());
                    if last {
                        map.insert(key, value);
                        return Ok(());
                    }
                    if !map.contains_key(&key) {
                        map.insert(key.clone(), Value::Mapping(Mapping::new()));
                    }
                    current = map
                        .get_mut(&key)
                        .ok_or_else(|| format!("'{}' vanished during traversal", partial(path, i)))?;
                }
                Segment::Index(n) => {
                    let seq = current
                        .as_sequence_mut()
                        .ok_or_else(|| format!("'{}' is not a sequence", partial(path, i)))?;
                    if *n >= seq.len() {
                        return Err(format!(
                            "index {} out of bounds at '{}'",
                            n,
                            partial(path, i)
                        ));
                    }
                    if last {
                        seq[*n] = value;
                        return Ok(());
                    }
                    current = &mut seq[*n];
                }
                Segment::Wildcard => {
                    return Err("wildcard paths cannot be set".to_string());
                }
            }
        }
        Ok(())
    }

    /// Remove the mapping key a path points at. Absent paths are a no-op.
    pub fn remove(&mut self, path: &FieldPath) -> Result<(), String> {
        let Some(Segment::Key(k)) = path.segments().last() else {
            return Err(format!("'{}' does not end in a mapping key", path));
        };
        let parent = path
            .parent()
            .ok_or_else(|| "cannot remove the document root".to_string())?;
        if let Some(value) = self.get_mut(&parent) {
            if let Some(map) = value.as_mapping_mut() {
                map.remove(&Value::String(k.clone()));
            }
        }
        Ok(())
    }

    fn get_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            current = match segment {
                Segment::Key(k) => current.get_mut(k.as_str())?,
                Segment::Index(n) => current.as_sequence_mut()?.get_mut(*n)?,
                Segment::Wildcard => return None,
            };
        }
        Some(current)
    }
}

fn collect_entries<'a>(
    value: &'a Value,
    rest: &[Segment],
    prefix: FieldPath,
    out: &mut Vec<(FieldPath, &'a Value)>,
) {
    let Some((head, tail)) = rest.split_first() else {
        out.push((prefix, value));
        return;
    };
    match head {
        Segment::Key(k) => {
            if let Some(child) = value.get(k.as_str()) {
                collect_entries(child, tail, prefix.key(k.clone()), out);
            }
        }
        Segment::Index(n) => {
            if let Some(child) = value.as_sequence().and_then(|s| s.get(*n)) {
                collect_entries(child, tail, prefix.index(*n), out);
            }
        }
        Segment::Wildcard => {
            if let Some(seq) = value.as_sequence() {
                for (i, child) in seq.iter().enumerate() {
                    collect_entries(child, tail, prefix.clone().index(i), out);
                }
            }
        }
    }
}

fn split_documents(content: &str) -> Vec<&str> {
    content
        .split("\n---")
        .map(str::trim)
        .filter(|doc| !doc.is_empty() && *doc != "---")
        .collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "a null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn partial(path: &FieldPath, upto: usize) -> FieldPath {
    let mut out = FieldPath::root();
    for segment in path.segments().iter().take(upto + 1) {
        out = match segment {
            Segment::Key(k) => out.key(k.clone()),
            Segment::Index(n) => out.index(*n),
            Segment::Wildcard => out.wildcard(),
        };
    }
    out
}
