// src/core/field_path.rs

//! Dotted/indexed addresses into a command model, e.g. `parameters.hosts[1].port`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

lazy_static! {
    // A key followed by any number of `[n]` indexes.
    static ref PATH_PART_RE: Regex = Regex::new(r"^([^.\[\]]+)((?:\[\d+\])*)$").unwrap();
    static ref INDEX_RE: Regex = Regex::new(r"\[(\d+)\]").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("Empty field path.")]
    Empty,
    #[error("Invalid field path segment '{0}'.")]
    InvalidSegment(String),
    #[error("Field path '{0}' does not exist in the model.")]
    Missing(String),
    #[error("Field path '{0}' does not address a list.")]
    NotAList(String),
}

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Address of a value inside a command model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The empty path (the model itself).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path extended by an object key.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    /// Path extended by a list index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// The leading key, which names the top-level model entry.
    pub fn head(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// Everything after the leading segment.
    pub fn tail(&self) -> &[PathSegment] {
        self.0.get(1..).unwrap_or(&[])
    }

    /// Parses `a.b[2].c` into segments.
    pub fn parse(raw: &str) -> Result<Self, FieldPathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FieldPathError::Empty);
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            let caps = PATH_PART_RE
                .captures(part)
                .ok_or_else(|| FieldPathError::InvalidSegment(part.to_string()))?;
            let key = caps.get(1).map_or("", |m| m.as_str());
            segments.push(PathSegment::Key(key.to_string()));

            if let Some(indexes) = caps.get(2) {
                for index_caps in INDEX_RE.captures_iter(indexes.as_str()) {
                    let index = index_caps
                        .get(1)
                        .and_then(|m| m.as_str().parse::<usize>().ok())
                        .ok_or_else(|| FieldPathError::InvalidSegment(part.to_string()))?;
                    segments.push(PathSegment::Index(index));
                }
            }
        }
        Ok(Self(segments))
    }
}

impl From<Vec<PathSegment>> for FieldPath {
    fn from(value: Vec<PathSegment>) -> Self {
        Self(value)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Reads the value at `segments` below `root`.
pub fn get_at<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |current, segment| match segment {
        PathSegment::Key(key) => current.get(key.as_str()),
        PathSegment::Index(index) => current.get(*index),
    })
}

/// Mutable access to the value at `segments` below `root`.
pub fn get_at_mut<'a>(root: &'a mut Value, segments: &[PathSegment]) -> Option<&'a mut Value> {
    segments.iter().try_fold(root, |current, segment| match segment {
        PathSegment::Key(key) => current.get_mut(key.as_str()),
        PathSegment::Index(index) => current.get_mut(*index),
    })
}

/// Replaces the value at `segments`. The last key may be new; every container on the way must exist.
pub fn set_at(root: &mut Value, segments: &[PathSegment], value: Value) -> Result<(), FieldPathError> {
    let display = || FieldPath::from(segments.to_vec()).to_string();
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };
    let parent = get_at_mut(root, parents).ok_or_else(|| FieldPathError::Missing(display()))?;
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            let slot = items
                .get_mut(*index)
                .ok_or_else(|| FieldPathError::Missing(display()))?;
            *slot = value;
            Ok(())
        }
        _ => Err(FieldPathError::Missing(display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_display_roundtrip_shape() {
        let path = FieldPath::parse("parameters.hosts[1].port").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("parameters".into()),
                PathSegment::Key("hosts".into()),
                PathSegment::Index(1),
                PathSegment::Key("port".into()),
            ]
        );
        assert_eq!(path.to_string(), "parameters.hosts[1].port");
        assert_eq!(path.head(), Some("parameters"));
        assert_eq!(path.tail().len(), 3);
    }

    #[test]
    fn test_nested_indexes() {
        let path = FieldPath::parse("parameters.matrix[0][3]").unwrap();
        assert_eq!(path.to_string(), "parameters.matrix[0][3]");
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert_eq!(FieldPath::parse("  "), Err(FieldPathError::Empty));
        assert!(FieldPath::parse("parameters..x").is_err());
        assert!(FieldPath::parse("parameters.x[a]").is_err());
    }

    #[test]
    fn test_builder_methods_match_parse() {
        let built = FieldPath::root().key("parameters").key("list").index(2);
        assert_eq!(built, FieldPath::parse("parameters.list[2]").unwrap());
    }

    #[test]
    fn test_get_and_set_values() {
        let mut doc = json!({"a": {"b": [1, 2, 3]}});
        let path = FieldPath::parse("a.b[1]").unwrap();
        assert_eq!(get_at(&doc, path.segments()), Some(&json!(2)));

        set_at(&mut doc, path.segments(), json!(20)).unwrap();
        assert_eq!(doc, json!({"a": {"b": [1, 20, 3]}}));

        let new_key = FieldPath::parse("a.c").unwrap();
        set_at(&mut doc, new_key.segments(), json!("x")).unwrap();
        assert_eq!(doc["a"]["c"], json!("x"));

        let missing = FieldPath::parse("a.b[9]").unwrap();
        assert!(matches!(
            set_at(&mut doc, missing.segments(), json!(0)),
            Err(FieldPathError::Missing(_))
        ));
    }
}
