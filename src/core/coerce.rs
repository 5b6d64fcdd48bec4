// src/core/coerce.rs

//! Text → typed value conversion for edits typed by a user.
//!
//! Coercion never fails: text that cannot be read as the parameter's type is
//! kept as a JSON string so that the validator reports a `type` violation on it.

use crate::{
    core::field_path::PathSegment,
    models::{ParameterDescriptor, ParameterKind},
};
use serde_json::{Number, Value};

/// The descriptor a field path points at.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub descriptor: &'a ParameterDescriptor,
    /// True when the path addresses one element of a multi parameter.
    pub element: bool,
}

/// Walks `segments` (relative to `parameters`) down the descriptor tree.
pub fn resolve_descriptor<'a>(
    parameters: &'a [ParameterDescriptor],
    segments: &[PathSegment],
) -> Option<Target<'a>> {
    let mut siblings = parameters;
    let mut target: Option<Target<'a>> = None;

    for segment in segments {
        match segment {
            PathSegment::Key(name) => {
                if let Some(current) = target {
                    // Stepping into a dictionary: a multi dictionary needs an index first.
                    if current.descriptor.multi && !current.element {
                        return None;
                    }
                    siblings = current.descriptor.children();
                }
                let descriptor = siblings.iter().find(|d| &d.name == name)?;
                target = Some(Target {
                    descriptor,
                    element: false,
                });
            }
            PathSegment::Index(_) => {
                let current = target?;
                if !current.descriptor.multi || current.element {
                    return None;
                }
                target = Some(Target {
                    element: true,
                    ..current
                });
            }
        }
    }
    target
}

/// Reads `text` as a value for `target`.
pub fn coerce_text(target: Target<'_>, text: &str) -> Value {
    if target.descriptor.multi && !target.element {
        return coerce_list(target.descriptor, text);
    }
    coerce_scalar(&target.descriptor.kind, text)
}

/// A list is either a JSON array or comma-separated items.
fn coerce_list(descriptor: &ParameterDescriptor, text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Array(Vec::new());
    }
    if trimmed.starts_with('[')
        && let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed)
    {
        return Value::Array(items);
    }
    Value::Array(
        trimmed
            .split(',')
            .map(|item| coerce_scalar(&descriptor.kind, item.trim()))
            .collect(),
    )
}

fn coerce_scalar(kind: &ParameterKind, text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() && !matches!(kind, ParameterKind::String) {
        return Value::Null;
    }
    let raw = || Value::String(text.to_string());

    match kind {
        ParameterKind::String => raw(),
        ParameterKind::Integer | ParameterKind::Date => trimmed
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| raw()),
        ParameterKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(raw),
        ParameterKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Value::Bool(true),
            "false" | "no" | "n" | "0" | "off" => Value::Bool(false),
            _ => raw(),
        },
        ParameterKind::Any => serde_json::from_str(trimmed).unwrap_or_else(|_| raw()),
        ParameterKind::Dictionary(_) => match serde_json::from_str::<Value>(trimmed) {
            Ok(object @ Value::Object(_)) => object,
            _ => raw(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field_path::FieldPath;
    use serde_json::json;

    fn params() -> Vec<ParameterDescriptor> {
        serde_json::from_value(json!([
            {"name": "count", "type": "Integer"},
            {"name": "ratio", "type": "Float"},
            {"name": "flag", "type": "Boolean"},
            {"name": "note", "type": "String"},
            {"name": "ports", "type": "Integer", "multi": true},
            {"name": "targets", "type": "Dictionary", "multi": true, "parameters": [
                {"name": "host", "type": "String"}
            ]},
            {"name": "extra", "type": "Any", "optional": true}
        ]))
        .unwrap()
    }

    fn target<'a>(p: &'a [ParameterDescriptor], raw: &str) -> Option<Target<'a>> {
        resolve_descriptor(p, FieldPath::parse(raw).unwrap().segments())
    }

    #[test]
    fn test_resolve_descriptor() {
        let p = params();
        let host = target(&p, "targets[0].host").unwrap();
        assert_eq!(host.descriptor.name, "host");
        assert!(!host.element);

        let port = target(&p, "ports[3]").unwrap();
        assert!(port.element);

        assert!(target(&p, "targets.host").is_none());
        assert!(target(&p, "count[0]").is_none());
        assert!(target(&p, "missing").is_none());
    }

    #[test]
    fn test_scalar_coercion() {
        let p = params();
        assert_eq!(coerce_text(target(&p, "count").unwrap(), " 42 "), json!(42));
        assert_eq!(coerce_text(target(&p, "count").unwrap(), "4x"), json!("4x"));
        assert_eq!(coerce_text(target(&p, "count").unwrap(), ""), Value::Null);
        assert_eq!(coerce_text(target(&p, "ratio").unwrap(), "0.5"), json!(0.5));
        assert_eq!(coerce_text(target(&p, "flag").unwrap(), "Yes"), json!(true));
        assert_eq!(coerce_text(target(&p, "note").unwrap(), ""), json!(""));
        assert_eq!(
            coerce_text(target(&p, "extra").unwrap(), r#"{"a": 1}"#),
            json!({"a": 1})
        );
        assert_eq!(coerce_text(target(&p, "extra").unwrap(), "plain"), json!("plain"));
    }

    #[test]
    fn test_list_coercion() {
        let p = params();
        let ports = target(&p, "ports").unwrap();
        assert_eq!(coerce_text(ports, "22, 80,x"), json!([22, 80, "x"]));
        assert_eq!(coerce_text(ports, "[1, 2]"), json!([1, 2]));
        assert_eq!(coerce_text(ports, "  "), json!([]));
        assert_eq!(coerce_text(target(&p, "ports[0]").unwrap(), "7"), json!(7));
    }
}
