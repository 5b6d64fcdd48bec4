// src/core/descriptor.rs

//! Conversion of backend parameter specs into checked, typed descriptors.

use crate::{
    core::validator,
    models::{
        ChoiceOption, ChoiceSource, Choices, ChoicesSpec, Constraints, ParameterDescriptor,
        ParameterKind, ParameterSpec, ParameterType,
    },
};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("Parameter name '{0}' is empty or contains '.', '[' or ']'.")]
    InvalidName(String),
    #[error("Parameter name '{0}' is used more than once among its siblings.")]
    DuplicateName(String),
    #[error("Parameter '{name}' has an invalid regex: {reason}")]
    InvalidRegex { name: String, reason: String },
    #[error("Parameter '{name}' has minimum {minimum} greater than maximum {maximum}.")]
    InvertedRange {
        name: String,
        minimum: f64,
        maximum: f64,
    },
    #[error("Parameter '{name}' has static choices that are not a list.")]
    InvalidChoices { name: String },
    #[error("Parameter '{name}' has a default that violates its own constraints ({reasons}).")]
    InvalidDefault { name: String, reasons: String },
}

/// Fails when two descriptors in the same list share a name.
pub fn ensure_unique_names(parameters: &[ParameterDescriptor]) -> Result<(), DescriptorError> {
    let mut seen = HashSet::with_capacity(parameters.len());
    for parameter in parameters {
        if !seen.insert(parameter.name.as_str()) {
            return Err(DescriptorError::DuplicateName(parameter.name.clone()));
        }
    }
    Ok(())
}

/// Names become field path keys, so they cannot hold path separators.
fn ensure_addressable_name(name: &str) -> Result<(), DescriptorError> {
    if name.is_empty() || name.contains(['.', '[', ']']) {
        return Err(DescriptorError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Builds a typed descriptor from its wire form.
///
/// Nested parameters are converted first, so an error deep in a dictionary
/// surfaces before the parent's own checks. The default is checked last,
/// with the same rules the validator applies to user input.
pub fn from_spec(spec: ParameterSpec) -> Result<ParameterDescriptor, DescriptorError> {
    ensure_addressable_name(&spec.name)?;
    let kind = match spec.kind {
        ParameterType::String => ParameterKind::String,
        ParameterType::Integer => ParameterKind::Integer,
        ParameterType::Float => ParameterKind::Float,
        ParameterType::Boolean => ParameterKind::Boolean,
        ParameterType::Date => ParameterKind::Date,
        ParameterType::Any => ParameterKind::Any,
        ParameterType::Dictionary => {
            let children = spec
                .parameters
                .into_iter()
                .map(from_spec)
                .collect::<Result<Vec<_>, _>>()?;
            ensure_unique_names(&children)?;
            ParameterKind::Dictionary(children)
        }
    };

    if let Some(pattern) = &spec.regex {
        Regex::new(pattern).map_err(|e| DescriptorError::InvalidRegex {
            name: spec.name.clone(),
            reason: e.to_string(),
        })?;
    }

    if let (Some(minimum), Some(maximum)) = (spec.minimum, spec.maximum)
        && minimum > maximum
    {
        return Err(DescriptorError::InvertedRange {
            name: spec.name,
            minimum,
            maximum,
        });
    }

    let choices = spec
        .choices
        .map(|choices| convert_choices(&spec.name, choices))
        .transpose()?;

    let descriptor = ParameterDescriptor {
        name: spec.name,
        kind,
        multi: spec.multi,
        optional: spec.optional,
        nullable: spec.nullable,
        default: spec.default,
        choices,
        constraints: Constraints {
            minimum: spec.minimum,
            maximum: spec.maximum,
            regex: spec.regex,
        },
        description: spec.description,
        display_name: spec.display_name,
    };

    if let Some(default) = &descriptor.default {
        let result = validator::validate_value(&descriptor, default);
        if !result.is_valid() {
            let reasons = result
                .violations()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DescriptorError::InvalidDefault {
                name: descriptor.name,
                reasons,
            });
        }
    }

    if matches!(
        descriptor.kind,
        ParameterKind::Date | ParameterKind::Any
    ) && descriptor.optional
        && descriptor.nullable == Some(false)
        && descriptor.default.is_none()
    {
        log::warn!(
            "Parameter '{}' is optional but not nullable and has no default; its empty value will not validate.",
            descriptor.name
        );
    }

    Ok(descriptor)
}

fn convert_choices(name: &str, choices: ChoicesSpec) -> Result<Choices, DescriptorError> {
    match choices {
        ChoicesSpec::List(values) => Ok(Choices::Static {
            options: values.into_iter().map(choice_option).collect(),
            strict: true,
        }),
        ChoicesSpec::Described(description) => match description.source {
            ChoiceSource::Static => match description.value {
                Value::Array(values) => Ok(Choices::Static {
                    options: values.into_iter().map(choice_option).collect(),
                    strict: description.strict,
                }),
                _ => Err(DescriptorError::InvalidChoices {
                    name: name.to_string(),
                }),
            },
            source => Ok(Choices::Dynamic {
                source,
                lookup: description.value,
            }),
        },
    }
}

/// A choice is either a bare value or a `{text, value}` pair.
fn choice_option(raw: Value) -> ChoiceOption {
    if let Value::Object(map) = &raw
        && let Some(value) = map.get("value")
    {
        let text = map
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| display_value(value));
        return ChoiceOption {
            text,
            value: value.clone(),
        };
    }
    ChoiceOption {
        text: display_value(&raw),
        value: raw,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> ParameterSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_wire_key_alias_and_lowercase_type() {
        let descriptor = from_spec(spec(json!({"key": "count", "type": "integer"}))).unwrap();
        assert_eq!(descriptor.name, "count");
        assert_eq!(descriptor.kind, ParameterKind::Integer);
        assert!(descriptor.is_required());
    }

    #[test]
    fn test_nested_dictionary_is_recursive() {
        let descriptor = from_spec(spec(json!({
            "name": "target",
            "type": "Dictionary",
            "parameters": [
                {"name": "host", "type": "String"},
                {"name": "port", "type": "Integer", "default": 22}
            ]
        })))
        .unwrap();
        let names: Vec<_> = descriptor.children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["host", "port"]);
    }

    #[test]
    fn test_names_must_be_path_keys() {
        for name in ["file.name", "hosts[0]", "a]b", ""] {
            assert_eq!(
                from_spec(spec(json!({"name": name, "type": "String"}))),
                Err(DescriptorError::InvalidName(name.to_string()))
            );
        }
        let nested = from_spec(spec(json!({
            "name": "target",
            "type": "Dictionary",
            "parameters": [{"name": "host.name", "type": "String"}]
        })));
        assert_eq!(nested, Err(DescriptorError::InvalidName("host.name".into())));
        assert!(from_spec(spec(json!({"name": "file_name", "type": "String"}))).is_ok());
    }

    #[test]
    fn test_duplicate_sibling_names_are_rejected() {
        let result = from_spec(spec(json!({
            "name": "target",
            "type": "Dictionary",
            "parameters": [
                {"name": "host", "type": "String"},
                {"name": "host", "type": "Integer"}
            ]
        })));
        assert_eq!(result, Err(DescriptorError::DuplicateName("host".into())));
    }

    #[test]
    fn test_same_name_in_different_parents_is_fine() {
        let result = from_spec(spec(json!({
            "name": "outer",
            "type": "Dictionary",
            "parameters": [
                {"name": "name", "type": "String", "optional": true},
                {"name": "inner", "type": "Dictionary", "parameters": [
                    {"name": "name", "type": "String", "optional": true}
                ]}
            ]
        })));
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_outside_range_is_rejected() {
        let result = from_spec(spec(json!({
            "name": "retries", "type": "Integer", "minimum": 1, "maximum": 10, "default": 15
        })));
        assert!(matches!(result, Err(DescriptorError::InvalidDefault { .. })));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let result = from_spec(spec(json!({"name": "tag", "type": "String", "regex": "(["})));
        assert!(matches!(result, Err(DescriptorError::InvalidRegex { .. })));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let result = from_spec(spec(json!({
            "name": "n", "type": "Float", "minimum": 5.0, "maximum": 1.0
        })));
        assert!(matches!(result, Err(DescriptorError::InvertedRange { .. })));
    }

    #[test]
    fn test_choices_forms() {
        let bare = from_spec(spec(json!({
            "name": "color", "type": "String", "choices": ["red", "blue"]
        })))
        .unwrap();
        match bare.choices.unwrap() {
            Choices::Static { options, strict } => {
                assert!(strict);
                assert_eq!(options.len(), 2);
                assert_eq!(options[0].text, "red");
            }
            other => panic!("unexpected choices: {other:?}"),
        }

        let pairs = from_spec(spec(json!({
            "name": "level", "type": "Integer",
            "choices": {"type": "static", "strict": false,
                        "value": [{"text": "Low", "value": 1}, {"text": "High", "value": 9}]}
        })))
        .unwrap();
        match pairs.choices.unwrap() {
            Choices::Static { options, strict } => {
                assert!(!strict);
                assert_eq!(options[1].text, "High");
                assert_eq!(options[1].value, json!(9));
            }
            other => panic!("unexpected choices: {other:?}"),
        }

        let dynamic = from_spec(spec(json!({
            "name": "host", "type": "String",
            "choices": {"type": "command", "value": "list_hosts"}
        })))
        .unwrap();
        assert!(matches!(
            dynamic.choices,
            Some(Choices::Dynamic { source: ChoiceSource::Command, .. })
        ));
    }

    #[test]
    fn test_descriptor_serializes_back_to_wire_form() {
        let original = json!({
            "name": "target", "type": "Dictionary", "optional": true,
            "parameters": [{"name": "host", "type": "String", "regex": "^[a-z]+$", "default": "abc"}]
        });
        let descriptor: ParameterDescriptor = serde_json::from_value(original).unwrap();
        let back = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(back["type"], json!("Dictionary"));
        assert_eq!(back["parameters"][0]["regex"], json!("^[a-z]+$"));
    }
}
