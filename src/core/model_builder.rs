// src/core/model_builder.rs

//! Initial command models: fresh from descriptors, or seeded from a prior request.

use crate::models::{
    CommandModel, FormOptions, Instance, JobConfig, Mode, ParameterDescriptor, ParameterKind,
    PriorRequest,
};
use serde_json::{Map, Value};

/// Builds a fresh model with the default form options.
pub fn build_model(parameters: &[ParameterDescriptor], instances: &[Instance], mode: Mode) -> CommandModel {
    build_model_with(parameters, instances, mode, &FormOptions::default())
}

/// Builds a fresh model: every parameter at its default (or type-empty) value,
/// the single selectable instance pre-selected, plus the mode-specific block.
pub fn build_model_with(
    parameters: &[ParameterDescriptor],
    instances: &[Instance],
    mode: Mode,
    options: &FormOptions,
) -> CommandModel {
    let (comment, job) = match mode {
        Mode::Immediate => (Some(String::new()), None),
        Mode::Job => (None, Some(JobConfig::default())),
    };
    CommandModel {
        instance_names: initial_instances(instances, options),
        parameters: default_parameters(parameters),
        comment,
        job,
    }
}

/// Seeds an immediate-mode model from a previously submitted request.
///
/// Fields the request does not carry fall back to their defaults, recursively
/// into dictionaries; keys of the request that no descriptor declares are dropped.
pub fn replay_model(
    parameters: &[ParameterDescriptor],
    instances: &[Instance],
    prior: &PriorRequest,
    options: &FormOptions,
) -> CommandModel {
    let mut seeded = Map::with_capacity(parameters.len());
    for descriptor in parameters {
        let value = merge_with_defaults(descriptor, prior.parameters.get(&descriptor.name));
        seeded.insert(descriptor.name.clone(), value);
    }

    let dropped: Vec<&String> = prior
        .parameters
        .keys()
        .filter(|key| !parameters.iter().any(|d| &d.name == *key))
        .collect();
    if !dropped.is_empty() {
        log::debug!("Replay dropped undeclared parameters: {:?}", dropped);
    }

    let instance_names = match &prior.instance_name {
        Some(name) => vec![name.clone()],
        None => initial_instances(instances, options),
    };

    CommandModel {
        instance_names,
        parameters: seeded,
        comment: Some(prior.comment.clone().unwrap_or_default()),
        job: None,
    }
}

/// The parameters object of a fresh model.
pub fn default_parameters(parameters: &[ParameterDescriptor]) -> Map<String, Value> {
    parameters
        .iter()
        .map(|d| (d.name.clone(), default_value(d)))
        .collect()
}

/// The declared default, else the type-empty value.
pub fn default_value(descriptor: &ParameterDescriptor) -> Value {
    match &descriptor.default {
        Some(default) => default.clone(),
        None => empty_value(descriptor),
    }
}

/// Type-empty value: `""`, `0`, `false`, `null`, `[]` for lists, and for
/// dictionaries an object built from the children's defaults.
pub fn empty_value(descriptor: &ParameterDescriptor) -> Value {
    if descriptor.multi {
        return Value::Array(Vec::new());
    }
    empty_element(descriptor)
}

/// Empty value of one element, ignoring `multi`.
pub fn empty_element(descriptor: &ParameterDescriptor) -> Value {
    match &descriptor.kind {
        ParameterKind::String => Value::String(String::new()),
        ParameterKind::Integer | ParameterKind::Float => Value::from(0),
        ParameterKind::Boolean => Value::Bool(false),
        ParameterKind::Date | ParameterKind::Any => Value::Null,
        ParameterKind::Dictionary(children) => Value::Object(default_parameters(children)),
    }
}

fn initial_instances(instances: &[Instance], options: &FormOptions) -> Vec<String> {
    let selectable = options.instance_filter.selectable(instances);
    match selectable.as_slice() {
        [only] if options.preselect_single_instance => vec![only.name.clone()],
        _ => Vec::new(),
    }
}

fn merge_with_defaults(descriptor: &ParameterDescriptor, replayed: Option<&Value>) -> Value {
    let Some(replayed) = replayed else {
        return default_value(descriptor);
    };
    let children = descriptor.children();
    if children.is_empty() {
        return replayed.clone();
    }

    match (descriptor.multi, replayed) {
        (false, Value::Object(map)) => Value::Object(merge_object(children, map)),
        (true, Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(merge_object(children, map)),
                    other => other.clone(),
                })
                .collect(),
        ),
        _ => replayed.clone(),
    }
}

fn merge_object(children: &[ParameterDescriptor], replayed: &Map<String, Value>) -> Map<String, Value> {
    children
        .iter()
        .map(|child| (child.name.clone(), merge_with_defaults(child, replayed.get(&child.name))))
        .collect()
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator;
    use crate::models::InstanceStatus;
    use serde_json::json;

    fn params(value: Value) -> Vec<ParameterDescriptor> {
        serde_json::from_value(value).unwrap()
    }

    fn instance(name: &str, status: InstanceStatus) -> Instance {
        Instance {
            name: name.into(),
            status,
        }
    }

    fn sample() -> Vec<ParameterDescriptor> {
        params(json!([
            {"name": "message", "type": "String"},
            {"name": "count", "type": "Integer"},
            {"name": "ratio", "type": "Float"},
            {"name": "loud", "type": "Boolean"},
            {"name": "when", "type": "Date", "optional": true},
            {"name": "blob", "type": "Any", "optional": true},
            {"name": "tags", "type": "String", "multi": true, "optional": true},
            {"name": "target", "type": "Dictionary", "parameters": [
                {"name": "host", "type": "String", "default": "localhost"},
                {"name": "port", "type": "Integer", "default": 22}
            ]},
            {"name": "free", "type": "Dictionary", "optional": true}
        ]))
    }

    #[test]
    fn test_model_mirrors_descriptor_shape() {
        let model = build_model(&sample(), &[], Mode::Immediate);
        assert_eq!(
            Value::Object(model.parameters),
            json!({
                "message": "",
                "count": 0,
                "ratio": 0,
                "loud": false,
                "when": null,
                "blob": null,
                "tags": [],
                "target": {"host": "localhost", "port": 22},
                "free": {}
            })
        );
        assert_eq!(model.comment.as_deref(), Some(""));
        assert!(model.job.is_none());
    }

    #[test]
    fn test_job_mode_has_job_block_and_no_comment() {
        let model = build_model(&sample(), &[], Mode::Job);
        assert!(model.comment.is_none());
        assert_eq!(model.job, Some(JobConfig::default()));
    }

    #[test]
    fn test_single_selectable_instance_is_preselected() {
        let one = [
            instance("a", InstanceStatus::Running),
            instance("b", InstanceStatus::Stopped),
        ];
        assert_eq!(build_model(&[], &one, Mode::Immediate).instance_names, vec!["a"]);

        let two = [
            instance("a", InstanceStatus::Running),
            instance("b", InstanceStatus::Paused),
        ];
        assert!(build_model(&[], &two, Mode::Immediate).instance_names.is_empty());

        let options = FormOptions {
            preselect_single_instance: false,
            ..Default::default()
        };
        assert!(build_model_with(&[], &one, Mode::Immediate, &options).instance_names.is_empty());
    }

    #[test]
    fn test_fresh_defaults_validate_when_defaults_satisfy() {
        let p = params(json!([
            {"name": "greeting", "type": "String", "default": "hi"},
            {"name": "retries", "type": "Integer", "minimum": 1, "maximum": 10, "default": 3},
            {"name": "note", "type": "String", "optional": true},
            {"name": "flag", "type": "Boolean"}
        ]));
        let model = build_model(&p, &[], Mode::Immediate);
        assert!(validator::validate(&p, &model).is_valid());
    }

    #[test]
    fn test_replay_falls_back_per_field_and_drops_unknown_keys() {
        let prior = PriorRequest {
            command: "say".into(),
            system: "echo".into(),
            system_version: "1.0.0".into(),
            namespace: "default".into(),
            instance_name: Some("b".into()),
            parameters: serde_json::from_value(json!({
                "message": "hello",
                "target": {"host": "remote", "legacy": true},
                "removed": 1
            }))
            .unwrap(),
            comment: Some("again".into()),
        };
        let model = replay_model(&sample(), &[], &prior, &FormOptions::default());
        assert_eq!(model.parameters["message"], json!("hello"));
        assert_eq!(model.parameters["count"], json!(0));
        assert_eq!(model.parameters["target"], json!({"host": "remote", "port": 22}));
        assert!(!model.parameters.contains_key("removed"));
        assert_eq!(model.instance_names, vec!["b"]);
        assert_eq!(model.comment.as_deref(), Some("again"));
        assert!(model.job.is_none());
    }

    #[test]
    fn test_replay_merges_each_dictionary_element() {
        let p = params(json!([{
            "name": "targets", "type": "Dictionary", "multi": true,
            "parameters": [
                {"name": "host", "type": "String"},
                {"name": "port", "type": "Integer", "default": 80}
            ]
        }]));
        let prior: PriorRequest = serde_json::from_value(json!({
            "command": "c", "system": "s", "system_version": "1", "namespace": "n",
            "parameters": {"targets": [{"host": "a"}, {"host": "b", "port": 8080}]}
        }))
        .unwrap();
        let model = replay_model(&p, &[], &prior, &FormOptions::default());
        assert_eq!(
            model.parameters["targets"],
            json!([{"host": "a", "port": 80}, {"host": "b", "port": 8080}])
        );
    }
}
