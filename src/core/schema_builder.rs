// src/core/schema_builder.rs

//! Turns parameter descriptors into a presentation-independent form schema.

use crate::{
    constants::{COMMENT_FIELD, INSTANCE_NAMES_FIELD, JOB_FIELD, PARAMETERS_FIELD},
    models::{
        ChoiceOption, ChoiceSource, Choices, FormOptions, Instance, Mode, ParameterDescriptor,
        ParameterKind, TriggerKind,
    },
};
use serde::Serialize;
use serde_json::{Map, Value, json};

// --- SCHEMA TREE ---

/// The full form for one command in one mode.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Schema {
    pub mode: Mode,
    pub fields: Vec<SchemaField>,
}

/// A labeled slot of the form.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub node: SchemaNode,
}

/// The input widget family of a field, independent of any UI toolkit.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_length: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<f64>,
    },
    Number {
        integer: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    Toggle,
    /// Epoch milliseconds.
    Date,
    Object {
        fields: Vec<SchemaField>,
        /// Arbitrary keys are allowed (dictionary without declared children).
        free_form: bool,
    },
    /// Any JSON value.
    Opaque,
    Array {
        items: Box<SchemaNode>,
    },
    Choice {
        options: Vec<ChoiceOption>,
        multiple: bool,
        strict: bool,
    },
    /// Options resolved elsewhere at render time.
    Lookup {
        source: ChoiceSource,
        lookup: Value,
    },
    /// One of several field groups, picked by the sibling field named `discriminator`.
    Variant {
        discriminator: String,
        variants: Vec<SchemaVariant>,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SchemaVariant {
    pub tag: String,
    pub fields: Vec<SchemaField>,
}

impl SchemaField {
    fn new(name: &str, title: &str, required: bool, node: SchemaNode) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            description: None,
            required,
            default: None,
            node,
        }
    }

    fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

impl Schema {
    /// Finds a top-level field.
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Top-level field names, in render order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Renders the schema as a JSON Schema (draft-07) document.
    pub fn to_json_schema(&self) -> Value {
        let mut document = object_schema(&self.fields, false);
        if let Value::Object(map) = &mut document {
            map.insert(
                "$schema".into(),
                json!("http://json-schema.org/draft-07/schema#"),
            );
            map.insert("x-mode".into(), serde_json::to_value(self.mode).unwrap_or(Value::Null));
        }
        document
    }
}

// --- BUILDERS ---

/// Builds the schema with the default instance filter.
pub fn build_schema(instances: &[Instance], parameters: &[ParameterDescriptor], mode: Mode) -> Schema {
    build_schema_with(instances, parameters, mode, &FormOptions::default())
}

/// Builds the schema for a command.
///
/// Job mode renders `[job, instance_names, parameters]`, immediate mode
/// renders `[instance_names, parameters, comment]`. Parameters keep their
/// declaration order at every level.
pub fn build_schema_with(
    instances: &[Instance],
    parameters: &[ParameterDescriptor],
    mode: Mode,
    options: &FormOptions,
) -> Schema {
    let mut fields = Vec::with_capacity(4);

    if mode == Mode::Job {
        fields.push(job_field());
    }
    fields.push(instances_field(instances, options));
    fields.push(SchemaField::new(
        PARAMETERS_FIELD,
        "Parameters",
        true,
        SchemaNode::Object {
            fields: parameters.iter().map(parameter_field).collect(),
            free_form: false,
        },
    ));
    if mode == Mode::Immediate {
        fields.push(
            SchemaField::new(COMMENT_FIELD, "Comment", false, text())
                .described("Free text attached to the request."),
        );
    }

    log::debug!(
        "Built {:?} schema with {} parameter(s) and {} instance(s).",
        mode,
        parameters.len(),
        instances.len()
    );
    Schema { mode, fields }
}

fn instances_field(instances: &[Instance], options: &FormOptions) -> SchemaField {
    let selectable = options
        .instance_filter
        .selectable(instances)
        .into_iter()
        .map(|instance| ChoiceOption {
            text: instance.name.clone(),
            value: Value::String(instance.name.clone()),
        })
        .collect();
    SchemaField::new(
        INSTANCE_NAMES_FIELD,
        "Instances",
        true,
        SchemaNode::Choice {
            options: selectable,
            multiple: true,
            strict: true,
        },
    )
}

/// One field per descriptor; composites and lists nest.
pub fn parameter_field(descriptor: &ParameterDescriptor) -> SchemaField {
    let element = element_node(descriptor);
    let node = if descriptor.multi {
        SchemaNode::Array {
            items: Box::new(element),
        }
    } else {
        element
    };
    SchemaField {
        name: descriptor.name.clone(),
        title: descriptor.title().to_string(),
        description: descriptor.description.clone(),
        required: descriptor.is_required(),
        default: descriptor.default.clone(),
        node,
    }
}

fn element_node(descriptor: &ParameterDescriptor) -> SchemaNode {
    match &descriptor.choices {
        Some(Choices::Static { options, strict }) => {
            return SchemaNode::Choice {
                options: options.clone(),
                multiple: false,
                strict: *strict,
            };
        }
        Some(Choices::Dynamic { source, lookup }) => {
            return SchemaNode::Lookup {
                source: *source,
                lookup: lookup.clone(),
            };
        }
        None => {}
    }

    let limits = &descriptor.constraints;
    match &descriptor.kind {
        ParameterKind::String => SchemaNode::Text {
            pattern: limits.regex.clone(),
            min_length: limits.minimum,
            max_length: limits.maximum,
        },
        ParameterKind::Integer => SchemaNode::Number {
            integer: true,
            minimum: limits.minimum,
            maximum: limits.maximum,
        },
        ParameterKind::Float => SchemaNode::Number {
            integer: false,
            minimum: limits.minimum,
            maximum: limits.maximum,
        },
        ParameterKind::Boolean => SchemaNode::Toggle,
        ParameterKind::Date => SchemaNode::Date,
        ParameterKind::Any => SchemaNode::Opaque,
        ParameterKind::Dictionary(children) => SchemaNode::Object {
            fields: children.iter().map(parameter_field).collect(),
            free_form: children.is_empty(),
        },
    }
}

// --- JOB BLOCK ---

fn text() -> SchemaNode {
    SchemaNode::Text {
        pattern: None,
        min_length: None,
        max_length: None,
    }
}

fn count(minimum: f64) -> SchemaNode {
    SchemaNode::Number {
        integer: true,
        minimum: Some(minimum),
        maximum: None,
    }
}

/// Window, timezone and jitter arguments shared by interval and cron triggers.
fn schedule_window_fields() -> Vec<SchemaField> {
    vec![
        SchemaField::new("start_date", "Start Date", false, SchemaNode::Date),
        SchemaField::new("end_date", "End Date", false, SchemaNode::Date),
        SchemaField::new("timezone", "Timezone", false, text()),
        SchemaField::new("jitter", "Jitter", false, count(0.0))
            .described("Random delay in seconds added to each run."),
    ]
}

fn interval_fields() -> Vec<SchemaField> {
    let mut fields: Vec<SchemaField> = ["weeks", "days", "hours", "minutes", "seconds"]
        .into_iter()
        .map(|unit| SchemaField::new(unit, &title_case(unit), false, count(0.0)).with_default(json!(0)))
        .collect();
    fields.extend(schedule_window_fields());
    fields.push(
        SchemaField::new("reschedule_on_finish", "Reschedule On Finish", false, SchemaNode::Toggle)
            .with_default(json!(false)),
    );
    fields
}

fn cron_fields() -> Vec<SchemaField> {
    let mut fields: Vec<SchemaField> = [
        ("year", "*"),
        ("month", "*"),
        ("day", "*"),
        ("week", "*"),
        ("day_of_week", "*"),
        ("hour", "*"),
        ("minute", "*"),
        ("second", "0"),
    ]
    .into_iter()
    .map(|(name, default)| SchemaField::new(name, &title_case(name), true, text()).with_default(json!(default)))
    .collect();
    fields.extend(schedule_window_fields());
    fields
}

fn date_fields() -> Vec<SchemaField> {
    vec![
        SchemaField::new("run_date", "Run Date", true, SchemaNode::Date),
        SchemaField::new("timezone", "Timezone", false, text()),
    ]
}

fn job_field() -> SchemaField {
    let kinds = TriggerKind::ALL
        .iter()
        .map(|kind| ChoiceOption {
            text: title_case(kind.as_str()),
            value: json!(kind.as_str()),
        })
        .collect();

    let variants = TriggerKind::ALL
        .iter()
        .map(|kind| SchemaVariant {
            tag: kind.as_str().to_string(),
            fields: match kind {
                TriggerKind::Interval => interval_fields(),
                TriggerKind::Cron => cron_fields(),
                TriggerKind::Date => date_fields(),
            },
        })
        .collect();

    let fields = vec![
        SchemaField::new(
            "trigger_type",
            "Trigger Type",
            true,
            SchemaNode::Choice {
                options: kinds,
                multiple: false,
                strict: true,
            },
        )
        .with_default(json!(TriggerKind::Interval.as_str())),
        SchemaField::new(
            "trigger",
            "Trigger",
            true,
            SchemaNode::Variant {
                discriminator: "trigger_type".to_string(),
                variants,
            },
        ),
        SchemaField::new("name", "Job Name", true, text()),
        SchemaField::new("success_count", "Success Count", false, count(1.0))
            .described("Stop the job after this many successful runs."),
        SchemaField::new("error_count", "Error Count", false, count(1.0))
            .described("Stop the job after this many failed runs."),
        SchemaField::new("request_template", "Request Template", false, SchemaNode::Toggle)
            .described("Create the job paused so that it only stores the request.")
            .with_default(json!(false)),
    ];

    SchemaField::new(
        JOB_FIELD,
        "Job",
        true,
        SchemaNode::Object {
            fields,
            free_form: false,
        },
    )
}

fn title_case(raw: &str) -> String {
    raw.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// --- JSON SCHEMA RENDERING ---

fn object_schema(fields: &[SchemaField], free_form: bool) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        properties.insert(field.name.clone(), field_schema(field));
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": free_form,
    })
}

fn field_schema(field: &SchemaField) -> Value {
    let mut schema = node_schema(&field.node);
    if let Value::Object(map) = &mut schema {
        map.insert("title".into(), json!(field.title));
        if let Some(description) = &field.description {
            map.insert("description".into(), json!(description));
        }
        if let Some(default) = &field.default {
            map.insert("default".into(), default.clone());
        }
    }
    schema
}

/// Whole non-negative numbers only; JSON Schema length limits are integers.
fn whole(value: f64) -> Option<u64> {
    value.to_string().parse::<u64>().ok()
}

fn node_schema(node: &SchemaNode) -> Value {
    match node {
        SchemaNode::Text {
            pattern,
            min_length,
            max_length,
        } => {
            let mut map = Map::new();
            map.insert("type".into(), json!("string"));
            if let Some(pattern) = pattern {
                map.insert("pattern".into(), json!(pattern));
            }
            if let Some(min) = min_length.and_then(whole) {
                map.insert("minLength".into(), json!(min));
            }
            if let Some(max) = max_length.and_then(whole) {
                map.insert("maxLength".into(), json!(max));
            }
            Value::Object(map)
        }
        SchemaNode::Number {
            integer,
            minimum,
            maximum,
        } => {
            let mut map = Map::new();
            map.insert("type".into(), json!(if *integer { "integer" } else { "number" }));
            if let Some(min) = minimum {
                map.insert("minimum".into(), json!(min));
            }
            if let Some(max) = maximum {
                map.insert("maximum".into(), json!(max));
            }
            Value::Object(map)
        }
        SchemaNode::Toggle => json!({ "type": "boolean" }),
        SchemaNode::Date => json!({ "type": ["integer", "null"], "format": "epoch-millis" }),
        SchemaNode::Object { fields, free_form } => object_schema(fields, *free_form),
        SchemaNode::Opaque => json!({}),
        SchemaNode::Array { items } => json!({ "type": "array", "items": node_schema(items) }),
        SchemaNode::Choice {
            options,
            multiple,
            strict,
        } => {
            let values: Vec<Value> = options.iter().map(|o| o.value.clone()).collect();
            let labels: Vec<Value> = options.iter().map(|o| json!(o.text)).collect();
            let element = if *strict {
                json!({ "enum": values, "x-enumNames": labels })
            } else {
                json!({ "examples": values, "x-enumNames": labels })
            };
            if *multiple {
                json!({ "type": "array", "items": element, "uniqueItems": true })
            } else {
                element
            }
        }
        SchemaNode::Lookup { source, lookup } => {
            json!({ "x-lookup": { "type": source, "value": lookup } })
        }
        SchemaNode::Variant {
            discriminator,
            variants,
        } => json!({
            "x-discriminator": discriminator,
            "oneOf": variants
                .iter()
                .map(|variant| {
                    let mut schema = object_schema(&variant.fields, false);
                    if let Value::Object(map) = &mut schema {
                        map.insert("title".into(), json!(variant.tag));
                    }
                    schema
                })
                .collect::<Vec<_>>(),
        }),
    }
}

// MARK: --- UNIT TESTS ---
