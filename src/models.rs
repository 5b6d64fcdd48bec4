// src/models.rs

use crate::core::descriptor::{self, DescriptorError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// --- BACKEND WIRE MODELS ---
// These mirror what the garden API sends. They are only used as the
// deserialization surface; the rest of the crate works on the typed models below.

/// Scalar type tag of a parameter as sent by the backend.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    #[serde(alias = "string")]
    String,
    #[serde(alias = "integer")]
    Integer,
    #[serde(alias = "float")]
    Float,
    #[serde(alias = "boolean")]
    Boolean,
    #[serde(alias = "dictionary")]
    Dictionary,
    #[serde(alias = "date")]
    Date,
    #[serde(alias = "any")]
    Any,
}

/// Where the values of a choice list come from.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceSource {
    #[default]
    Static,
    Command,
    Url,
}

/// Full choices description (`{type, value, strict, display}`).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChoicesDescription {
    #[serde(rename = "type", default)]
    pub source: ChoiceSource,
    pub value: Value,
    #[serde(default = "default_true")]
    pub strict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Choices as found on the wire: either a bare list or a full description.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ChoicesSpec {
    List(Vec<Value>),
    Described(ChoicesDescription),
}

/// One parameter exactly as the backend describes it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    #[serde(alias = "key")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default)]
    pub multi: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<ChoicesSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

fn default_true() -> bool {
    true
}

// --- TYPED PARAMETER MODELS ---

/// The type of a parameter. `Dictionary` carries its nested parameters, which may be empty
/// for a free-form key/value dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Any,
    Dictionary(Vec<ParameterDescriptor>),
}

impl ParameterKind {
    /// The wire tag for this kind.
    pub fn wire_type(&self) -> ParameterType {
        match self {
            Self::String => ParameterType::String,
            Self::Integer => ParameterType::Integer,
            Self::Float => ParameterType::Float,
            Self::Boolean => ParameterType::Boolean,
            Self::Date => ParameterType::Date,
            Self::Any => ParameterType::Any,
            Self::Dictionary(_) => ParameterType::Dictionary,
        }
    }
}

/// One selectable option of a static choice list.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub text: String,
    pub value: Value,
}

/// Allowed values of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Choices {
    /// A fixed list. Membership is only enforced when `strict`.
    Static {
        options: Vec<ChoiceOption>,
        strict: bool,
    },
    /// Values looked up elsewhere (another command, a URL). Not checked client-side.
    Dynamic { source: ChoiceSource, lookup: Value },
}

/// Numeric and textual limits of a parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub regex: Option<String>,
}

/// Declarative description of one command input, checked for internal consistency.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(try_from = "ParameterSpec", into = "ParameterSpec")]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParameterKind,
    pub multi: bool,
    pub optional: bool,
    pub nullable: Option<bool>,
    pub default: Option<Value>,
    pub choices: Option<Choices>,
    pub constraints: Constraints,
    pub description: Option<String>,
    pub display_name: Option<String>,
}

impl ParameterDescriptor {
    /// Label shown to the user.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// A parameter is required when it is not optional.
    pub fn is_required(&self) -> bool {
        !self.optional
    }

    /// Nested parameters of a dictionary; empty for every other kind.
    pub fn children(&self) -> &[ParameterDescriptor] {
        match &self.kind {
            ParameterKind::Dictionary(children) => children,
            _ => &[],
        }
    }
}

impl TryFrom<ParameterSpec> for ParameterDescriptor {
    type Error = DescriptorError;

    fn try_from(spec: ParameterSpec) -> Result<Self, Self::Error> {
        descriptor::from_spec(spec)
    }
}

impl From<ParameterDescriptor> for ParameterSpec {
    fn from(value: ParameterDescriptor) -> Self {
        let choices = value.choices.map(|choices| match choices {
            Choices::Static { options, strict } => ChoicesSpec::Described(ChoicesDescription {
                source: ChoiceSource::Static,
                value: Value::Array(
                    options
                        .into_iter()
                        .map(|o| serde_json::json!({ "text": o.text, "value": o.value }))
                        .collect(),
                ),
                strict,
                display: None,
            }),
            Choices::Dynamic { source, lookup } => ChoicesSpec::Described(ChoicesDescription {
                source,
                value: lookup,
                strict: false,
                display: None,
            }),
        });
        let kind = value.kind.wire_type();
        let parameters = match value.kind {
            ParameterKind::Dictionary(children) => children.into_iter().map(Into::into).collect(),
            _ => Vec::new(),
        };
        Self {
            name: value.name,
            kind,
            multi: value.multi,
            optional: value.optional,
            nullable: value.nullable,
            default: value.default,
            choices,
            parameters,
            maximum: value.constraints.maximum,
            minimum: value.constraints.minimum,
            regex: value.constraints.regex,
            description: value.description,
            display_name: value.display_name,
        }
    }
}

// --- SYSTEMS, COMMANDS AND INSTANCES ---

/// Lifecycle state of a running instance.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Initializing,
    Starting,
    Running,
    Paused,
    Stopping,
    Stopped,
    Unresponsive,
    Dead,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initializing => "INITIALIZING",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Unresponsive => "UNRESPONSIVE",
            Self::Dead => "DEAD",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// One running process of a system.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub status: InstanceStatus,
}

/// A named, parameterized operation exposed by a system.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(try_from = "CommandSpec")]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub hidden: bool,
}

/// Wire form of a command; deserialization goes through it to check sibling names.
#[derive(Deserialize, Debug)]
pub struct CommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(default)]
    pub hidden: bool,
}

impl TryFrom<CommandSpec> for Command {
    type Error = DescriptorError;

    fn try_from(spec: CommandSpec) -> Result<Self, Self::Error> {
        descriptor::ensure_unique_names(&spec.parameters)?;
        Ok(Self {
            name: spec.name,
            description: spec.description,
            parameters: spec.parameters,
            hidden: spec.hidden,
        })
    }
}

/// A registered plugin exposing commands and running as instances.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct System {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

/// The identifying part of a system, carried by sessions and payloads.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SystemRef {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub version: String,
}

impl From<&System> for SystemRef {
    fn from(value: &System) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
            namespace: value.namespace.clone(),
            version: value.version.clone(),
        }
    }
}

/// The recorded data of a previously submitted request, as used by replay.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PriorRequest {
    pub command: String,
    pub system: String,
    pub system_version: String,
    pub namespace: String,
    #[serde(default)]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub comment: Option<String>,
}

// --- FORM MODELS ---

/// Whether the form runs the command now or schedules it.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Immediate,
    Job,
}

/// Which instance statuses may be offered in the instance selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceFilter {
    pub excluded: Vec<InstanceStatus>,
}

impl Default for InstanceFilter {
    fn default() -> Self {
        Self {
            excluded: vec![
                InstanceStatus::Stopping,
                InstanceStatus::Stopped,
                InstanceStatus::Unresponsive,
                InstanceStatus::Dead,
            ],
        }
    }
}

impl InstanceFilter {
    /// Returns whether an instance can receive requests.
    pub fn is_selectable(&self, instance: &Instance) -> bool {
        !self.excluded.contains(&instance.status)
    }

    /// Selectable instances, in their original order.
    pub fn selectable<'a>(&self, instances: &'a [Instance]) -> Vec<&'a Instance> {
        instances.iter().filter(|i| self.is_selectable(i)).collect()
    }
}

/// Knobs shared by the schema and model builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    pub instance_filter: InstanceFilter,
    pub preselect_single_instance: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            instance_filter: InstanceFilter::default(),
            preselect_single_instance: true,
        }
    }
}

/// The editable state of one command invocation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct CommandModel {
    #[serde(default)]
    pub instance_names: Vec<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobConfig>,
}

// --- JOB SCHEDULING MODELS ---

/// Kind of trigger a job is scheduled with.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Interval,
    Cron,
    Date,
}

impl TriggerKind {
    /// All kinds, in presentation order.
    pub const ALL: [Self; 3] = [Self::Interval, Self::Cron, Self::Date];

    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Cron => "cron",
            Self::Date => "date",
        }
    }
}

/// Run every fixed period.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct IntervalTrigger {
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter: Option<u32>,
    pub reschedule_on_finish: bool,
}

/// Run on a cron-style calendar expression.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CronTrigger {
    pub year: String,
    pub month: String,
    pub day: String,
    pub week: String,
    pub day_of_week: String,
    pub hour: String,
    pub minute: String,
    pub second: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter: Option<u32>,
}

impl Default for CronTrigger {
    fn default() -> Self {
        let any = || "*".to_string();
        Self {
            year: any(),
            month: any(),
            day: any(),
            week: any(),
            day_of_week: any(),
            hour: any(),
            minute: any(),
            second: "0".to_string(),
            start_date: None,
            end_date: None,
            timezone: None,
            jitter: None,
        }
    }
}

impl CronTrigger {
    /// The calendar fields with their names, in schedule order.
    pub fn fields(&self) -> [(&'static str, &str); 8] {
        [
            ("year", &self.year),
            ("month", &self.month),
            ("day", &self.day),
            ("week", &self.week),
            ("day_of_week", &self.day_of_week),
            ("hour", &self.hour),
            ("minute", &self.minute),
            ("second", &self.second),
        ]
    }
}

/// Run once at a given time (epoch milliseconds).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DateTrigger {
    pub run_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// A trigger with its kind-specific arguments. Serializes as `trigger_type` + `trigger`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "trigger_type", content = "trigger", rename_all = "lowercase")]
pub enum Trigger {
    Interval(IntervalTrigger),
    Cron(CronTrigger),
    Date(DateTrigger),
}

impl Default for Trigger {
    fn default() -> Self {
        Self::Interval(IntervalTrigger::default())
    }
}

impl Trigger {
    /// Default arguments for a kind.
    pub fn for_kind(kind: TriggerKind) -> Self {
        match kind {
            TriggerKind::Interval => Self::Interval(IntervalTrigger::default()),
            TriggerKind::Cron => Self::Cron(CronTrigger::default()),
            TriggerKind::Date => Self::Date(DateTrigger::default()),
        }
    }

    /// The kind of this trigger.
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::Interval(_) => TriggerKind::Interval,
            Self::Cron(_) => TriggerKind::Cron,
            Self::Date(_) => TriggerKind::Date,
        }
    }
}

/// Scheduling block of a job-mode model.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct JobConfig {
    #[serde(flatten)]
    pub trigger: Trigger,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u32>,
    /// When set, the job is created paused and serves as a stored request template.
    #[serde(default)]
    pub request_template: bool,
}
