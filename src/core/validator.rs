// src/core/validator.rs

//! Checks a command model against its parameter descriptors.
//!
//! Descriptors are compiled once into a tree of [`FieldRule`]s (regexes
//! compiled, strict choices extracted) so that the same `Validator` can be
//! run on every edit. Validation never stops at the first bad field: every
//! field is visited and each one contributes at most one violation, chosen by
//! the first failing rule in this order: required, type, range, choice, pattern.
//! Dictionaries are the exception, since their children report on their own.

use crate::{
    constants::{INSTANCE_NAMES_FIELD, JOB_FIELD, PARAMETERS_FIELD},
    core::field_path::FieldPath,
    models::{
        Choices, CommandModel, JobConfig, ParameterDescriptor, ParameterKind, Trigger,
    },
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

lazy_static! {
    /// One comma-separated term of a cron calendar field: `*`, `5`, `1-5`, `mon-fri`,
    /// `last`, `2nd wed`, each optionally stepped with `/n`.
    static ref CRON_TERM_RE: Regex = Regex::new(
        r"^(?:\*|[0-9A-Za-z]+(?:-[0-9A-Za-z]+)?|(?:1st|2nd|3rd|4th|5th|last) [A-Za-z]+)(?:/\d+)?$"
    )
    .unwrap();
}

/// Why a field failed validation.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Required,
    Type,
    Range,
    Choice,
    Pattern,
}

impl ReasonCode {
    /// Wire name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Type => "type",
            Self::Range => "range",
            Self::Choice => "choice",
            Self::Pattern => "pattern",
        }
    }
}

/// One failing field.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: FieldPath,
    pub reason: ReasonCode,
}

impl Violation {
    pub fn new(path: FieldPath, reason: ReasonCode) -> Self {
        Self { path, reason }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason.as_str())
    }
}

/// Outcome of a validation pass. `Invalid` never holds an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationResult {
    #[default]
    Valid,
    Invalid(Vec<Violation>),
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(violations)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid => &[],
            Self::Invalid(violations) => violations,
        }
    }

    /// The violation reported for an exact path, if any.
    pub fn reason_at(&self, path: &FieldPath) -> Option<ReasonCode> {
        self.violations()
            .iter()
            .find(|v| &v.path == path)
            .map(|v| v.reason)
    }

    /// Concatenates two results, keeping order.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Valid, other) => other,
            (this, Self::Valid) => this,
            (Self::Invalid(mut a), Self::Invalid(b)) => {
                a.extend(b);
                Self::Invalid(a)
            }
        }
    }
}

// --- COMPILED RULES ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Any,
    Object,
}

/// A descriptor reduced to what validation needs.
#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    value_type: ValueType,
    multi: bool,
    required: bool,
    nullable: Option<bool>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    pattern: Option<Regex>,
    strict_choices: Option<Vec<Value>>,
    children: Vec<FieldRule>,
}

impl FieldRule {
    fn compile(descriptor: &ParameterDescriptor) -> Self {
        let value_type = match &descriptor.kind {
            ParameterKind::String => ValueType::String,
            ParameterKind::Integer => ValueType::Integer,
            ParameterKind::Float => ValueType::Float,
            ParameterKind::Boolean => ValueType::Boolean,
            ParameterKind::Date => ValueType::Date,
            ParameterKind::Any => ValueType::Any,
            ParameterKind::Dictionary(_) => ValueType::Object,
        };

        let pattern = descriptor.constraints.regex.as_deref().and_then(|p| {
            Regex::new(p)
                .map_err(|e| {
                    log::warn!(
                        "Ignoring invalid regex on parameter '{}': {e}",
                        descriptor.name
                    );
                })
                .ok()
        });

        let strict_choices = match &descriptor.choices {
            Some(Choices::Static {
                options,
                strict: true,
            }) => Some(options.iter().map(|o| o.value.clone()).collect()),
            _ => None,
        };

        Self {
            name: descriptor.name.clone(),
            value_type,
            multi: descriptor.multi,
            required: descriptor.is_required(),
            nullable: descriptor.nullable,
            minimum: descriptor.constraints.minimum,
            maximum: descriptor.constraints.maximum,
            pattern,
            strict_choices,
            children: descriptor.children().iter().map(Self::compile).collect(),
        }
    }

    /// Checks the value under this rule's name. `value` is `None` when the key is absent.
    fn check(&self, value: Option<&Value>, path: &FieldPath, out: &mut Vec<Violation>) {
        let Some(value) = value else {
            if self.required {
                out.push(Violation::new(path.clone(), ReasonCode::Required));
            }
            return;
        };

        if value.is_null() {
            if self.required || self.nullable == Some(false) {
                out.push(Violation::new(path.clone(), ReasonCode::Required));
            }
            return;
        }

        if self.multi {
            let Value::Array(items) = value else {
                out.push(Violation::new(path.clone(), ReasonCode::Type));
                return;
            };
            if items.is_empty() {
                if self.required {
                    out.push(Violation::new(path.clone(), ReasonCode::Required));
                }
                return;
            }
            for (index, item) in items.iter().enumerate() {
                self.check_element(item, &path.index(index), true, out);
            }
            return;
        }

        self.check_element(value, path, self.required, out);
    }

    /// Checks a single (non-list) value.
    fn check_element(
        &self,
        value: &Value,
        path: &FieldPath,
        required: bool,
        out: &mut Vec<Violation>,
    ) {
        if value.is_null() {
            if required || self.nullable == Some(false) {
                out.push(Violation::new(path.clone(), ReasonCode::Required));
            }
            return;
        }

        if self.value_type == ValueType::String && value.as_str() == Some("") {
            if required {
                out.push(Violation::new(path.clone(), ReasonCode::Required));
            }
            return;
        }

        if !self.type_matches(value) {
            out.push(Violation::new(path.clone(), ReasonCode::Type));
            return;
        }

        if let Value::Object(map) = value {
            self.check_children(map, path, out);
            return;
        }

        let reason = if !self.in_range(value) {
            Some(ReasonCode::Range)
        } else if !self.in_choices(value) {
            Some(ReasonCode::Choice)
        } else if !self.matches_pattern(value) {
            Some(ReasonCode::Pattern)
        } else {
            None
        };
        if let Some(reason) = reason {
            out.push(Violation::new(path.clone(), reason));
        }
    }

    fn check_children(&self, map: &Map<String, Value>, path: &FieldPath, out: &mut Vec<Violation>) {
        for child in &self.children {
            child.check(map.get(&child.name), &path.key(&child.name), out);
        }
    }

    fn type_matches(&self, value: &Value) -> bool {
        match self.value_type {
            ValueType::String => value.is_string(),
            // Whole floats such as `5.0` count, as they do for JSON Schema `integer`.
            ValueType::Integer | ValueType::Date => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            ValueType::Float => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Object => value.is_object(),
            ValueType::Any => true,
        }
    }

    /// Numbers and dates compare by value, strings by character count.
    fn in_range(&self, value: &Value) -> bool {
        if self.minimum.is_none() && self.maximum.is_none() {
            return true;
        }
        let measured = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if self.value_type == ValueType::String => {
                Some(s.chars().count() as f64)
            }
            _ => None,
        };
        let Some(measured) = measured else {
            return true;
        };
        self.minimum.is_none_or(|min| measured >= min)
            && self.maximum.is_none_or(|max| measured <= max)
    }

    fn in_choices(&self, value: &Value) -> bool {
        match &self.strict_choices {
            None => true,
            Some(allowed) => allowed.iter().any(|choice| same_choice(choice, value)),
        }
    }

    fn matches_pattern(&self, value: &Value) -> bool {
        match (&self.pattern, value) {
            (Some(pattern), Value::String(s)) => pattern.is_match(s),
            _ => true,
        }
    }
}

/// Numeric choices compare by value so that `1` and `1.0` are the same option.
fn same_choice(choice: &Value, value: &Value) -> bool {
    match (choice.as_f64(), value.as_f64()) {
        (Some(a), Some(b)) if choice.is_number() && value.is_number() => a == b,
        _ => choice == value,
    }
}

// --- PUBLIC API ---

/// Compiled checker for one command's parameters.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: Vec<FieldRule>,
}

impl Validator {
    pub fn new(parameters: &[ParameterDescriptor]) -> Self {
        Self {
            rules: parameters.iter().map(FieldRule::compile).collect(),
        }
    }

    /// Checks `model.parameters`. Instance selection and the job block are
    /// session concerns, see [`validate_instances`] and [`validate_job`].
    pub fn validate(&self, model: &CommandModel) -> ValidationResult {
        self.validate_parameters(&model.parameters)
    }

    /// Checks a bare parameters object.
    pub fn validate_parameters(&self, parameters: &Map<String, Value>) -> ValidationResult {
        let base = FieldPath::root().key(PARAMETERS_FIELD);
        let mut violations = Vec::new();
        for rule in &self.rules {
            rule.check(parameters.get(&rule.name), &base.key(&rule.name), &mut violations);
        }
        ValidationResult::from_violations(violations)
    }
}

/// One-shot form of [`Validator::validate`].
pub fn validate(parameters: &[ParameterDescriptor], model: &CommandModel) -> ValidationResult {
    Validator::new(parameters).validate(model)
}

/// Checks one value against a descriptor, as a declared default.
///
/// The value counts as given, so only the type and constraint rules apply
/// (plus `nullable: false` against an explicit null). Paths are rooted at the
/// descriptor name.
pub fn validate_value(descriptor: &ParameterDescriptor, value: &Value) -> ValidationResult {
    let mut rule = FieldRule::compile(descriptor);
    rule.required = false;
    let mut violations = Vec::new();
    rule.check(Some(value), &FieldPath::root().key(&descriptor.name), &mut violations);
    ValidationResult::from_violations(violations)
}

/// Instance selection: at least one name, each among the selectable ones.
pub fn validate_instances(selected: &[String], selectable: &[&str]) -> ValidationResult {
    let base = FieldPath::root().key(INSTANCE_NAMES_FIELD);
    if selected.is_empty() {
        return ValidationResult::Invalid(vec![Violation::new(base, ReasonCode::Required)]);
    }
    let violations = selected
        .iter()
        .enumerate()
        .filter(|(_, name)| !selectable.contains(&name.as_str()))
        .map(|(index, _)| Violation::new(base.index(index), ReasonCode::Choice))
        .collect();
    ValidationResult::from_violations(violations)
}

/// Job block: a name, a usable trigger, positive thresholds and an ordered date window.
pub fn validate_job(job: &JobConfig) -> ValidationResult {
    let base = FieldPath::root().key(JOB_FIELD);
    let trigger_path = base.key("trigger");
    let mut violations = Vec::new();

    if job.name.trim().is_empty() {
        violations.push(Violation::new(base.key("name"), ReasonCode::Required));
    }

    let window = match &job.trigger {
        Trigger::Interval(interval) => {
            let total = u64::from(interval.weeks)
                + u64::from(interval.days)
                + u64::from(interval.hours)
                + u64::from(interval.minutes)
                + u64::from(interval.seconds);
            if total == 0 {
                violations.push(Violation::new(trigger_path.clone(), ReasonCode::Required));
            }
            (interval.start_date, interval.end_date)
        }
        Trigger::Cron(cron) => {
            for (field, expression) in cron.fields() {
                let path = trigger_path.key(field);
                if expression.trim().is_empty() {
                    violations.push(Violation::new(path, ReasonCode::Required));
                } else if !is_cron_expression(expression) {
                    violations.push(Violation::new(path, ReasonCode::Pattern));
                }
            }
            (cron.start_date, cron.end_date)
        }
        Trigger::Date(date) => {
            if date.run_date.is_none() {
                violations.push(Violation::new(trigger_path.key("run_date"), ReasonCode::Required));
            }
            (None, None)
        }
    };

    if let (Some(start), Some(end)) = window
        && end < start
    {
        violations.push(Violation::new(trigger_path.key("end_date"), ReasonCode::Range));
    }

    for (field, count) in [("success_count", job.success_count), ("error_count", job.error_count)] {
        if count == Some(0) {
            violations.push(Violation::new(base.key(field), ReasonCode::Range));
        }
    }

    ValidationResult::from_violations(violations)
}

fn is_cron_expression(expression: &str) -> bool {
    expression
        .split(',')
        .all(|term| CRON_TERM_RE.is_match(term.trim()))
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CronTrigger, DateTrigger, IntervalTrigger};
    use serde_json::json;

    fn params(value: Value) -> Vec<ParameterDescriptor> {
        serde_json::from_value(value).unwrap()
    }

    fn model(parameters: Value) -> CommandModel {
        CommandModel {
            parameters: serde_json::from_value(parameters).unwrap(),
            ..Default::default()
        }
    }

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_empty_required_string_yields_single_required() {
        let p = params(json!([{"name": "message", "type": "String"}]));
        let result = validate(&p, &model(json!({"message": ""})));
        assert_eq!(
            result.violations(),
            &[Violation::new(path("parameters.message"), ReasonCode::Required)]
        );
    }

    #[test]
    fn test_integer_range() {
        let p = params(json!([{"name": "n", "type": "Integer", "minimum": 1, "maximum": 10}]));
        let validator = Validator::new(&p);
        assert_eq!(
            validator.validate(&model(json!({"n": 15}))).reason_at(&path("parameters.n")),
            Some(ReasonCode::Range)
        );
        assert!(validator.validate(&model(json!({"n": 5}))).is_valid());
    }

    #[test]
    fn test_rule_order_reports_first_failure_only() {
        let p = params(json!([{
            "name": "code", "type": "String", "maximum": 3, "regex": "^[0-9]+$"
        }]));
        // Too long and not numeric: range comes before pattern.
        let result = validate(&p, &model(json!({"code": "abcdef"})));
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.reason_at(&path("parameters.code")), Some(ReasonCode::Range));

        let result = validate(&p, &model(json!({"code": "ab"})));
        assert_eq!(result.reason_at(&path("parameters.code")), Some(ReasonCode::Pattern));
    }

    #[test]
    fn test_type_mismatch() {
        let p = params(json!([
            {"name": "count", "type": "Integer"},
            {"name": "flag", "type": "Boolean"},
            {"name": "ratio", "type": "Float"}
        ]));
        let result = validate(&p, &model(json!({"count": 1.5, "flag": "yes", "ratio": 2})));
        assert_eq!(result.reason_at(&path("parameters.count")), Some(ReasonCode::Type));
        assert_eq!(result.reason_at(&path("parameters.flag")), Some(ReasonCode::Type));
        assert_eq!(result.reason_at(&path("parameters.ratio")), None);
    }

    #[test]
    fn test_whole_floats_are_integers() {
        let p = params(json!([
            {"name": "count", "type": "Integer", "maximum": 10},
            {"name": "at", "type": "Date"}
        ]));
        let validator = Validator::new(&p);
        assert!(validator.validate(&model(json!({"count": 5.0, "at": 1700000000000.0}))).is_valid());
        assert_eq!(
            validator.validate(&model(json!({"count": 12.0, "at": 1}))).reason_at(&path("parameters.count")),
            Some(ReasonCode::Range)
        );
    }

    #[test]
    fn test_validation_is_exhaustive_across_fields() {
        let p = params(json!([
            {"name": "a", "type": "String"},
            {"name": "b", "type": "Integer", "maximum": 2},
            {"name": "c", "type": "String", "choices": ["x", "y"]}
        ]));
        let result = validate(&p, &model(json!({"b": 3, "c": "z"})));
        let reasons: Vec<_> = result.violations().iter().map(|v| v.reason).collect();
        assert_eq!(
            reasons,
            vec![ReasonCode::Required, ReasonCode::Range, ReasonCode::Choice]
        );
    }

    #[test]
    fn test_non_strict_and_numeric_choices() {
        let p = params(json!([
            {"name": "loose", "type": "String",
             "choices": {"type": "static", "value": ["a"], "strict": false}},
            {"name": "level", "type": "Float", "choices": [1, 2]}
        ]));
        let result = validate(&p, &model(json!({"loose": "b", "level": 2.0})));
        assert!(result.is_valid());
    }

    #[test]
    fn test_nullable_rules() {
        let p = params(json!([
            {"name": "when", "type": "Date", "optional": true, "nullable": false, "default": 0},
            {"name": "extra", "type": "Any", "optional": true},
            {"name": "must", "type": "Date"}
        ]));
        let result = validate(&p, &model(json!({"when": null, "extra": null, "must": null})));
        assert_eq!(result.reason_at(&path("parameters.when")), Some(ReasonCode::Required));
        assert_eq!(result.reason_at(&path("parameters.extra")), None);
        assert_eq!(result.reason_at(&path("parameters.must")), Some(ReasonCode::Required));
    }

    #[test]
    fn test_nested_dictionary_and_multi_paths() {
        let p = params(json!([{
            "name": "targets", "type": "Dictionary", "multi": true,
            "parameters": [
                {"name": "host", "type": "String"},
                {"name": "port", "type": "Integer", "minimum": 1, "maximum": 65535}
            ]
        }]));
        let result = validate(
            &p,
            &model(json!({"targets": [
                {"host": "a", "port": 22},
                {"host": "", "port": 70000}
            ]})),
        );
        assert_eq!(
            result.violations(),
            &[
                Violation::new(path("parameters.targets[1].host"), ReasonCode::Required),
                Violation::new(path("parameters.targets[1].port"), ReasonCode::Range),
            ]
        );
    }

    #[test]
    fn test_multi_constraints_apply_per_element() {
        let p = params(json!([{
            "name": "tags", "type": "String", "multi": true, "regex": "^[a-z]+$"
        }]));
        let result = validate(&p, &model(json!({"tags": ["ok", "NO"]})));
        assert_eq!(
            result.violations(),
            &[Violation::new(path("parameters.tags[1]"), ReasonCode::Pattern)]
        );

        let result = validate(&p, &model(json!({"tags": []})));
        assert_eq!(result.reason_at(&path("parameters.tags")), Some(ReasonCode::Required));

        let result = validate(&p, &model(json!({"tags": "ok"})));
        assert_eq!(result.reason_at(&path("parameters.tags")), Some(ReasonCode::Type));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let p = params(json!([{"name": "x", "type": "Integer", "maximum": 1}]));
        let m = model(json!({"x": 4}));
        let validator = Validator::new(&p);
        assert_eq!(validator.validate(&m), validator.validate(&m));
    }

    #[test]
    fn test_pattern_searches_anywhere() {
        let p = params(json!([{"name": "s", "type": "String", "regex": "b"}]));
        assert!(validate(&p, &model(json!({"s": "abc"}))).is_valid());
    }

    #[test]
    fn test_validate_instances() {
        let selectable = ["a", "b"];
        let empty = validate_instances(&[], &selectable);
        assert_eq!(empty.reason_at(&path("instance_names")), Some(ReasonCode::Required));

        let bad = validate_instances(&["a".into(), "zombie".into()], &selectable);
        assert_eq!(
            bad.violations(),
            &[Violation::new(path("instance_names[1]"), ReasonCode::Choice)]
        );
        assert!(validate_instances(&["b".into()], &selectable).is_valid());
    }

    #[test]
    fn test_validate_job_interval_and_name() {
        let job = JobConfig::default();
        let result = validate_job(&job);
        assert_eq!(result.reason_at(&path("job.name")), Some(ReasonCode::Required));
        assert_eq!(result.reason_at(&path("job.trigger")), Some(ReasonCode::Required));

        let job = JobConfig {
            name: "nightly".into(),
            trigger: Trigger::Interval(IntervalTrigger {
                hours: 24,
                start_date: Some(2_000),
                end_date: Some(1_000),
                ..Default::default()
            }),
            success_count: Some(0),
            ..Default::default()
        };
        let result = validate_job(&job);
        assert_eq!(result.reason_at(&path("job.trigger.end_date")), Some(ReasonCode::Range));
        assert_eq!(result.reason_at(&path("job.success_count")), Some(ReasonCode::Range));
        assert_eq!(result.violations().len(), 2);
    }

    #[test]
    fn test_validate_job_cron_and_date() {
        let cron = JobConfig {
            name: "c".into(),
            trigger: Trigger::Cron(CronTrigger {
                minute: "*/15".into(),
                day_of_week: "mon-fri,sun".into(),
                day: "last fri".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_job(&cron).is_valid());

        let broken = JobConfig {
            name: "c".into(),
            trigger: Trigger::Cron(CronTrigger {
                hour: "1-".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            validate_job(&broken).reason_at(&path("job.trigger.hour")),
            Some(ReasonCode::Pattern)
        );

        let date = JobConfig {
            name: "d".into(),
            trigger: Trigger::Date(DateTrigger::default()),
            ..Default::default()
        };
        assert_eq!(
            validate_job(&date).reason_at(&path("job.trigger.run_date")),
            Some(ReasonCode::Required)
        );
    }

    #[test]
    fn test_merge_keeps_order() {
        let a = ValidationResult::from_violations(vec![Violation::new(path("a"), ReasonCode::Type)]);
        let b = ValidationResult::from_violations(vec![Violation::new(path("b"), ReasonCode::Range)]);
        let merged = a.merge(ValidationResult::Valid).merge(b);
        assert_eq!(merged.violations().len(), 2);
        assert_eq!(merged.violations()[1].path, path("b"));
        assert!(ValidationResult::Valid.merge(ValidationResult::Valid).is_valid());
    }
}
