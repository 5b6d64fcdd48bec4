// src/core/session.rs

//! One command invocation attempt, from opening the form to the submit outcome.
//!
//! ```text
//! Empty -> Editing -> Validating -> {Valid, Invalid} -> Submitting -> {Succeeded, Failed}
//! ```
//!
//! Edits are accepted in `Editing`, `Valid`, `Invalid` and `Failed` and always
//! move the session back to `Editing`. Validation is recomputed from the full
//! model after every edit, so [`FormSession::validation`] is never stale.
//! Dispatch happens outside the session: [`FormSession::begin_submit`] hands
//! out a [`SubmitTicket`] and [`FormSession::complete_submit`] applies the
//! result, dropping it when the session was closed or reopened meanwhile.

use crate::{
    LivenessToken,
    constants::{COMMENT_FIELD, INSTANCE_NAMES_FIELD, JOB_FIELD, PARAMETERS_FIELD},
    core::{
        coerce::{self, Target},
        commons::{is_alive, new_liveness_token, revoke, same_live_token},
        field_path::{self, FieldPath, FieldPathError, PathSegment},
        model_builder,
        schema_builder::{self, Schema},
        submission::{
            self, Alert, PermissionOracle, SubmissionPlan, SubmitOutcome, Transport,
            TransportError,
        },
        validator::{self, ValidationResult, Validator},
    },
    models::{
        Command, CommandModel, FormOptions, Instance, JobConfig, Mode, PriorRequest, System,
        SystemRef, Trigger, TriggerKind,
    },
};
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, fmt};
use thiserror::Error;
use uuid::Uuid;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    Editing,
    Validating,
    Valid,
    Invalid,
    Submitting,
    Succeeded,
    Failed,
}

impl SessionState {
    /// States in which the model may be edited or submitted.
    pub fn accepts_edits(self) -> bool {
        matches!(self, Self::Editing | Self::Valid | Self::Invalid | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Empty => "empty",
            Self::Editing => "editing",
            Self::Validating => "validating",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No command is open in this form.")]
    NotOpen,
    #[error("The form cannot be edited while it is {0}.")]
    Locked(SessionState),
    #[error("The form cannot be submitted while it is {0}.")]
    NotSubmittable(SessionState),
    #[error("The form has {} invalid field(s).", .0.violations().len())]
    Invalid(ValidationResult),
    #[error(transparent)]
    Path(#[from] FieldPathError),
    #[error("No field is declared at '{0}'.")]
    UnknownField(String),
    #[error("Value for '{path}' has the wrong shape: {reason}")]
    BadValue { path: String, reason: String },
    #[error("Session token '{0}' is unknown or was already claimed.")]
    UnknownToken(Uuid),
    #[error("Session belongs to '{expected}', not '{found}'.")]
    RouteMismatch {
        expected: RouteContext,
        found: RouteContext,
    },
}

// --- CONTEXT ---

/// The `namespace/system/version/command` a form is bound to.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteContext {
    pub namespace: String,
    pub system: String,
    pub version: String,
    pub command: String,
}

impl RouteContext {
    /// Parses `namespace/system/version/command`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim_matches('/').split('/');
        let route = Self {
            namespace: parts.next()?.to_string(),
            system: parts.next()?.to_string(),
            version: parts.next()?.to_string(),
            command: parts.next()?.to_string(),
        };
        let complete = parts.next().is_none()
            && [&route.namespace, &route.system, &route.version, &route.command]
                .iter()
                .all(|part| !part.is_empty());
        complete.then_some(route)
    }
}

impl fmt::Display for RouteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.namespace, self.system, self.version, self.command
        )
    }
}

/// What a form is opened for.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub system: SystemRef,
    pub command: Command,
    pub instances: Vec<Instance>,
    pub mode: Mode,
    pub options: FormOptions,
}

impl SessionContext {
    pub fn new(system: &System, command: &Command, mode: Mode) -> Self {
        Self {
            system: SystemRef::from(system),
            command: command.clone(),
            instances: system.instances.clone(),
            mode,
            options: FormOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    pub fn route(&self) -> RouteContext {
        RouteContext {
            namespace: self.system.namespace.clone(),
            system: self.system.name.clone(),
            version: self.system.version.clone(),
            command: self.command.name.clone(),
        }
    }

    fn selectable_names(&self) -> Vec<&str> {
        self.options
            .instance_filter
            .selectable(&self.instances)
            .into_iter()
            .map(|i| i.name.as_str())
            .collect()
    }
}

/// Everything derived from the context when a form opens.
#[derive(Debug, Clone)]
struct OpenForm {
    context: SessionContext,
    schema: Schema,
    validator: Validator,
}

// --- SUBMISSION HANDSHAKE ---

/// Handed out by [`FormSession::begin_submit`]; carries what to dispatch.
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    pub system: SystemRef,
    pub plan: SubmissionPlan,
    liveness: LivenessToken,
}

impl SubmitTicket {
    /// False once the issuing session has been closed or reopened.
    pub fn is_live(&self) -> bool {
        is_alive(&self.liveness)
    }
}

/// How [`FormSession::complete_submit`] handled a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded(Alert),
    Failed(Alert),
    /// The ticket is stale; the result was dropped.
    Ignored,
}

// --- SESSION ---

/// Owner of one command model and its lifecycle.
#[derive(Debug)]
pub struct FormSession {
    state: SessionState,
    form: Option<OpenForm>,
    model: CommandModel,
    validation: ValidationResult,
    alert: Option<Alert>,
    outcome: Option<SubmitOutcome>,
    liveness: LivenessToken,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    /// An empty session with nothing open.
    pub fn new() -> Self {
        Self {
            state: SessionState::Empty,
            form: None,
            model: CommandModel::default(),
            validation: ValidationResult::Valid,
            alert: None,
            outcome: None,
            liveness: new_liveness_token(),
        }
    }

    /// Opens a fresh form for `context`, replacing whatever was open.
    pub fn open(&mut self, context: SessionContext) {
        let model = model_builder::build_model_with(
            &context.command.parameters,
            &context.instances,
            context.mode,
            &context.options,
        );
        self.install(context, model);
    }

    /// Opens an immediate-mode form seeded from a prior request.
    pub fn replay(&mut self, mut context: SessionContext, prior: &PriorRequest) {
        context.mode = Mode::Immediate;
        let model = model_builder::replay_model(
            &context.command.parameters,
            &context.instances,
            prior,
            &context.options,
        );
        self.install(context, model);
    }

    fn install(&mut self, context: SessionContext, model: CommandModel) {
        revoke(&self.liveness);
        self.liveness = new_liveness_token();

        let schema = schema_builder::build_schema_with(
            &context.instances,
            &context.command.parameters,
            context.mode,
            &context.options,
        );
        let validator = Validator::new(&context.command.parameters);
        log::debug!("Opening form for '{}' ({:?}).", context.route(), context.mode);

        self.form = Some(OpenForm {
            context,
            schema,
            validator,
        });
        self.model = model;
        self.alert = None;
        self.outcome = None;
        self.state = SessionState::Editing;
        self.recompute();
    }

    /// Drops the open form. In-flight submissions become stale.
    pub fn close(&mut self) {
        revoke(&self.liveness);
        *self = Self::new();
    }

    // --- Accessors ---

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model(&self) -> &CommandModel {
        &self.model
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn outcome(&self) -> Option<&SubmitOutcome> {
        self.outcome.as_ref()
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.form.as_ref().map(|f| &f.schema)
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.form.as_ref().map(|f| &f.context)
    }

    pub fn route(&self) -> Option<RouteContext> {
        self.context().map(SessionContext::route)
    }

    /// Whether a submit would be attempted: editable state, valid model, permission granted.
    pub fn can_submit<P: PermissionOracle + ?Sized>(&self, oracle: &P) -> bool {
        let Some(form) = &self.form else {
            return false;
        };
        let action = match form.context.mode {
            Mode::Immediate => crate::constants::REQUEST_CREATE_ACTION,
            Mode::Job => crate::constants::JOB_CREATE_ACTION,
        };
        self.state.accepts_edits()
            && self.validation.is_valid()
            && oracle.has_system_permission(
                action,
                &form.context.system.namespace,
                &form.context.system.id,
            )
    }

    // --- Edits ---

    fn begin_edit(&self) -> Result<&OpenForm, SessionError> {
        if !self.state.accepts_edits() {
            return Err(match self.state {
                SessionState::Empty => SessionError::NotOpen,
                other => SessionError::Locked(other),
            });
        }
        self.form.as_ref().ok_or(SessionError::NotOpen)
    }

    fn finish_edit(&mut self) {
        self.state = SessionState::Editing;
        self.recompute();
    }

    /// Sets the value at a field path (`parameters.x`, `job.trigger.hours`, `comment`, ...).
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<(), SessionError> {
        let path = FieldPath::parse(path)?;
        self.begin_edit()?;
        self.write(&path, value)?;
        self.finish_edit();
        Ok(())
    }

    /// Sets a field from user-typed text, coerced to the declared type.
    pub fn set_text(&mut self, path: &str, text: &str) -> Result<(), SessionError> {
        let parsed = FieldPath::parse(path)?;
        let form = self.begin_edit()?;
        let value = match parsed.head() {
            Some(PARAMETERS_FIELD) => {
                let target = parameter_target(form, &parsed)?;
                coerce::coerce_text(target, text)
            }
            Some(COMMENT_FIELD) => Value::String(text.to_string()),
            _ => serde_json::from_str(text.trim()).unwrap_or_else(|_| Value::String(text.to_string())),
        };
        self.write(&parsed, value)?;
        self.finish_edit();
        Ok(())
    }

    /// Appends an empty element to a multi parameter.
    pub fn push_element(&mut self, path: &str) -> Result<(), SessionError> {
        let parsed = FieldPath::parse(path)?;
        let form = self.begin_edit()?;
        let target = parameter_target(form, &parsed)?;
        if !target.descriptor.multi || target.element {
            return Err(FieldPathError::NotAList(parsed.to_string()).into());
        }
        let element = model_builder::empty_element(target.descriptor);
        self.list_at(&parsed)?.push(element);
        self.finish_edit();
        Ok(())
    }

    /// Removes one element of a multi parameter.
    pub fn remove_element(&mut self, path: &str, index: usize) -> Result<(), SessionError> {
        let parsed = FieldPath::parse(path)?;
        let form = self.begin_edit()?;
        let target = parameter_target(form, &parsed)?;
        if !target.descriptor.multi || target.element {
            return Err(FieldPathError::NotAList(parsed.to_string()).into());
        }
        let items = self.list_at(&parsed)?;
        if index >= items.len() {
            return Err(FieldPathError::Missing(parsed.index(index).to_string()).into());
        }
        items.remove(index);
        self.finish_edit();
        Ok(())
    }

    pub fn set_instances(&mut self, names: Vec<String>) -> Result<(), SessionError> {
        self.begin_edit()?;
        self.model.instance_names = names;
        self.finish_edit();
        Ok(())
    }

    /// Only immediate-mode forms carry a comment.
    pub fn set_comment(&mut self, comment: impl Into<String>) -> Result<(), SessionError> {
        self.begin_edit()?;
        if self.model.job.is_some() {
            return Err(SessionError::UnknownField(COMMENT_FIELD.to_string()));
        }
        self.model.comment = Some(comment.into());
        self.finish_edit();
        Ok(())
    }

    /// Switches the job trigger kind; the arguments reset to that kind's defaults.
    pub fn set_trigger_kind(&mut self, kind: TriggerKind) -> Result<(), SessionError> {
        self.begin_edit()?;
        let job = self
            .model
            .job
            .as_mut()
            .ok_or_else(|| SessionError::UnknownField(JOB_FIELD.to_string()))?;
        if job.trigger.kind() != kind {
            job.trigger = Trigger::for_kind(kind);
        }
        self.finish_edit();
        Ok(())
    }

    /// Installs a complete model as written, without filling absent fields from defaults.
    /// A job-mode form keeps its current job block when `model` carries none.
    pub fn replace_model(&mut self, model: CommandModel) -> Result<(), SessionError> {
        let form = self.begin_edit()?;
        let job_mode = form.context.mode == Mode::Job;
        if !job_mode && model.job.is_some() {
            return Err(SessionError::UnknownField(JOB_FIELD.to_string()));
        }
        if job_mode && model.comment.is_some() {
            return Err(SessionError::UnknownField(COMMENT_FIELD.to_string()));
        }

        let job = match model.job {
            Some(job) => Some(job),
            None => self.model.job.take(),
        };
        self.model = CommandModel { job, ..model };
        self.finish_edit();
        Ok(())
    }

    fn write(&mut self, path: &FieldPath, value: Value) -> Result<(), SessionError> {
        let shape = |reason: String| SessionError::BadValue {
            path: path.to_string(),
            reason,
        };
        match path.head() {
            Some(PARAMETERS_FIELD) => {
                let form = self.form.as_ref().ok_or(SessionError::NotOpen)?;
                parameter_target(form, path)?;
                let mut root = Value::Object(std::mem::take(&mut self.model.parameters));
                let written = field_path::set_at(&mut root, path.tail(), value);
                if let Value::Object(map) = root {
                    self.model.parameters = map;
                }
                written?;
            }
            Some(INSTANCE_NAMES_FIELD) => {
                let mut root = serde_json::to_value(&self.model.instance_names)
                    .map_err(|e| shape(e.to_string()))?;
                field_path::set_at(&mut root, path.tail(), value)?;
                self.model.instance_names =
                    serde_json::from_value(root).map_err(|e| shape(e.to_string()))?;
            }
            Some(COMMENT_FIELD) if path.tail().is_empty() && self.model.job.is_none() => {
                let Value::String(text) = value else {
                    return Err(shape("expected text".to_string()));
                };
                self.model.comment = Some(text);
            }
            Some(JOB_FIELD) if self.model.job.is_some() => {
                let mut root = serde_json::to_value(&self.model.job)
                    .map_err(|e| shape(e.to_string()))?;
                field_path::set_at(&mut root, path.tail(), value)?;
                let job: JobConfig =
                    serde_json::from_value(root).map_err(|e| shape(e.to_string()))?;
                self.model.job = Some(job);
            }
            _ => return Err(SessionError::UnknownField(path.to_string())),
        }
        Ok(())
    }

    fn list_at(&mut self, path: &FieldPath) -> Result<&mut Vec<Value>, SessionError> {
        let missing = || FieldPathError::Missing(path.to_string());
        let (first, rest) = path.tail().split_first().ok_or_else(missing)?;
        let PathSegment::Key(name) = first else {
            return Err(missing().into());
        };
        let slot = self.model.parameters.get_mut(name).ok_or_else(missing)?;
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        match field_path::get_at_mut(slot, rest) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(FieldPathError::NotAList(path.to_string()).into()),
            None => Err(missing().into()),
        }
    }

    fn recompute(&mut self) {
        let Some(form) = &self.form else {
            self.validation = ValidationResult::Valid;
            return;
        };
        let selectable = form.context.selectable_names();
        let mut result = form
            .validator
            .validate(&self.model)
            .merge(validator::validate_instances(&self.model.instance_names, &selectable));
        if let Some(job) = &self.model.job {
            result = result.merge(validator::validate_job(job));
        }
        self.validation = result;
    }

    /// Runs validation and settles into `Valid` or `Invalid`.
    pub fn validate(&mut self) -> &ValidationResult {
        if self.state.accepts_edits() {
            self.state = SessionState::Validating;
            self.recompute();
            self.state = if self.validation.is_valid() {
                SessionState::Valid
            } else {
                SessionState::Invalid
            };
        }
        &self.validation
    }

    // --- Submission ---

    /// Validates and, if the model is valid, enters `Submitting` and returns what to dispatch.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, SessionError> {
        if !self.state.accepts_edits() {
            return Err(SessionError::NotSubmittable(self.state));
        }
        if !self.validate().is_valid() {
            log::debug!("Submit blocked: {} violation(s).", self.validation.violations().len());
            return Err(SessionError::Invalid(self.validation.clone()));
        }
        let form = self.form.as_ref().ok_or(SessionError::NotOpen)?;
        let plan = submission::build_plan(&form.context.system, &form.context.command.name, &self.model);
        let ticket = SubmitTicket {
            system: form.context.system.clone(),
            plan,
            liveness: self.liveness.clone(),
        };
        self.state = SessionState::Submitting;
        Ok(ticket)
    }

    /// Applies a dispatch result. Stale tickets are ignored.
    pub fn complete_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<SubmitOutcome, TransportError>,
    ) -> Completion {
        if !same_live_token(&ticket.liveness, &self.liveness)
            || self.state != SessionState::Submitting
        {
            log::debug!("Dropping the result of a stale submission.");
            return Completion::Ignored;
        }
        match result {
            Ok(outcome) => {
                let alert = Alert::success(format!("Created {} item(s).", outcome.ids.len()));
                self.outcome = Some(outcome);
                self.alert = Some(alert.clone());
                self.state = SessionState::Succeeded;
                Completion::Succeeded(alert)
            }
            Err(error) => {
                log::warn!("Submission failed: {}", error);
                let alert = Alert::from(&error);
                self.alert = Some(alert.clone());
                self.state = SessionState::Failed;
                Completion::Failed(alert)
            }
        }
    }

    /// Full submit: permission check, dispatch through `transport`, outcome applied.
    pub async fn submit<T, P>(
        &mut self,
        transport: &T,
        oracle: &P,
    ) -> Result<Completion, SessionError>
    where
        T: Transport + ?Sized,
        P: PermissionOracle + ?Sized,
    {
        let ticket = self.begin_submit()?;
        let result = match submission::authorize(oracle, &ticket.system, &ticket.plan) {
            Ok(()) => submission::dispatch(transport, &ticket.plan).await,
            Err(e) => Err(e),
        };
        Ok(self.complete_submit(ticket, result))
    }
}

fn parameter_target<'a>(form: &'a OpenForm, path: &FieldPath) -> Result<Target<'a>, SessionError> {
    if path.head() != Some(PARAMETERS_FIELD) {
        return Err(SessionError::UnknownField(path.to_string()));
    }
    coerce::resolve_descriptor(&form.context.command.parameters, path.tail())
        .ok_or_else(|| SessionError::UnknownField(path.to_string()))
}

// --- SESSION STORE ---

/// Sessions handed from one view to another, keyed by a navigation token.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, FormSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a session and returns the token to claim it with.
    pub fn stash(&mut self, session: FormSession) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.insert(token, session);
        token
    }

    /// Releases the session only to a view showing the same command.
    /// On a mismatch the session stays stored.
    pub fn claim(&mut self, token: Uuid, route: &RouteContext) -> Result<FormSession, SessionError> {
        let session = self
            .sessions
            .get(&token)
            .ok_or(SessionError::UnknownToken(token))?;
        let expected = session.route().ok_or(SessionError::NotOpen)?;
        if &expected != route {
            return Err(SessionError::RouteMismatch {
                expected,
                found: route.clone(),
            });
        }
        self.sessions
            .remove(&token)
            .ok_or(SessionError::UnknownToken(token))
    }

    /// Drops a stored session, making its pending submissions stale.
    pub fn discard(&mut self, token: Uuid) -> bool {
        match self.sessions.remove(&token) {
            Some(mut session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// MARK: --- UNIT TESTS ---
