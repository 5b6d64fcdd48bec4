// src/core/submission.rs

//! Turns a valid command model into create-request / create-job payloads and
//! dispatches them through an external [`Transport`].

use crate::{
    constants::{JOB_CREATE_ACTION, JOBS_ROUTE, REQUEST_CREATE_ACTION, REQUESTS_ROUTE},
    models::{CommandModel, JobConfig, SystemRef, Trigger},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use thiserror::Error;

// --- PAYLOADS ---

/// Body of a create-request call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestPayload {
    pub command: String,
    pub namespace: String,
    pub system: String,
    pub system_version: String,
    pub instance_name: String,
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Status a job is created with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Paused,
}

/// Body of a create-job call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobPayload {
    pub name: String,
    #[serde(flatten)]
    pub trigger: Trigger,
    pub request_template: RequestPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u32>,
    pub status: JobStatus,
}

/// Everything one submission sends, one payload per selected instance.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPlan {
    Requests(Vec<RequestPayload>),
    Jobs(Vec<JobPayload>),
}

impl SubmissionPlan {
    pub fn len(&self) -> usize {
        match self {
            Self::Requests(items) => items.len(),
            Self::Jobs(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Permission action needed to send this plan.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Requests(_) => REQUEST_CREATE_ACTION,
            Self::Jobs(_) => JOB_CREATE_ACTION,
        }
    }

    /// The payloads as JSON documents, in dispatch order.
    pub fn to_json(&self) -> Result<Vec<Value>, serde_json::Error> {
        match self {
            Self::Requests(items) => items.iter().map(serde_json::to_value).collect(),
            Self::Jobs(items) => items.iter().map(serde_json::to_value).collect(),
        }
    }
}

/// Builds the payloads for `model`. A model with a job block yields jobs.
///
/// Requests carry the comment only when it is non-blank. Jobs are suffixed
/// with the instance name when more than one instance is selected, and are
/// created paused when the model asks for a request template.
pub fn build_plan(system: &SystemRef, command: &str, model: &CommandModel) -> SubmissionPlan {
    let request_for = |instance_name: &str, comment: Option<String>| RequestPayload {
        command: command.to_string(),
        namespace: system.namespace.clone(),
        system: system.name.clone(),
        system_version: system.version.clone(),
        instance_name: instance_name.to_string(),
        parameters: model.parameters.clone(),
        comment,
    };

    match &model.job {
        None => {
            let comment = model
                .comment
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            SubmissionPlan::Requests(
                model
                    .instance_names
                    .iter()
                    .map(|name| request_for(name, comment.clone()))
                    .collect(),
            )
        }
        Some(job) => {
            let fan_out = model.instance_names.len() > 1;
            SubmissionPlan::Jobs(
                model
                    .instance_names
                    .iter()
                    .map(|instance| job_payload(job, request_for(instance, None), fan_out))
                    .collect(),
            )
        }
    }
}

fn job_payload(job: &JobConfig, template: RequestPayload, suffix: bool) -> JobPayload {
    let name = if suffix {
        format!("{}-{}", job.name, template.instance_name)
    } else {
        job.name.clone()
    };
    JobPayload {
        name,
        trigger: job.trigger.clone(),
        request_template: template,
        success_count: job.success_count,
        error_count: job.error_count,
        status: if job.request_template {
            JobStatus::Paused
        } else {
            JobStatus::Running
        },
    }
}

// --- JOB CONTROL ---

/// One operation of a patch document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PatchOperation {
    pub operation: String,
    pub path: String,
    pub value: Value,
}

/// Patch document for an existing job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobPatch {
    pub operations: Vec<PatchOperation>,
}

impl JobPatch {
    fn status(status: JobStatus) -> Self {
        Self {
            operations: vec![PatchOperation {
                operation: "update".to_string(),
                path: "/status".to_string(),
                value: serde_json::to_value(status).unwrap_or(Value::Null),
            }],
        }
    }

    pub fn pause() -> Self {
        Self::status(JobStatus::Paused)
    }

    pub fn resume() -> Self {
        Self::status(JobStatus::Running)
    }
}

// --- TRANSPORT ---

/// Failure reported by (or on the way to) the backend.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("The server rejected the submission (status {status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        details: Option<Value>,
    },
    #[error("The server could not be reached: {0}")]
    Unreachable(String),
    #[error("Permission '{action}' is missing for system '{system}'.")]
    Forbidden { action: String, system: String },
    #[error("I/O error while submitting: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not encode the payload: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// The backend collaborator. Each call returns the id of the created entity.
pub trait Transport {
    fn create_request(
        &self,
        payload: &RequestPayload,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    fn create_job(
        &self,
        payload: &JobPayload,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    fn patch_job(
        &self,
        job_id: &str,
        patch: &JobPatch,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Opaque permission check, keyed by action, namespace and system id.
pub trait PermissionOracle {
    fn has_system_permission(&self, action: &str, namespace: &str, system_id: &str) -> bool;
}

/// Fails with [`TransportError::Forbidden`] when the plan's action is not allowed.
pub fn authorize<P: PermissionOracle + ?Sized>(
    oracle: &P,
    system: &SystemRef,
    plan: &SubmissionPlan,
) -> Result<(), TransportError> {
    let action = plan.action();
    if oracle.has_system_permission(action, &system.namespace, &system.id) {
        Ok(())
    } else {
        Err(TransportError::Forbidden {
            action: action.to_string(),
            system: system.name.clone(),
        })
    }
}

/// What was created.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CreatedKind {
    Request,
    Job,
}

/// Ids of everything a successful submission created.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub kind: CreatedKind,
    pub ids: Vec<String>,
}

impl SubmitOutcome {
    /// Where to navigate next: the first created entity.
    pub fn redirect_path(&self) -> Option<String> {
        let route = match self.kind {
            CreatedKind::Request => REQUESTS_ROUTE,
            CreatedKind::Job => JOBS_ROUTE,
        };
        self.ids.first().map(|id| format!("{route}/{id}"))
    }
}

/// Sends every payload of the plan in order. Stops at the first failure;
/// nothing is retried.
pub async fn dispatch<T: Transport + ?Sized>(
    transport: &T,
    plan: &SubmissionPlan,
) -> Result<SubmitOutcome, TransportError> {
    let mut ids = Vec::with_capacity(plan.len());
    let kind = match plan {
        SubmissionPlan::Requests(payloads) => {
            for payload in payloads {
                match transport.create_request(payload).await {
                    Ok(id) => ids.push(id),
                    Err(e) => return Err(abort(&ids, e)),
                }
            }
            CreatedKind::Request
        }
        SubmissionPlan::Jobs(payloads) => {
            for payload in payloads {
                match transport.create_job(payload).await {
                    Ok(id) => ids.push(id),
                    Err(e) => return Err(abort(&ids, e)),
                }
            }
            CreatedKind::Job
        }
    };
    log::debug!("Dispatched {} payload(s): {:?}", ids.len(), ids);
    Ok(SubmitOutcome { kind, ids })
}

fn abort(created: &[String], error: TransportError) -> TransportError {
    if !created.is_empty() {
        log::warn!(
            "Submission stopped after creating {} item(s) {:?}: {}",
            created.len(),
            created,
            error
        );
    }
    error
}

// --- ALERTS ---

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// User-facing notification derived from a submission outcome.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub severity: Severity,
    pub message: String,
    pub do_not_auto_dismiss: bool,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
            do_not_auto_dismiss: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            do_not_auto_dismiss: true,
        }
    }
}

impl From<&TransportError> for Alert {
    /// Server messages are shown verbatim, followed by any structured details.
    fn from(error: &TransportError) -> Self {
        match error {
            TransportError::Rejected {
                message,
                details: Some(details),
                ..
            } => {
                let details = serde_json::to_string_pretty(details).unwrap_or_default();
                Self::error(format!("{message}\n{details}"))
            }
            TransportError::Rejected { message, .. } => Self::error(message.clone()),
            other => Self::error(other.to_string()),
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CronTrigger, IntervalTrigger};
    use serde_json::json;
    use std::sync::Mutex;

    fn system() -> SystemRef {
        SystemRef {
            id: "sys-1".into(),
            name: "echo".into(),
            namespace: "default".into(),
            version: "1.0.0".into(),
        }
    }

    fn model(instances: &[&str]) -> CommandModel {
        CommandModel {
            instance_names: instances.iter().map(|s| s.to_string()).collect(),
            parameters: serde_json::from_value(json!({"message": "hi"})).unwrap(),
            comment: Some("  ".into()),
            job: None,
        }
    }

    /// Records payloads and fails on the configured call number.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Value>>,
        fail_on: Option<usize>,
    }

    impl RecordingTransport {
        fn record(&self, value: Value) -> Result<String, TransportError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_on == Some(sent.len()) {
                return Err(TransportError::Rejected {
                    status: 400,
                    message: "bad parameter".into(),
                    details: Some(json!({"field": "message"})),
                });
            }
            sent.push(value);
            Ok(format!("id-{}", sent.len()))
        }
    }

    impl Transport for RecordingTransport {
        async fn create_request(&self, payload: &RequestPayload) -> Result<String, TransportError> {
            self.record(serde_json::to_value(payload)?)
        }

        async fn create_job(&self, payload: &JobPayload) -> Result<String, TransportError> {
            self.record(serde_json::to_value(payload)?)
        }

        async fn patch_job(&self, _job_id: &str, patch: &JobPatch) -> Result<(), TransportError> {
            self.record(serde_json::to_value(patch)?).map(|_| ())
        }
    }

    #[test]
    fn test_request_plan_fans_out_per_instance() {
        let plan = build_plan(&system(), "say", &model(&["a", "b"]));
        let SubmissionPlan::Requests(requests) = &plan else {
            panic!("expected requests");
        };
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].instance_name, "b");
        assert_eq!(requests[0].comment, None);
        assert_eq!(plan.action(), REQUEST_CREATE_ACTION);

        let json = serde_json::to_value(&requests[0]).unwrap();
        assert_eq!(
            json,
            json!({
                "command": "say", "namespace": "default", "system": "echo",
                "system_version": "1.0.0", "instance_name": "a",
                "parameters": {"message": "hi"}
            })
        );
    }

    #[test]
    fn test_job_plan_names_and_status() {
        let mut m = model(&["a", "b"]);
        m.comment = None;
        m.job = Some(JobConfig {
            name: "nightly".into(),
            trigger: Trigger::Cron(CronTrigger {
                hour: "2".into(),
                ..Default::default()
            }),
            success_count: Some(3),
            request_template: true,
            ..Default::default()
        });
        let plan = build_plan(&system(), "say", &m);
        let SubmissionPlan::Jobs(jobs) = &plan else {
            panic!("expected jobs");
        };
        assert_eq!(jobs[0].name, "nightly-a");
        assert_eq!(jobs[1].name, "nightly-b");
        assert_eq!(jobs[0].status, JobStatus::Paused);

        let json = serde_json::to_value(&jobs[0]).unwrap();
        assert_eq!(json["trigger_type"], json!("cron"));
        assert_eq!(json["trigger"]["hour"], json!("2"));
        assert_eq!(json["status"], json!("PAUSED"));
        assert_eq!(json["success_count"], json!(3));
        assert!(json.get("error_count").is_none());
        assert_eq!(json["request_template"]["instance_name"], json!("a"));
    }

    #[test]
    fn test_single_instance_job_keeps_its_name() {
        let mut m = model(&["only"]);
        m.job = Some(JobConfig {
            name: "hourly".into(),
            trigger: Trigger::Interval(IntervalTrigger {
                hours: 1,
                ..Default::default()
            }),
            ..Default::default()
        });
        let SubmissionPlan::Jobs(jobs) = build_plan(&system(), "say", &m) else {
            panic!("expected jobs");
        };
        assert_eq!(jobs[0].name, "hourly");
        assert_eq!(jobs[0].status, JobStatus::Running);
    }

    #[test]
    fn test_job_patch_documents() {
        assert_eq!(
            serde_json::to_value(JobPatch::pause()).unwrap(),
            json!({"operations": [{"operation": "update", "path": "/status", "value": "PAUSED"}]})
        );
        assert_eq!(JobPatch::resume().operations[0].value, json!("RUNNING"));
    }

    #[tokio::test]
    async fn test_dispatch_reports_ids_and_redirect() {
        let transport = RecordingTransport::default();
        let plan = build_plan(&system(), "say", &model(&["a", "b"]));
        let outcome = dispatch(&transport, &plan).await.unwrap();
        assert_eq!(outcome.ids, vec!["id-1", "id-2"]);
        assert_eq!(outcome.redirect_path().as_deref(), Some("/requests/id-1"));
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_stops_at_first_failure() {
        let transport = RecordingTransport {
            fail_on: Some(1),
            ..Default::default()
        };
        let plan = build_plan(&system(), "say", &model(&["a", "b", "c"]));
        let error = dispatch(&transport, &plan).await.unwrap_err();
        assert!(matches!(error, TransportError::Rejected { status: 400, .. }));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);

        let alert = Alert::from(&error);
        assert_eq!(alert.severity, Severity::Error);
        assert!(alert.do_not_auto_dismiss);
        assert!(alert.message.starts_with("bad parameter"));
        assert!(alert.message.contains("\"field\""));
    }

    #[test]
    fn test_authorize() {
        struct Deny;
        impl PermissionOracle for Deny {
            fn has_system_permission(&self, _: &str, _: &str, _: &str) -> bool {
                false
            }
        }
        let plan = build_plan(&system(), "say", &model(&["a"]));
        assert!(matches!(
            authorize(&Deny, &system(), &plan),
            Err(TransportError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_alert_serializes_camel_case() {
        let json = serde_json::to_value(Alert::success("done")).unwrap();
        assert_eq!(
            json,
            json!({"severity": "success", "message": "done", "doNotAutoDismiss": false})
        );
    }
}
