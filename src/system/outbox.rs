// src/system/outbox.rs

use crate::core::submission::{JobPatch, JobPayload, RequestPayload, Transport, TransportError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Writes payloads to `<root>/requests/<id>.json` and `<root>/jobs/<id>.json`.
/// Job patches go to `<root>/jobs/<job id>.patch-<uuid>.json`.
#[derive(Debug, Clone)]
pub struct OutboxTransport {
    root: PathBuf,
}

impl OutboxTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_json<T: Serialize + Sync>(
        &self,
        folder: &str,
        file_name: String,
        value: &T,
    ) -> Result<PathBuf, TransportError> {
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(file_name);
        let body = serde_json::to_vec_pretty(value)?;
        fs::write(&path, body).await?;
        log::debug!("Outbox wrote '{}'.", path.display());
        Ok(path)
    }
}

impl Transport for OutboxTransport {
    async fn create_request(&self, payload: &RequestPayload) -> Result<String, TransportError> {
        let id = Uuid::new_v4().to_string();
        self.write_json("requests", format!("{id}.json"), payload).await?;
        Ok(id)
    }

    async fn create_job(&self, payload: &JobPayload) -> Result<String, TransportError> {
        let id = Uuid::new_v4().to_string();
        self.write_json("jobs", format!("{id}.json"), payload).await?;
        Ok(id)
    }

    async fn patch_job(&self, job_id: &str, patch: &JobPatch) -> Result<(), TransportError> {
        if job_id.is_empty() || job_id.contains(['/', '\\']) || job_id.contains("..") {
            return Err(TransportError::Rejected {
                status: 400,
                message: format!("Invalid job id '{job_id}'."),
                details: None,
            });
        }
        let file_name = format!("{job_id}.patch-{}.json", Uuid::new_v4());
        self.write_json("jobs", file_name, patch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::submission::{self, SubmissionPlan};
    use serde_json::{Map, Value, json};
    use tempfile::tempdir;

    fn request(instance: &str) -> RequestPayload {
        RequestPayload {
            command: "say".into(),
            namespace: "default".into(),
            system: "echo".into(),
            system_version: "1.0.0".into(),
            instance_name: instance.into(),
            parameters: Map::new(),
            comment: Some("from test".into()),
        }
    }

    #[tokio::test]
    async fn test_requests_are_written_as_json() {
        let dir = tempdir().unwrap();
        let outbox = OutboxTransport::new(dir.path());
        let plan = SubmissionPlan::Requests(vec![request("a"), request("b")]);
        let outcome = submission::dispatch(&outbox, &plan).await.unwrap();
        assert_eq!(outcome.ids.len(), 2);

        let path = dir.path().join("requests").join(format!("{}.json", outcome.ids[1]));
        let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["instance_name"], json!("b"));
        assert_eq!(written["comment"], json!("from test"));
    }

    #[tokio::test]
    async fn test_patches_reject_path_like_ids() {
        let dir = tempdir().unwrap();
        let outbox = OutboxTransport::new(dir.path());
        outbox.patch_job("job-1", &JobPatch::pause()).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path().join("jobs")).unwrap().count(), 1);

        let error = outbox.patch_job("../x", &JobPatch::resume()).await.unwrap_err();
        assert!(matches!(error, TransportError::Rejected { status: 400, .. }));
    }
}
