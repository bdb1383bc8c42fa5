use serde::{Deserialize, Serialize};

use crate::domain::CorrelationId;
use crate::error::ModelResult;
use crate::job::JobStatus;

/// Transient per-step status event exchanged between scheduler and solver.
///
/// Wire shape: `{"name", "correlationId", "step", "status"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    pub name: String,
    pub correlation_id: CorrelationId,
    #[serde(default)]
    pub step: String,
    pub status: JobStatus,
}

impl JobUpdate {
    pub fn from_slice(bytes: &[u8]) -> ModelResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec(&self) -> ModelResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == JobStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelError;

    #[test]
    fn wire_shape_is_exact() {
        let update = JobUpdate {
            name: "render".into(),
            correlation_id: CorrelationId::new("job-42").unwrap(),
            step: "A".into(),
            status: JobStatus::InProgress,
        };
        let json = String::from_utf8(update.to_vec().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"name":"render","correlationId":"job-42","step":"A","status":"InProgress"}"#
        );
    }

    #[test]
    fn decodes_foreign_documents() {
        let raw = br#"{"step":"B","status":"In Progress","correlationId":"job-7","name":"n","extra":1}"#;
        let update = JobUpdate::from_slice(raw).unwrap();
        assert_eq!(update.status, JobStatus::InProgress);
        assert_eq!(update.step, "B");
    }

    #[test]
    fn unknown_status_is_a_serialization_error() {
        let raw = br#"{"name":"n","correlationId":"job-7","step":"B","status":"Paused"}"#;
        match JobUpdate::from_slice(raw) {
            Err(ModelError::Serialization(msg)) => assert!(msg.contains("Paused"), "{msg}"),
            other => panic!("expected Serialization error, got {other:?}"),
        }
    }
}
