use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::job::{Job, JobUpdate, RunnerCommand};

/// Any document that travels between the two halves of a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolMessage {
    Job(Job),
    Update(JobUpdate),
    Command(RunnerCommand),
}

impl ProtocolMessage {
    /// Classify and decode a payload.
    ///
    /// The discriminating key decides the type: `command`, then `status`, then `steps`.
    pub fn decode(bytes: &[u8]) -> ModelResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Some(obj) = value.as_object() else {
            return Err(ModelError::Serialization("expected a JSON object".into()));
        };

        if obj.contains_key("command") {
            return Ok(Self::Command(serde_json::from_value(value)?));
        }
        if obj.contains_key("status") {
            return Ok(Self::Update(serde_json::from_value(value)?));
        }
        if obj.contains_key("steps") {
            let job: Job = serde_json::from_value(value)?;
            job.validate()?;
            return Ok(Self::Job(job));
        }
        Err(ModelError::Serialization(
            "payload is neither a job, an update nor a command".into(),
        ))
    }
}
