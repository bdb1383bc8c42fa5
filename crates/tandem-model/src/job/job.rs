use serde::{Deserialize, Serialize};

use crate::domain::{CorrelationId, Identity};
use crate::error::{ModelError, ModelResult};
use crate::job::{JobStatus, JobUpdate};

/// Unit of work submitted by a scheduler and executed step by step by a solver.
///
/// Immutable once published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub name: String,
    pub correlation_id: CorrelationId,
    #[serde(default)]
    pub steps: Vec<String>,
}

impl Job {
    pub fn new<I, S>(name: impl Into<String>, correlation_id: CorrelationId, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            correlation_id,
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the fields serde cannot: a non-empty name and non-empty step names.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::InvalidJob("name must not be empty".into()));
        }
        if let Some(pos) = self.steps.iter().position(|s| s.trim().is_empty()) {
            return Err(ModelError::InvalidJob(format!(
                "step #{pos} has an empty name"
            )));
        }
        Ok(())
    }

    /// Decode and validate a job document.
    pub fn from_slice(bytes: &[u8]) -> ModelResult<Self> {
        let job: Job = serde_json::from_slice(bytes)?;
        job.validate()?;
        Ok(job)
    }

    pub fn to_vec(&self) -> ModelResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn scheduler_identity(&self) -> Identity {
        Identity::scheduler(self.correlation_id.clone())
    }

    pub fn solver_identity(&self) -> Identity {
        Identity::solver(self.correlation_id.clone())
    }

    /// Build an update for one of this job's steps.
    pub fn update(&self, step: impl Into<String>, status: JobStatus) -> JobUpdate {
        JobUpdate {
            name: self.name.clone(),
            correlation_id: self.correlation_id.clone(),
            step: step.into(),
            status,
        }
    }
}
