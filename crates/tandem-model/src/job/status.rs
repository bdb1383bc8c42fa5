use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ModelError, ModelResult};

/// Status carried by a [`crate::JobUpdate`].
///
/// Serialized as `InProgress` / `Completed` / `Cancelled`. The legacy spelling
/// `In Progress` is accepted on input. Any other value is a deserialization error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for JobStatus {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "InProgress" | "In Progress" => Ok(JobStatus::InProgress),
            "Completed" => Ok(JobStatus::Completed),
            "Cancelled" => Ok(JobStatus::Cancelled),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
