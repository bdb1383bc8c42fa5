use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Token tying a scheduler, its solver and every update of one job together.
///
/// Never empty. Deserialization enforces the same rule as [`CorrelationId::new`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wrap a caller-provided value.
    pub fn new(value: impl Into<String>) -> ModelResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ModelError::EmptyCorrelationId);
        }
        Ok(Self(value))
    }

    /// Generate a fresh, unique correlation id (`job-<uuid>`).
    pub fn generate() -> Self {
        Self(format!("job-{}", Uuid::new_v4().simple()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = ModelError;
    fn try_from(value: String) -> ModelResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CorrelationId {
    type Error = ModelError;
    fn try_from(value: &str) -> ModelResult<Self> {
        Self::new(value)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
