use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{CorrelationId, Role};
use crate::error::{ModelError, ModelResult};

/// Separator between the role tag and the correlation id.
pub const IDENTITY_SEPARATOR: &str = "::";

/// Logical participant identity: `role::correlation-id`.
///
/// The pairing invariant (one scheduler and one solver per correlation id) lets the
/// counterpart be computed from the identity alone, see [`Identity::counterpart`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    role: Role,
    correlation_id: CorrelationId,
}

impl Identity {
    pub fn new(role: Role, correlation_id: CorrelationId) -> Self {
        Self {
            role,
            correlation_id,
        }
    }

    pub fn scheduler(correlation_id: CorrelationId) -> Self {
        Self::new(Role::Scheduler, correlation_id)
    }

    pub fn solver(correlation_id: CorrelationId) -> Self {
        Self::new(Role::Solver, correlation_id)
    }

    /// Parse `role::correlation-id`, splitting at the first separator.
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let (role, cid) = raw
            .split_once(IDENTITY_SEPARATOR)
            .ok_or_else(|| ModelError::InvalidIdentity(raw.to_string()))?;

        let role = role.parse::<Role>()?;
        let correlation_id = CorrelationId::new(cid)?;
        Ok(Self::new(role, correlation_id))
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Same correlation id, opposite role. Applying it twice yields `self`.
    pub fn counterpart(&self) -> Self {
        Self::new(self.role.opposite(), self.correlation_id.clone())
    }
}

impl FromStr for Identity {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = ModelError;
    fn try_from(value: String) -> ModelResult<Self> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.role, IDENTITY_SEPARATOR, self.correlation_id)
    }
}
