//! Principal registry used by the identity broker.
use std::{fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Per-principal credential issued by the registry.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedAccessKey(String);

impl SharedAccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }

    /// Raw key. Only for building a connection descriptor.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SharedAccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedAccessKey(<redacted>)")
    }
}

/// A registered participant and its credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub key: SharedAccessKey,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("principal already exists: {0}")]
    AlreadyExists(String),

    #[error("principal not found: {0}")]
    NotFound(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Storage of principals keyed by logical identity.
///
/// The broker treats the key as opaque.
#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Registry name used in logs.
    fn name(&self) -> &'static str;

    /// Create a principal. Fails with [`RegistryError::AlreadyExists`] if the id is taken.
    async fn add_principal(&self, id: &str) -> Result<Principal, RegistryError>;

    async fn get_principal(&self, id: &str) -> Result<Principal, RegistryError>;

    async fn remove_principal(&self, id: &str) -> Result<(), RegistryError>;
}

pub type RegistryHandle = Arc<dyn Registry>;
