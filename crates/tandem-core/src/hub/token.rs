use std::fmt;

use uuid::Uuid;

const TOKEN_QUERY_KEY: &str = "access_token=";

/// Bearer token granting a user access to the hub.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(String);

impl AccessToken {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Extract the token from a client connection descriptor
    /// (`...?access_token=<token>`).
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        let (_, query) = descriptor.split_once('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(TOKEN_QUERY_KEY))
            .filter(|t| !t.is_empty())
            .map(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}
