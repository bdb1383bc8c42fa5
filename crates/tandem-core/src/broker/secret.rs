use std::fmt;

use subtle::ConstantTimeEq;

/// Shared secret gating negotiation.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Constant-time comparison against a presented key.
    pub fn matches(&self, presented: &str) -> bool {
        bool::from(self.0.as_bytes().ct_eq(presented.as_bytes()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Scoped credential returned by negotiation.
///
/// Device form: `HostName=..;DeviceId=..;SharedAccessKey=..`.
/// Group form: `wss://<host>/client/hubs/<hub>?access_token=..`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor(String);

impl ConnectionDescriptor {
    pub(crate) fn new(raw: String) -> Self {
        Self(raw)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConnectionDescriptor(<redacted>)")
    }
}
