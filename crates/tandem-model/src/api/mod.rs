use std::fmt;

use serde::{Deserialize, Serialize};

/// Body returned by the negotiation endpoints: `{"url": <connection descriptor>}`.
///
/// The descriptor embeds a credential, so `Debug` does not print it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiateResponse {
    pub url: String,
}

impl NegotiateResponse {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl fmt::Debug for NegotiateResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiateResponse")
            .field("url", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_descriptor() {
        let resp = NegotiateResponse::new("HostName=h;DeviceId=d;SharedAccessKey=secret");
        let dbg = format!("{resp:?}");
        assert!(!dbg.contains("secret"));

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["url"], "HostName=h;DeviceId=d;SharedAccessKey=secret");
    }
}
