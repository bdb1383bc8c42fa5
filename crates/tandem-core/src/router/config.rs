/// Relay router settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterConfig {
    /// Messages processed concurrently. Values below 1 are treated as 1.
    pub max_concurrent: usize,
    /// Dead-letter payloads that are not protocol documents instead of forwarding them.
    pub validate_payloads: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            validate_payloads: false,
        }
    }
}
