use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Randomness applied to restart backoff delays.
///
/// - `None`: deterministic delays.
/// - `Full`: uniform in `[0, base]`.
/// - `Equal`: around `base / 2`.
/// - `Decorrelated`: `min(max, rand(base * 3))`.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JitterStrategy {
    None,
    #[default]
    Full,
    Equal,
    Decorrelated,
}

impl FromStr for JitterStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(JitterStrategy::None),
            "full" => Ok(JitterStrategy::Full),
            "equal" => Ok(JitterStrategy::Equal),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(ModelError::UnknownJitter(other.to_string())),
        }
    }
}
