use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

use crate::logger::{LoggerError, LoggerFormat, LoggerLevel, LoggerResult, LoggerTimeZone};

pub const ENV_LOG_FORMAT: &str = "TANDEM_LOG_FORMAT";
pub const ENV_LOG_LEVEL: &str = "TANDEM_LOG_LEVEL";
pub const ENV_LOG_TZ: &str = "TANDEM_LOG_TZ";
pub const ENV_LOG_COLOR: &str = "TANDEM_LOG_COLOR";

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive.
    pub level: LoggerLevel,
    pub tz: LoggerTimeZone,
    /// Include the module target in each line.
    pub with_targets: bool,
    /// Colored text output; ignored unless stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Read `TANDEM_LOG_*` values through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> LoggerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_LOG_FORMAT) {
            cfg.format = v.parse()?;
        }
        if let Some(v) = lookup(ENV_LOG_LEVEL) {
            cfg.level = v.parse()?;
        }
        if let Some(v) = lookup(ENV_LOG_TZ) {
            cfg.tz = v.parse()?;
        }
        if let Some(v) = lookup(ENV_LOG_COLOR) {
            cfg.use_color = parse_flag(ENV_LOG_COLOR, &v)?;
        }
        Ok(cfg)
    }

    /// Read `TANDEM_LOG_*` from the process environment.
    pub fn from_env() -> LoggerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

fn parse_flag(key: &'static str, value: &str) -> LoggerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LoggerError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}
