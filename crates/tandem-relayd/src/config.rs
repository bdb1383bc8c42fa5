use std::{fmt, net::SocketAddr, time::Duration};

use tandem_core::broker::{ApiKey, BrokerSettings, DEFAULT_TOKEN_TTL};
use tandem_core::router::RouterConfig;
use tandem_core::runner::DEFAULT_STEP_DELAY;
use thiserror::Error;

pub const ENV_QUEUE_NAMESPACE: &str = "TANDEM_QUEUE_NAMESPACE";
pub const ENV_QUEUE_NAME: &str = "TANDEM_QUEUE_NAME";
pub const ENV_TOPIC_NAME: &str = "TANDEM_TOPIC_NAME";
pub const ENV_PUBSUB_ENDPOINT: &str = "TANDEM_PUBSUB_ENDPOINT";
pub const ENV_HUB_NAME: &str = "TANDEM_HUB_NAME";
pub const ENV_API_KEY: &str = "TANDEM_API_KEY";
pub const ENV_DEVICE_HOSTNAME: &str = "TANDEM_DEVICE_HOSTNAME";
pub const ENV_PUBSUB_HOSTNAME: &str = "TANDEM_PUBSUB_HOSTNAME";
pub const ENV_BIND_ADDR: &str = "TANDEM_BIND_ADDR";
pub const ENV_ROUTER_MAX_CONCURRENT: &str = "TANDEM_ROUTER_MAX_CONCURRENT";
pub const ENV_ROUTER_VALIDATE_PAYLOADS: &str = "TANDEM_ROUTER_VALIDATE_PAYLOADS";
pub const ENV_TOKEN_TTL_SECS: &str = "TANDEM_TOKEN_TTL_SECS";
pub const ENV_EMBEDDED_SOLVER: &str = "TANDEM_EMBEDDED_SOLVER";
pub const ENV_STEP_DELAY_SECS: &str = "TANDEM_STEP_DELAY_SECS";

const DEFAULT_QUEUE_NAME: &str = "device-messages";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Daemon configuration read from the environment.
#[derive(Clone)]
pub struct RelayConfig {
    pub queue_namespace: String,
    pub queue_name: String,
    pub topic_name: String,
    /// Pub/sub connection string. Holds a credential.
    pub pubsub_endpoint: String,
    pub hub_name: String,
    pub api_key: ApiKey,
    pub device_hostname: String,
    pub pubsub_hostname: String,
    pub bind_addr: SocketAddr,
    pub router: RouterConfig,
    pub token_ttl: Duration,
    /// Run a solver worker inside the daemon.
    pub embedded_solver: bool,
    pub step_delay: Duration,
}

impl RelayConfig {
    /// Read the configuration through `lookup`. Every required key must be present
    /// and non-empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = optional(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| invalid(ENV_BIND_ADDR, e))?;

        let max_concurrent = match optional(ENV_ROUTER_MAX_CONCURRENT) {
            Some(v) => parse_positive(ENV_ROUTER_MAX_CONCURRENT, &v)? as usize,
            None => RouterConfig::default().max_concurrent,
        };
        let validate_payloads = match optional(ENV_ROUTER_VALIDATE_PAYLOADS) {
            Some(v) => parse_flag(ENV_ROUTER_VALIDATE_PAYLOADS, &v)?,
            None => RouterConfig::default().validate_payloads,
        };
        let token_ttl = match optional(ENV_TOKEN_TTL_SECS) {
            Some(v) => Duration::from_secs(parse_positive(ENV_TOKEN_TTL_SECS, &v)?),
            None => DEFAULT_TOKEN_TTL,
        };
        let embedded_solver = match optional(ENV_EMBEDDED_SOLVER) {
            Some(v) => parse_flag(ENV_EMBEDDED_SOLVER, &v)?,
            None => true,
        };
        let step_delay = match optional(ENV_STEP_DELAY_SECS) {
            Some(v) => Duration::from_secs(
                v.trim()
                    .parse::<u64>()
                    .map_err(|e| invalid(ENV_STEP_DELAY_SECS, e))?,
            ),
            None => DEFAULT_STEP_DELAY,
        };

        Ok(Self {
            queue_namespace: required(ENV_QUEUE_NAMESPACE)?,
            queue_name: optional(ENV_QUEUE_NAME)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
            topic_name: required(ENV_TOPIC_NAME)?,
            pubsub_endpoint: required(ENV_PUBSUB_ENDPOINT)?,
            hub_name: required(ENV_HUB_NAME)?,
            api_key: ApiKey::new(required(ENV_API_KEY)?),
            device_hostname: required(ENV_DEVICE_HOSTNAME)?,
            pubsub_hostname: required(ENV_PUBSUB_HOSTNAME)?,
            bind_addr,
            router: RouterConfig {
                max_concurrent,
                validate_payloads,
            },
            token_ttl,
            embedded_solver,
            step_delay,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Fully qualified name of the inbound device-message queue.
    pub fn inbound_queue(&self) -> String {
        format!("{}/{}", self.queue_namespace, self.queue_name)
    }

    /// Fully qualified name of the job topic.
    pub fn job_topic(&self) -> String {
        format!("{}/{}", self.queue_namespace, self.topic_name)
    }

    pub fn broker_settings(&self) -> BrokerSettings {
        BrokerSettings {
            api_key: self.api_key.clone(),
            device_hostname: self.device_hostname.clone(),
            pubsub_hostname: self.pubsub_hostname.clone(),
            hub_name: self.hub_name.clone(),
            token_ttl: self.token_ttl,
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("queue_namespace", &self.queue_namespace)
            .field("queue_name", &self.queue_name)
            .field("topic_name", &self.topic_name)
            .field("pubsub_endpoint", &"<redacted>")
            .field("hub_name", &self.hub_name)
            .field("api_key", &self.api_key)
            .field("device_hostname", &self.device_hostname)
            .field("pubsub_hostname", &self.pubsub_hostname)
            .field("bind_addr", &self.bind_addr)
            .field("router", &self.router)
            .field("token_ttl", &self.token_ttl)
            .field("embedded_solver", &self.embedded_solver)
            .field("step_delay", &self.step_delay)
            .finish()
    }
}

fn invalid(key: &'static str, e: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: e.to_string(),
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(invalid(key, "must be greater than zero")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(key, e)),
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(key, format!("expected a boolean, got '{other}'"))),
    }
}
