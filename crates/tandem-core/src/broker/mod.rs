//! Identity broker: exchanges the shared secret for a scoped connection descriptor.
//!
//! The broker keeps no state of its own. Device principals live in the [`Registry`],
//! group grants in the [`FanoutHub`].
mod error;
pub use error::BrokerError;

mod secret;
pub use secret::{ApiKey, ConnectionDescriptor};

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info, instrument, warn};

use crate::hub::FanoutHub;
use crate::registry::{Principal, RegistryError, RegistryHandle};

/// Default lifetime of hub access tokens.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Static broker configuration.
#[derive(Clone, Debug)]
pub struct BrokerSettings {
    pub api_key: ApiKey,
    /// Host written into device connection descriptors.
    pub device_hostname: String,
    /// Host written into group connection descriptors.
    pub pubsub_hostname: String,
    pub hub_name: String,
    pub token_ttl: Duration,
}

pub struct IdentityBroker {
    registry: RegistryHandle,
    hub: Arc<FanoutHub>,
    settings: BrokerSettings,
}

impl IdentityBroker {
    pub fn new(registry: RegistryHandle, hub: Arc<FanoutHub>, settings: BrokerSettings) -> Self {
        Self {
            registry,
            hub,
            settings,
        }
    }

    pub fn hub(&self) -> &Arc<FanoutHub> {
        &self.hub
    }

    /// Check the presented shared secret.
    pub fn authorize(&self, presented: Option<&str>) -> Result<(), BrokerError> {
        match presented {
            Some(key) if self.settings.api_key.matches(key) => Ok(()),
            _ => Err(BrokerError::Unauthorized),
        }
    }

    /// Issue a device connection descriptor for `logical_id`.
    ///
    /// Idempotent: an existing principal is reused, never duplicated.
    #[instrument(level = "debug", skip(self, presented), fields(identity = %logical_id))]
    pub async fn negotiate(
        &self,
        presented: Option<&str>,
        logical_id: &str,
    ) -> Result<ConnectionDescriptor, BrokerError> {
        self.authorize(presented)?;
        let logical_id = non_empty(logical_id, "identity")?;

        let principal = self.get_or_create(logical_id).await?;
        debug!(registry = self.registry.name(), "device descriptor issued");

        Ok(ConnectionDescriptor::new(format!(
            "HostName={};DeviceId={};SharedAccessKey={}",
            self.settings.device_hostname,
            principal.id,
            principal.key.expose()
        )))
    }

    async fn get_or_create(&self, id: &str) -> Result<Principal, BrokerError> {
        match self.registry.add_principal(id).await {
            Ok(principal) => {
                info!(identity = %id, "principal registered");
                Ok(principal)
            }
            Err(RegistryError::AlreadyExists(_)) => {
                debug!(identity = %id, "principal exists, reusing it");
                self.registry
                    .get_principal(id)
                    .await
                    .map_err(|e| BrokerError::RegistryUnavailable(e.to_string()))
            }
            Err(e) => Err(BrokerError::RegistryUnavailable(e.to_string())),
        }
    }

    /// Grant `user_id` join and send rights for `group_id` and issue a fresh token.
    #[instrument(level = "debug", skip(self, presented), fields(user = %user_id, group = %group_id))]
    pub async fn negotiate_group(
        &self,
        presented: Option<&str>,
        user_id: &str,
        group_id: &str,
    ) -> Result<ConnectionDescriptor, BrokerError> {
        self.authorize(presented)?;
        let user_id = non_empty(user_id, "user id")?;
        let group_id = non_empty(group_id, "group id")?;

        let token = self
            .hub
            .issue_access(user_id, [group_id], self.settings.token_ttl);
        debug!(hub = %self.settings.hub_name, "group access token issued");

        Ok(ConnectionDescriptor::new(format!(
            "wss://{}/client/hubs/{}?access_token={}",
            self.settings.pubsub_hostname,
            self.settings.hub_name,
            token.expose()
        )))
    }

    /// Remove the principal and any hub grants of `logical_id`.
    ///
    /// Best effort: only an authorization failure is returned. The identity is
    /// normalized the same way [`IdentityBroker::negotiate`] normalizes it.
    #[instrument(level = "debug", skip(self, presented), fields(identity = %logical_id))]
    pub async fn revoke(&self, presented: Option<&str>, logical_id: &str) -> Result<(), BrokerError> {
        self.authorize(presented)?;
        let Ok(logical_id) = non_empty(logical_id, "identity") else {
            warn!("blank identity, nothing to revoke");
            return Ok(());
        };

        self.hub.revoke_user(logical_id);
        match self.registry.remove_principal(logical_id).await {
            Ok(()) => info!("principal removed"),
            Err(RegistryError::NotFound(_)) => warn!("principal not found, nothing to revoke"),
            Err(e) => error!(error = %e, "failed to remove principal"),
        }
        Ok(())
    }
}

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str, BrokerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BrokerError::InvalidIdentity(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}
