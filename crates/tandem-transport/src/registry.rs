use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tandem_core::delivery::{Delivery, DeliveryError, Outbound};
use tandem_core::registry::{Principal, Registry, RegistryError, SharedAccessKey};
use tandem_core::transport::Inbound;
use tandem_model::{Identity, PROP_FROM_IDENTITY};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace};

use crate::CredentialError;

/// Fields of a device connection string `HostName=..;DeviceId=..;SharedAccessKey=..`.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceCredentials {
    pub host_name: String,
    pub device_id: String,
    pub key: SharedAccessKey,
}

impl DeviceCredentials {
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let (mut host_name, mut device_id, mut key) = (None, None, None);
        for (pos, segment) in raw.split(';').filter(|s| !s.is_empty()).enumerate() {
            let (name, value) = segment
                .split_once('=')
                .ok_or(CredentialError::Malformed(pos))?;
            match name {
                "HostName" => host_name = Some(value.to_string()),
                "DeviceId" => device_id = Some(value.to_string()),
                // Base64 keys may end in '=', which split_once leaves in `value`.
                "SharedAccessKey" => key = Some(SharedAccessKey::new(value)),
                _ => trace!(segment = name, "ignoring connection string segment"),
            }
        }
        Ok(Self {
            host_name: host_name.ok_or(CredentialError::MissingField("HostName"))?,
            device_id: device_id.ok_or(CredentialError::MissingField("DeviceId"))?,
            key: key.ok_or(CredentialError::MissingField("SharedAccessKey"))?,
        })
    }
}

impl std::fmt::Debug for DeviceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCredentials")
            .field("host_name", &self.host_name)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

struct Device {
    key: SharedAccessKey,
    tx: mpsc::UnboundedSender<Inbound>,
    /// Parked until the device connects for the first time.
    rx: Option<mpsc::UnboundedReceiver<Inbound>>,
}

/// In-process device registry and cloud-to-device channel.
///
/// Messages delivered before the device connects are kept in its inbox.
/// Reconnecting replaces the previous connection.
pub struct MemoryRegistry {
    devices: Mutex<HashMap<String, Device>>,
    available: AtomicBool,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate a registry outage: every registry operation fails while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices().contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices().is_empty()
    }

    /// Open the cloud-to-device stream of the device named in `connection_string`.
    #[instrument(level = "debug", skip_all)]
    pub fn connect(
        &self,
        connection_string: &str,
    ) -> Result<mpsc::UnboundedReceiver<Inbound>, CredentialError> {
        let creds = DeviceCredentials::parse(connection_string)?;
        let mut devices = self.devices();
        let Some(device) = devices.get_mut(&creds.device_id) else {
            return Err(CredentialError::Rejected(creds.device_id));
        };
        if device.key != creds.key {
            return Err(CredentialError::Rejected(creds.device_id));
        }

        let rx = match device.rx.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                device.tx = tx;
                rx
            }
        };
        debug!(device = %creds.device_id, "device connected");
        Ok(rx)
    }

    fn devices(&self) -> std::sync::MutexGuard<'_, HashMap<String, Device>> {
        self.devices.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<(), RegistryError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("registry is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn add_principal(&self, id: &str) -> Result<Principal, RegistryError> {
        self.check()?;
        let mut devices = self.devices();
        if devices.contains_key(id) {
            return Err(RegistryError::AlreadyExists(id.to_string()));
        }
        let key = SharedAccessKey::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        devices.insert(
            id.to_string(),
            Device {
                key: key.clone(),
                tx,
                rx: Some(rx),
            },
        );
        info!(device = %id, "device registered");
        Ok(Principal {
            id: id.to_string(),
            key,
        })
    }

    async fn get_principal(&self, id: &str) -> Result<Principal, RegistryError> {
        self.check()?;
        self.devices()
            .get(id)
            .map(|d| Principal {
                id: id.to_string(),
                key: d.key.clone(),
            })
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    async fn remove_principal(&self, id: &str) -> Result<(), RegistryError> {
        self.check()?;
        match self.devices().remove(id) {
            Some(_) => {
                info!(device = %id, "device removed");
                Ok(())
            }
            None => Err(RegistryError::NotFound(id.to_string())),
        }
    }
}

#[async_trait]
impl Delivery for MemoryRegistry {
    async fn deliver(&self, to: &Identity, msg: Outbound) -> Result<(), DeliveryError> {
        let id = to.to_string();
        let devices = self.devices();
        let Some(device) = devices.get(&id) else {
            return Err(DeliveryError::RecipientNotFound(id));
        };
        let inbound = Inbound {
            sender: msg.properties.get_trimmed(PROP_FROM_IDENTITY).map(str::to_string),
            payload: msg.payload,
        };
        device
            .tx
            .send(inbound)
            .map_err(|_| DeliveryError::Failed(format!("device '{id}' is disconnected")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_model::{CorrelationId, Properties};

    fn connection_string(p: &Principal) -> String {
        format!(
            "HostName=devices.local;DeviceId={};SharedAccessKey={}",
            p.id,
            p.key.expose()
        )
    }

    #[test]
    fn parses_connection_string() {
        let c = DeviceCredentials::parse("HostName=h;DeviceId=solver::job-1;SharedAccessKey=abc=")
            .unwrap();
        assert_eq!(c.host_name, "h");
        assert_eq!(c.device_id, "solver::job-1");
        assert_eq!(c.key.expose(), "abc=");
        assert!(!format!("{c:?}").contains("abc"));

        assert_eq!(
            DeviceCredentials::parse("HostName=h;DeviceId=x"),
            Err(CredentialError::MissingField("SharedAccessKey"))
        );
        assert_eq!(
            DeviceCredentials::parse("HostName=h;garbage"),
            Err(CredentialError::Malformed(1))
        );
    }

    #[tokio::test]
    async fn messages_before_connect_are_kept() {
        let reg = MemoryRegistry::new();
        let p = reg.add_principal("solver::job-1").await.unwrap();
        let to = Identity::solver(CorrelationId::new("job-1").unwrap());

        let mut props = Properties::new();
        props.insert(PROP_FROM_IDENTITY, "scheduler::job-1");
        reg.deliver(
            &to,
            Outbound {
                payload: b"hi".to_vec(),
                properties: props,
            },
        )
        .await
        .unwrap();

        let mut rx = reg.connect(&connection_string(&p)).unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got.sender.as_deref(), Some("scheduler::job-1"));
        assert_eq!(got.payload, b"hi".to_vec());
    }

    #[tokio::test]
    async fn wrong_key_is_rejected() {
        let reg = MemoryRegistry::new();
        reg.add_principal("solver::job-1").await.unwrap();
        assert_eq!(
            reg.connect("HostName=h;DeviceId=solver::job-1;SharedAccessKey=nope")
                .unwrap_err(),
            CredentialError::Rejected("solver::job-1".into())
        );
    }

    #[tokio::test]
    async fn unknown_recipient_and_outage() {
        let reg = MemoryRegistry::new();
        let to = Identity::scheduler(CorrelationId::new("job-1").unwrap());
        let out = Outbound {
            payload: Vec::new(),
            properties: Properties::new(),
        };
        assert!(matches!(
            reg.deliver(&to, out).await,
            Err(DeliveryError::RecipientNotFound(_))
        ));

        reg.set_available(false);
        assert!(matches!(
            reg.add_principal("x").await,
            Err(RegistryError::Unavailable(_))
        ));
    }
}
