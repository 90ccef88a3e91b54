//! BLE Connection Module
//!
//! Owns the single link to a train module: discovery, connect, disconnect
//! and link-loss observation.

use crate::domain::models::{ConnectionStatus, DiscoveredDevice, SessionSnapshot};
use crate::domain::settings::BleSettings;
use crate::error::{RemoteError, Result, TransportError};
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::transport::{
    BleChannel, BleTransport, Connection, DeviceFilter, GattTarget,
};
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Identifiers used to find and open the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Service UUID to look for
    pub service_uuid: Uuid,
    /// Control characteristic UUID
    pub control_char_uuid: Uuid,
    /// Advertised name prefix
    pub name_prefix: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            service_uuid: protocol::SERVICE_UUID,
            control_char_uuid: protocol::CONTROL_CHAR_UUID,
            name_prefix: protocol::DEVICE_NAME_PREFIX.to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Build from user settings. Unparsable UUIDs fall back to the firmware
    /// defaults.
    pub fn from_settings(settings: &BleSettings) -> Self {
        let parse = |value: &str, fallback: Uuid, what: &str| match Uuid::parse_str(value) {
            Ok(uuid) => uuid,
            Err(e) => {
                warn!("Invalid {} UUID {:?} in settings ({}), using {}", what, value, e, fallback);
                fallback
            }
        };

        Self {
            service_uuid: parse(&settings.service_uuid, protocol::SERVICE_UUID, "service"),
            control_char_uuid: parse(
                &settings.control_char_uuid,
                protocol::CONTROL_CHAR_UUID,
                "control characteristic",
            ),
            name_prefix: settings.name_prefix.clone(),
        }
    }

    pub fn filter(&self) -> DeviceFilter {
        DeviceFilter {
            service: self.service_uuid,
            name_prefix: self.name_prefix.clone(),
        }
    }

    pub fn target(&self) -> GattTarget {
        GattTarget {
            service: self.service_uuid,
            characteristic: self.control_char_uuid,
        }
    }
}

/// The live session's channel.
pub(crate) struct ActiveLink {
    id: u64,
    pub(crate) channel: Arc<dyn BleChannel>,
    link_watch: LinkWatch,
}

/// Slot shared by the manager, the dispatcher and the link-loss watcher.
/// The lock is held for the whole of a write or a disconnect.
pub(crate) type LinkSlot = Arc<Mutex<Option<ActiveLink>>>;

/// Link-loss subscription; dropping it unsubscribes.
struct LinkWatch(JoinHandle<()>);

impl Drop for LinkWatch {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Cancels a discovery in progress. Cancelling while not discovering does
/// nothing.
#[derive(Clone)]
pub struct DiscoveryCanceller(Arc<Notify>);

impl DiscoveryCanceller {
    pub fn cancel(&self) {
        self.0.notify_waiters();
    }
}

/// Connection manager for one train module
pub struct ConnectionManager {
    transport: Arc<dyn BleTransport>,
    config: ConnectionConfig,
    link: LinkSlot,
    session: Arc<watch::Sender<SessionSnapshot>>,
    discovery_cancel: Arc<Notify>,
    next_link_id: u64,
}

impl ConnectionManager {
    /// Create a new connection manager
    pub fn new(transport: Arc<dyn BleTransport>, config: ConnectionConfig) -> Self {
        let (session, _) = watch::channel(SessionSnapshot::default());
        Self {
            transport,
            config,
            link: Arc::new(Mutex::new(None)),
            session: Arc::new(session),
            discovery_cancel: Arc::new(Notify::new()),
            next_link_id: 0,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.borrow().clone()
    }

    pub fn canceller(&self) -> DiscoveryCanceller {
        DiscoveryCanceller(Arc::clone(&self.discovery_cancel))
    }

    pub(crate) fn link_slot(&self) -> LinkSlot {
        Arc::clone(&self.link)
    }

    /// Discover a module and connect to it, replacing any live session.
    pub async fn connect(&mut self) -> Result<DiscoveredDevice> {
        // The old link goes first, whatever happens to this attempt
        self.disconnect().await;

        if !self.transport.is_available().await {
            warn!("Bluetooth LE transport unavailable");
            let err = RemoteError::TransportUnavailable;
            self.fail(&err);
            return Err(err);
        }

        info!(
            "Connecting to a module named {}* with service {}",
            self.config.name_prefix, self.config.service_uuid
        );
        self.session.send_modify(|s| {
            s.status = ConnectionStatus::Connecting;
            s.device = None;
            s.last_error = None;
        });

        match self.open_link().await {
            Ok(device) => {
                info!("Connected to {} ({:#X})", device.name, device.address);
                Ok(device)
            }
            Err(err) => {
                error!("Connection failed: {}", err);
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn open_link(&mut self) -> Result<DiscoveredDevice> {
        let transport = Arc::clone(&self.transport);
        let cancel = Arc::clone(&self.discovery_cancel);
        let filter = self.config.filter();

        let device = tokio::select! {
            found = transport.request_device(&filter) => {
                found.map_err(RemoteError::connection_failed)?
            }
            _ = cancel.notified() => {
                info!("Discovery cancelled");
                return Err(RemoteError::connection_failed(TransportError::Cancelled));
            }
        };

        info!("Found module {} ({:#X})", device.name, device.address);
        self.session
            .send_modify(|s| s.device = Some(device.clone()));

        let Connection { channel, link_lost } = transport
            .connect(&device, &self.config.target())
            .await
            .map_err(RemoteError::connection_failed)?;

        self.next_link_id += 1;
        let id = self.next_link_id;

        // Publish under the lock so a link loss can only be seen after it
        let mut slot = self.link.lock().await;
        *slot = Some(ActiveLink {
            id,
            channel: Arc::from(channel),
            link_watch: self.watch_link_loss(id, link_lost),
        });
        self.session.send_modify(|s| {
            s.status = ConnectionStatus::Connected;
            s.device = Some(device.clone());
        });

        Ok(device)
    }

    /// Clear the session when the module drops link `id` on its own.
    fn watch_link_loss(&self, id: u64, link_lost: oneshot::Receiver<()>) -> LinkWatch {
        let link = Arc::clone(&self.link);
        let session = Arc::clone(&self.session);

        LinkWatch(tokio::spawn(async move {
            if link_lost.await.is_err() {
                return;
            }

            let mut slot = link.lock().await;
            if slot.as_ref().map(|l| l.id) != Some(id) {
                debug!("Ignoring link loss for stale session {}", id);
                return;
            }
            warn!("Module disconnected");
            let lost = slot.take();
            session.send_modify(|s| {
                s.status = ConnectionStatus::Disconnected;
                s.device = None;
            });
            drop(slot);
            // Aborts this task's own handle, which is fine with no await left
            drop(lost);
        }))
    }

    /// Close the live session. Does nothing when there is none.
    pub async fn disconnect(&mut self) {
        let Some(link) = self.link.lock().await.take() else {
            debug!("Disconnect requested with no live session");
            return;
        };

        let ActiveLink {
            channel,
            link_watch,
            ..
        } = link;
        drop(link_watch);

        if let Err(e) = channel.disconnect().await {
            warn!("Error while closing the link: {}", e);
        }

        info!("Disconnected from module");
        self.session.send_modify(|s| {
            s.status = ConnectionStatus::Disconnected;
            s.device = None;
        });
    }

    /// Dismiss the last error message.
    pub fn clear_error(&self) {
        self.session.send_if_modified(|s| s.last_error.take().is_some());
    }

    fn fail(&self, err: &RemoteError) {
        let message = err.to_string();
        self.session.send_modify(|s| {
            s.status = ConnectionStatus::Disconnected;
            s.device = None;
            s.last_error = Some(message);
        });
    }
}
