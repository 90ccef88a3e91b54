//! Transport Seam
//!
//! Traits the connection manager drives. A backend maps them onto a
//! platform BLE stack; tests substitute mocks.

use crate::domain::models::DiscoveredDevice;
use crate::error::TransportError;
use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

/// What discovery must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Advertised service UUID
    pub service: Uuid,
    /// Required local-name prefix
    pub name_prefix: String,
}

impl DeviceFilter {
    /// Check an advertisement against the filter
    pub fn matches(&self, name: &str, services: &[Uuid]) -> bool {
        name.starts_with(&self.name_prefix) && services.contains(&self.service)
    }
}

/// Service and characteristic to open once connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattTarget {
    pub service: Uuid,
    pub characteristic: Uuid,
}

/// An open link to a module.
pub struct Connection {
    pub channel: Box<dyn BleChannel>,
    /// Fires once if the module drops the link on its own.
    pub link_lost: oneshot::Receiver<()>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// Whether the host has a usable BLE adapter.
    async fn is_available(&self) -> bool;

    /// Discover one module matching `filter`.
    ///
    /// May suspend indefinitely; callers race it against cancellation.
    async fn request_device(&self, filter: &DeviceFilter)
        -> Result<DiscoveredDevice, TransportError>;

    /// Open the GATT connection and resolve the control characteristic.
    async fn connect(
        &self,
        device: &DiscoveredDevice,
        target: &GattTarget,
    ) -> Result<Connection, TransportError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BleChannel: Send + Sync {
    /// Write one payload to the control characteristic.
    async fn write(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Close the link.
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Backend for hosts without a supported BLE stack.
pub struct UnsupportedTransport;

#[async_trait]
impl BleTransport for UnsupportedTransport {
    async fn is_available(&self) -> bool {
        false
    }

    async fn request_device(
        &self,
        _filter: &DeviceFilter,
    ) -> Result<DiscoveredDevice, TransportError> {
        Err(TransportError::Platform(
            "Bluetooth LE is not supported on this platform".to_string(),
        ))
    }

    async fn connect(
        &self,
        _device: &DiscoveredDevice,
        _target: &GattTarget,
    ) -> Result<Connection, TransportError> {
        Err(TransportError::Platform(
            "Bluetooth LE is not supported on this platform".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::protocol;

    #[test]
    fn test_filter_needs_prefix_and_service() {
        let filter = DeviceFilter {
            service: protocol::SERVICE_UUID,
            name_prefix: protocol::DEVICE_NAME_PREFIX.to_string(),
        };
        let services = [Uuid::nil(), protocol::SERVICE_UUID];

        assert!(filter.matches("OIGNIES-SNCV-A1B2C3", &services));
        assert!(!filter.matches("OIGNIES-A1B2C3", &services));
        assert!(!filter.matches("OIGNIES-SNCV-A1B2C3", &[Uuid::nil()]));
    }
}
