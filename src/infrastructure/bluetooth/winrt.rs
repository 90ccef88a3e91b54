//! WinRT Backend
//!
//! [`BleTransport`] on top of `Windows.Devices.Bluetooth`.

use crate::domain::models::DiscoveredDevice;
use crate::error::TransportError;
use crate::infrastructure::bluetooth::scanner::BleScanner;
use crate::infrastructure::bluetooth::transport::{
    BleChannel, BleTransport, Connection, DeviceFilter, GattTarget,
};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use windows::core::GUID;
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCommunicationStatus, GattDeviceService,
};
use windows::Devices::Bluetooth::{
    BluetoothAdapter, BluetoothConnectionStatus, BluetoothLEDevice,
};
use windows::Devices::Radios::RadioState;
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::DataWriter;

/// Convert a UUID into a Windows GUID
fn guid(uuid: Uuid) -> GUID {
    GUID::from_u128(uuid.as_u128())
}

pub struct WinRtTransport;

impl WinRtTransport {
    async fn adapter_ready() -> Result<bool, TransportError> {
        let adapter = BluetoothAdapter::GetDefaultAsync()?.await?;
        if !adapter.IsLowEnergySupported()? {
            return Ok(false);
        }
        let radio = adapter.GetRadioAsync()?.await?;
        Ok(radio.State()? == RadioState::On)
    }
}

#[async_trait]
impl BleTransport for WinRtTransport {
    async fn is_available(&self) -> bool {
        match Self::adapter_ready().await {
            Ok(ready) => ready,
            Err(e) => {
                warn!("No usable Bluetooth adapter: {}", e);
                false
            }
        }
    }

    async fn request_device(
        &self,
        filter: &DeviceFilter,
    ) -> Result<DiscoveredDevice, TransportError> {
        // Dropping the scanner (e.g. on cancellation) stops the watcher
        let mut scanner = BleScanner::new();
        let mut found = scanner.start(filter)?;
        let device = found
            .recv()
            .await
            .ok_or(TransportError::NoMatchingDevice)?;
        scanner.stop()?;
        Ok(device)
    }

    async fn connect(
        &self,
        device: &DiscoveredDevice,
        target: &GattTarget,
    ) -> Result<Connection, TransportError> {
        info!("Connecting to Bluetooth device: {:#X}", device.address);
        let ble = OpenDevice(BluetoothLEDevice::FromBluetoothAddressAsync(device.address)?.await?);

        // Get services
        let services_result = ble
            .0
            .GetGattServicesForUuidAsync(guid(target.service))?
            .await?;
        if services_result.Status()? != GattCommunicationStatus::Success {
            error!(
                "Failed to get GATT services: {:?}",
                services_result.Status()?
            );
            return Err(TransportError::Platform(format!(
                "GATT services unavailable ({:?})",
                services_result.Status()?
            )));
        }
        let services = services_result.Services()?;
        if services.Size()? == 0 {
            return Err(TransportError::ServiceNotFound);
        }
        let service = services.GetAt(0)?;
        info!("Found train service");

        // Get the control characteristic
        let chars_result = service
            .GetCharacteristicsForUuidAsync(guid(target.characteristic))?
            .await?;
        if chars_result.Status()? != GattCommunicationStatus::Success {
            let _ = service.Close();
            return Err(TransportError::Platform(format!(
                "GATT characteristics unavailable ({:?})",
                chars_result.Status()?
            )));
        }
        let characteristics = chars_result.Characteristics()?;
        if characteristics.Size()? == 0 {
            let _ = service.Close();
            return Err(TransportError::CharacteristicNotFound);
        }
        let characteristic = characteristics.GetAt(0)?;
        debug!(
            "Control characteristic properties: {:?}",
            characteristic.CharacteristicProperties()?
        );

        // Link loss is reported once
        let (lost_tx, link_lost) = oneshot::channel();
        let lost_tx = Mutex::new(Some(lost_tx));
        let status_handler =
            TypedEventHandler::new(move |dev: windows::core::Ref<BluetoothLEDevice>, _| {
                if let Some(dev) = dev.as_ref() {
                    if dev.ConnectionStatus()? == BluetoothConnectionStatus::Disconnected {
                        if let Some(tx) = lost_tx.lock().ok().and_then(|mut tx| tx.take()) {
                            let _ = tx.send(());
                        }
                    }
                }
                Ok(())
            });
        let status_token = ble.0.ConnectionStatusChanged(&status_handler)?;

        Ok(Connection {
            channel: Box::new(WinRtChannel {
                device: ble,
                service,
                characteristic,
                status_token,
            }),
            link_lost,
        })
    }
}

/// Closes the device on drop, so every early return in `connect` releases it.
struct OpenDevice(BluetoothLEDevice);

impl Drop for OpenDevice {
    fn drop(&mut self) {
        let _ = self.0.Close();
    }
}

struct WinRtChannel {
    device: OpenDevice,
    service: GattDeviceService,
    characteristic: GattCharacteristic,
    status_token: i64,
}

#[async_trait]
impl BleChannel for WinRtChannel {
    async fn write(&self, payload: &[u8]) -> Result<(), TransportError> {
        let writer = DataWriter::new()?;
        writer.WriteBytes(payload)?;
        let buffer = writer.DetachBuffer()?;

        let status = self.characteristic.WriteValueAsync(&buffer)?.await?;
        if status != GattCommunicationStatus::Success {
            return Err(TransportError::WriteRejected(format!("{:?}", status)));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.device
            .0
            .RemoveConnectionStatusChanged(self.status_token)?;
        self.service.Close()?;
        self.device.0.Close()?;
        Ok(())
    }
}

impl Drop for WinRtChannel {
    fn drop(&mut self) {
        let _ = self
            .device
            .0
            .RemoveConnectionStatusChanged(self.status_token);
        let _ = self.service.Close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::protocol;

    #[test]
    fn test_guid_conversion() {
        let guid = guid(protocol::SERVICE_UUID);
        assert_eq!(guid.data1, 0x4fafc201);
        assert_eq!(guid.data2, 0x1fb5);
        assert_eq!(guid.data3, 0x459e);
        assert_eq!(guid.data4, [0x8f, 0xcc, 0xc5, 0xc9, 0xc3, 0x31, 0x91, 0x4b]);
    }
}
