//! BLE Scanner Module
//!
//! Advertisement watcher used for discovery on Windows.

use crate::domain::models::DiscoveredDevice;
use crate::infrastructure::bluetooth::transport::DeviceFilter;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

#[cfg(windows)]
pub use watcher::BleScanner;

/// What has been heard from one address so far. With active scanning the
/// name usually arrives in the scan response, apart from the service list.
#[derive(Default)]
struct Sighting {
    name: String,
    services: Vec<Uuid>,
}

/// Merges advertisements per address and reports the modules matching the
/// filter. Once closed, the receiving side sees the end of the stream.
pub struct Discoveries {
    filter: DeviceFilter,
    sightings: HashMap<u64, Sighting>,
    sender: Option<mpsc::UnboundedSender<DiscoveredDevice>>,
}

impl Discoveries {
    pub fn new(filter: DeviceFilter) -> (Self, mpsc::UnboundedReceiver<DiscoveredDevice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let discoveries = Self {
            filter,
            sightings: HashMap::new(),
            sender: Some(sender),
        };
        (discoveries, receiver)
    }

    /// Fold one advertisement into what is known about `address`.
    pub fn observe(&mut self, address: u64, name: &str, services: &[Uuid]) {
        let Some(sender) = &self.sender else {
            return;
        };

        let sighting = self.sightings.entry(address).or_default();
        if !name.is_empty() {
            sighting.name = name.to_string();
        }
        for uuid in services {
            if !sighting.services.contains(uuid) {
                sighting.services.push(*uuid);
            }
        }

        if self.filter.matches(&sighting.name, &sighting.services) {
            debug!("Matching module {} at {:#X}", sighting.name, address);
            let _ = sender.send(DiscoveredDevice {
                name: sighting.name.clone(),
                address,
            });
        }
    }

    /// No more advertisements will come.
    pub fn close(&mut self) {
        self.sender = None;
    }
}

#[cfg(windows)]
mod watcher {
    use super::Discoveries;
    use crate::domain::models::DiscoveredDevice;
    use crate::error::TransportError;
    use crate::infrastructure::bluetooth::transport::DeviceFilter;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tokio::sync::mpsc;
    use tracing::{info, warn};
    use uuid::Uuid;
    use windows::Devices::Bluetooth::Advertisement::{
        BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
        BluetoothLEAdvertisementWatcherStoppedEventArgs, BluetoothLEScanningMode,
    };
    use windows::Devices::Bluetooth::BluetoothError;
    use windows::Foundation::TypedEventHandler;

    fn lock(discoveries: &Mutex<Discoveries>) -> MutexGuard<'_, Discoveries> {
        match discoveries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// BLE Scanner for discovering train modules
    pub struct BleScanner {
        watcher: Option<BluetoothLEAdvertisementWatcher>,
    }

    impl BleScanner {
        pub fn new() -> Self {
            Self { watcher: None }
        }

        /// Start scanning; every module matching `filter` is sent on the
        /// returned receiver, which ends when the watcher stops.
        pub fn start(
            &mut self,
            filter: &DeviceFilter,
        ) -> Result<mpsc::UnboundedReceiver<DiscoveredDevice>, TransportError> {
            // Stop any existing scan
            self.stop()?;

            info!(
                "Starting BLE scan for {}* with service {}",
                filter.name_prefix, filter.service
            );

            let watcher = BluetoothLEAdvertisementWatcher::new()?;
            watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

            let (discoveries, receiver) = Discoveries::new(filter.clone());
            let discoveries = Arc::new(Mutex::new(discoveries));

            let received = Arc::clone(&discoveries);
            let handler = TypedEventHandler::new(
                move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                      args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                    if let Some(args) = args.as_ref() {
                        let adv = args.Advertisement()?;
                        let name = adv.LocalName()?.to_string();
                        let service_uuids = adv.ServiceUuids()?;
                        let mut services = Vec::with_capacity(service_uuids.Size()? as usize);
                        for i in 0..service_uuids.Size()? {
                            services.push(Uuid::from_u128(service_uuids.GetAt(i)?.to_u128()));
                        }
                        lock(&received).observe(args.BluetoothAddress()?, &name, &services);
                    }
                    Ok(())
                },
            );

            // Radio switched off or adapter gone: end the discovery stream
            let stopped = Arc::clone(&discoveries);
            let stopped_handler = TypedEventHandler::new(
                move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                      args: windows::core::Ref<BluetoothLEAdvertisementWatcherStoppedEventArgs>| {
                    if let Some(args) = args.as_ref() {
                        let error = args.Error()?;
                        if error != BluetoothError::Success {
                            warn!("BLE scan aborted: {:?}", error);
                        }
                    }
                    lock(&stopped).close();
                    Ok(())
                },
            );

            watcher.Received(&handler)?;
            watcher.Stopped(&stopped_handler)?;
            watcher.Start()?;
            self.watcher = Some(watcher);

            Ok(receiver)
        }

        /// Stop scanning
        pub fn stop(&mut self) -> Result<(), TransportError> {
            if let Some(watcher) = self.watcher.take() {
                info!("Stopping BLE scan...");
                watcher.Stop()?;
            }
            Ok(())
        }
    }

    impl Drop for BleScanner {
        fn drop(&mut self) {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::protocol;

    fn train_filter() -> DeviceFilter {
        DeviceFilter {
            service: protocol::SERVICE_UUID,
            name_prefix: protocol::DEVICE_NAME_PREFIX.to_string(),
        }
    }

    #[test]
    fn test_name_and_services_from_separate_packets() {
        let (mut discoveries, mut found) = Discoveries::new(train_filter());

        discoveries.observe(0xA1, "", &[protocol::SERVICE_UUID]);
        assert!(found.try_recv().is_err());

        discoveries.observe(0xA1, "OIGNIES-SNCV-A1B2C3", &[]);
        assert_eq!(
            found.try_recv().unwrap(),
            DiscoveredDevice {
                name: "OIGNIES-SNCV-A1B2C3".to_string(),
                address: 0xA1,
            }
        );
    }

    #[test]
    fn test_other_devices_are_skipped() {
        let (mut discoveries, mut found) = Discoveries::new(train_filter());
        discoveries.observe(0xB2, "Headphones", &[protocol::SERVICE_UUID]);
        discoveries.observe(0xC3, "OIGNIES-SNCV-FFFFFF", &[Uuid::nil()]);
        assert!(found.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stopped_watcher_ends_discovery() {
        let (mut discoveries, mut found) = Discoveries::new(train_filter());
        discoveries.close();
        discoveries.observe(0xA1, "OIGNIES-SNCV-A1B2C3", &[protocol::SERVICE_UUID]);

        assert_eq!(found.recv().await, None);
    }
}
