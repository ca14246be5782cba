//! Classic Bluetooth discovery through a WinRT `DeviceWatcher`.

use super::device;
use crate::domain::models::PlatformEvent;
use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};
use windows::Devices::Bluetooth::BluetoothDevice;
use windows::Devices::Enumeration::{DeviceInformation, DeviceWatcher};
use windows::Foundation::TypedEventHandler;

pub struct ClassicScanner {
    watcher: Option<DeviceWatcher>,
    event_sender: mpsc::UnboundedSender<PlatformEvent>,
}

impl ClassicScanner {
    pub fn new(event_sender: mpsc::UnboundedSender<PlatformEvent>) -> Self {
        Self {
            watcher: None,
            event_sender,
        }
    }

    /// Start watching for unpaired classic devices in range
    pub fn start(&mut self) -> Result<()> {
        self.stop()?;

        let selector = BluetoothDevice::GetDeviceSelectorFromPairingState(false)?;
        info!("Starting classic discovery");
        let watcher = DeviceInformation::CreateWatcherAqsFilter(&selector)?;

        let sender = self.event_sender.clone();
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<DeviceWatcher>,
                  info: windows::core::Ref<DeviceInformation>| {
                if let Some(info) = info.as_ref() {
                    let id = info.Id()?;
                    let device = device::open_by_id(&id)
                        .and_then(|bt| device::snapshot(&bt))
                        .map_err(|e| debug!("Could not resolve {}: {}", id, e))
                        .ok();
                    let _ = sender.send(PlatformEvent::DeviceFound { device, rssi: None });
                }
                Ok(())
            },
        );

        watcher.Added(&handler)?;
        watcher.Start()?;
        self.watcher = Some(watcher);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if let Some(watcher) = self.watcher.take() {
            info!("Stopping classic discovery");
            watcher.Stop()?;
        }
        Ok(())
    }

    pub fn is_scanning(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Drop for ClassicScanner {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
