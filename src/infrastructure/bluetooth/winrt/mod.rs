//! WinRT adapter for Windows hosts.

pub mod device;
pub mod scanner;

use super::{BluetoothPlatform, PlatformError};
use crate::domain::models::{BondState, Device, PlatformEvent};
use crate::infrastructure::process;
use anyhow::Result;
use scanner::ClassicScanner;
use tokio::sync::mpsc;
use tracing::{info, warn};
use windows::Devices::Bluetooth::BluetoothDevice;
use windows::Devices::Enumeration::{
    DeviceInformation, DeviceInformationCustomPairing, DevicePairingKinds,
    DevicePairingRequestedEventArgs, DeviceUnpairingResultStatus,
};
use windows::Foundation::TypedEventHandler;

pub struct WinRtPlatform {
    scanner: ClassicScanner,
    events: mpsc::UnboundedSender<PlatformEvent>,
    diagnostic_command: String,
}

impl WinRtPlatform {
    pub fn new(
        events: mpsc::UnboundedSender<PlatformEvent>,
        diagnostic_command: String,
    ) -> Result<Self> {
        Ok(Self {
            scanner: ClassicScanner::new(events.clone()),
            events,
            diagnostic_command,
        })
    }

    fn report(events: &mpsc::UnboundedSender<PlatformEvent>, bt: &BluetoothDevice) {
        let device = device::snapshot(bt).ok();
        let _ = events.send(PlatformEvent::BondStateChanged { device });
    }
}

impl BluetoothPlatform for WinRtPlatform {
    fn start_discovery(&mut self) -> Result<()> {
        self.scanner.start()
    }

    fn cancel_discovery(&mut self) -> Result<()> {
        self.scanner.stop()
    }

    fn is_discovering(&self) -> bool {
        self.scanner.is_scanning()
    }

    fn bonded_devices(&mut self) -> Result<Vec<Device>> {
        let selector = BluetoothDevice::GetDeviceSelectorFromPairingState(true)?;
        let infos = DeviceInformation::FindAllAsyncAqsFilter(&selector)?.get()?;

        let mut devices = Vec::new();
        for i in 0..infos.Size()? {
            let info = infos.GetAt(i)?;
            match device::open_by_id(&info.Id()?).and_then(|bt| device::snapshot(&bt)) {
                Ok(device) => devices.push(device),
                Err(e) => warn!("Skipping paired entry {}: {}", info.Name()?, e),
            }
        }
        Ok(devices)
    }

    fn create_bond(&mut self, device: &Device) -> Result<bool> {
        let bt = device::open_by_address(&device.address)?;
        let pairing = bt.DeviceInformation()?.Pairing()?;
        if pairing.IsPaired()? || !pairing.CanPair()? {
            return Ok(false);
        }

        let _ = self.events.send(PlatformEvent::BondStateChanged {
            device: Some(device::snapshot(&bt)?.with_bond_state(BondState::Bonding)),
        });

        let operation = pairing.PairAsync()?;
        let events = self.events.clone();
        std::thread::spawn(move || {
            match operation.get().and_then(|r| r.Status()) {
                Ok(status) => info!("PairAsync finished: {:?}", status),
                Err(e) => warn!("PairAsync failed: {}", e),
            }
            Self::report(&events, &bt);
        });
        Ok(true)
    }

    fn remove_bond(&mut self, device: &Device) -> Result<bool> {
        let bt = device::open_by_address(&device.address)?;
        let result = bt.DeviceInformation()?.Pairing()?.UnpairAsync()?.get()?;
        let status = result.Status()?;
        info!("UnpairAsync finished: {:?}", status);
        Self::report(&self.events, &bt);
        Ok(status == DeviceUnpairingResultStatus::Unpaired)
    }

    fn send_pairing_request(&mut self, device: Option<&Device>) -> Result<()> {
        let device = device.ok_or(PlatformError::Unsupported(
            "pairing request without a selected device",
        ))?;
        let bt = device::open_by_address(&device.address)?;
        let custom = bt.DeviceInformation()?.Pairing()?.Custom()?;

        let handler = TypedEventHandler::new(
            |_: windows::core::Ref<DeviceInformationCustomPairing>,
             args: windows::core::Ref<DevicePairingRequestedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    args.Accept()?;
                }
                Ok(())
            },
        );
        custom.PairingRequested(&handler)?;

        let operation = custom.PairAsync(
            DevicePairingKinds::ConfirmOnly
                | DevicePairingKinds::DisplayPin
                | DevicePairingKinds::ConfirmPinMatch,
        )?;
        let events = self.events.clone();
        std::thread::spawn(move || {
            // Keeps the PairingRequested registration alive until completion
            let _custom = custom;
            match operation.get().and_then(|r| r.Status()) {
                Ok(status) => info!("Custom pairing finished: {:?}", status),
                Err(e) => warn!("Custom pairing failed: {}", e),
            }
            Self::report(&events, &bt);
        });
        Ok(())
    }

    fn launch_settings(&mut self, target: &str) -> Result<()> {
        std::process::Command::new("explorer").arg(target).spawn()?;
        Ok(())
    }

    fn dump_stack(&mut self, on_line: &mut dyn FnMut(String)) -> Result<()> {
        process::stream_lines(&self.diagnostic_command, on_line)
    }
}
