//! Discovery Listener
//!
//! Applies platform notifications to the registry and the log.

use crate::domain::classifier;
use crate::domain::controller::{summary_line, DiagnosticController};
use crate::domain::models::{Device, PlatformEvent};
use crate::infrastructure::bluetooth::BluetoothPlatform;
use tracing::{debug, info};

impl<P: BluetoothPlatform> DiagnosticController<P> {
    /// Apply every queued platform event in arrival order
    pub fn drain_events(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(rx) = self.events.as_mut() {
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }

        let count = pending.len();
        for event in pending {
            self.handle_event(event);
        }
        count
    }

    pub fn handle_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::DeviceFound {
                device: Some(device),
                rssi,
            } => self.on_device_found(device, rssi),
            PlatformEvent::BondStateChanged {
                device: Some(device),
            } => self.on_bond_state_changed(&device),
            other => debug!("Dropping event without device: {:?}", other),
        }
    }

    fn on_device_found(&mut self, device: Device, rssi: Option<i16>) {
        if self.state.registry().contains(&device) {
            return;
        }
        let line = format!("Found: {}", summary_line(&device, rssi));
        info!("{}", line);
        self.state.add_device(device);
        self.log(line);
    }

    fn on_bond_state_changed(&mut self, device: &Device) {
        let line = format!(
            "Bond state: {} [{}] -> {}",
            classifier::display_name(device),
            device.address,
            device.bond_state
        );
        info!("{}", line);
        self.log(line);
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::classifier::blacklisted;
    use crate::domain::controller::tests::{controller_with, log_lines, FakePlatform};
    use crate::domain::models::{BondState, Device, PlatformEvent};

    fn dualsense() -> Device {
        Device::new("A0:5A:5C:00:00:01").with_name("DualSense Wireless Controller")
    }

    #[test]
    fn test_repeated_discovery_is_deduplicated() {
        let (mut controller, tx) = controller_with(FakePlatform::default());
        tx.send(PlatformEvent::DeviceFound {
            device: Some(dualsense()),
            rssi: Some(-60),
        })
        .unwrap();
        tx.send(PlatformEvent::DeviceFound {
            device: Some(dualsense()),
            rssi: Some(-55),
        })
        .unwrap();

        assert_eq!(controller.drain_events(), 2);

        let registry = controller.state().registry();
        assert_eq!(registry.len(), 1);
        assert_eq!(blacklisted(registry.get(0).unwrap()), "PlayStation (blocked)");

        let lines = log_lines(&controller);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Found: DualSense Wireless Controller [A0:5A:5C:00:00:01]"));
        assert!(lines[0].contains("RSSI: -60 dBm"));
    }

    #[test]
    fn test_bond_state_change_logs_without_registry_change() {
        let (mut controller, tx) = controller_with(FakePlatform::default());
        tx.send(PlatformEvent::BondStateChanged {
            device: Some(dualsense().with_bond_state(BondState::Bonding)),
        })
        .unwrap();
        controller.drain_events();

        assert!(controller.state().registry().is_empty());
        assert_eq!(
            log_lines(&controller),
            vec!["Bond state: DualSense Wireless Controller [A0:5A:5C:00:00:01] -> BONDING"]
        );
    }

    #[test]
    fn test_events_without_device_are_dropped() {
        let (mut controller, tx) = controller_with(FakePlatform::default());
        tx.send(PlatformEvent::DeviceFound {
            device: None,
            rssi: Some(-40),
        })
        .unwrap();
        tx.send(PlatformEvent::BondStateChanged { device: None }).unwrap();

        assert_eq!(controller.drain_events(), 2);
        assert!(controller.state().registry().is_empty());
        assert!(log_lines(&controller).is_empty());
    }

    #[test]
    fn test_no_events_after_teardown() {
        let (mut controller, tx) = controller_with(FakePlatform::default());
        controller.teardown();
        assert!(tx
            .send(PlatformEvent::DeviceFound {
                device: Some(dualsense()),
                rssi: None,
            })
            .is_err());
        assert_eq!(controller.drain_events(), 0);
    }
}
