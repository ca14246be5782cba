//! Diagnostic Controller
//!
//! Owns the application state and the injected platform. Every method runs
//! on the UI thread; platform failures end up as log lines, never as errors
//! returned to the caller.

use crate::domain::classifier;
use crate::domain::models::{Device, PlatformEvent};
use crate::domain::state::AppState;
use crate::infrastructure::bluetooth::BluetoothPlatform;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Launch targets and paths the controller needs from settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub export_path: PathBuf,
    pub bluetooth_settings_target: String,
    pub tv_settings_target: String,
}

pub struct DiagnosticController<P: BluetoothPlatform> {
    pub(crate) platform: P,
    pub(crate) state: AppState,
    pub(crate) events: Option<mpsc::UnboundedReceiver<PlatformEvent>>,
    pub(crate) config: ControllerConfig,
}

impl<P: BluetoothPlatform> DiagnosticController<P> {
    pub fn new(
        platform: P,
        events: mpsc::UnboundedReceiver<PlatformEvent>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            platform,
            state: AppState::new(),
            events: Some(events),
            config,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn is_discovering(&self) -> bool {
        self.platform.is_discovering()
    }

    #[cfg(test)]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub(crate) fn log(&mut self, line: impl AsRef<str>) {
        self.state.log_line(line.as_ref());
    }

    /// Clear the registry and start a fresh discovery
    pub fn scan(&mut self) {
        self.state.clear_devices();
        if let Err(e) = self.platform.cancel_discovery() {
            warn!("Cancel before scan failed: {}", e);
        }
        match self.platform.start_discovery() {
            Ok(()) => {
                info!("Discovery started");
                self.log("Scanning...");
            }
            Err(e) => {
                error!("Discovery failed to start: {}", e);
                self.log(format!("Scan error: {}", e));
            }
        }
    }

    /// Replace the registry with the currently bonded devices
    pub fn show_paired(&mut self) {
        self.state.clear_devices();
        match self.platform.bonded_devices() {
            Ok(devices) => {
                self.log(format!("Paired devices: {}", devices.len()));
                for device in devices {
                    let line = format!("Paired: {}", summary_line(&device, None));
                    if self.state.add_device(device) {
                        self.log(line);
                    }
                }
            }
            Err(e) => {
                error!("Listing bonded devices failed: {}", e);
                self.log(format!("Paired list error: {}", e));
            }
        }
    }

    /// Run the host diagnostic command and stream its output into the log
    pub fn dump_stack(&mut self) {
        let state = &mut self.state;
        let result = self.platform.dump_stack(&mut |line: String| state.log_line(&line));
        if let Err(e) = result {
            error!("Stack dump failed: {}", e);
            self.log("Dump failed");
        }
    }

    pub fn open_settings(&mut self) {
        let target = self.config.bluetooth_settings_target.clone();
        match self.platform.launch_settings(&target) {
            Ok(()) => self.log(format!("Opened settings: {}", target)),
            Err(e) => {
                warn!("Launching {} failed: {}", target, e);
                self.log(format!("Settings error: {}", e));
            }
        }
    }

    pub fn export_log(&mut self) {
        let path = self.config.export_path.clone();
        match self.state.export_log(&path) {
            Ok(()) => info!("Log exported to {}", path.display()),
            Err(e) => {
                error!("Log export failed: {:#}", e);
                self.log(format!("Export failed: {:#}", e));
            }
        }
    }

    pub fn clear_log(&mut self) {
        self.state.clear_log();
    }

    /// Stop discovery and stop listening for platform events
    pub fn teardown(&mut self) {
        if self.events.take().is_none() {
            return;
        }
        info!("Tearing down diagnostic controller");
        if let Err(e) = self.platform.cancel_discovery() {
            warn!("Cancel discovery on teardown failed: {}", e);
        }
    }
}

impl<P: BluetoothPlatform> Drop for DiagnosticController<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// `<name> [<address>] RSSI: <rssi> | <hid> | Keyboard: <bool> | Blacklist: <verdict>`
pub fn summary_line(device: &Device, rssi: Option<i16>) -> String {
    let c = classifier::classify(device);
    let rssi = rssi
        .map(|r| format!("{} dBm", r))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "{} [{}] RSSI: {} | {} | Keyboard: {} | Blacklist: {}",
        classifier::display_name(device),
        device.address,
        rssi,
        c.hid,
        c.keyboard_like,
        c.blacklist
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::models::BondState;
    use anyhow::{anyhow, Result};
    use std::cell::RefCell;

    /// Records every call and returns scripted results
    #[derive(Default)]
    pub struct FakePlatform {
        pub calls: RefCell<Vec<String>>,
        pub discovering: bool,
        pub bonded: Vec<Device>,
        pub fail_with: Option<String>,
        pub bond_result: bool,
        pub dump_output: Vec<String>,
    }

    impl FakePlatform {
        fn record(&self, call: impl Into<String>) -> Result<()> {
            self.calls.borrow_mut().push(call.into());
            match &self.fail_with {
                Some(message) => Err(anyhow!(message.clone())),
                None => Ok(()),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl BluetoothPlatform for FakePlatform {
        fn start_discovery(&mut self) -> Result<()> {
            self.record("start_discovery")?;
            self.discovering = true;
            Ok(())
        }

        fn cancel_discovery(&mut self) -> Result<()> {
            self.calls.borrow_mut().push("cancel_discovery".to_string());
            self.discovering = false;
            Ok(())
        }

        fn is_discovering(&self) -> bool {
            self.discovering
        }

        fn bonded_devices(&mut self) -> Result<Vec<Device>> {
            self.record("bonded_devices")?;
            Ok(self.bonded.clone())
        }

        fn create_bond(&mut self, device: &Device) -> Result<bool> {
            self.record(format!("create_bond {}", device.address))?;
            Ok(self.bond_result)
        }

        fn remove_bond(&mut self, device: &Device) -> Result<bool> {
            self.record(format!("remove_bond {}", device.address))?;
            Ok(self.bond_result)
        }

        fn send_pairing_request(&mut self, device: Option<&Device>) -> Result<()> {
            let target = device.map(|d| d.address.as_str()).unwrap_or("none");
            self.record(format!("send_pairing_request {}", target))
        }

        fn launch_settings(&mut self, target: &str) -> Result<()> {
            self.record(format!("launch_settings {}", target))
        }

        fn dump_stack(&mut self, on_line: &mut dyn FnMut(String)) -> Result<()> {
            for line in &self.dump_output {
                on_line(line.clone());
            }
            self.record("dump_stack")
        }
    }

    pub fn controller_with(
        platform: FakePlatform,
    ) -> (
        DiagnosticController<FakePlatform>,
        mpsc::UnboundedSender<PlatformEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = ControllerConfig {
            export_path: std::env::temp_dir().join("bt_classic_diag_unused.txt"),
            bluetooth_settings_target: "bt-settings".to_string(),
            tv_settings_target: "tv-settings".to_string(),
        };
        (DiagnosticController::new(platform, rx, config), tx)
    }

    pub fn log_lines<P: BluetoothPlatform>(controller: &DiagnosticController<P>) -> Vec<String> {
        controller
            .state()
            .log()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_summary_line() {
        let device = Device::new("00:11:22:33:44:55")
            .with_name("K380")
            .with_class(0x002540);
        assert_eq!(
            summary_line(&device, Some(-60)),
            "K380 [00:11:22:33:44:55] RSSI: -60 dBm | HID | Keyboard: true | Blacklist: No"
        );
        assert_eq!(
            summary_line(&Device::new("00:11:22:33:44:56"), None),
            "Unknown [00:11:22:33:44:56] RSSI: n/a | Non-HID | Keyboard: false | Blacklist: No"
        );
    }

    #[test]
    fn test_scan_clears_registry_and_starts_discovery() {
        let (mut controller, _tx) = controller_with(FakePlatform::default());
        controller.state_mut().add_device(Device::new("00:00:00:00:00:01"));

        controller.scan();

        assert!(controller.state().registry().is_empty());
        assert!(controller.is_discovering());
        assert_eq!(
            controller.platform().calls(),
            vec!["cancel_discovery", "start_discovery"]
        );
        assert_eq!(log_lines(&controller), vec!["Scanning..."]);
    }

    #[test]
    fn test_scan_failure_is_logged() {
        let platform = FakePlatform {
            fail_with: Some("adapter off".to_string()),
            ..Default::default()
        };
        let (mut controller, _tx) = controller_with(platform);
        controller.scan();
        assert_eq!(log_lines(&controller), vec!["Scan error: adapter off"]);
    }

    #[test]
    fn test_show_paired_loads_registry() {
        let platform = FakePlatform {
            bonded: vec![
                Device::new("00:00:00:00:00:01")
                    .with_name("Speaker")
                    .with_bond_state(BondState::Bonded),
                Device::new("00:00:00:00:00:02").with_name("Xbox Controller"),
            ],
            ..Default::default()
        };
        let (mut controller, _tx) = controller_with(platform);
        controller
            .state_mut()
            .add_device(Device::new("00:00:00:00:00:09"));

        controller.show_paired();

        let registry = controller.state().registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).unwrap().address, "00:00:00:00:00:01");
        let lines = log_lines(&controller);
        assert_eq!(lines[0], "Paired devices: 2");
        assert!(lines[2].ends_with("Blacklist: Xbox (blocked)"));
    }

    #[test]
    fn test_dump_stack_streams_lines() {
        let platform = FakePlatform {
            dump_output: vec!["line one".to_string(), "line two".to_string()],
            ..Default::default()
        };
        let (mut controller, _tx) = controller_with(platform);
        controller.dump_stack();
        assert_eq!(log_lines(&controller), vec!["line one", "line two"]);
    }

    #[test]
    fn test_dump_stack_failure_collapses() {
        let platform = FakePlatform {
            fail_with: Some("no such command".to_string()),
            ..Default::default()
        };
        let (mut controller, _tx) = controller_with(platform);
        controller.dump_stack();
        assert_eq!(log_lines(&controller), vec!["Dump failed"]);
    }

    #[test]
    fn test_open_settings_uses_configured_target() {
        let (mut controller, _tx) = controller_with(FakePlatform::default());
        controller.open_settings();
        assert_eq!(controller.platform().calls(), vec!["launch_settings bt-settings"]);
    }

    #[test]
    fn test_clear_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _tx) = controller_with(FakePlatform::default());
        controller.config.export_path = dir.path().join("bt_log.txt");

        controller.log("noise");
        controller.clear_log();
        controller.export_log();

        let written = std::fs::read_to_string(dir.path().join("bt_log.txt")).unwrap();
        assert!(written.is_empty());
        let lines = log_lines(&controller);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Saved: "));
        assert!(lines[1].starts_with("Copy out: "));
    }

    #[test]
    fn test_export_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _tx) = controller_with(FakePlatform::default());
        controller.config.export_path = dir.path().to_path_buf();

        controller.export_log();

        let lines = log_lines(&controller);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Export failed: "));
    }

    #[test]
    fn test_teardown_cancels_once() {
        let (mut controller, tx) = controller_with(FakePlatform::default());
        controller.scan();
        controller.teardown();
        controller.teardown();

        assert!(!controller.is_discovering());
        assert!(tx.is_closed());
        let cancels = controller
            .platform()
            .calls()
            .iter()
            .filter(|c| *c == "cancel_discovery")
            .count();
        assert_eq!(cancels, 2); // one before the scan, one on teardown
    }
}
