//! Pairing Controller
//!
//! Bond and unbond requests against the injected platform. Each call is a
//! single best-effort attempt whose outcome only shows up in the log.

use crate::domain::classifier;
use crate::domain::controller::DiagnosticController;
use crate::domain::models::Device;
use crate::infrastructure::bluetooth::BluetoothPlatform;
use tracing::{info, warn};

impl<P: BluetoothPlatform> DiagnosticController<P> {
    pub fn pair(&mut self, device: &Device) {
        self.state.select(device);

        let c = classifier::classify(device);
        let class = device
            .class
            .map(|c| c.to_string())
            .unwrap_or_else(|| "n/a".to_string());

        self.log(format!("Pairing: {}", classifier::display_name(device)));
        self.log(format!(
            "Type: {} | Bond: {} | Class: {}",
            device.device_type, device.bond_state, class
        ));
        self.log(format!(
            "HID: {} | Keyboard: {} | Blacklist: {}",
            c.hid, c.keyboard_like, c.blacklist
        ));

        match self.platform.create_bond(device) {
            Ok(started) => {
                info!("create_bond({}) -> {}", device.address, started);
                self.log(format!("createBond -> {}", started));
            }
            Err(e) => {
                warn!("create_bond({}) failed: {}", device.address, e);
                self.log(format!("Pair error: {}", e));
            }
        }
    }

    pub fn unpair(&mut self, device: &Device) {
        self.log(format!("Unpairing: {}", classifier::display_name(device)));
        match self.platform.remove_bond(device) {
            Ok(removed) => {
                info!("remove_bond({}) -> {}", device.address, removed);
                self.log(format!("removeBond -> {}", removed));
            }
            Err(e) => {
                warn!("remove_bond({}) failed: {}", device.address, e);
                self.log(format!("Unpair error: {}", e));
            }
        }
    }

    /// Nudge the selected device with an unofficial pairing request, then
    /// restart discovery so it gets re-announced.
    pub fn experimental_pair(&mut self) {
        let target = self.state.selected().cloned();
        match &target {
            Some(device) => self.log(format!(
                "Experimental pair: {}",
                classifier::display_name(device)
            )),
            None => self.log("Experimental pair: no device selected"),
        }

        match self.platform.send_pairing_request(target.as_ref()) {
            Ok(()) => self.log("Pairing request sent"),
            Err(e) => {
                warn!("Pairing request failed: {}", e);
                self.log(format!("Pairing request failed: {}", e));
            }
        }

        if let Err(e) = self.platform.cancel_discovery() {
            warn!("Cancel discovery failed: {}", e);
        }
        match self.platform.start_discovery() {
            Ok(()) => self.log("Discovery restarted"),
            Err(e) => self.log(format!("Scan error: {}", e)),
        }
    }

    pub fn tv_pairing_trick(&mut self) {
        let target = self.config.tv_settings_target.clone();
        match self.platform.launch_settings(&target) {
            Ok(()) => self.log(format!("TV trick launched: {}", target)),
            Err(e) => {
                warn!("TV trick {} failed: {}", target, e);
                self.log(format!("TV trick failed: {}", e));
            }
        }
    }
}
