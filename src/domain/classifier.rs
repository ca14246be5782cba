//! Device Classifier
//!
//! Best-effort heuristics over a device snapshot. Nothing here is cached;
//! callers recompute whenever they need a verdict.

use crate::domain::models::{Device, MAJOR_PERIPHERAL, PERIPHERAL_KEYBOARD};

pub const HID: &str = "HID";
pub const NON_HID: &str = "Non-HID";
pub const NOT_BLOCKED: &str = "No";
pub const UNKNOWN_NAME: &str = "Unknown";

/// Substring rules checked in order; the first hit wins.
const BLACKLIST_RULES: &[(&[&str], &str)] = &[
    (&["xbox"], "Xbox (blocked)"),
    // "ps" is broad and also hits names like "AirPods"
    (&["dualshock", "dualsense", "ps"], "PlayStation (blocked)"),
    (&["switch", "pro controller"], "Switch (blocked)"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub hid: &'static str,
    pub keyboard_like: bool,
    pub blacklist: &'static str,
}

pub fn display_name(device: &Device) -> &str {
    device.name.as_deref().unwrap_or(UNKNOWN_NAME)
}

pub fn hid_type(device: &Device) -> &'static str {
    match device.class {
        Some(class) if class.major() == MAJOR_PERIPHERAL => HID,
        _ => NON_HID,
    }
}

pub fn keyboard_like(device: &Device) -> bool {
    device
        .class
        .map(|class| class.device_class() == PERIPHERAL_KEYBOARD)
        .unwrap_or(false)
}

pub fn blacklisted(device: &Device) -> &'static str {
    let Some(name) = device.name.as_deref() else {
        return NOT_BLOCKED;
    };
    let name = name.to_lowercase();

    BLACKLIST_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| name.contains(n)))
        .map(|(_, verdict)| *verdict)
        .unwrap_or(NOT_BLOCKED)
}

pub fn classify(device: &Device) -> Classification {
    Classification {
        hid: hid_type(device),
        keyboard_like: keyboard_like(device),
        blacklist: blacklisted(device),
    }
}
