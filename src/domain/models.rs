use crate::infrastructure::bluetooth::PlatformError;
use std::fmt;

/// Major device class for peripherals (keyboards, mice, gamepads)
pub const MAJOR_PERIPHERAL: u32 = 0x0500;

/// Peripheral subclass reported by keyboards
pub const PERIPHERAL_KEYBOARD: u32 = 0x0540;

/// Class of Device bitfield as reported during inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceClass(u32);

impl DeviceClass {
    pub fn new(raw: u32) -> Self {
        Self(raw & 0x00FF_FFFF)
    }

    /// Major device class bits (`0x1F00`)
    pub fn major(&self) -> u32 {
        self.0 & 0x1F00
    }

    /// Major and minor bits together (`0x1FFC`)
    pub fn device_class(&self) -> u32 {
        self.0 & 0x1FFC
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondState {
    None,
    Bonding,
    Bonded,
}

impl fmt::Display for BondState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::None => "NONE",
            Self::Bonding => "BONDING",
            Self::Bonded => "BONDED",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Unknown,
    Classic,
    Le,
    Dual,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unknown => "UNKNOWN",
            Self::Classic => "CLASSIC",
            Self::Le => "LE",
            Self::Dual => "DUAL",
        };
        f.write_str(text)
    }
}

/// Snapshot of a remote Bluetooth peripheral.
///
/// Equality follows the hardware address only, so two snapshots of the same
/// peripheral taken at different moments compare equal.
#[derive(Debug, Clone)]
pub struct Device {
    pub name: Option<String>,
    pub address: String,
    pub device_type: DeviceType,
    pub bond_state: BondState,
    pub class: Option<DeviceClass>,
}

impl Device {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
            device_type: DeviceType::Unknown,
            bond_state: BondState::None,
            class: None,
        }
    }

    #[cfg(test)]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_class(mut self, raw: u32) -> Self {
        self.class = Some(DeviceClass::new(raw));
        self
    }

    pub fn with_bond_state(mut self, state: BondState) -> Self {
        self.bond_state = state;
        self
    }

    pub fn with_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.address.eq_ignore_ascii_case(&other.address)
    }
}

impl Eq for Device {}

/// Notifications delivered by the platform into the controller's channel
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    DeviceFound {
        device: Option<Device>,
        rssi: Option<i16>,
    },
    BondStateChanged {
        device: Option<Device>,
    },
}

/// Format a 48-bit address as `AA:BB:CC:DD:EE:FF`
#[cfg_attr(not(windows), allow(dead_code))]
pub fn format_address(address: u64) -> String {
    let bytes = address.to_be_bytes();
    bytes[2..]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

pub fn parse_address(text: &str) -> Result<u64, PlatformError> {
    let hex: String = text.chars().filter(|c| *c != ':' && *c != '-').collect();
    if hex.len() != 12 {
        return Err(PlatformError::InvalidAddress(text.to_string()));
    }
    u64::from_str_radix(&hex, 16).map_err(|_| PlatformError::InvalidAddress(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_bits() {
        // Peripheral, keyboard, limited discoverable service bit set
        let class = DeviceClass::new(0x002540);
        assert_eq!(class.major(), MAJOR_PERIPHERAL);
        assert_eq!(class.device_class(), PERIPHERAL_KEYBOARD);

        let phone = DeviceClass::new(0x5A020C);
        assert_eq!(phone.major(), 0x0200);
        assert_eq!(phone.to_string(), "0x5A020C");
    }

    #[test]
    fn test_device_equality_uses_address() {
        let a = Device::new("AA:BB:CC:DD:EE:FF").with_name("Pad");
        let b = Device::new("aa:bb:cc:dd:ee:ff").with_bond_state(BondState::Bonded);
        let c = Device::new("AA:BB:CC:DD:EE:00").with_name("Pad");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_address_format_and_parse() {
        assert_eq!(format_address(0x0011_2233_AABB), "00:11:22:33:AA:BB");
        assert_eq!(parse_address("00:11:22:33:AA:BB").unwrap(), 0x0011_2233_AABB);
        assert!(parse_address("00:11:22").is_err());
        assert!(parse_address("GG:11:22:33:44:55").is_err());
    }
}
