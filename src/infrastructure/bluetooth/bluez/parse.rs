//! Parsers for `bluetoothctl` output.

use crate::domain::models::{BondState, Device, DeviceType};

/// A line of interest from an interactive `bluetoothctl` session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLine {
    NewDevice {
        address: String,
        name: Option<String>,
    },
    Rssi {
        address: String,
        rssi: i16,
    },
    Paired {
        address: String,
        paired: bool,
    },
}

/// Remove ANSI colour sequences and readline markers
pub fn strip_ansi(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    // Parameters run until the final byte in @..~
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
            }
            '\u{1}' | '\u{2}' | '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

fn is_address(text: &str) -> bool {
    let parts: Vec<&str> = text.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Accepts `-60` as well as the newer `0xffffffc4 (-60)` form
pub fn parse_rssi(value: &str) -> Option<i16> {
    let value = value.trim();
    if let Some(start) = value.find('(') {
        let inner = &value[start + 1..];
        let end = inner.find(')')?;
        return inner[..end].trim().parse().ok();
    }
    if let Some(hex) = value.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16).ok().map(|v| v as i32 as i16);
    }
    value.parse().ok()
}

pub fn parse_session_line(raw: &str) -> Option<SessionLine> {
    let line = strip_ansi(raw);
    let (tag, rest) = ["[NEW]", "[CHG]"]
        .iter()
        .find_map(|tag| line.find(tag).map(|i| (*tag, line[i + tag.len()..].trim())))?;

    let rest = rest.strip_prefix("Device ")?;
    let (address, tail) = match rest.split_once(' ') {
        Some((address, tail)) => (address, tail.trim()),
        None => (rest, ""),
    };
    if !is_address(address) {
        return None;
    }
    let address = address.to_string();

    if tag == "[NEW]" {
        let name = (!tail.is_empty() && !is_address(&tail.replace('-', ":")))
            .then(|| tail.to_string());
        return Some(SessionLine::NewDevice { address, name });
    }

    let (key, value) = tail.split_once(':')?;
    match key.trim() {
        "RSSI" => parse_rssi(value).map(|rssi| SessionLine::Rssi { address, rssi }),
        // `Bonded` accompanies `Paired` for the same transition
        "Paired" => Some(SessionLine::Paired {
            address,
            paired: value.trim() == "yes",
        }),
        _ => None,
    }
}

/// Build a device snapshot from `bluetoothctl info <address>` output
pub fn parse_info(address: &str, text: &str) -> Option<Device> {
    let text = strip_ansi(text);
    if text.trim().is_empty() || text.contains("not available") {
        return None;
    }

    let mut device = Device::new(address.to_uppercase());
    let mut paired = false;
    let mut random_address = false;

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" if !value.is_empty() => device.name = Some(value.to_string()),
            "Alias" if device.name.is_none() && !value.is_empty() => {
                device.name = Some(value.to_string())
            }
            "Class" => {
                let hex = value.trim_start_matches("0x");
                if let Ok(raw) = u32::from_str_radix(hex, 16) {
                    device = device.with_class(raw);
                }
            }
            "Paired" | "Bonded" => paired |= value == "yes",
            "AddressType" => random_address = value == "random",
            _ => {}
        }
    }

    let device_type = match (device.class.is_some(), random_address) {
        (true, true) => DeviceType::Dual,
        (true, false) => DeviceType::Classic,
        (false, true) => DeviceType::Le,
        (false, false) => DeviceType::Unknown,
    };
    let bond_state = if paired {
        BondState::Bonded
    } else {
        BondState::None
    };
    Some(device.with_type(device_type).with_bond_state(bond_state))
}

/// Outcome of a `pair` command as reported by an interactive session
pub fn pair_outcome(line: &str) -> Option<bool> {
    let line = strip_ansi(line);
    if line.contains("Pairing successful") {
        Some(true)
    } else if line.contains("Failed to pair") {
        Some(false)
    } else {
        None
    }
}

/// Last RSSI reported in `info` output, if any
pub fn info_rssi(text: &str) -> Option<i16> {
    strip_ansi(text)
        .lines()
        .filter_map(|l| l.trim().strip_prefix("RSSI:"))
        .last()
        .and_then(parse_rssi)
}

/// Addresses listed by `bluetoothctl devices [Paired]`
pub fn parse_device_list(text: &str) -> Vec<String> {
    strip_ansi(text)
        .lines()
        .filter_map(|l| l.trim().strip_prefix("Device "))
        .filter_map(|rest| rest.split_whitespace().next())
        .filter(|a| is_address(a))
        .map(str::to_string)
        .collect()
}
