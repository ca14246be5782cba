//! Conversions between WinRT Bluetooth objects and device snapshots.

use crate::domain::models::{format_address, parse_address, BondState, Device, DeviceType};
use anyhow::Result;
use windows::core::HSTRING;
use windows::Devices::Bluetooth::BluetoothDevice;

pub fn snapshot(bt: &BluetoothDevice) -> Result<Device> {
    let paired = bt.DeviceInformation()?.Pairing()?.IsPaired()?;
    let mut device = Device::new(format_address(bt.BluetoothAddress()?))
        .with_class(bt.ClassOfDevice()?.RawValue()?)
        .with_type(DeviceType::Classic)
        .with_bond_state(if paired {
            BondState::Bonded
        } else {
            BondState::None
        });

    let name = bt.Name()?.to_string();
    if !name.is_empty() {
        device.name = Some(name);
    }
    Ok(device)
}

pub fn open_by_id(id: &HSTRING) -> Result<BluetoothDevice> {
    Ok(BluetoothDevice::FromIdAsync(id)?.get()?)
}

pub fn open_by_address(address: &str) -> Result<BluetoothDevice> {
    let raw = parse_address(address)?;
    Ok(BluetoothDevice::FromBluetoothAddressAsync(raw)?.get()?)
}
