//! Bluetooth Platform Module
//!
//! The controller talks to the host Bluetooth stack only through
//! [`BluetoothPlatform`]. Each adapter pushes discovery and bond
//! notifications into an unbounded channel that the controller drains
//! on the UI thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐  calls   ┌──────────────────────────┐
//! │   DiagnosticController   │ ───────▶ │    BluetoothPlatform     │
//! │      (UI thread)         │          │  winrt (Windows)         │
//! │                          │ ◀─────── │  bluez (Unix)            │
//! └──────────────────────────┘  events  └──────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`winrt`] - WinRT device watcher and pairing (Windows)
//! - [`bluez`] - `bluetoothctl` session and command wrappers (Unix)

#[cfg(unix)]
pub mod bluez;
#[cfg(windows)]
pub mod winrt;

use crate::domain::models::{Device, PlatformEvent};
use crate::domain::settings::Settings;
use anyhow::Result;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[cfg_attr(not(windows), allow(dead_code))]
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
    #[error("device {0} is not known to the Bluetooth stack")]
    UnknownDevice(String),
    #[error("`{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },
    #[error("invalid Bluetooth address: {0}")]
    InvalidAddress(String),
}

/// Capabilities the diagnostic controller needs from the host stack.
///
/// Long-running operations (discovery, bonding) only start work here; their
/// outcome arrives later as a [`PlatformEvent`].
pub trait BluetoothPlatform {
    fn start_discovery(&mut self) -> Result<()>;

    fn cancel_discovery(&mut self) -> Result<()>;

    fn is_discovering(&self) -> bool;

    fn bonded_devices(&mut self) -> Result<Vec<Device>>;

    /// Returns false when bonding could not be started (already bonded, etc.)
    fn create_bond(&mut self, device: &Device) -> Result<bool>;

    fn remove_bond(&mut self, device: &Device) -> Result<bool>;

    /// Unofficial pairing nudge for peripherals ignoring standard bonding
    fn send_pairing_request(&mut self, device: Option<&Device>) -> Result<()>;

    fn launch_settings(&mut self, target: &str) -> Result<()>;

    /// Run the host diagnostic command, handing each output line to `on_line`
    fn dump_stack(&mut self, on_line: &mut dyn FnMut(String)) -> Result<()>;
}

#[cfg(windows)]
pub type SystemPlatform = winrt::WinRtPlatform;
#[cfg(unix)]
pub type SystemPlatform = bluez::BluezPlatform;

/// Build the adapter for the current OS
pub fn system_platform(
    settings: &Settings,
    events: mpsc::UnboundedSender<PlatformEvent>,
) -> Result<SystemPlatform> {
    #[cfg(windows)]
    {
        winrt::WinRtPlatform::new(events, settings.diagnostic_command.clone())
    }
    #[cfg(unix)]
    {
        Ok(bluez::BluezPlatform::new(
            events,
            settings.bluetoothctl_path.clone(),
            settings.diagnostic_command.clone(),
        ))
    }
}
