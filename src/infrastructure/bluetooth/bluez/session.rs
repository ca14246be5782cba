//! Interactive `bluetoothctl` discovery session.
//!
//! The session keeps one `bluetoothctl` process alive with `scan on` and
//! turns its notification lines into [`PlatformEvent`]s on a reader thread.

use super::parse::{self, SessionLine};
use crate::domain::models::{BondState, Device, PlatformEvent};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Last bond state reported per address.
///
/// Shared by the session reader and the pairing worker so one transition
/// reaches the event channel once, whichever side notices it first.
#[derive(Debug, Clone, Default)]
pub struct BondTracker {
    states: Arc<Mutex<HashMap<String, BondState>>>,
}

impl BondTracker {
    /// Record `state` for `address`; false when it was already the last one reported
    pub fn transition(&self, address: &str, state: BondState) -> bool {
        let mut states = match self.states.lock() {
            Ok(states) => states,
            Err(poisoned) => poisoned.into_inner(),
        };
        states.insert(address.to_uppercase(), state) != Some(state)
    }
}

pub struct ScanSession {
    child: Child,
    stdin: ChildStdin,
    alive: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl ScanSession {
    pub fn start(
        bluetoothctl: &str,
        events: mpsc::UnboundedSender<PlatformEvent>,
        bonds: BondTracker,
    ) -> Result<Self> {
        info!("Starting bluetoothctl discovery session");
        let mut child = Command::new(bluetoothctl)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawning {}", bluetoothctl))?;

        let mut stdin = child.stdin.take().context("bluetoothctl stdin unavailable")?;
        let stdout = child.stdout.take().context("bluetoothctl stdout unavailable")?;

        writeln!(stdin, "scan on")?;
        stdin.flush()?;

        let tool = bluetoothctl.to_string();
        let alive = Arc::new(AtomicBool::new(true));
        let reader_alive = alive.clone();
        let reader = std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if let Some(parsed) = parse::parse_session_line(&line) {
                    if let Some(event) = to_event(&tool, &bonds, parsed) {
                        if events.send(event).is_err() {
                            debug!("Event receiver gone, stopping session reader");
                            break;
                        }
                    }
                }
            }
            reader_alive.store(false, Ordering::SeqCst);
            debug!("bluetoothctl session reader finished");
        });

        Ok(Self {
            child,
            stdin,
            alive,
            reader: Some(reader),
        })
    }

    /// False once `bluetoothctl` has closed its output (exited, adapter gone)
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Forward a raw command into the running session
    pub fn send(&mut self, command: &str) -> Result<()> {
        writeln!(self.stdin, "{}", command)?;
        self.stdin.flush()?;
        Ok(())
    }

    pub fn stop(mut self) -> Result<()> {
        info!("Stopping bluetoothctl discovery session");
        let _ = self.send("scan off");
        let _ = self.send("quit");
        if let Err(e) = self.child.kill() {
            debug!("bluetoothctl already exited: {}", e);
        }
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("bluetoothctl reader thread panicked");
            }
        }
        Ok(())
    }
}

/// Look up a device snapshot; `None` when the stack no longer knows it
pub fn device_info(bluetoothctl: &str, address: &str) -> Option<(Device, Option<i16>)> {
    let output = Command::new(bluetoothctl)
        .args(["info", address])
        .output()
        .ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    let device = parse::parse_info(address, &text)?;
    Some((device, parse::info_rssi(&text)))
}

fn to_event(bluetoothctl: &str, bonds: &BondTracker, line: SessionLine) -> Option<PlatformEvent> {
    match line {
        SessionLine::NewDevice { address, name } => {
            let (device, rssi) = match device_info(bluetoothctl, &address) {
                Some(found) => found,
                None => {
                    let mut device = Device::new(address.to_uppercase());
                    device.name = name;
                    (device, None)
                }
            };
            Some(PlatformEvent::DeviceFound {
                device: Some(device),
                rssi,
            })
        }
        SessionLine::Rssi { address, rssi } => Some(PlatformEvent::DeviceFound {
            device: device_info(bluetoothctl, &address).map(|(d, _)| d),
            rssi: Some(rssi),
        }),
        SessionLine::Paired { address, paired } => {
            let state = if paired {
                BondState::Bonded
            } else {
                BondState::None
            };
            if !bonds.transition(&address, state) {
                debug!("{} already reported as {}", address, state);
                return None;
            }
            let device = device_info(bluetoothctl, &address)
                .map(|(d, _)| d.with_bond_state(state));
            Some(PlatformEvent::BondStateChanged { device })
        }
    }
}
