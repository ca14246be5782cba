//! BlueZ adapter driven through `bluetoothctl`.

pub mod parse;
pub mod session;

use super::{BluetoothPlatform, PlatformError};
use crate::domain::models::{BondState, Device, PlatformEvent};
use crate::infrastructure::process;
use anyhow::{Context, Result};
use session::{BondTracker, ScanSession};
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long the helper session waits for the peer before giving up
const PAIR_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BluezPlatform {
    bluetoothctl: String,
    diagnostic_command: String,
    session: Option<ScanSession>,
    bonds: BondTracker,
    events: mpsc::UnboundedSender<PlatformEvent>,
}

impl BluezPlatform {
    pub fn new(
        events: mpsc::UnboundedSender<PlatformEvent>,
        bluetoothctl: String,
        diagnostic_command: String,
    ) -> Self {
        Self {
            bluetoothctl,
            diagnostic_command,
            session: None,
            bonds: BondTracker::default(),
            events,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        process::output_of(&self.bluetoothctl, args)
    }

    fn lookup(&self, device: &Device) -> Result<Device> {
        session::device_info(&self.bluetoothctl, &device.address)
            .map(|(d, _)| d)
            .ok_or_else(|| PlatformError::UnknownDevice(device.address.clone()).into())
    }
}

impl BluetoothPlatform for BluezPlatform {
    fn start_discovery(&mut self) -> Result<()> {
        self.cancel_discovery()?;
        self.session = Some(ScanSession::start(
            &self.bluetoothctl,
            self.events.clone(),
            self.bonds.clone(),
        )?);
        Ok(())
    }

    fn cancel_discovery(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            session.stop()?;
        }
        Ok(())
    }

    fn is_discovering(&self) -> bool {
        self.session.as_ref().is_some_and(ScanSession::is_alive)
    }

    fn bonded_devices(&mut self) -> Result<Vec<Device>> {
        let listing = self.run(&["devices", "Paired"])?;
        let devices = parse::parse_device_list(&listing)
            .into_iter()
            .filter_map(|address| session::device_info(&self.bluetoothctl, &address))
            .map(|(d, _)| d)
            .collect();
        Ok(devices)
    }

    fn create_bond(&mut self, device: &Device) -> Result<bool> {
        let current = self.lookup(device)?;
        if current.bond_state == BondState::Bonded {
            return Ok(false);
        }

        if self.bonds.transition(&current.address, BondState::Bonding) {
            let _ = self.events.send(PlatformEvent::BondStateChanged {
                device: Some(current.clone().with_bond_state(BondState::Bonding)),
            });
        }

        // `pair` blocks until the peer answers, so it runs off the UI thread
        // and reports back through the event channel. A running scan session
        // may already have reported the outcome.
        let tool = self.bluetoothctl.clone();
        let events = self.events.clone();
        let bonds = self.bonds.clone();
        let address = current.address.clone();
        std::thread::spawn(move || {
            match process::output_of(&tool, &["pair", &address]) {
                Ok(_) => info!("bluetoothctl pair {} completed", address),
                Err(e) => warn!("bluetoothctl pair {} failed: {}", address, e),
            }
            let Some((device, _)) = session::device_info(&tool, &address) else {
                return;
            };
            if bonds.transition(&device.address, device.bond_state) {
                let _ = events.send(PlatformEvent::BondStateChanged {
                    device: Some(device),
                });
            }
        });
        Ok(true)
    }

    fn remove_bond(&mut self, device: &Device) -> Result<bool> {
        match self.run(&["remove", &device.address]) {
            Ok(_) => {
                if self.bonds.transition(&device.address, BondState::None) {
                    let _ = self.events.send(PlatformEvent::BondStateChanged {
                        device: Some(device.clone().with_bond_state(BondState::None)),
                    });
                }
                Ok(true)
            }
            Err(e) => {
                warn!("bluetoothctl remove {} failed: {}", device.address, e);
                Ok(false)
            }
        }
    }

    fn send_pairing_request(&mut self, device: Option<&Device>) -> Result<()> {
        // The agent lives only as long as this bluetoothctl process, so the
        // process is held open until the pair reply arrives or the wait ends.
        let mut script = String::from("agent NoInputNoOutput\ndefault-agent\n");
        if let Some(device) = device {
            script.push_str(&format!("trust {0}\npair {0}\n", device.address));
        }

        let mut child = Command::new(&self.bluetoothctl)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawning {}", self.bluetoothctl))?;
        let mut stdin = child.stdin.take().context("bluetoothctl stdin unavailable")?;
        let stdout = child.stdout.take().context("bluetoothctl stdout unavailable")?;
        stdin.write_all(script.as_bytes())?;
        stdin.flush()?;

        let (line_tx, line_rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        });

        std::thread::spawn(move || {
            match await_pair_reply(&line_rx, PAIR_REPLY_TIMEOUT) {
                Some(true) => info!("Pairing helper: peer paired"),
                Some(false) => warn!("Pairing helper: peer refused pairing"),
                None => debug!("Pairing helper: no reply within {:?}", PAIR_REPLY_TIMEOUT),
            }
            let _ = writeln!(stdin, "quit");
            let _ = stdin.flush();
            drop(stdin);
            let _ = child.wait();
        });
        Ok(())
    }

    fn launch_settings(&mut self, target: &str) -> Result<()> {
        process::spawn_detached(target)
    }

    fn dump_stack(&mut self, on_line: &mut dyn FnMut(String)) -> Result<()> {
        process::stream_lines(&self.diagnostic_command, on_line)
    }
}

/// Wait for a `pair` outcome on the helper's output.
///
/// Returns `None` when the deadline passes or the process closes its output first.
fn await_pair_reply(lines: &std_mpsc::Receiver<String>, timeout: Duration) -> Option<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        match lines.recv_timeout(remaining) {
            Ok(line) => {
                if let Some(outcome) = parse::pair_outcome(&line) {
                    return Some(outcome);
                }
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std_mpsc::RecvTimeoutError::Disconnected) => return None,
        }
    }
}

impl Drop for BluezPlatform {
    fn drop(&mut self) {
        let _ = self.cancel_discovery();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_reply_waits_past_unrelated_lines() {
        let (tx, rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            for line in ["Agent registered", "Attempting to pair with 00:11:22:33:44:55"] {
                tx.send(line.to_string()).unwrap();
            }
            std::thread::sleep(Duration::from_millis(50));
            tx.send("[CHG] Device 00:11:22:33:44:55 Paired: yes".to_string()).unwrap();
            tx.send("Pairing successful".to_string()).unwrap();
        });
        assert_eq!(await_pair_reply(&rx, Duration::from_secs(5)), Some(true));
    }

    #[test]
    fn test_pair_reply_failure() {
        let (tx, rx) = std_mpsc::channel();
        tx.send("Failed to pair: org.bluez.Error.AuthenticationCanceled".to_string())
            .unwrap();
        assert_eq!(await_pair_reply(&rx, Duration::from_secs(1)), Some(false));
    }

    #[test]
    fn test_pair_reply_gives_up() {
        let (tx, rx) = std_mpsc::channel::<String>();
        let started = Instant::now();
        assert_eq!(await_pair_reply(&rx, Duration::from_millis(100)), None);
        assert!(started.elapsed() >= Duration::from_millis(100));

        // Output closed before any reply
        drop(tx);
        assert_eq!(await_pair_reply(&rx, Duration::from_secs(5)), None);
    }

    #[test]
    fn test_discovery_ends_when_tool_exits() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut platform = BluezPlatform::new(tx, "sh".to_string(), "true".to_string());
        platform.start_discovery().unwrap();
        assert!(platform.is_discovering());

        // The tool going away on its own, as bluetoothctl does when the adapter vanishes
        platform.session.as_mut().unwrap().send("exit").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while platform.is_discovering() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!platform.is_discovering());
        platform.cancel_discovery().unwrap();
    }
}
