//! Application state: the device registry and the activity log.
//!
//! All mutation goes through `AppState` so the UI can be told when to redraw.

use crate::domain::models::Device;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Ordered list of devices seen during the current scan or paired-device load
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    /// Returns false if an equal device is already present
    pub fn insert(&mut self, device: Device) -> bool {
        if self.devices.contains(&device) {
            return false;
        }
        self.devices.push(device);
        true
    }

    pub fn contains(&self, device: &Device) -> bool {
        self.devices.contains(device)
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Append-only text log shown in the UI and exported on demand
#[derive(Debug, Default)]
pub struct LogSink {
    buffer: String,
}

impl LogSink {
    pub fn append(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    #[cfg(test)]
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.buffer.lines()
    }

    /// Overwrite `path` with the current buffer, then record where it went.
    pub fn export(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, &self.buffer).with_context(|| format!("writing {}", path.display()))?;

        self.append(&format!("Saved: {}", path.display()));
        self.append(&format!("Copy out: {} \"{}\" .", copy_command(), path.display()));
        Ok(())
    }
}

fn copy_command() -> &'static str {
    if cfg!(windows) {
        "copy"
    } else {
        "cp"
    }
}

/// Registry and log, plus a revision counter bumped on every mutation
#[derive(Default)]
pub struct AppState {
    registry: DeviceRegistry,
    log: LogSink,
    selected: Option<Device>,
    revision: u64,
    observer: Option<Box<dyn Fn() + Send>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked after each state change
    pub fn set_observer(&mut self, observer: Box<dyn Fn() + Send>) {
        self.observer = Some(observer);
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn log(&self) -> &LogSink {
        &self.log
    }

    pub fn selected(&self) -> Option<&Device> {
        self.selected.as_ref()
    }

    #[cfg(test)]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn log_line(&mut self, line: &str) {
        self.log.append(line);
        self.changed();
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.changed();
    }

    pub fn export_log(&mut self, path: &Path) -> Result<()> {
        let result = self.log.export(path);
        self.changed();
        result
    }

    pub fn add_device(&mut self, device: Device) -> bool {
        let inserted = self.registry.insert(device);
        if inserted {
            self.changed();
        }
        inserted
    }

    pub fn clear_devices(&mut self) {
        self.registry.clear();
        self.changed();
    }

    pub fn select(&mut self, device: &Device) {
        self.selected = Some(device.clone());
        self.changed();
    }

    fn changed(&mut self) {
        self.revision += 1;
        if let Some(observer) = &self.observer {
            observer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_registry_dedup() {
        let mut registry = DeviceRegistry::default();
        assert!(registry.insert(Device::new("00:00:00:00:00:01")));
        assert!(registry.insert(Device::new("00:00:00:00:00:02")));
        assert!(!registry.insert(Device::new("00:00:00:00:00:01").with_name("again")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(1).unwrap().address, "00:00:00:00:00:02");

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_log_append_and_clear() {
        let mut log = LogSink::default();
        log.append("one");
        log.append("two");
        assert_eq!(log.contents(), "one\ntwo\n");
        assert_eq!(log.lines().collect::<Vec<_>>(), vec!["one", "two"]);
        log.clear();
        assert_eq!(log.contents(), "");
    }

    #[test]
    fn test_export_writes_buffer_then_confirms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bt_log.txt");

        let mut log = LogSink::default();
        log.append("first");
        log.export(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\n");
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Saved: "));
        assert!(lines[2].starts_with("Copy out: "));
    }

    #[test]
    fn test_clear_then_export_gives_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bt_log.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale contents").unwrap();

        let mut log = LogSink::default();
        log.append("something");
        log.clear();
        log.export(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("Saved: {}", path.display()));
        assert!(lines[1].contains(&path.display().to_string()));
    }

    #[test]
    fn test_export_failure_leaves_log_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = LogSink::default();
        log.append("kept");
        // A directory cannot be overwritten as a file
        assert!(log.export(dir.path()).is_err());
        assert_eq!(log.contents(), "kept\n");
    }

    #[test]
    fn test_state_notifies_observer() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let mut state = AppState::new();
        state.set_observer(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        state.log_line("hello");
        assert!(state.add_device(Device::new("00:00:00:00:00:01")));
        assert!(!state.add_device(Device::new("00:00:00:00:00:01")));
        state.clear_devices();

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(state.revision(), 3);
    }
}
