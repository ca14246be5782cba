use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "BtClassicDiag";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "bt_classic_diag".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,

    /// File name of the exported log inside the app data directory
    #[serde(default = "default_export_file_name")]
    pub export_file_name: String,

    // Launch targets
    #[serde(default = "default_bluetooth_settings_target")]
    pub bluetooth_settings_target: String,
    #[serde(default = "default_tv_settings_target")]
    pub tv_settings_target: String,

    #[serde(default = "default_diagnostic_command")]
    pub diagnostic_command: String,
    #[serde(default = "default_bluetoothctl_path")]
    pub bluetoothctl_path: String,

    #[serde(default = "default_false")]
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            export_file_name: default_export_file_name(),
            bluetooth_settings_target: default_bluetooth_settings_target(),
            tv_settings_target: default_tv_settings_target(),
            diagnostic_command: default_diagnostic_command(),
            bluetoothctl_path: default_bluetoothctl_path(),
            dark_mode: false,
        }
    }
}

fn default_export_file_name() -> String {
    "bt_log.txt".to_string()
}

#[cfg(windows)]
fn default_bluetooth_settings_target() -> String {
    "ms-settings:bluetooth".to_string()
}
#[cfg(not(windows))]
fn default_bluetooth_settings_target() -> String {
    "gnome-control-center bluetooth".to_string()
}

// Undocumented URI that opens the "Add a device" flow directly
#[cfg(windows)]
fn default_tv_settings_target() -> String {
    "ms-settings-connectabledevices:devicediscovery".to_string()
}
#[cfg(not(windows))]
fn default_tv_settings_target() -> String {
    "blueman-assistant".to_string()
}

#[cfg(windows)]
fn default_diagnostic_command() -> String {
    "pnputil /enum-devices /class Bluetooth".to_string()
}
#[cfg(not(windows))]
fn default_diagnostic_command() -> String {
    "btmgmt info".to_string()
}

fn default_bluetoothctl_path() -> String {
    "bluetoothctl".to_string()
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::load(settings_path))
    }

    /// Load from `settings_path`, falling back to defaults
    pub fn load(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!("Using default settings ({})", e);
                Settings::default()
            }
        };
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push(APP_DIR);
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Fixed location of the exported log in the app's private data directory
    pub fn export_path(&self) -> anyhow::Result<PathBuf> {
        let mut path = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        path.push(APP_DIR);
        path.push(&self.settings.export_file_name);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "export_file_name": "dump.txt" }"#).unwrap();
        assert_eq!(settings.export_file_name, "dump.txt");
        assert_eq!(settings.bluetoothctl_path, "bluetoothctl");
        assert_eq!(settings.log_settings.level, "info");
        assert!(!settings.dark_mode);
    }

    #[test]
    fn test_missing_file_falls_back_and_save_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut service = SettingsService::load(path.clone());
        assert_eq!(service.get().export_file_name, "bt_log.txt");

        service.get_mut().dark_mode = true;
        service.save().unwrap();

        let reloaded = SettingsService::load(path);
        assert!(reloaded.get().dark_mode);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let service = SettingsService::load(path);
        assert_eq!(service.get().diagnostic_command, default_diagnostic_command());
    }
}
