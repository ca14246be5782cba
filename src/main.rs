mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use domain::controller::{ControllerConfig, DiagnosticController};
use domain::settings::SettingsService;
use eframe::egui;
use std::path::PathBuf;
use tokio::sync::mpsc;

fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new().unwrap_or_else(|e| {
        eprintln!("Settings directory unavailable ({}), using defaults", e);
        SettingsService::load(PathBuf::from("settings.json"))
    });

    let logging_guard = infrastructure::logging::init_logger(&settings.get().log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    tracing::info!("Starting Bluetooth classic diagnostics");

    let config = ControllerConfig {
        export_path: settings.export_path()?,
        bluetooth_settings_target: settings.get().bluetooth_settings_target.clone(),
        tv_settings_target: settings.get().tv_settings_target.clone(),
    };

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let platform = infrastructure::bluetooth::system_platform(settings.get(), event_tx)
        .context("initializing Bluetooth platform")?;
    let controller = DiagnosticController::new(platform, event_rx, config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 560.0])
            .with_title("BT Classic Diag"),
        ..Default::default()
    };

    eframe::run_native(
        "BT Classic Diag",
        options,
        Box::new(|cc| {
            Ok(Box::new(presentation::app::DiagnosticApp::new(
                cc,
                controller,
                settings,
                logging_guard,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI terminated: {}", e))
}
