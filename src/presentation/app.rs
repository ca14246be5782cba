use crate::domain::classifier;
use crate::domain::controller::DiagnosticController;
use crate::domain::models::Device;
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::SystemPlatform;
use crate::infrastructure::logging::LoggingGuard;
use crate::presentation::components::Components;
use crate::presentation::theme::{self, Palette};
use eframe::egui;
use std::time::Duration;
use tracing::warn;

/// Everything the screen can ask the controller to do
enum Action {
    Scan,
    ShowPaired,
    ExperimentalPair,
    TvTrick,
    DumpStack,
    OpenSettings,
    ExportLog,
    ClearLog,
    Pair(Device),
    Unpair(Device),
}

const BUTTONS: &[(&str, fn() -> Action)] = &[
    ("Scan", || Action::Scan),
    ("Show Paired", || Action::ShowPaired),
    ("Experimental Pair", || Action::ExperimentalPair),
    ("TV Trick", || Action::TvTrick),
    ("Dump Stack", || Action::DumpStack),
    ("Open Settings", || Action::OpenSettings),
    ("Export Log", || Action::ExportLog),
    ("Clear Log", || Action::ClearLog),
];

pub struct DiagnosticApp {
    controller: DiagnosticController<SystemPlatform>,
    settings: SettingsService,
    is_dark_mode: bool,
    _logging_guard: Option<LoggingGuard>,
}

impl DiagnosticApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        mut controller: DiagnosticController<SystemPlatform>,
        settings: SettingsService,
        logging_guard: Option<LoggingGuard>,
    ) -> Self {
        let is_dark_mode = settings.get().dark_mode;
        theme::configure(&cc.egui_ctx, is_dark_mode);

        let ctx = cc.egui_ctx.clone();
        controller
            .state_mut()
            .set_observer(Box::new(move || ctx.request_repaint()));

        Self {
            controller,
            settings,
            is_dark_mode,
            _logging_guard: logging_guard,
        }
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::Scan => self.controller.scan(),
            Action::ShowPaired => self.controller.show_paired(),
            Action::ExperimentalPair => self.controller.experimental_pair(),
            Action::TvTrick => self.controller.tv_pairing_trick(),
            Action::DumpStack => self.controller.dump_stack(),
            Action::OpenSettings => self.controller.open_settings(),
            Action::ExportLog => self.controller.export_log(),
            Action::ClearLog => self.controller.clear_log(),
            Action::Pair(device) => self.controller.pair(&device),
            Action::Unpair(device) => self.controller.unpair(&device),
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.is_dark_mode = !self.is_dark_mode;
        theme::configure(ctx, self.is_dark_mode);
        self.settings.get_mut().dark_mode = self.is_dark_mode;
        if let Err(e) = self.settings.save() {
            warn!("Could not persist theme choice: {}", e);
        }
    }

    fn ui_top_bar(&mut self, ctx: &egui::Context) {
        let palette = Palette::new(self.is_dark_mode);
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("BT Classic Diag");
                if self.controller.is_discovering() {
                    Components::status_chip(ui, "DISCOVERING", palette.ok);
                    ui.spinner();
                } else {
                    Components::status_chip(ui, "IDLE", egui::Color32::from_gray(170));
                }
                ui.label(format!(
                    "{} device(s)",
                    self.controller.state().registry().len()
                ));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = if self.is_dark_mode { "Light" } else { "Dark" };
                    if ui.button(label).clicked() {
                        self.toggle_theme(ctx);
                    }
                });
            });
        });
    }

    fn ui_actions(&self, ctx: &egui::Context) -> Option<Action> {
        let mut action = None;
        egui::SidePanel::left("actions")
            .resizable(false)
            .exact_width(170.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                for (label, make) in BUTTONS {
                    if Components::action_button(ui, label) {
                        action = Some(make());
                    }
                }
            });
        action
    }

    fn ui_devices(&self, ui: &mut egui::Ui) -> Option<Action> {
        let palette = Palette::new(self.is_dark_mode);
        let state = self.controller.state();
        let mut action = None;

        Components::card(ui, "Devices", |ui| {
            if state.registry().is_empty() {
                ui.label("No devices. Scan or show paired devices.");
                return;
            }
            egui::ScrollArea::vertical()
                .id_salt("devices")
                .max_height(180.0)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for device in state.registry().devices() {
                        let verdict = classifier::blacklisted(device);
                        let mut text = egui::RichText::new(format!(
                            "{}  [{}]  {}  {}",
                            classifier::display_name(device),
                            device.address,
                            device.bond_state,
                            classifier::hid_type(device),
                        ));
                        if verdict != classifier::NOT_BLOCKED {
                            text = text.color(palette.blocked);
                        }

                        let selected = state.selected() == Some(device);
                        let response = ui
                            .selectable_label(selected, text)
                            .on_hover_text("Click to pair, right-click or long-press to unpair");
                        if response.clicked() {
                            action = Some(Action::Pair(device.clone()));
                        } else if response.secondary_clicked() || response.long_touched() {
                            action = Some(Action::Unpair(device.clone()));
                        }
                    }
                });
        });
        action
    }

    fn ui_log(&self, ui: &mut egui::Ui) {
        Components::card(ui, "Log", |ui| {
            egui::ScrollArea::vertical()
                .id_salt("log")
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(self.controller.state().log().contents())
                                .monospace(),
                        )
                        .wrap_mode(egui::TextWrapMode::Wrap),
                    );
                });
        });
    }
}

impl eframe::App for DiagnosticApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.drain_events();
        if self.controller.is_discovering() {
            // Events from the platform thread do not wake the UI by themselves
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        self.ui_top_bar(ctx);
        let mut action = self.ui_actions(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(row_action) = self.ui_devices(ui) {
                action = Some(row_action);
            }
            ui.add_space(8.0);
            self.ui_log(ui);
        });

        if let Some(action) = action {
            self.dispatch(action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.teardown();
    }
}
