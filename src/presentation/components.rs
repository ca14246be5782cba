use eframe::egui;

pub struct Components;

impl Components {
    pub fn card<R>(
        ui: &mut egui::Ui,
        title: &str,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let bg = ui.style().visuals.widgets.noninteractive.bg_fill;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(10.0))
            .stroke(stroke)
            .fill(bg)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(title).strong().size(16.0));
                    ui.add_space(4.0);
                    add_contents(ui)
                })
                .inner
            })
            .inner
    }

    /// Button stretched to the available width
    pub fn action_button(ui: &mut egui::Ui, text: &str) -> bool {
        ui.add_sized([ui.available_width(), 30.0], egui::Button::new(text))
            .clicked()
    }

    pub fn status_chip(ui: &mut egui::Ui, text: &str, color: egui::Color32) {
        ui.label(
            egui::RichText::new(format!(" {} ", text))
                .color(egui::Color32::BLACK)
                .background_color(color)
                .strong(),
        );
    }
}
