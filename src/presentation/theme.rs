use eframe::egui;

pub struct Palette {
    pub bg: egui::Color32,
    pub fg: egui::Color32,
    pub stroke: egui::Color32,
    pub hover: egui::Color32,
    pub active: egui::Color32,
    pub selection: egui::Color32,
    pub ok: egui::Color32,
    pub blocked: egui::Color32,
}

impl Palette {
    pub fn new(is_dark: bool) -> Self {
        if is_dark {
            Self {
                bg: egui::Color32::from_rgb(22, 22, 22),
                fg: egui::Color32::from_gray(230),
                stroke: egui::Color32::from_gray(200),
                hover: egui::Color32::from_rgb(60, 90, 160),
                active: egui::Color32::from_rgb(40, 140, 90),
                selection: egui::Color32::from_rgb(30, 90, 130),
                ok: egui::Color32::from_rgb(90, 220, 120),
                blocked: egui::Color32::from_rgb(255, 110, 90),
            }
        } else {
            Self {
                bg: egui::Color32::from_rgb(246, 246, 246),
                fg: egui::Color32::BLACK,
                stroke: egui::Color32::BLACK,
                hover: egui::Color32::from_rgb(190, 210, 255),
                active: egui::Color32::from_rgb(120, 220, 150),
                selection: egui::Color32::from_rgb(150, 210, 255),
                ok: egui::Color32::from_rgb(0, 140, 60),
                blocked: egui::Color32::from_rgb(200, 30, 30),
            }
        }
    }
}

/// Flat, square-cornered style sized for a small diagnostic window
pub fn configure(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();
    let palette = Palette::new(is_dark);

    style.visuals = if is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);

    let widgets = &mut style.visuals.widgets;
    for (visuals, width) in [
        (&mut widgets.noninteractive, 1.0),
        (&mut widgets.inactive, 1.5),
        (&mut widgets.hovered, 2.0),
        (&mut widgets.active, 2.5),
    ] {
        visuals.bg_stroke = egui::Stroke::new(width, palette.stroke);
        visuals.rounding = egui::Rounding::ZERO;
        visuals.fg_stroke = egui::Stroke::new(1.0, palette.fg);
    }
    widgets.noninteractive.bg_fill = palette.bg;
    widgets.hovered.weak_bg_fill = palette.hover;
    widgets.active.weak_bg_fill = palette.active;

    style.visuals.selection.bg_fill = palette.selection;
    style.visuals.selection.stroke = egui::Stroke::new(1.0, palette.stroke);
    style.visuals.panel_fill = palette.bg;
    style.visuals.window_rounding = egui::Rounding::ZERO;

    ctx.set_style(style);
}
