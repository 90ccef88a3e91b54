use eframe::egui;

/// Colours of the SNCV livery: cream and tram green, or a night variant.
pub struct Palette {
    pub bg: egui::Color32,
    pub card: egui::Color32,
    pub fg: egui::Color32,
    pub stroke: egui::Color32,
    pub accent: egui::Color32,
    pub accent_soft: egui::Color32,
}

impl Palette {
    pub fn new(is_dark: bool) -> Self {
        if is_dark {
            Self {
                bg: egui::Color32::from_rgb(18, 22, 28),
                card: egui::Color32::from_rgb(30, 36, 44),
                fg: egui::Color32::from_rgb(235, 235, 230),
                stroke: egui::Color32::from_rgb(70, 80, 90),
                accent: egui::Color32::from_rgb(60, 170, 110),
                accent_soft: egui::Color32::from_rgb(40, 90, 65),
            }
        } else {
            Self {
                bg: egui::Color32::from_rgb(246, 242, 232),
                card: egui::Color32::WHITE,
                fg: egui::Color32::from_rgb(30, 35, 40),
                stroke: egui::Color32::from_rgb(200, 195, 180),
                accent: egui::Color32::from_rgb(20, 110, 70),
                accent_soft: egui::Color32::from_rgb(190, 225, 205),
            }
        }
    }
}

pub fn configure(ctx: &egui::Context, is_dark: bool) {
    let palette = Palette::new(is_dark);
    let mut style = (*ctx.style()).clone();
    style.visuals = if is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };

    // Typography
    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 30.0,
                egui::TextStyle::Body | egui::TextStyle::Button => 16.0,
                _ => font_id.size,
            };
        });

    // Spacing, sized for touch screens
    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.spacing.button_padding = egui::vec2(14.0, 10.0);
    style.spacing.slider_width = 260.0;

    let widgets = &mut style.visuals.widgets;
    widgets.noninteractive.bg_fill = palette.card;
    widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, palette.stroke);
    widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, palette.fg);
    for state in [&mut widgets.inactive, &mut widgets.hovered, &mut widgets.active] {
        state.rounding = egui::Rounding::same(8.0);
    }
    widgets.hovered.bg_stroke = egui::Stroke::new(1.5, palette.accent);
    widgets.active.bg_fill = palette.accent;

    style.visuals.selection.bg_fill = palette.accent_soft;
    style.visuals.selection.stroke = egui::Stroke::new(1.0, palette.accent);
    style.visuals.panel_fill = palette.bg;
    style.visuals.window_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
