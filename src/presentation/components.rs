use crate::domain::models::MessageSeverity;
use eframe::egui;

pub struct Components;

impl Components {
    pub fn heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).heading().strong());
    }

    pub fn card<R>(
        ui: &mut egui::Ui,
        title: &str,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let bg = ui.style().visuals.widgets.noninteractive.bg_fill;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(16.0))
            .rounding(egui::Rounding::same(10.0))
            .stroke(stroke)
            .fill(bg)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(title).strong().size(18.0));
                    ui.add_space(8.0);
                    add_contents(ui)
                })
                .inner
            })
            .inner
    }

    /// Coloured message line with a dismiss button. Returns true when the
    /// user dismissed it.
    pub fn status_message(ui: &mut egui::Ui, text: &str, severity: MessageSeverity) -> bool {
        let color = Self::severity_color(severity);
        let mut dismissed = false;

        egui::Frame::none()
            .inner_margin(egui::Margin::symmetric(12.0, 8.0))
            .rounding(egui::Rounding::same(6.0))
            .stroke(egui::Stroke::new(1.5, color))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(text).color(color).strong());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        dismissed = ui.small_button("✖").clicked();
                    });
                });
            });

        dismissed
    }

    /// Swatch filling the available width.
    pub fn swatch(ui: &mut egui::Ui, color: egui::Color32, caption: &str) {
        let size = egui::vec2(ui.available_width(), 70.0);
        let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
        let painter = ui.painter();
        painter.rect_filled(rect, egui::Rounding::same(8.0), color);

        let text_color = if color.r() as u16 + color.g() as u16 + color.b() as u16 > 380 {
            egui::Color32::BLACK
        } else {
            egui::Color32::WHITE
        };
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            caption,
            egui::FontId::proportional(20.0),
            text_color,
        );
    }

    pub fn severity_color(severity: MessageSeverity) -> egui::Color32 {
        match severity {
            MessageSeverity::Info => egui::Color32::from_rgb(70, 130, 220),
            MessageSeverity::Success => egui::Color32::from_rgb(40, 160, 80),
            MessageSeverity::Warning => egui::Color32::from_rgb(210, 150, 0),
            MessageSeverity::Error => egui::Color32::from_rgb(220, 60, 60),
        }
    }
}
