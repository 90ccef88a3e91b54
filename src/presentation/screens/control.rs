use crate::domain::color::Rgb;
use crate::domain::models::{Direction, LightMode, RemoteCommand, MAX_PERCENT};
use crate::presentation::app::TrainRemoteApp;
use crate::presentation::components::Components;
use crate::presentation::inputs::Control;
use eframe::egui;

pub fn render(app: &mut TrainRemoteApp, ui: &mut egui::Ui) {
    let device_name = app
        .session
        .device
        .as_ref()
        .map(|d| d.name.clone())
        .unwrap_or_else(|| "Oignies SNCV".to_string());
    Components::heading(ui, &device_name);
    ui.add_space(15.0);

    if let Some(msg) = app.status_message.clone() {
        if Components::status_message(ui, &msg.message, msg.severity) {
            app.status_message = None;
        }
        ui.add_space(15.0);
    }

    ui_lighting_panel(app, ui);
    ui.add_space(15.0);

    ui_door_panel(app, ui);
    ui.add_space(15.0);

    ui_train_panel(app, ui);
    ui.add_space(25.0);

    if ui.button("⏏ Déconnecter").clicked() {
        app.send(RemoteCommand::Disconnect);
    }
}

/// What the lights look like right now, for the preview swatch.
fn preview_color(app: &TrainRemoteApp) -> (egui::Color32, &'static str) {
    let mode = app.train.light_mode;
    match mode {
        LightMode::Manual => {
            let [r, g, b] = Rgb::from(app.inputs.color).to_array();
            let alpha = (u16::from(app.train.brightness) * 255 / u16::from(MAX_PERCENT)) as u8;
            (egui::Color32::from_rgba_unmultiplied(r, g, b, alpha), mode.label())
        }
        LightMode::Auto => {
            let phase = LightMode::auto_phase(app.started.elapsed());
            (ambiance(phase, 1.0), phase.label())
        }
        _ => (ambiance(mode, 0.9), mode.label()),
    }
}

fn ambiance(mode: LightMode, opacity: f32) -> egui::Color32 {
    let [r, g, b] = mode
        .ambiance_color()
        .unwrap_or(crate::domain::models::DEFAULT_LIGHT_COLOR)
        .to_array();
    egui::Color32::from_rgba_unmultiplied(r, g, b, (opacity * 255.0) as u8)
}

fn ui_lighting_panel(app: &mut TrainRemoteApp, ui: &mut egui::Ui) {
    let pointer_down = ui.input(|i| i.pointer.any_down());
    Components::card(ui, "💡 Éclairage", |ui| {
        let (color, caption) = preview_color(app);
        Components::swatch(ui, color, caption);
        ui.add_space(8.0);

        let current = app.train.light_mode;
        ui.horizontal_wrapped(|ui| {
            for mode in LightMode::ALL {
                if ui.selectable_label(current == mode, mode.label()).clicked() && current != mode {
                    app.send(RemoteCommand::SetLightMode(mode));
                }
            }
        });

        if current == LightMode::Manual {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label("Couleur");
                let response = ui.color_edit_button_srgb(&mut app.inputs.color);
                app.inputs
                    .track(Control::Color, response.changed(), pointer_down, &app.train);
                if response.changed() {
                    let hex = Rgb::from(app.inputs.color).to_hex();
                    app.send(RemoteCommand::SetLightColor(hex));
                }
                ui.monospace(&app.train.light_color);
            });
            ui.horizontal(|ui| {
                ui.label("Intensité");
                let slider = egui::Slider::new(&mut app.inputs.brightness, 0..=MAX_PERCENT)
                    .suffix(" %");
                let response = ui.add(slider);
                app.inputs.track(
                    Control::Brightness,
                    response.changed(),
                    pointer_down,
                    &app.train,
                );
                if response.changed() {
                    app.send(RemoteCommand::SetBrightness(app.inputs.brightness));
                }
            });
        }
    });
}

fn ui_door_panel(app: &mut TrainRemoteApp, ui: &mut egui::Ui) {
    Components::card(ui, "🚪 Porte des WC", |ui| {
        let (state, action) = if app.train.wc_door_open {
            ("Ouverte", "Fermer")
        } else {
            ("Fermée", "Ouvrir")
        };
        ui.horizontal(|ui| {
            ui.label(format!("État : {}", state));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(action).clicked() {
                    app.send(RemoteCommand::ToggleWcDoor);
                }
            });
        });
    });
}

fn ui_train_panel(app: &mut TrainRemoteApp, ui: &mut egui::Ui) {
    let pointer_down = ui.input(|i| i.pointer.any_down());
    Components::card(ui, "🚋 Tram", |ui| {
        ui.horizontal(|ui| {
            ui.label("Vitesse");
            let slider = egui::Slider::new(&mut app.inputs.speed, 0..=MAX_PERCENT).suffix(" %");
            let response = ui.add(slider);
            app.inputs
                .track(Control::Speed, response.changed(), pointer_down, &app.train);
            if response.changed() {
                app.send(RemoteCommand::SetSpeed(app.inputs.speed));
            }
        });

        ui.add_space(8.0);
        let direction = app.train.direction;
        ui.horizontal(|ui| {
            if ui
                .selectable_label(direction == Direction::Reverse, "◀ Arrière")
                .clicked()
                && direction != Direction::Reverse
            {
                app.send(RemoteCommand::SetDirection(Direction::Reverse));
            }
            if ui
                .selectable_label(direction == Direction::Forward, "Avant ▶")
                .clicked()
                && direction != Direction::Forward
            {
                app.send(RemoteCommand::SetDirection(Direction::Forward));
            }
        });

        ui.add_space(8.0);
        let stop = egui::Button::new(egui::RichText::new("⏹ Arrêt").strong())
            .fill(egui::Color32::from_rgb(200, 50, 50))
            .min_size(egui::vec2(ui.available_width(), 40.0));
        if ui.add(stop).clicked() {
            app.inputs.speed = 0;
            app.send(RemoteCommand::SetSpeed(0));
        }
    });
}
