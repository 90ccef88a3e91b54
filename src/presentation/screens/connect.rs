use crate::domain::models::{MessageSeverity, RemoteCommand};
use crate::presentation::app::TrainRemoteApp;
use crate::presentation::components::Components;
use eframe::egui;

pub fn render(app: &mut TrainRemoteApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Oignies SNCV");
    ui.label("Télécommande du tram");
    ui.add_space(30.0);

    if let Some(error) = app.session.last_error.clone() {
        if Components::status_message(ui, &error, MessageSeverity::Error) {
            app.send(RemoteCommand::ClearError);
        }
        ui.add_space(15.0);
    } else if let Some(msg) = app.status_message.clone() {
        if Components::status_message(ui, &msg.message, msg.severity) {
            app.status_message = None;
        }
        ui.add_space(15.0);
    }

    Components::card(ui, "Connexion", |ui| {
        if app.session.is_discovering() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Recherche du train…");
            });
            ui.add_space(8.0);
            if ui.button("Annuler").clicked() {
                app.canceller.cancel();
            }
        } else if app.session.is_connecting() {
            // Module found, GATT setup cannot be interrupted
            let name = app
                .session
                .device
                .as_ref()
                .map(|d| d.name.as_str())
                .unwrap_or_default();
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("Connexion à {}…", name));
            });
        } else {
            let button = egui::Button::new(egui::RichText::new("🔗 Se connecter").size(20.0))
                .min_size(egui::vec2(ui.available_width(), 48.0));
            if ui.add(button).clicked() {
                app.send(RemoteCommand::Connect);
            }
        }
    });

    ui.add_space(20.0);
    ui.label(
        egui::RichText::new("Allumez le module du train et restez à proximité.")
            .small()
            .weak(),
    );
}
