mod domain;
mod error;
mod infrastructure;
mod presentation;

use domain::settings::SettingsService;
use eframe::egui;
use presentation::app::TrainRemoteApp;

fn main() -> eframe::Result {
    let settings = SettingsService::new().unwrap_or_else(|e| {
        eprintln!("No config directory ({}), using ./settings.json", e);
        SettingsService::from_path("settings.json".into())
    });

    let logging_guard = infrastructure::logging::init_logger(&settings.get().log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    tracing::info!("Starting Oignies SNCV remote");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 760.0])
            .with_min_inner_size([360.0, 480.0])
            .with_title("Oignies SNCV"),
        ..Default::default()
    };

    eframe::run_native(
        "Oignies SNCV",
        options,
        Box::new(move |cc| {
            let app = TrainRemoteApp::new(cc, settings, logging_guard)?;
            Ok(Box::new(app))
        }),
    )
}
