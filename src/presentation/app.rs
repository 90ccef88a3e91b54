use crate::domain::models::{
    AppEvent, MessageSeverity, RemoteCommand, SessionSnapshot, StatusMessage, TrainState,
};
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::connection::{ConnectionConfig, DiscoveryCanceller};
use crate::infrastructure::bluetooth::{platform_transport, RemoteHandle, TrainRemoteService};
use crate::infrastructure::logging::LoggingGuard;
use crate::presentation::inputs::ControlInputs;
use eframe::egui;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

pub struct TrainRemoteApp {
    // Services
    pub(crate) settings: SettingsService,

    // Bluetooth
    pub(crate) commands: Option<mpsc::UnboundedSender<RemoteCommand>>,
    pub(crate) events: mpsc::UnboundedReceiver<AppEvent>,
    pub(crate) session_rx: watch::Receiver<SessionSnapshot>,
    pub(crate) train_rx: watch::Receiver<TrainState>,
    pub(crate) canceller: DiscoveryCanceller,
    worker: Option<JoinHandle<()>>,

    // State
    pub(crate) session: SessionSnapshot,
    pub(crate) train: TrainState,
    pub(crate) status_message: Option<StatusMessage>,
    disconnect_requested: bool,

    // Control inputs, resynced whenever the module confirms a change
    pub(crate) inputs: ControlInputs,

    // UI Options
    pub(crate) started: Instant,
    pub(crate) is_dark_mode: bool,

    // Logging guard
    _logging_guard: Option<LoggingGuard>,
}

impl TrainRemoteApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: SettingsService,
        logging_guard: Option<LoggingGuard>,
    ) -> anyhow::Result<Self> {
        let is_dark_mode = settings.get().dark_mode;
        crate::presentation::theme::configure(&cc.egui_ctx, is_dark_mode);

        let config = ConnectionConfig::from_settings(&settings.get().ble);
        let RemoteHandle {
            commands,
            events,
            session,
            train,
            canceller,
            worker,
        } = TrainRemoteService::spawn(platform_transport(), config)?;

        let initial_session = session.borrow().clone();
        let initial_train = train.borrow().clone();

        let inputs = ControlInputs::new(&initial_train);
        let app = Self {
            settings,
            commands: Some(commands),
            events,
            session_rx: session,
            train_rx: train,
            canceller,
            worker: Some(worker),
            session: initial_session,
            train: initial_train,
            status_message: None,
            disconnect_requested: false,
            inputs,
            started: Instant::now(),
            is_dark_mode,
            _logging_guard: logging_guard,
        };
        Ok(app)
    }

    /// Queue a command for the Bluetooth thread.
    pub(crate) fn send(&mut self, command: RemoteCommand) {
        match command {
            RemoteCommand::Disconnect => self.disconnect_requested = true,
            RemoteCommand::Connect => {
                self.disconnect_requested = false;
                self.status_message = None;
            }
            _ => {}
        }

        let sent = self
            .commands
            .as_ref()
            .is_some_and(|tx| tx.send(command).is_ok());
        if !sent {
            warn!("Bluetooth thread is gone, command dropped");
            self.status_message = Some(StatusMessage {
                message: "Bluetooth thread stopped".to_string(),
                severity: MessageSeverity::Error,
            });
        }
    }

    pub(crate) fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.is_dark_mode = !self.is_dark_mode;
        crate::presentation::theme::configure(ctx, self.is_dark_mode);
        if let Err(e) = self.settings.set_dark_mode(self.is_dark_mode) {
            warn!("Failed to save theme preference: {}", e);
        }
    }

    fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                AppEvent::LogMessage(msg) => self.status_message = Some(msg),
            }
        }

        if self.session_rx.has_changed().unwrap_or(false) {
            let session = self.session_rx.borrow_and_update().clone();
            let lost = self.session.is_connected()
                && !session.is_connected()
                && !session.is_connecting()
                && !self.disconnect_requested;
            if lost {
                info!("Link to the train lost");
                self.status_message = Some(StatusMessage {
                    message: "Connection to the train lost".to_string(),
                    severity: MessageSeverity::Warning,
                });
            }
            self.session = session;
        }

        if self.train_rx.has_changed().unwrap_or(false) {
            self.train = self.train_rx.borrow_and_update().clone();
            self.inputs.sync(&self.train);
        }
    }
}

impl eframe::App for TrainRemoteApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump();

        // Watch channels do not wake egui, and the auto cycle preview animates
        ctx.request_repaint_after(Duration::from_millis(100));

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.label(egui::RichText::new("🚋 Oignies SNCV").strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_icon = if self.is_dark_mode {
                        "☀ Clair"
                    } else {
                        "🌙 Sombre"
                    };
                    if ui.button(switch_icon).clicked() {
                        self.toggle_theme(ctx);
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(520.0);
                    ui.add_space(20.0);

                    use crate::presentation::screens;
                    if self.session.is_connected() {
                        screens::control::render(self, ui);
                    } else {
                        screens::connect::render(self, ui);
                    }

                    ui.add_space(30.0);
                });
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // Closing the channel makes the worker disconnect and return
        self.commands = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Bluetooth thread panicked");
            }
        }
        info!("Application closed");
    }
}
