//! Train Remote Service
//!
//! Runs the connection manager and dispatcher on a dedicated Bluetooth
//! thread. The UI talks to it through [`RemoteHandle`]: commands go in over
//! a channel, state comes back through watch receivers and log events.

use crate::domain::models::{
    AppEvent, MessageSeverity, RemoteCommand, SessionSnapshot, StatusMessage, TrainState,
};
use crate::error::Result;
use crate::infrastructure::bluetooth::{
    connection::{ConnectionConfig, ConnectionManager, DiscoveryCanceller},
    dispatcher::CommandDispatcher,
    transport::BleTransport,
};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Everything the UI needs to drive the Bluetooth thread
pub struct RemoteHandle {
    pub commands: mpsc::UnboundedSender<RemoteCommand>,
    pub events: mpsc::UnboundedReceiver<AppEvent>,
    pub session: watch::Receiver<SessionSnapshot>,
    pub train: watch::Receiver<TrainState>,
    pub canceller: DiscoveryCanceller,
    pub worker: JoinHandle<()>,
}

/// Main Bluetooth service coordinating the connection and the commands
pub struct TrainRemoteService {
    manager: ConnectionManager,
    dispatcher: CommandDispatcher,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl TrainRemoteService {
    /// Create a new Bluetooth service
    pub fn new(
        transport: Arc<dyn BleTransport>,
        config: ConnectionConfig,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let manager = ConnectionManager::new(transport, config);
        let dispatcher = CommandDispatcher::new(&manager);
        Self {
            manager,
            dispatcher,
            event_sender,
        }
    }

    /// Start the service on its own thread with a single-threaded runtime.
    pub fn spawn(
        transport: Arc<dyn BleTransport>,
        config: ConnectionConfig,
    ) -> std::io::Result<RemoteHandle> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let service = Self::new(transport, config, event_tx);
        let session = service.manager.subscribe();
        let train = service.dispatcher.subscribe();
        let canceller = service.manager.canceller();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let worker = std::thread::Builder::new()
            .name("bluetooth".to_string())
            .spawn(move || rt.block_on(service.run(cmd_rx)))?;

        Ok(RemoteHandle {
            commands: cmd_tx,
            events: event_rx,
            session,
            train,
            canceller,
            worker,
        })
    }

    /// Execute commands one at a time until the UI hangs up, then close
    /// the link.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<RemoteCommand>) {
        info!("Bluetooth service started");
        while let Some(cmd) = commands.recv().await {
            self.handle(cmd).await;
        }

        info!("Command channel closed, releasing the link");
        self.manager.disconnect().await;
    }

    pub async fn handle(&mut self, cmd: RemoteCommand) {
        match cmd {
            RemoteCommand::Connect => match self.manager.connect().await {
                Ok(device) => self.send_log(
                    format!("Connected to {}", device.name),
                    MessageSeverity::Success,
                ),
                // Shown on the connect screen via SessionSnapshot::last_error
                Err(e) => error!("Connect request failed: {}", e),
            },
            RemoteCommand::Disconnect => {
                self.manager.disconnect().await;
                self.send_log("Disconnected from the train", MessageSeverity::Info);
            }
            RemoteCommand::ClearError => self.manager.clear_error(),
            RemoteCommand::SetSpeed(speed) => {
                let result = self.dispatcher.set_train_speed(speed).await;
                self.report("speed", result);
            }
            RemoteCommand::SetDirection(direction) => {
                let result = self.dispatcher.set_train_direction(direction).await;
                self.report("direction", result);
            }
            RemoteCommand::SetLightMode(mode) => {
                let result = self.dispatcher.set_light_mode(mode).await;
                self.report("light mode", result);
            }
            RemoteCommand::SetLightColor(color) => {
                let result = self.dispatcher.set_light_color(&color).await;
                self.report("light colour", result);
            }
            RemoteCommand::SetBrightness(brightness) => {
                let result = self.dispatcher.set_light_brightness(brightness).await;
                self.report("brightness", result);
            }
            RemoteCommand::SetWcDoor(open) => {
                let result = self.dispatcher.set_wc_door(open).await;
                self.report("door", result);
            }
            RemoteCommand::ToggleWcDoor => {
                let result = self.dispatcher.toggle_wc_door().await;
                self.report("door", result);
            }
        }
    }

    fn report(&self, what: &str, result: Result<()>) {
        if let Err(e) = result {
            error!("Failed to set {}: {}", what, e);
            self.send_log(format!("Failed to set {}: {}", what, e), MessageSeverity::Error);
        }
    }

    /// Send a log message
    fn send_log(&self, message: impl Into<String>, severity: MessageSeverity) {
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: message.into(),
            severity,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConnectionStatus, Direction, LightMode};
    use crate::infrastructure::bluetooth::connection::tests::transport_with;
    use crate::infrastructure::bluetooth::transport::{MockBleChannel, MockBleTransport};
    use tokio::sync::oneshot;

    fn drain(events: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<StatusMessage> {
        let mut messages = Vec::new();
        while let Ok(AppEvent::LogMessage(msg)) = events.try_recv() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn test_commands_reach_the_module() {
        let mut channel = MockBleChannel::new();
        channel.expect_write().times(3).returning(|_| Ok(()));
        channel.expect_disconnect().times(1).returning(|| Ok(()));
        let (_lose_link, link_lost) = oneshot::channel();
        let transport = transport_with(channel, link_lost);

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut service =
            TrainRemoteService::new(Arc::new(transport), ConnectionConfig::default(), event_tx);
        let session = service.manager.subscribe();
        let train = service.dispatcher.subscribe();

        service.handle(RemoteCommand::Connect).await;
        assert_eq!(session.borrow().status, ConnectionStatus::Connected);

        service.handle(RemoteCommand::SetSpeed(55)).await;
        service
            .handle(RemoteCommand::SetDirection(Direction::Reverse))
            .await;
        service
            .handle(RemoteCommand::SetLightMode(LightMode::Sunset))
            .await;

        {
            let state = train.borrow();
            assert_eq!(state.speed, 55);
            assert_eq!(state.direction, Direction::Reverse);
            assert_eq!(state.light_mode, LightMode::Sunset);
        }

        service.handle(RemoteCommand::Disconnect).await;
        assert_eq!(session.borrow().status, ConnectionStatus::Disconnected);

        let messages = drain(&mut event_rx);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].severity, MessageSeverity::Success);
    }

    #[tokio::test]
    async fn test_failed_command_is_reported() {
        let mut transport = MockBleTransport::new();
        transport.expect_is_available().never();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut service =
            TrainRemoteService::new(Arc::new(transport), ConnectionConfig::default(), event_tx);

        service.handle(RemoteCommand::ToggleWcDoor).await;
        service
            .handle(RemoteCommand::SetLightColor("gold".to_string()))
            .await;

        let messages = drain(&mut event_rx);
        assert_eq!(messages.len(), 2);
        assert!(messages
            .iter()
            .all(|m| m.severity == MessageSeverity::Error));
        assert_eq!(
            messages[0].message,
            "Failed to set door: Not connected to the train"
        );
        assert!(!service.dispatcher.state().wc_door_open);
    }

    #[tokio::test]
    async fn test_connect_error_lands_in_session() {
        let mut transport = MockBleTransport::new();
        transport.expect_is_available().returning(|| false);
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let mut service =
            TrainRemoteService::new(Arc::new(transport), ConnectionConfig::default(), event_tx);

        service.handle(RemoteCommand::Connect).await;
        assert_eq!(
            service.manager.snapshot().last_error.as_deref(),
            Some("Bluetooth is not available on this computer")
        );

        service.handle(RemoteCommand::ClearError).await;
        assert_eq!(service.manager.snapshot().last_error, None);
    }

    #[tokio::test]
    async fn test_run_releases_link_when_ui_hangs_up() {
        let mut channel = MockBleChannel::new();
        channel.expect_disconnect().times(1).returning(|| Ok(()));
        let (_lose_link, link_lost) = oneshot::channel();
        let transport = transport_with(channel, link_lost);

        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let service =
            TrainRemoteService::new(Arc::new(transport), ConnectionConfig::default(), event_tx);
        let session = service.manager.subscribe();

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        cmd_tx.send(RemoteCommand::Connect).unwrap();
        drop(cmd_tx);
        service.run(cmd_rx).await;

        assert_eq!(session.borrow().status, ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_spawned_worker_stops_with_the_ui() {
        let handle = TrainRemoteService::spawn(
            Arc::new(crate::infrastructure::bluetooth::transport::UnsupportedTransport),
            ConnectionConfig::default(),
        )
        .unwrap();

        let RemoteHandle {
            commands,
            mut session,
            worker,
            ..
        } = handle;
        commands.send(RemoteCommand::Connect).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(session.wait_for(|s| s.last_error.is_some()))
            .unwrap();

        drop(commands);
        worker.join().unwrap();
    }
}
