//! Command Dispatcher
//!
//! Turns user intents into protocol commands, writes them to the live
//! link and keeps [`TrainState`] in step with the writes that succeeded.

use crate::domain::color::Rgb;
use crate::domain::models::{Direction, LightMode, TrainState, MAX_PERCENT};
use crate::error::{RemoteError, Result};
use crate::infrastructure::bluetooth::connection::{ConnectionManager, LinkSlot};
use crate::infrastructure::bluetooth::protocol::{Command, ModePayload};
use tokio::sync::watch;
use tracing::{debug, warn};

pub struct CommandDispatcher {
    link: LinkSlot,
    state: watch::Sender<TrainState>,
}

impl CommandDispatcher {
    /// Dispatcher writing to whatever link `manager` currently holds.
    pub fn new(manager: &ConnectionManager) -> Self {
        let (state, _) = watch::channel(TrainState::default());
        Self {
            link: manager.link_slot(),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrainState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> TrainState {
        self.state.borrow().clone()
    }

    /// Speeds above 100 are clamped.
    pub async fn set_train_speed(&self, speed: u8) -> Result<()> {
        let speed = speed.min(MAX_PERCENT);
        self.dispatch(Command::TrainSpeed(speed), |s| s.speed = speed)
            .await
    }

    pub async fn set_train_direction(&self, direction: Direction) -> Result<()> {
        self.dispatch(Command::Direction(direction), |s| s.direction = direction)
            .await
    }

    /// Manual mode is sent as the currently stored colour.
    pub async fn set_light_mode(&self, mode: LightMode) -> Result<()> {
        let color = Rgb::from_hex(&self.state.borrow().light_color)?;
        self.dispatch(Command::light_mode(mode, color), |s| s.light_mode = mode)
            .await
    }

    /// Send a manual colour. The module switches to manual mode on it, so
    /// the mirror does too.
    pub async fn set_light_color(&self, color: &str) -> Result<()> {
        let rgb = Rgb::from_hex(color)?;
        self.dispatch(Command::Mode(ModePayload::Manual(rgb)), |s| {
            s.light_color = color.to_string();
            s.light_mode = LightMode::Manual;
        })
        .await
    }

    /// Brightness above 100 is clamped.
    pub async fn set_light_brightness(&self, brightness: u8) -> Result<()> {
        let brightness = brightness.min(MAX_PERCENT);
        self.dispatch(Command::Brightness(brightness), |s| {
            s.brightness = brightness
        })
        .await
    }

    pub async fn set_wc_door(&self, open: bool) -> Result<()> {
        self.dispatch(Command::Wc(open), |s| s.wc_door_open = open)
            .await
    }

    /// Flip the door relative to the mirrored state.
    pub async fn toggle_wc_door(&self) -> Result<()> {
        let open = !self.state.borrow().wc_door_open;
        self.set_wc_door(open).await
    }

    /// Write `command`, then apply `update` to the mirror as one replacement.
    async fn dispatch(&self, command: Command, update: impl FnOnce(&mut TrainState)) -> Result<()> {
        let payload = command.encode()?;

        {
            let slot = self.link.lock().await;
            let link = slot.as_ref().ok_or(RemoteError::NotConnected)?;

            debug!(
                "Writing {} command: {}",
                command.tag(),
                String::from_utf8_lossy(&payload)
            );
            if let Err(e) = link.channel.write(&payload).await {
                warn!("Write of {} command failed: {}", command.tag(), e);
                return Err(RemoteError::WriteFailed(e));
            }
        }

        let mut next = self.state.borrow().clone();
        update(&mut next);
        self.state.send_replace(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::infrastructure::bluetooth::connection::tests::connected_manager;
    use crate::infrastructure::bluetooth::connection::ConnectionConfig;
    use crate::infrastructure::bluetooth::transport::{MockBleChannel, MockBleTransport};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Channel that records every payload it accepts.
    fn recording_channel() -> (MockBleChannel, Arc<Mutex<Vec<String>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&writes);
        let mut channel = MockBleChannel::new();
        channel.expect_write().returning(move |payload| {
            sink.lock()
                .unwrap()
                .push(String::from_utf8(payload.to_vec()).unwrap());
            Ok(())
        });
        channel.expect_disconnect().returning(|| Ok(()));
        (channel, writes)
    }

    fn disconnected_dispatcher() -> CommandDispatcher {
        let transport = MockBleTransport::new();
        let manager = ConnectionManager::new(Arc::new(transport), ConnectionConfig::default());
        CommandDispatcher::new(&manager)
    }

    #[tokio::test]
    async fn test_setters_need_a_connection() {
        let dispatcher = disconnected_dispatcher();
        let before = dispatcher.state();

        let results = [
            dispatcher.set_train_speed(42).await,
            dispatcher.set_train_direction(Direction::Reverse).await,
            dispatcher.set_light_mode(LightMode::Night).await,
            dispatcher.set_light_mode(LightMode::Manual).await,
            dispatcher.set_light_color("#123456").await,
            dispatcher.set_light_brightness(10).await,
            dispatcher.set_wc_door(true).await,
            dispatcher.toggle_wc_door().await,
        ];

        for result in results {
            assert!(matches!(result, Err(RemoteError::NotConnected)));
        }
        assert_eq!(dispatcher.state(), before);
    }

    #[tokio::test]
    async fn test_speed_writes_once_and_updates_mirror() {
        let mut channel = MockBleChannel::new();
        channel
            .expect_write()
            .withf(|payload| payload == br#"{"cmd":"train-speed","value":42}"#)
            .times(1)
            .returning(|_| Ok(()));
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);

        dispatcher.set_train_speed(42).await.unwrap();
        assert_eq!(dispatcher.state().speed, 42);
    }

    #[tokio::test]
    async fn test_speed_is_clamped() {
        let (channel, writes) = recording_channel();
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);

        dispatcher.set_train_speed(250).await.unwrap();
        dispatcher.set_light_brightness(101).await.unwrap();

        assert_eq!(dispatcher.state().speed, 100);
        assert_eq!(dispatcher.state().brightness, 100);
        assert_eq!(
            *writes.lock().unwrap(),
            vec![
                r#"{"cmd":"train-speed","value":100}"#,
                r#"{"cmd":"brightness","value":100}"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_rapid_speed_changes_are_not_coalesced() {
        let (channel, writes) = recording_channel();
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);

        for speed in (0..100).step_by(10) {
            dispatcher.set_train_speed(speed).await.unwrap();
        }

        let expected: Vec<String> = (0..100)
            .step_by(10)
            .map(|speed| format!(r#"{{"cmd":"train-speed","value":{}}}"#, speed))
            .collect();
        assert_eq!(*writes.lock().unwrap(), expected);
        assert_eq!(dispatcher.state().speed, 90);
    }

    #[tokio::test]
    async fn test_manual_mode_sends_stored_colour() {
        let (channel, writes) = recording_channel();
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);

        dispatcher.set_light_mode(LightMode::Manual).await.unwrap();
        dispatcher.set_light_mode(LightMode::Night).await.unwrap();

        assert_eq!(
            *writes.lock().unwrap(),
            vec![
                r#"{"cmd":"mode","value":{"r":255,"g":215,"b":0}}"#,
                r#"{"cmd":"mode","value":"night"}"#,
            ]
        );
        assert_eq!(dispatcher.state().light_mode, LightMode::Night);
    }

    #[tokio::test]
    async fn test_colour_switches_to_manual() {
        let (channel, writes) = recording_channel();
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);

        dispatcher.set_light_color("#1a1a2e").await.unwrap();
        dispatcher.set_light_mode(LightMode::Day).await.unwrap();
        dispatcher.set_light_mode(LightMode::Manual).await.unwrap();

        let state = dispatcher.state();
        assert_eq!(state.light_color, "#1a1a2e");
        assert_eq!(state.light_mode, LightMode::Manual);
        assert_eq!(
            writes.lock().unwrap().last().map(String::as_str),
            Some(r#"{"cmd":"mode","value":{"r":26,"g":26,"b":46}}"#)
        );
    }

    #[tokio::test]
    async fn test_invalid_colour_is_rejected_before_writing() {
        let mut channel = MockBleChannel::new();
        channel.expect_write().never();
        channel.expect_disconnect().returning(|| Ok(()));
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);

        let err = dispatcher.set_light_color("#12345G").await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidColor(_)));
        assert_eq!(dispatcher.state(), TrainState::default());
    }

    #[tokio::test]
    async fn test_direction_and_door() {
        let (channel, writes) = recording_channel();
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);

        dispatcher
            .set_train_direction(Direction::Reverse)
            .await
            .unwrap();
        dispatcher.toggle_wc_door().await.unwrap();
        assert!(dispatcher.state().wc_door_open);
        dispatcher.toggle_wc_door().await.unwrap();

        let state = dispatcher.state();
        assert_eq!(state.direction, Direction::Reverse);
        assert!(!state.wc_door_open);
        assert_eq!(
            *writes.lock().unwrap(),
            vec![
                r#"{"cmd":"direction","value":"reverse"}"#,
                r#"{"cmd":"wc","value":true}"#,
                r#"{"cmd":"wc","value":false}"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_write_failure_leaves_mirror_untouched() {
        let mut channel = MockBleChannel::new();
        channel
            .expect_write()
            .times(1)
            .returning(|_| Err(TransportError::WriteRejected("Unreachable".to_string())));
        channel.expect_disconnect().returning(|| Ok(()));
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);
        let mut observer = dispatcher.subscribe();

        let err = dispatcher.set_light_brightness(20).await.unwrap_err();

        assert!(matches!(
            err,
            RemoteError::WriteFailed(TransportError::WriteRejected(_))
        ));
        assert_eq!(dispatcher.state(), TrainState::default());
        assert!(!observer.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_mirror_update_is_one_notification() {
        let (channel, _writes) = recording_channel();
        let (manager, _lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);
        let mut observer = dispatcher.subscribe();

        dispatcher.set_light_color("#00FF00").await.unwrap();

        assert!(observer.has_changed().unwrap());
        let seen = observer.borrow_and_update().clone();
        assert_eq!(seen.light_color, "#00FF00");
        assert_eq!(seen.light_mode, LightMode::Manual);
        assert!(!observer.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_link_loss_then_setter_fails() {
        let (channel, writes) = recording_channel();
        let (manager, lose_link) = connected_manager(channel).await;
        let dispatcher = CommandDispatcher::new(&manager);
        let mut session = manager.subscribe();

        dispatcher.set_train_speed(30).await.unwrap();
        lose_link.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), session.wait_for(|s| !s.is_connected()))
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            dispatcher.set_train_speed(60).await,
            Err(RemoteError::NotConnected)
        ));
        assert_eq!(dispatcher.state().speed, 30);
        assert_eq!(writes.lock().unwrap().len(), 1);
    }
}
