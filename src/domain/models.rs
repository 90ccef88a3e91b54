use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::color::Rgb;

/// Upper bound for speed and brightness.
pub const MAX_PERCENT: u8 = 100;

/// Colour of the lights until the user picks one.
pub const DEFAULT_LIGHT_COLOR: Rgb = Rgb::new(0xFF, 0xD7, 0x00);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightMode {
    #[default]
    Auto,
    Manual,
    Day,
    Night,
    Sunrise,
    Sunset,
}

impl LightMode {
    pub const ALL: [LightMode; 6] = [
        LightMode::Auto,
        LightMode::Manual,
        LightMode::Day,
        LightMode::Night,
        LightMode::Sunrise,
        LightMode::Sunset,
    ];

    /// Wire tag, identical to the serde name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Day => "day",
            Self::Night => "night",
            Self::Sunrise => "sunrise",
            Self::Sunset => "sunset",
        }
    }

    /// Label shown on the control screen.
    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "Cycle Auto",
            Self::Manual => "Manuel",
            Self::Day => "Jour",
            Self::Night => "Nuit",
            Self::Sunrise => "Aube",
            Self::Sunset => "Crépuscule",
        }
    }

    /// Preview colour for the fixed ambiances. `Auto` and `Manual` have none.
    pub fn ambiance_color(self) -> Option<Rgb> {
        match self {
            Self::Day => Some(Rgb::new(0xFF, 0xE8, 0x7C)),
            Self::Night => Some(Rgb::new(0x1A, 0x1A, 0x2E)),
            Self::Sunrise => Some(Rgb::new(0xFF, 0x6B, 0x35)),
            Self::Sunset => Some(Rgb::new(0xFF, 0x8C, 0x42)),
            Self::Auto | Self::Manual => None,
        }
    }

    /// Ambiance the automatic cycle shows after `elapsed`: sunrise, day,
    /// sunset then night, six seconds each.
    pub fn auto_phase(elapsed: Duration) -> LightMode {
        match (elapsed.as_millis() / 100) % 240 {
            0..=59 => Self::Sunrise,
            60..=119 => Self::Day,
            120..=179 => Self::Sunset,
            _ => Self::Night,
        }
    }
}

/// Local mirror of what the train module is believed to be doing.
///
/// Updated only after the module accepted a write. Nothing is ever read
/// back, so it drifts if the module ignores a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainState {
    pub speed: u8,
    pub direction: Direction,
    pub light_mode: LightMode,
    /// `#RRGGBB`, as entered by the user.
    pub light_color: String,
    pub brightness: u8,
    pub wc_door_open: bool,
}

impl Default for TrainState {
    fn default() -> Self {
        Self {
            speed: 0,
            direction: Direction::Forward,
            light_mode: LightMode::Auto,
            light_color: DEFAULT_LIGHT_COLOR.to_hex(),
            brightness: 80,
            wc_door_open: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Identity of the module picked during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: u64,
}

/// Observable view of the connection session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub device: Option<DiscoveredDevice>,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.status == ConnectionStatus::Connecting
    }

    /// Still looking for a module. Only this part of a connect can be
    /// cancelled.
    pub fn is_discovering(&self) -> bool {
        self.is_connecting() && self.device.is_none()
    }
}

/// Requests from the UI to the Bluetooth worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    Connect,
    Disconnect,
    ClearError,
    SetSpeed(u8),
    SetDirection(Direction),
    SetLightMode(LightMode),
    SetLightColor(String),
    SetBrightness(u8),
    SetWcDoor(bool),
    ToggleWcDoor,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_mode_tags_match_serde() {
        for mode in LightMode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
        }
    }

    #[test]
    fn test_auto_cycle() {
        let at = |ms| LightMode::auto_phase(Duration::from_millis(ms));
        assert_eq!(at(0), LightMode::Sunrise);
        assert_eq!(at(5_999), LightMode::Sunrise);
        assert_eq!(at(6_000), LightMode::Day);
        assert_eq!(at(12_500), LightMode::Sunset);
        assert_eq!(at(23_900), LightMode::Night);
        assert_eq!(at(24_000), LightMode::Sunrise);
        assert!(at(18_000).ambiance_color().is_some());
    }

    #[test]
    fn test_discovery_phase() {
        let mut session = SessionSnapshot {
            status: ConnectionStatus::Connecting,
            ..Default::default()
        };
        assert!(session.is_discovering());

        session.device = Some(DiscoveredDevice {
            name: "OIGNIES-SNCV-A1B2C3".to_string(),
            address: 0xA1B2C3D4E5F6,
        });
        assert!(session.is_connecting());
        assert!(!session.is_discovering());

        session.status = ConnectionStatus::Disconnected;
        session.device = None;
        assert!(!session.is_discovering());
    }

    #[test]
    fn test_default_state() {
        let state = TrainState::default();
        assert_eq!(state.light_color, "#FFD700");
        assert_eq!(state.brightness, 80);
        assert_eq!(state.light_mode, LightMode::Auto);
        assert!(!state.wc_door_open);
    }
}
