//! Train Module Protocol
//!
//! The module exposes one writable characteristic. Every command is a
//! UTF-8 JSON object `{"cmd": <tag>, "value": <payload>}` written to it.
//!
//! # Tags
//!
//! ```text
//! train-speed : integer 0-100
//! direction   : "forward" | "reverse"
//! mode        : "auto" | "day" | "night" | "sunrise" | "sunset" | {r,g,b}
//! brightness  : integer 0-100
//! wc          : true (open) | false (closed)
//! ```
//!
//! `speed`, `status` and `led` are understood by the module but never sent
//! from here.

use crate::domain::color::Rgb;
use crate::domain::models::{Direction, LightMode};
use serde::Serialize;
use uuid::Uuid;

/// Train module service UUID
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);

/// Control characteristic UUID - where every command is written
pub const CONTROL_CHAR_UUID: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);

/// Modules advertise as `OIGNIES-SNCV-XXXXXX` (last three MAC bytes)
pub const DEVICE_NAME_PREFIX: &str = "OIGNIES-SNCV-";

/// Every tag the module understands.
pub const PROTOCOL_TAGS: [&str; 8] = [
    "speed",
    "train-speed",
    "direction",
    "mode",
    "brightness",
    "wc",
    "status",
    "led",
];

/// Payload of a `mode` command.
///
/// The module treats "manual" and "this is the manual colour" as the same
/// message, so manual mode is always sent as a colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ModePayload {
    Ambiance(LightMode),
    Manual(Rgb),
}

/// One command for the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", content = "value", rename_all = "kebab-case")]
pub enum Command {
    TrainSpeed(u8),
    Direction(Direction),
    Mode(ModePayload),
    Brightness(u8),
    Wc(bool),
}

impl Command {
    /// Build the `mode` command for `mode`, using `color` when entering
    /// manual mode.
    pub fn light_mode(mode: LightMode, color: Rgb) -> Self {
        match mode {
            LightMode::Manual => Self::Mode(ModePayload::Manual(color)),
            other => Self::Mode(ModePayload::Ambiance(other)),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::TrainSpeed(_) => "train-speed",
            Self::Direction(_) => "direction",
            Self::Mode(_) => "mode",
            Self::Brightness(_) => "brightness",
            Self::Wc(_) => "wc",
        }
    }

    /// Compact JSON text, as bytes ready for the characteristic.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
