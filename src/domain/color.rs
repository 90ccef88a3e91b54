//! `#RRGGBB` colours as used by the lighting controls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid colour {input:?}: expected #RRGGBB")]
pub struct ColorError {
    pub input: String,
}

/// One colour as three 0-255 channels.
///
/// Serializes as `{"r":..,"g":..,"b":..}`, which is the payload shape the
/// module expects for a manual lighting colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` string. Digits are case-insensitive.
    ///
    /// Anything else (missing `#`, wrong length, non-hex digit) is rejected
    /// instead of producing a half-parsed colour.
    pub fn from_hex(input: &str) -> Result<Self, ColorError> {
        let invalid = || ColorError {
            input: input.to_string(),
        };

        let digits = input.strip_prefix('#').ok_or_else(invalid)?;
        // from_str_radix tolerates a leading '+', so check the digits ourselves
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Format as upper-case `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channels() {
        let gold = Rgb::from_hex("#FFD700").unwrap();
        assert_eq!(gold, Rgb::new(255, 215, 0));
    }

    #[test]
    fn test_hex_round_trip_is_case_insensitive() {
        for input in ["#000000", "#ffffff", "#1a1a2e", "#FF6B35", "#aBcDeF", "#09f0C3"] {
            let rgb: Rgb = input.parse().unwrap();
            assert_eq!(rgb.to_hex(), input.to_ascii_uppercase());
        }
    }

    #[test]
    fn test_every_channel_value_round_trips() {
        for v in 0..=255u8 {
            let rgb = Rgb::new(v, 255 - v, v / 2);
            assert_eq!(Rgb::from_hex(&rgb.to_hex()).unwrap(), rgb);
        }
    }

    #[test]
    fn test_rejects_malformed_input() {
        for input in ["", "#", "FFD700", "#FFD70", "#FFD7000", "#GGGGGG", "#+F+F+F", "# FFD70"] {
            let err = Rgb::from_hex(input).unwrap_err();
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn test_serializes_as_channel_object() {
        let json = serde_json::to_string(&Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(json, r#"{"r":1,"g":2,"b":3}"#);
    }
}
