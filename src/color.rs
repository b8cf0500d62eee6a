//! Color handling for pad text and background
//!
//! Info files store colors as three 16-bit channels, the settings file as
//! `#RRGGBB` hex strings. `Rgb16` converts between the two.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb16 {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl Rgb16 {
    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }

    /// Build from 8-bit channels, spreading each to the full 16-bit range
    pub const fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as u16 * 0x101,
            green: green as u16 * 0x101,
            blue: blue as u16 * 0x101,
        }
    }

    /// Parse `RRGGBB` or `#RRGGBB`
    /// Returns None for any other length or non-hex digits
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Hex string with 8-bit precision (low byte of each channel dropped)
    pub fn to_hex_string(self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            self.red >> 8,
            self.green >> 8,
            self.blue >> 8
        )
    }
}

impl Serialize for Rgb16 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for Rgb16 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Rgb16::parse(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{hex}', expected #RRGGBB")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_hash() {
        assert_eq!(Rgb16::parse("#ff0000"), Some(Rgb16::new(0xffff, 0, 0)));
        assert_eq!(Rgb16::parse("00ff80"), Some(Rgb16::new(0, 0xffff, 0x8080)));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Rgb16::parse("#fff"), None);
        assert_eq!(Rgb16::parse("#gg0000"), None);
        assert_eq!(Rgb16::parse(""), None);
    }

    #[test]
    fn test_hex_string_drops_low_byte() {
        assert_eq!(Rgb16::new(0xff12, 0x0034, 0x80ff).to_hex_string(), "#ff0080");
        assert_eq!(Rgb16::parse("#ffeeaa").map(Rgb16::to_hex_string).as_deref(), Some("#ffeeaa"));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Rgb16::from_rgb8(1, 2, 3)).unwrap();
        assert_eq!(json, "\"#010203\"");
        let back: Rgb16 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb16::from_rgb8(1, 2, 3));
        assert!(serde_json::from_str::<Rgb16>("\"nope\"").is_err());
    }
}
