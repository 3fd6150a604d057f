use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Straight RGB color with `f32` channels, nominally in [0, 1].
///
/// This is the evaluator's working color; it is never premultiplied.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { r: v, g: v, b: v }
    }

    #[inline]
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    /// Quantizes to 8-bit channels with round-to-nearest.
    #[inline]
    pub fn to_u8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// An sRGB color stored as bytes and written as `#RRGGBB`.
///
/// Scene documents store colors in this form so a JSON round-trip is exact.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Normalized channels for the evaluator.
    #[inline]
    pub fn to_rgb(self) -> Rgb {
        Rgb::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Error produced when a `#RRGGBB` literal is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex color '{}': expected #RRGGBB", self.0)
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for HexColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upper_and_lower_case() {
        assert_eq!("#0220E7".parse::<HexColor>().unwrap(), HexColor::new(0x02, 0x20, 0xE7));
        assert_eq!("#ffa49b".parse::<HexColor>().unwrap(), HexColor::new(0xFF, 0xA4, 0x9B));
    }

    #[test]
    fn display_is_uppercase_hash_prefixed() {
        assert_eq!(HexColor::new(0x17, 0x17, 0x17).to_string(), "#171717");
    }

    #[test]
    fn rejects_malformed_literals() {
        for bad in ["0220E7", "#0220E", "#0220E7FF", "#xyzxyz", "#ééé"] {
            assert!(bad.parse::<HexColor>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn to_u8_rounds_to_nearest() {
        assert_eq!(Rgb::new(0.0, 0.5, 1.0).to_u8(), [0, 128, 255]);
        assert_eq!(Rgb::new(-1.0, 2.0, 0.999).to_u8(), [0, 255, 255]);
    }
}
