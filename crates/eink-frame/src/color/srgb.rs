//! sRGB color type

use std::str::FromStr;

use crate::palette::ParseColorError;

/// A color in gamma-encoded sRGB, channels in 0.0..=1.0.
///
/// Use this type for anything that comes from or goes to the outside world:
/// decoded images, hex palette strings, preview output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Srgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Srgb {
    #[inline]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create an Srgb color from 8-bit channel values.
    ///
    /// ```
    /// use eink_frame::Srgb;
    /// let red = Srgb::from_u8(255, 0, 0);
    /// assert_eq!(red.r, 1.0);
    /// ```
    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::from_u8(bytes[0], bytes[1], bytes[2])
    }

    /// Convert to `[R, G, B]` bytes, rounding and clamping each channel.
    #[inline]
    pub fn to_bytes(self) -> [u8; 3] {
        [
            (self.r * 255.0).round().clamp(0.0, 255.0) as u8,
            (self.g * 255.0).round().clamp(0.0, 255.0) as u8,
            (self.b * 255.0).round().clamp(0.0, 255.0) as u8,
        ]
    }
}

impl FromStr for Srgb {
    type Err = ParseColorError;

    /// Parse `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB` (case-insensitive).
    ///
    /// ```
    /// use eink_frame::Srgb;
    /// let orange: Srgb = "#FF8000".parse().unwrap();
    /// assert_eq!(orange.to_bytes(), [255, 128, 0]);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return Err(ParseColorError::InvalidLength);
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16);

        match hex.len() {
            6 => Ok(Self::from_u8(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                // #RGB expands each digit: F -> FF
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                Ok(Self::from_u8(r * 17, g * 17, b * 17))
            }
            _ => Err(ParseColorError::InvalidLength),
        }
    }
}
