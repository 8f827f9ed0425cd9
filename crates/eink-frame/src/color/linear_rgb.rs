//! Linear RGB color type

use super::lut::{srgb8_to_linear, srgb_to_linear};
use super::srgb::Srgb;

/// A color in linear RGB color space.
///
/// Values are proportional to emitted (or reflected) light, so adding two
/// colors or scaling one is physically meaningful. Quantization error is
/// carried in this space. Values may leave 0.0..=1.0 while error accumulates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl LinearRgb {
    #[inline]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Decode an 8-bit sRGB triplet through the gamma table.
    #[inline]
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self {
            r: srgb8_to_linear(bytes[0]),
            g: srgb8_to_linear(bytes[1]),
            b: srgb8_to_linear(bytes[2]),
        }
    }
}

impl From<Srgb> for LinearRgb {
    fn from(srgb: Srgb) -> Self {
        Self {
            r: srgb_to_linear(srgb.r),
            g: srgb_to_linear(srgb.g),
            b: srgb_to_linear(srgb.b),
        }
    }
}
