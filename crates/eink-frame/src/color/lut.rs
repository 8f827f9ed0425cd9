//! Gamma lookup table access functions
//!
//! The table is generated at compile time by build.rs.

include!(concat!(env!("OUT_DIR"), "/gamma_lut.rs"));

/// Convert an 8-bit sRGB code value to linear light.
#[inline]
pub fn srgb8_to_linear(value: u8) -> f32 {
    SRGB8_TO_LINEAR[value as usize]
}

/// Convert an sRGB value (0.0..=1.0) to linear RGB using the LUT with linear
/// interpolation between the 8-bit entries.
#[inline]
pub fn srgb_to_linear(srgb: f32) -> f32 {
    let scaled = srgb.clamp(0.0, 1.0) * 255.0;
    let index = scaled as usize;
    if index >= 255 {
        return SRGB8_TO_LINEAR[255];
    }

    let frac = scaled - index as f32;
    let a = SRGB8_TO_LINEAR[index];
    let b = SRGB8_TO_LINEAR[index + 1];
    a + (b - a) * frac
}
