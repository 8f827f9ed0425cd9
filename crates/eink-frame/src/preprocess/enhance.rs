//! Contrast and saturation boosts.
//!
//! Both operate on 8-bit sRGB after resizing and blend the image with a
//! degenerate version of itself, `out = base + (px - base) * factor`, clipped
//! to 0..=255:
//!
//! - contrast: `base` is the mean luma of the whole image
//! - saturation: `base` is the pixel's own luma
//!
//! Luma uses ITU-R 601 weights.

/// Factors this close to 1.0 are treated as "unchanged".
const IDENTITY_EPSILON: f32 = 1e-3;

#[inline]
fn luma(px: [u8; 3]) -> f32 {
    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
}

#[inline]
fn blend(base: f32, value: u8, factor: f32) -> u8 {
    (base + (value as f32 - base) * factor).round().clamp(0.0, 255.0) as u8
}

pub(crate) fn adjust_contrast(pixels: &mut [[u8; 3]], factor: f32) {
    if (factor - 1.0).abs() <= IDENTITY_EPSILON || pixels.is_empty() {
        return;
    }
    // Mean of the rounded per-pixel luma, rounded again
    let total: f64 = pixels.iter().map(|&p| luma(p).round() as f64).sum();
    let mean = (total / pixels.len() as f64).round() as f32;

    for px in pixels.iter_mut() {
        *px = px.map(|v| blend(mean, v, factor));
    }
}

pub(crate) fn adjust_saturation(pixels: &mut [[u8; 3]], factor: f32) {
    if (factor - 1.0).abs() <= IDENTITY_EPSILON {
        return;
    }
    for px in pixels.iter_mut() {
        let grey = luma(*px).round();
        *px = px.map(|v| blend(grey, v, factor));
    }
}
