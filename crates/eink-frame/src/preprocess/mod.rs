//! Geometry and enhancement before quantization.
//!
//! Order of operations:
//!
//! 1. **Rotate** by the fixed mounting rotation
//! 2. **Resize** with a separable triangle filter, then letterbox
//!    ([`FitMode::Fit`]) or center-crop ([`FitMode::Fill`]) to the exact
//!    target size
//! 3. **Contrast**, then **saturation**, at the target resolution
//!
//! Everything here is deterministic; the same input and options always give
//! the same bytes.
//!
//! ```
//! use eink_frame::{preprocess, FitMode, PreprocessOptions, RasterImage};
//!
//! let photo = RasterImage::filled(40, 30, [120, 80, 60]).unwrap();
//! let options = PreprocessOptions::new().fit_mode(FitMode::Fit);
//! let prepared = preprocess(&photo, 16, 8, &options).unwrap();
//!
//! assert_eq!((prepared.width(), prepared.height()), (16, 8));
//! // 4:3 into 2:1 leaves white bars left and right
//! assert_eq!(prepared.pixel(0, 0), [255, 255, 255]);
//! ```

mod enhance;
mod options;
mod resize;

pub use options::{FitMode, PreprocessOptions, Rotation};

use crate::raster::{check_area, RasterError, RasterImage, CHANNELS};

/// Produce a `target_width x target_height` image ready for quantization.
///
/// # Errors
///
/// [`RasterError::ZeroArea`] if the target has zero area. The source image is
/// valid by construction.
pub fn preprocess(
    image: &RasterImage,
    target_width: u32,
    target_height: u32,
    options: &PreprocessOptions,
) -> Result<RasterImage, RasterError> {
    check_area(target_width, target_height)?;

    let pixels: Vec<resize::Rgbf> = image
        .as_bytes()
        .chunks_exact(CHANNELS)
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();

    let (rotated, width, height) = resize::rotate(
        &pixels,
        image.width() as usize,
        image.height() as usize,
        options.rotation,
    );

    let fitted = resize::fit_to_target(
        &rotated,
        width,
        height,
        target_width as usize,
        target_height as usize,
        options.fit_mode,
        options.background,
    );

    let mut bytes: Vec<[u8; 3]> = fitted
        .into_iter()
        .map(|p| p.map(|c| c.round().clamp(0.0, 255.0) as u8))
        .collect();

    enhance::adjust_contrast(&mut bytes, options.contrast);
    enhance::adjust_saturation(&mut bytes, options.saturation);

    RasterImage::new(target_width, target_height, bytes.concat())
}
