//! Error diffusion dithering.
//!
//! Each pixel, plus the error accumulated from already-visited neighbors, is
//! matched to the nearest palette entry in Oklab. The difference between the
//! pixel and that entry's *actual* color, in linear RGB, is then spread over
//! the unvisited neighbors by the [`Kernel`] weights.
//!
//! ```
//! use eink_frame::{dither, DitherMode, DitherOptions, LinearRgb, Palette, Srgb};
//!
//! let palette = Palette::from_hex(&["#000000", "#FFFFFF"], None).unwrap();
//! let grey = LinearRgb::from(Srgb::from_u8(186, 186, 186));
//! let indices = dither(
//!     &vec![grey; 64],
//!     8,
//!     8,
//!     &palette,
//!     DitherMode::FloydSteinberg,
//!     &DitherOptions::new(),
//! );
//! assert_eq!(indices.len(), 64);
//! assert!(indices.contains(&0) && indices.contains(&1));
//! ```

mod kernel;
mod options;

pub use kernel::{Kernel, ATKINSON, FLOYD_STEINBERG};
pub use options::{DitherMode, DitherOptions};

use crate::color::{LinearRgb, Oklab};
use crate::palette::Palette;

/// Sliding window of error rows.
///
/// Holds only the rows the kernel can reach (`max_dy + 1`), so memory is
/// proportional to the width, not the image. Scoped to one dithering pass.
///
/// 1. Read the error for the current row with `get_accumulated(x)`
/// 2. Spread error with `add_error(x, dy, error)`
/// 3. Call `advance_row()` after each row
#[derive(Debug)]
pub struct ErrorBuffer {
    /// rows[0] is the current row, rows[1] the next, and so on
    rows: Vec<Vec<[f32; 3]>>,
    width: usize,
}

impl ErrorBuffer {
    pub fn new(width: usize, row_depth: usize) -> Self {
        Self {
            rows: (0..row_depth).map(|_| vec![[0.0; 3]; width]).collect(),
            width,
        }
    }

    #[inline]
    pub fn get_accumulated(&self, x: usize) -> [f32; 3] {
        self.rows[0][x]
    }

    /// Add error to a future pixel. Out-of-bounds targets are ignored.
    #[inline]
    pub fn add_error(&mut self, x: usize, row_offset: usize, error: [f32; 3]) {
        if x < self.width && row_offset < self.rows.len() {
            for c in 0..3 {
                self.rows[row_offset][x][c] += error[c];
            }
        }
    }

    /// Drop the current row and append a zeroed one.
    pub fn advance_row(&mut self) {
        self.rows.rotate_left(1);
        if let Some(last) = self.rows.last_mut() {
            last.fill([0.0; 3]);
        }
    }
}

#[inline]
pub(crate) fn clamp_channel(value: f32, max_error: f32) -> f32 {
    value.clamp(-max_error, 1.0 + max_error)
}

/// Map linear RGB pixels (row-major) to palette indices.
///
/// The result has `width * height` entries, each below `palette.len()`.
/// Deterministic: the same input always produces the same indices.
pub fn dither(
    image: &[LinearRgb],
    width: usize,
    height: usize,
    palette: &Palette,
    mode: DitherMode,
    options: &DitherOptions,
) -> Vec<u8> {
    match mode.kernel() {
        Some(kernel) => dither_with_kernel(image, width, height, palette, kernel, options),
        None => image
            .iter()
            .map(|&px| palette.find_nearest(Oklab::from(px)).0 as u8)
            .collect(),
    }
}

/// The diffusion loop shared by every kernel.
pub(crate) fn dither_with_kernel(
    image: &[LinearRgb],
    width: usize,
    height: usize,
    palette: &Palette,
    kernel: &Kernel,
    options: &DitherOptions,
) -> Vec<u8> {
    let mut output = vec![0u8; width * height];
    let mut error_buf = ErrorBuffer::new(width, kernel.max_dy + 1);
    let divisor = kernel.divisor as f32;

    for y in 0..height {
        let reverse = options.serpentine && y % 2 == 1;

        for step in 0..width {
            let x = if reverse { width - 1 - step } else { step };
            let idx = y * width + x;

            let accumulated = error_buf.get_accumulated(x);
            let pixel = LinearRgb::new(
                clamp_channel(image[idx].r + accumulated[0], options.error_clamp),
                clamp_channel(image[idx].g + accumulated[1], options.error_clamp),
                clamp_channel(image[idx].b + accumulated[2], options.error_clamp),
            );

            let (nearest_idx, _) = palette.find_nearest(Oklab::from(pixel));
            output[idx] = nearest_idx as u8;

            let nearest = palette.actual_linear(nearest_idx);
            let error = [
                pixel.r - nearest.r,
                pixel.g - nearest.g,
                pixel.b - nearest.b,
            ];

            for &(dx, dy, weight) in kernel.entries {
                let dx = if reverse { -dx } else { dx };
                let nx = x as i32 + dx;
                if nx < 0 || nx as usize >= width || y + dy as usize >= height {
                    continue;
                }
                let share = weight as f32 / divisor;
                error_buf.add_error(
                    nx as usize,
                    dy as usize,
                    [error[0] * share, error[1] * share, error[2] * share],
                );
            }
        }

        error_buf.advance_row();
    }

    output
}
