//! Dithering options and configuration.

use super::kernel::{Kernel, ATKINSON, FLOYD_STEINBERG};

/// How pixels are mapped onto the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherMode {
    /// Floyd–Steinberg error diffusion.
    #[default]
    FloydSteinberg,

    /// Atkinson error diffusion. Loses a quarter of the error, which keeps
    /// highlights and shadows cleaner on small palettes at the cost of
    /// midtone accuracy.
    Atkinson,

    /// Nearest color only, no diffusion.
    None,
}

impl DitherMode {
    /// The diffusion kernel, or `None` for plain nearest-color mapping.
    pub fn kernel(self) -> Option<&'static Kernel> {
        match self {
            DitherMode::FloydSteinberg => Some(&FLOYD_STEINBERG),
            DitherMode::Atkinson => Some(&ATKINSON),
            DitherMode::None => None,
        }
    }
}

/// Configuration for the diffusion loop.
///
/// # Defaults
///
/// - Raster scan (left to right on every row)
/// - Error clamp 0.5
///
/// ```
/// use eink_frame::DitherOptions;
///
/// let options = DitherOptions::new().serpentine(true).error_clamp(0.3);
/// assert!(options.serpentine);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DitherOptions {
    /// Process odd rows right to left with a mirrored kernel.
    pub serpentine: bool,

    /// Accumulated pixel values are clamped per channel to
    /// `[-error_clamp, 1.0 + error_clamp]` in linear RGB.
    pub error_clamp: f32,
}

impl Default for DitherOptions {
    fn default() -> Self {
        Self {
            serpentine: false,
            error_clamp: 0.5,
        }
    }
}

impl DitherOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn serpentine(mut self, enabled: bool) -> Self {
        self.serpentine = enabled;
        self
    }

    #[inline]
    pub fn error_clamp(mut self, clamp: f32) -> Self {
        self.error_clamp = clamp;
        self
    }
}
