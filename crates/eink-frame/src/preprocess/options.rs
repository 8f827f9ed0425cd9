//! Preprocessing options and configuration.

/// How a source image is mapped onto a target of a different aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Scale to fit inside the target and pad with the background color.
    #[default]
    Fit,
    /// Scale to cover the target and crop the overflow around the center.
    Fill,
}

/// Fixed clockwise rotation applied before resizing.
///
/// This is a mounting setting (a portrait-mounted panel), not an editing
/// tool, so only quarter turns exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Map 0/90/180/270 degrees to a rotation. Anything else is `None`.
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// True if width and height trade places.
    #[inline]
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// Configuration for the geometry and enhancement stage.
///
/// # Defaults
///
/// - Fit mode with a white background
/// - No rotation
/// - Contrast and saturation 1.0 (unchanged)
///
/// # Example
///
/// ```
/// use eink_frame::{FitMode, PreprocessOptions, Rotation};
///
/// let options = PreprocessOptions::new()
///     .fit_mode(FitMode::Fill)
///     .rotation(Rotation::Cw90)
///     .contrast(1.5)
///     .saturation(1.5);
/// assert_eq!(options.fit_mode, FitMode::Fill);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    pub fit_mode: FitMode,

    /// Letterbox color for [`FitMode::Fit`].
    pub background: [u8; 3],

    pub rotation: Rotation,

    /// Contrast multiplier around the mean luma of the resized image.
    ///
    /// - 1.0 = no change
    /// - 1.5 = what the photo frame ships with
    pub contrast: f32,

    /// Saturation multiplier around each pixel's own luma.
    ///
    /// 0.0 yields greyscale.
    pub saturation: f32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            fit_mode: FitMode::Fit,
            background: [255, 255, 255],
            rotation: Rotation::None,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

impl PreprocessOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn fit_mode(mut self, mode: FitMode) -> Self {
        self.fit_mode = mode;
        self
    }

    #[inline]
    pub fn background(mut self, rgb: [u8; 3]) -> Self {
        self.background = rgb;
        self
    }

    #[inline]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    #[inline]
    pub fn contrast(mut self, factor: f32) -> Self {
        self.contrast = factor;
        self
    }

    #[inline]
    pub fn saturation(mut self, factor: f32) -> Self {
        self.saturation = factor;
        self
    }
}
