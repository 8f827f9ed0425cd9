//! Quantizer builder, the entry point of the pipeline.

use crate::color::LinearRgb;
use crate::dither::{dither, DitherMode, DitherOptions};
use crate::palette::Palette;
use crate::preprocess::{preprocess, FitMode, PreprocessOptions, Rotation};
use crate::raster::{QuantizedRaster, RasterError, RasterImage, CHANNELS};

/// Turns a [`RasterImage`] of any size into a [`QuantizedRaster`] of exactly
/// the requested size.
///
/// - Constructor takes the [`Palette`], so there is no unconfigured state
/// - Setters consume and return `self`
/// - [`quantize()`](Self::quantize) takes `&self`, so one quantizer serves
///   many images, also from several threads
///
/// ```
/// use eink_frame::{DitherMode, Palette, Quantizer, RasterImage};
///
/// let quantizer = Quantizer::new(Palette::acep_7color())
///     .contrast(1.5)
///     .saturation(1.5)
///     .dither_mode(DitherMode::FloydSteinberg);
///
/// let photo = RasterImage::filled(64, 48, [200, 120, 40]).unwrap();
/// let raster = quantizer.quantize(&photo, 80, 48).unwrap();
///
/// assert_eq!((raster.width(), raster.height()), (80, 48));
/// assert!(raster.indices().iter().all(|&i| i < 7));
/// ```
#[derive(Debug, Clone)]
pub struct Quantizer {
    palette: Palette,
    preprocess: PreprocessOptions,
    mode: DitherMode,
    dither_opts: DitherOptions,
}

impl Quantizer {
    /// Floyd–Steinberg, fit with a white background, no enhancement.
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            preprocess: PreprocessOptions::default(),
            mode: DitherMode::default(),
            dither_opts: DitherOptions::default(),
        }
    }

    #[inline]
    pub fn fit_mode(mut self, mode: FitMode) -> Self {
        self.preprocess = self.preprocess.fit_mode(mode);
        self
    }

    #[inline]
    pub fn background(mut self, rgb: [u8; 3]) -> Self {
        self.preprocess = self.preprocess.background(rgb);
        self
    }

    #[inline]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.preprocess = self.preprocess.rotation(rotation);
        self
    }

    #[inline]
    pub fn contrast(mut self, factor: f32) -> Self {
        self.preprocess = self.preprocess.contrast(factor);
        self
    }

    #[inline]
    pub fn saturation(mut self, factor: f32) -> Self {
        self.preprocess = self.preprocess.saturation(factor);
        self
    }

    #[inline]
    pub fn dither_mode(mut self, mode: DitherMode) -> Self {
        self.mode = mode;
        self
    }

    #[inline]
    pub fn serpentine(mut self, enabled: bool) -> Self {
        self.dither_opts = self.dither_opts.serpentine(enabled);
        self
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[inline]
    pub fn preprocess_options(&self) -> &PreprocessOptions {
        &self.preprocess
    }

    #[inline]
    pub fn mode(&self) -> DitherMode {
        self.mode
    }

    #[inline]
    pub fn dither_options(&self) -> &DitherOptions {
        &self.dither_opts
    }

    /// Resize, enhance and dither `image` to `target_width x target_height`.
    ///
    /// # Errors
    ///
    /// [`RasterError::ZeroArea`] for a zero-area target. Nothing else can fail:
    /// a [`RasterImage`] is well-formed by construction.
    pub fn quantize(
        &self,
        image: &RasterImage,
        target_width: u32,
        target_height: u32,
    ) -> Result<QuantizedRaster, RasterError> {
        let prepared = preprocess(image, target_width, target_height, &self.preprocess)?;

        let linear: Vec<LinearRgb> = prepared
            .as_bytes()
            .chunks_exact(CHANNELS)
            .map(|p| LinearRgb::from_bytes([p[0], p[1], p[2]]))
            .collect();

        let indices = dither(
            &linear,
            target_width as usize,
            target_height as usize,
            &self.palette,
            self.mode,
            &self.dither_opts,
        );

        Ok(QuantizedRaster::from_parts(
            target_width,
            target_height,
            indices,
            self.palette.len(),
        ))
    }
}
