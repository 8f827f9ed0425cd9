#![allow(clippy::needless_range_loop, clippy::module_inception)]

//! eink-frame: photo quantization and frame packing for color e-paper
//!
//! Turns an RGB photo of any size into the exact byte stream a fixed-palette
//! e-paper controller expects:
//!
//! 1. [`Quantizer`] rotates, resizes and enhances the image to the panel
//!    resolution, then dithers it onto the [`Palette`]
//! 2. [`pack()`] writes two palette indices per byte, high nibble first
//!
//! Both stages are pure and deterministic.
//!
//! # Quick Start
//!
//! ```
//! use eink_frame::{pack, Palette, Quantizer, RasterImage};
//!
//! let photo = RasterImage::filled(120, 90, [90, 140, 200]).unwrap();
//! let quantizer = Quantizer::new(Palette::acep_7color()).saturation(1.5);
//!
//! let raster = quantizer.quantize(&photo, 800, 480).unwrap();
//! let frame = pack(&raster);
//! assert_eq!(frame.len(), 192_000);
//! ```
//!
//! # Color Spaces
//!
//! | Space | Used for |
//! |-------|----------|
//! | [`Srgb`] | image bytes, palette definitions |
//! | [`LinearRgb`] | error diffusion (light adds linearly) |
//! | [`Oklab`] | palette matching (perceptually uniform) |
//!
//! ## Distance Metric
//!
//! Achromatic palettes match by squared Euclidean distance in Oklab.
//! Chromatic palettes use HyAB with a chroma-coupling penalty:
//!
//! ```text
//! d = kl * |dL| + kc * sqrt(da^2 + db^2) + kchroma * |C_pixel - C_palette|
//! ```
//!
//! with `kl = 2.0, kc = 1.0, kchroma = 10.0`. Yellow has Oklab L ≈ 0.97,
//! close to white, so plain Euclidean distance sends light greys to yellow;
//! the coupling term keeps them on black and white.
//!
//! ## Measured Colors
//!
//! ACeP panels show noticeably duller colors than their nominal RGB values.
//! A [`Palette`] can carry measured *actual* colors next to the official
//! ones: matching and error use the actual colors, while the emitted index
//! stays the device code.

pub mod color;
pub mod dither;
pub mod pack;
pub mod palette;
pub mod preprocess;
pub mod quantize;
pub mod raster;


pub use color::{LinearRgb, Oklab, Srgb};
pub use dither::{dither, DitherMode, DitherOptions, Kernel};
pub use pack::{frame_len, pack, PackedFrame, PAD_NIBBLE};
pub use palette::{DistanceMetric, Palette, PaletteError, ParseColorError, MAX_PALETTE_LEN};
pub use preprocess::{preprocess, FitMode, PreprocessOptions, Rotation};
pub use quantize::Quantizer;
pub use raster::{QuantizedRaster, RasterError, RasterImage};
