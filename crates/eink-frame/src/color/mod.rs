//! Color types and conversion utilities
//!
//! Three color spaces, each with one job:
//!
//! - **sRGB** ([`Srgb`]): how images and device palettes are encoded. Input/output only.
//! - **Linear RGB** ([`LinearRgb`]): physical light intensity. Error diffusion happens here.
//! - **Oklab** ([`Oklab`]): perceptually uniform. Palette matching happens here.
//!
//! # Example
//!
//! ```
//! use eink_frame::{LinearRgb, Oklab, Srgb};
//!
//! let srgb = Srgb::from_u8(128, 64, 32);
//! let linear = LinearRgb::from(srgb);
//! let oklab = Oklab::from(linear);
//! assert!(oklab.l > 0.0 && oklab.l < 1.0);
//! ```

mod linear_rgb;
mod lut;
mod oklab;
mod srgb;

pub use linear_rgb::LinearRgb;
pub use oklab::Oklab;
pub use srgb::Srgb;
