//! Raster types at the pipeline boundaries.
//!
//! [`RasterImage`] is what comes in (8-bit RGB, any size), [`QuantizedRaster`]
//! is what the quantizer hands to the frame packer (one palette index per
//! pixel, exactly the requested size).

use std::fmt;

use crate::color::Srgb;

/// Number of samples per pixel in a [`RasterImage`].
pub const CHANNELS: usize = 3;

/// Errors for malformed rasters and targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// Width or height is zero
    ZeroArea { width: u32, height: u32 },
    /// Buffer length is not `width * height * 3`
    ChannelMismatch { expected: usize, actual: usize },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::ZeroArea { width, height } => {
                write!(f, "raster has zero area ({}x{})", width, height)
            }
            RasterError::ChannelMismatch { expected, actual } => write!(
                f,
                "pixel buffer has {} bytes, expected {} for 3-channel RGB",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for RasterError {}

/// A decoded RGB image, 8 bits per channel, row-major.
///
/// Immutable once built; construction guarantees a non-empty image whose
/// buffer holds exactly three samples per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterImage {
    /// Wrap an interleaved `[R, G, B, R, G, B, ...]` buffer.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        check_area(width, height)?;
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(RasterError::ChannelMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A single-color image.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, RasterError> {
        check_area(width, height)?;
        let data = rgb.repeat(width as usize * height as usize);
        Self::new(width, height, data)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw interleaved RGB bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// RGB triplet at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// All pixels as [`Srgb`], row-major.
    pub fn to_srgb(&self) -> Vec<Srgb> {
        self.data
            .chunks_exact(CHANNELS)
            .map(|p| Srgb::from_u8(p[0], p[1], p[2]))
            .collect()
    }
}

pub(crate) fn check_area(width: u32, height: u32) -> Result<(), RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::ZeroArea { width, height });
    }
    Ok(())
}

/// A raster of palette indices at the target resolution.
///
/// Every index is below the palette length it was quantized against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedRaster {
    width: u32,
    height: u32,
    indices: Vec<u8>,
    palette_len: usize,
}

impl QuantizedRaster {
    /// Build from raw indices; `None` if the buffer size or any index is wrong.
    pub fn from_indices(
        width: u32,
        height: u32,
        indices: Vec<u8>,
        palette_len: usize,
    ) -> Option<Self> {
        if width == 0 || height == 0 || indices.len() != width as usize * height as usize {
            return None;
        }
        if indices.iter().any(|&i| i as usize >= palette_len) {
            return None;
        }
        Some(Self {
            width,
            height,
            indices,
            palette_len,
        })
    }

    /// Caller guarantees the size and index invariants.
    pub(crate) fn from_parts(width: u32, height: u32, indices: Vec<u8>, palette_len: usize) -> Self {
        debug_assert_eq!(indices.len(), width as usize * height as usize);
        Self {
            width,
            height,
            indices,
            palette_len,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of entries in the palette the indices refer to.
    #[inline]
    pub fn palette_len(&self) -> usize {
        self.palette_len
    }

    #[inline]
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> u8 {
        self.indices[y as usize * self.width as usize + x as usize]
    }

    /// Count of pixels mapped to each palette entry.
    pub fn histogram(&self) -> Vec<usize> {
        let mut counts = vec![0; self.palette_len];
        for &i in &self.indices {
            counts[i as usize] += 1;
        }
        counts
    }
}
