//! Frame packing: two palette indices per byte.
//!
//! Layout, as consumed by the 7in3f controller's `DTM1` data stream:
//!
//! - row-major, top row first
//! - high nibble = left pixel, low nibble = right pixel
//! - every row starts on a byte boundary; an odd-width row ends with the
//!   last pixel in the high nibble and [`PAD_NIBBLE`] in the low nibble
//!
//! The frame length is therefore `ceil(width / 2) * height`.

use crate::raster::QuantizedRaster;

/// Fill value for the unused low nibble of an odd-width row (white).
pub const PAD_NIBBLE: u8 = 0x1;

/// Bytes per packed row.
#[inline]
pub fn row_stride(width: u32) -> usize {
    (width as usize).div_ceil(2)
}

/// Packed frame length for a `width x height` raster.
#[inline]
pub fn frame_len(width: u32, height: u32) -> usize {
    row_stride(width) * height as usize
}

/// The wire-ready frame buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PackedFrame {
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Never true for a frame packed from a [`QuantizedRaster`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Palette index of the pixel at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let byte = self.data[y as usize * row_stride(self.width) + x as usize / 2];
        if x % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }
}

/// Pack a quantized raster into the nibble wire format.
///
/// ```
/// use eink_frame::{pack, QuantizedRaster};
///
/// // black, white / red, white
/// let raster = QuantizedRaster::from_indices(2, 2, vec![0, 1, 4, 1], 7).unwrap();
/// assert_eq!(pack(&raster).as_bytes(), &[0x01, 0x41]);
/// ```
pub fn pack(raster: &QuantizedRaster) -> PackedFrame {
    let width = raster.width();
    let height = raster.height();
    let mut data = Vec::with_capacity(frame_len(width, height));

    for row in raster.indices().chunks_exact(width as usize) {
        for pair in row.chunks(2) {
            let hi = pair[0] & 0x0F;
            let lo = pair.get(1).map_or(PAD_NIBBLE, |&p| p & 0x0F);
            data.push((hi << 4) | lo);
        }
    }

    PackedFrame {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32, indices: Vec<u8>, palette_len: usize) -> QuantizedRaster {
        QuantizedRaster::from_indices(width, height, indices, palette_len).unwrap()
    }

    #[test]
    fn test_three_color_scenario() {
        // black, white / red, white with palette [black, white, red]
        let frame = pack(&raster(2, 2, vec![0, 1, 2, 1], 3));
        assert_eq!(frame.as_bytes(), &[0x01, 0x21]);
    }

    #[test]
    fn test_odd_width_pads_with_white() {
        let frame = pack(&raster(3, 2, vec![2, 3, 4, 5, 6, 0], 7));
        assert_eq!(frame.as_bytes(), &[0x23, 0x41, 0x56, 0x01]);
    }

    #[test]
    fn test_single_pixel() {
        let frame = pack(&raster(1, 1, vec![6], 7));
        assert_eq!(frame.as_bytes(), &[0x61]);
    }

    #[test]
    fn test_length_formula() {
        for (w, h) in [(1, 1), (2, 3), (5, 4), (800, 480), (799, 2)] {
            let n = (w * h) as usize;
            let frame = pack(&raster(w, h, vec![0; n], 2));
            assert_eq!(frame.len(), w.div_ceil(2) as usize * h as usize);
            assert_eq!(frame.len(), frame_len(w, h));
        }
        assert_eq!(frame_len(800, 480), 192_000);
    }

    #[test]
    fn test_pixel_reads_back() {
        let indices: Vec<u8> = (0..15).map(|i| (i % 7) as u8).collect();
        let q = raster(5, 3, indices.clone(), 7);
        let frame = pack(&q);
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(frame.pixel(x, y), q.index(x, y), "({x}, {y})");
            }
        }
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_pixel_out_of_bounds() {
        let frame = pack(&raster(3, 1, vec![0, 0, 0], 2));
        frame.pixel(3, 0);
    }
}
