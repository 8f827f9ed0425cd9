//! Upload decoding into [`RasterImage`].
//!
//! PNG goes through the `png` crate so every color type and bit depth is
//! handled exactly; JPEG and WebP photos go through `image`. The format is
//! sniffed from the bytes, not taken from the declared content type.

use std::io::Cursor;

use eink_frame::RasterImage;
use image::{ImageFormat, ImageReader};
use thiserror::Error;

/// Refuse images that would need more than ~150 MB of RGB.
pub const MAX_PIXELS: u64 = 50_000_000;

/// Content types accepted for upload, all decodable by [`decode_image`].
pub const ACCEPTED_MIME: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("not a PNG, JPEG or WebP image")]
    UnknownFormat,

    #[error("not a valid {format}: {message}")]
    Invalid {
        format: &'static str,
        message: String,
    },

    #[error("image is {width}x{height}, limit is {MAX_PIXELS} pixels")]
    TooManyPixels { width: u32, height: u32 },

    #[error("image has zero area")]
    Empty,
}

impl DecodeError {
    fn png(message: impl ToString) -> Self {
        DecodeError::Invalid {
            format: "PNG",
            message: message.to_string(),
        }
    }
}

impl From<png::DecodingError> for DecodeError {
    fn from(e: png::DecodingError) -> Self {
        DecodeError::png(e)
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::Empty);
    }
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(DecodeError::TooManyPixels { width, height });
    }
    Ok(())
}

/// Decode a PNG, JPEG or WebP photo into 8-bit RGB.
///
/// Alpha is composited over white.
pub fn decode_image(bytes: &[u8]) -> Result<RasterImage, DecodeError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => decode_png(bytes),
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::WebP)) => decode_photo(bytes, format),
        _ => Err(DecodeError::UnknownFormat),
    }
}

/// Decode a PNG of any color type into 8-bit RGB.
///
/// Palette and low-bit-depth images are expanded, 16-bit samples are
/// truncated to 8 bits, greyscale is replicated into RGB and alpha is
/// composited over white.
pub fn decode_png(bytes: &[u8]) -> Result<RasterImage, DecodeError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;

    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    check_dimensions(width, height)?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let rgb = match info.color_type {
        png::ColorType::Rgb => buf,
        png::ColorType::Rgba => rgba_over_white(&buf),
        png::ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| {
                let v = over_white(p[0], p[1]);
                [v, v, v]
            })
            .collect(),
        png::ColorType::Indexed => return Err(DecodeError::png("palette was not expanded")),
    };

    RasterImage::new(info.width, info.height, rgb).map_err(DecodeError::png)
}

fn decode_photo(bytes: &[u8], format: ImageFormat) -> Result<RasterImage, DecodeError> {
    let name = match format {
        ImageFormat::WebP => "WebP",
        _ => "JPEG",
    };
    let invalid = |e: image::ImageError| DecodeError::Invalid {
        format: name,
        message: e.to_string(),
    };

    // Header first; oversized images never reach the decoder
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(invalid)?;
    check_dimensions(width, height)?;

    let decoded = ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(invalid)?;
    let rgb = if decoded.color().has_alpha() {
        rgba_over_white(decoded.to_rgba8().as_raw())
    } else {
        decoded.to_rgb8().into_raw()
    };

    RasterImage::new(width, height, rgb).map_err(|e| DecodeError::Invalid {
        format: name,
        message: e.to_string(),
    })
}

fn rgba_over_white(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|p| {
            let a = p[3];
            [over_white(p[0], a), over_white(p[1], a), over_white(p[2], a)]
        })
        .collect()
}

#[inline]
fn over_white(value: u8, alpha: u8) -> u8 {
    let v = value as u32 * alpha as u32 + 255 * (255 - alpha as u32);
    ((v + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(
        width: u32,
        height: u32,
        color: png::ColorType,
        depth: png::BitDepth,
        plte: Option<&[u8]>,
        data: &[u8],
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buf, width, height);
            encoder.set_color(color);
            encoder.set_depth(depth);
            if let Some(plte) = plte {
                encoder.set_palette(plte.to_vec());
            }
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        buf
    }

    #[test]
    fn test_decode_rgb() {
        let data = [255, 0, 0, 0, 255, 0];
        let png_data = encode(2, 1, png::ColorType::Rgb, png::BitDepth::Eight, None, &data);

        let image = decode_png(&png_data).unwrap();
        assert_eq!((image.width(), image.height()), (2, 1));
        assert_eq!(image.as_bytes(), &data);
    }

    #[test]
    fn test_decode_rgba_composites_over_white() {
        let data = [0, 0, 0, 0, 0, 0, 0, 255, 0, 0, 0, 128];
        let png_data = encode(3, 1, png::ColorType::Rgba, png::BitDepth::Eight, None, &data);

        let image = decode_png(&png_data).unwrap();
        assert_eq!(image.pixel(0, 0), [255, 255, 255]);
        assert_eq!(image.pixel(1, 0), [0, 0, 0]);
        assert_eq!(image.pixel(2, 0), [127, 127, 127]);
    }

    #[test]
    fn test_decode_grey_and_16bit() {
        let png_data = encode(
            2,
            1,
            png::ColorType::Grayscale,
            png::BitDepth::Sixteen,
            None,
            &[0x80, 0xFF, 0x10, 0x00],
        );

        let image = decode_png(&png_data).unwrap();
        assert_eq!(image.pixel(0, 0), [0x80, 0x80, 0x80]);
        assert_eq!(image.pixel(1, 0), [0x10, 0x10, 0x10]);
    }

    #[test]
    fn test_decode_indexed() {
        let plte = [10, 20, 30, 200, 100, 50];
        // 4 pixels at 2 bits: 0, 1, 1, 0
        let png_data = encode(
            4,
            1,
            png::ColorType::Indexed,
            png::BitDepth::Two,
            Some(&plte),
            &[0b00_01_01_00],
        );

        let image = decode_png(&png_data).unwrap();
        assert_eq!(image.pixel(0, 0), [10, 20, 30]);
        assert_eq!(image.pixel(1, 0), [200, 100, 50]);
        assert_eq!(image.pixel(3, 0), [10, 20, 30]);
    }

    fn encode_with_image(image: impl Into<image::DynamicImage>, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.into().write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn assert_near(actual: [u8; 3], expected: [u8; 3], tolerance: u8) {
        for c in 0..3 {
            assert!(
                actual[c].abs_diff(expected[c]) <= tolerance,
                "{actual:?} vs {expected:?}"
            );
        }
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_png(b"definitely not a png"),
            Err(DecodeError::Invalid { format: "PNG", .. })
        ));
        assert_eq!(
            decode_image(b"definitely not an image"),
            Err(DecodeError::UnknownFormat)
        );
        assert_eq!(decode_image(&[]), Err(DecodeError::UnknownFormat));
    }

    #[test]
    fn test_decode_image_dispatches_png() {
        let data = [255, 0, 0, 0, 255, 0];
        let png_data = encode(2, 1, png::ColorType::Rgb, png::BitDepth::Eight, None, &data);
        assert_eq!(decode_image(&png_data), decode_png(&png_data));
    }

    #[test]
    fn test_decode_jpeg() {
        let photo = image::RgbImage::from_pixel(24, 16, image::Rgb([200, 120, 40]));
        let jpeg = encode_with_image(photo, ImageFormat::Jpeg);

        let image = decode_image(&jpeg).unwrap();
        assert_eq!((image.width(), image.height()), (24, 16));
        assert_near(image.pixel(0, 0), [200, 120, 40], 4);
        assert_near(image.pixel(23, 15), [200, 120, 40], 4);
    }

    #[test]
    fn test_decode_truncated_jpeg() {
        let photo = image::RgbImage::from_pixel(64, 64, image::Rgb([10, 20, 30]));
        let jpeg = encode_with_image(photo, ImageFormat::Jpeg);
        assert!(matches!(
            decode_image(&jpeg[..jpeg.len() / 3]),
            Err(DecodeError::Invalid { format: "JPEG", .. })
        ));
    }

    #[test]
    fn test_decode_webp_composites_over_white() {
        let mut photo = image::RgbaImage::from_pixel(2, 1, image::Rgba([0, 0, 0, 0]));
        photo.put_pixel(1, 0, image::Rgba([0, 0, 255, 255]));
        let webp = encode_with_image(photo, ImageFormat::WebP);

        let image = decode_image(&webp).unwrap();
        assert_eq!(image.pixel(0, 0), [255, 255, 255]);
        assert_eq!(image.pixel(1, 0), [0, 0, 255]);
    }

    #[test]
    fn test_decode_truncated() {
        let png_data = encode(
            4,
            4,
            png::ColorType::Rgb,
            png::BitDepth::Eight,
            None,
            &[0x55; 48],
        );
        let truncated = &png_data[..png_data.len() - 20];
        assert!(decode_png(truncated).is_err());
    }

    #[test]
    fn test_over_white() {
        assert_eq!(over_white(0, 255), 0);
        assert_eq!(over_white(0, 0), 255);
        assert_eq!(over_white(200, 255), 200);
    }
}
