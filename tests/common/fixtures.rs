//! Test fixtures: image encoding and multipart bodies.

use std::io::Cursor;

pub const BOUNDARY: &str = "inkframe-test-boundary";

/// Encode an 8-bit RGB PNG, pixel colors from `color(x, y)`
pub fn rgb_png(width: u32, height: u32, color: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&color(x, y));
        }
    }
    encode(width, height, png::ColorType::Rgb, &data)
}

/// Single-color RGB PNG
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    rgb_png(width, height, |_, _| rgb)
}

/// Horizontal hue-ish gradient, enough to exercise every palette entry
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    rgb_png(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        [r, g, 255 - r]
    })
}

/// RGBA PNG with every pixel fully transparent
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let data = vec![0u8; (width * height * 4) as usize];
    encode(width, height, png::ColorType::Rgba, &data)
}

/// Baseline JPEG of a single color
pub fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let photo = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut buf = Cursor::new(Vec::new());
    photo.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

fn encode(width: u32, height: u32, color: png::ColorType, data: &[u8]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
    }
    buf.into_inner()
}

/// Decode an indexed preview PNG: (width, height, packed rows, PLTE)
pub fn decode_indexed(png_data: &[u8]) -> (u32, u32, Vec<u8>, Vec<u8>) {
    let decoder = png::Decoder::new(Cursor::new(png_data));
    let mut reader = decoder.read_info().unwrap();
    let plte = reader.info().palette.as_ref().unwrap().to_vec();
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).unwrap();
    buf.truncate(info.buffer_size());
    (info.width, info.height, buf, plte)
}

/// Build a multipart/form-data body with one file field
pub fn multipart_body(
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> (&'static str, Vec<u8>) {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (BOUNDARY, body)
}
